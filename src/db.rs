pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod permission_repo;
pub use permission_repo::PermissionRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
