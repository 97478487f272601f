// src/services.rs

pub mod audit_service;
pub mod auth;
pub mod default_matrix;
pub mod login_limiter;
pub mod permission_service;
