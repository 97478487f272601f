// src/config.rs

use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{env, sync::Arc, time::Duration};
use tokio::task::JoinHandle;

use crate::{
    db::{AuditRepository, PermissionRepository, UserRepository},
    services::audit_service::{AuditQueryService, AuditRecorder},
    services::auth::AuthService,
    services::login_limiter::InMemoryLoginLimiter,
    services::permission_service::{PermissionPolicy, PermissionService},
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub user_repo: UserRepository,
    pub permission_service: PermissionService,
    pub audit_query: AuditQueryService,
    pub audit_repo: AuditRepository,
    pub audit_recorder: AuditRecorder,
}

impl AppState {
    /// Monta o estado e sobe o worker de auditoria. O `JoinHandle` deve ser
    /// aguardado depois do shutdown do servidor, quando o canal fecha e a
    /// fila é drenada.
    pub async fn new() -> anyhow::Result<(Self, JoinHandle<()>)> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let perm_repo = PermissionRepository::new(db_pool.clone());
        let audit_repo = AuditRepository::new(db_pool.clone());

        let policy = PermissionPolicy::from_env();
        if policy == PermissionPolicy::FailOpen {
            tracing::warn!(
                "Permissões em modo fail-open: telas sem linha gravada são permitidas. \
                 Defina PERMISSION_FAIL_MODE=fail_closed para negar."
            );
        }
        let permission_service =
            PermissionService::new(perm_repo, user_repo.clone(), db_pool.clone(), policy);

        let (audit_recorder, audit_worker) = AuditRecorder::spawn(Arc::new(audit_repo.clone()));
        let audit_query = AuditQueryService::new(audit_repo.clone());

        let limiter = Arc::new(InMemoryLoginLimiter::default());
        let auth_service = AuthService::new(
            user_repo.clone(),
            limiter,
            audit_recorder.clone(),
            jwt_secret,
            db_pool.clone(),
        );

        Ok((
            Self {
                db_pool,
                auth_service,
                user_repo,
                permission_service,
                audit_query,
                audit_repo,
                audit_recorder,
            },
            audit_worker,
        ))
    }
}
