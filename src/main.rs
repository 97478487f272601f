//src/main.rs

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::audit::{AuditSpec, audit_tap};
use crate::middleware::auth::auth_guard;
use crate::models::audit::AuditAction;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let (app_state, audit_worker) = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas públicas de autenticação
    let auth_routes = Router::new().route("/login", post(handlers::auth::login));

    let session_routes = Router::new()
        .route("/logout", post(handlers::auth::logout))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Transições administrativas de usuário, cada uma com seu tap de auditoria
    let usuario_routes = Router::new()
        .route(
            "/{id}/status",
            put(handlers::auth::update_status).layer(axum_middleware::from_fn_with_state(
                (app_state.clone(), AuditSpec::new(AuditAction::UserStatusChange, "usuarios")),
                audit_tap,
            )),
        )
        .route(
            "/{id}/acesso",
            put(handlers::auth::update_acesso).layer(axum_middleware::from_fn_with_state(
                (app_state.clone(), AuditSpec::new(AuditAction::Update, "usuarios")),
                audit_tap,
            )),
        )
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // O tap cobre apenas o PUT; leituras não geram entrada na trilha.
    let permission_routes = Router::new()
        .route(
            "/usuario/{id}",
            put(handlers::permissions::update_user_permissions)
                .layer(axum_middleware::from_fn_with_state(
                    (app_state.clone(), AuditSpec::new(AuditAction::Update, "permissoes")),
                    audit_tap,
                ))
                .get(handlers::permissions::get_user_permissions),
        )
        .route("/defaults/{tipo}/{nivel}", get(handlers::permissions::get_defaults))
        .route("/screens", get(handlers::permissions::get_screens))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let audit_routes = Router::new()
        .route("/", get(handlers::audit::list_audit))
        .route("/stats", get(handlers::audit::audit_stats))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes.merge(session_routes))
        .nest("/api/usuarios", usuario_routes)
        .nest("/api/permissions", permission_routes)
        .nest("/api/audit", audit_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state.clone());

    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Erro no servidor Axum");

    // Fecha o canal de auditoria e espera o worker drenar a fila.
    drop(app_state);
    if let Err(e) = audit_worker.await {
        tracing::error!("Worker de auditoria encerrou com erro: {}", e);
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Falha ao instalar o handler de Ctrl+C");
    tracing::info!("Sinal de shutdown recebido, encerrando...");
}
