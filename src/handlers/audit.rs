// src/handlers/audit.rs

use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    middleware::rbac::can_view_audit,
    models::audit::{AuditListResponse, AuditLogQuery, AuditStatsResponse},
};

#[utoipa::path(
    get,
    path = "/api/audit",
    tag = "Auditoria",
    params(AuditLogQuery),
    responses(
        (status = 200, description = "Trilha de auditoria filtrada e paginada", body = AuditListResponse),
        (status = 403, description = "Acesso restrito a administradores e coordenadores nível III")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_audit(
    State(app_state): State<AppState>,
    AuthenticatedUser(usuario): AuthenticatedUser,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<AuditListResponse>, AppError> {
    if !can_view_audit(&usuario) {
        return Err(AppError::PermissionDenied);
    }

    let response = app_state.audit_query.list(&query).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/audit/stats",
    tag = "Auditoria",
    responses(
        (status = 200, description = "Agregados dos últimos 30 dias", body = AuditStatsResponse),
        (status = 403, description = "Acesso restrito a administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn audit_stats(
    State(app_state): State<AppState>,
    AuthenticatedUser(usuario): AuthenticatedUser,
) -> Result<Json<AuditStatsResponse>, AppError> {
    if !usuario.is_admin() {
        return Err(AppError::PermissionDenied);
    }

    let response = app_state.audit_query.stats().await?;
    Ok(Json(response))
}
