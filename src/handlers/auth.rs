// src/handlers/auth.rs

use axum::{
    Json,
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::audit::client_ip,
    middleware::auth::AuthenticatedUser,
    models::auth::{
        AuthResponse, LoginPayload, StatusUsuario, UpdateAcessoPayload, UpdateStatusPayload,
    },
};

use crate::middleware::audit::TableBinding;

// Pré-imagem das transições administrativas de usuário.
inventory::submit! {
    TableBinding { resource: "usuarios", table: "usuarios" }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Login bem-sucedido", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas ou conta inativa"),
        (status = 403, description = "Conta bloqueada por excesso de tentativas"),
        (status = 422, description = "Payload inválido")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let ip = client_ip(&headers, Some(addr));
    let response = app_state.auth_service.login(&payload.email, &payload.senha, ip).await?;

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Logout registrado"),
        (status = 401, description = "Não autenticado")
    ),
    security(("api_jwt" = []))
)]
pub async fn logout(
    State(app_state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    AuthenticatedUser(usuario): AuthenticatedUser,
) -> Json<Value> {
    let ip = client_ip(&headers, Some(addr));
    app_state.auth_service.logout(&usuario, ip);

    Json(json!({ "message": "Logout realizado com sucesso." }))
}

#[utoipa::path(
    put,
    path = "/api/usuarios/{id}/status",
    tag = "Usuarios",
    request_body = UpdateStatusPayload,
    params(("id" = i64, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Status atualizado"),
        (status = 403, description = "Apenas administradores alteram status"),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(ator): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<Json<Value>, AppError> {
    if !ator.is_admin() {
        return Err(AppError::PermissionDenied);
    }

    let usuario = app_state
        .user_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuário não encontrado".into()))?;

    app_state.user_repo.set_status(&app_state.db_pool, id, payload.status).await?;

    // Desbloqueio manual também zera o contador de tentativas em memória.
    if payload.status == StatusUsuario::Ativo {
        app_state.auth_service.clear_login_block(&usuario.email).await;
    }

    Ok(Json(json!({
        "message": "Status atualizado com sucesso.",
        "status": payload.status,
    })))
}

#[utoipa::path(
    put,
    path = "/api/usuarios/{id}/acesso",
    tag = "Usuarios",
    request_body = UpdateAcessoPayload,
    params(("id" = i64, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Tier atualizado e permissões padrão reaplicadas"),
        (status = 403, description = "Apenas administradores alteram o tier"),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_acesso(
    State(app_state): State<AppState>,
    AuthenticatedUser(ator): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAcessoPayload>,
) -> Result<Json<Value>, AppError> {
    if !ator.is_admin() {
        return Err(AppError::PermissionDenied);
    }

    app_state
        .permission_service
        .update_acesso(id, payload.tipo_de_acesso, payload.nivel_de_acesso)
        .await?;

    Ok(Json(json!({
        "message": "Acesso atualizado e permissões padrão reaplicadas.",
        "tipo_de_acesso": payload.tipo_de_acesso,
        "nivel_de_acesso": payload.nivel_de_acesso,
    })))
}
