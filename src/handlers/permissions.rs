// src/handlers/permissions.rs

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{PermissoesEditar, PermissoesVisualizar, RequireCapability},
    models::permissions::{
        DefaultsResponse, PermissaoPadrao, PermissoesUsuarioResponse, UpdatePermissoesPayload,
    },
    models::screens::listar_telas,
    services::default_matrix,
};

#[utoipa::path(
    get,
    path = "/api/permissions/usuario/{id}",
    tag = "Permissoes",
    params(("id" = i64, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Permissões do usuário sobre o catálogo completo", body = PermissoesUsuarioResponse),
        (status = 403, description = "Sem permissão para visualizar permissões"),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user_permissions(
    State(app_state): State<AppState>,
    _guard: RequireCapability<PermissoesVisualizar>,
    Path(id): Path<i64>,
) -> Result<Json<PermissoesUsuarioResponse>, AppError> {
    let response = app_state.permission_service.get_for_actor(id).await?;
    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/api/permissions/usuario/{id}",
    tag = "Permissoes",
    request_body = UpdatePermissoesPayload,
    params(("id" = i64, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Conjunto de permissões substituído", body = PermissoesUsuarioResponse),
        (status = 403, description = "Sem permissão para editar permissões"),
        (status = 404, description = "Usuário não encontrado"),
        (status = 422, description = "Tela desconhecida ou payload vazio")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_user_permissions(
    State(app_state): State<AppState>,
    _guard: RequireCapability<PermissoesEditar>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePermissoesPayload>,
) -> Result<Json<PermissoesUsuarioResponse>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    // O `estado_anterior` do payload é consumido pelo tap de auditoria; a
    // substituição em si só usa as linhas desejadas.
    let response =
        app_state.permission_service.replace_for_actor(id, &payload.permissoes).await?;

    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/permissions/defaults/{tipo}/{nivel}",
    tag = "Permissoes",
    params(
        ("tipo" = String, Path, description = "Tipo de acesso (ex.: coordenador)"),
        ("nivel" = String, Path, description = "Nível de acesso (I, II ou III)")
    ),
    responses(
        (status = 200, description = "Permissões padrão do tier", body = DefaultsResponse),
        (status = 404, description = "Combinação de tipo e nível sem padrão definido"),
        (status = 422, description = "Tipo ou nível inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_defaults(
    Path((tipo, nivel)): Path<(String, String)>,
) -> Result<Json<DefaultsResponse>, AppError> {
    let tipo = tipo.parse()?;
    let nivel = nivel.parse()?;

    let map = default_matrix::get_defaults(tipo, nivel).ok_or_else(|| {
        AppError::NotFound("Combinação de tipo e nível de acesso não encontrada".into())
    })?;

    let permissoes = map
        .into_iter()
        .map(|(tela, set)| PermissaoPadrao {
            tela,
            pode_visualizar: set.visualizar,
            pode_criar: set.criar,
            pode_editar: set.editar,
            pode_excluir: set.excluir,
        })
        .collect();

    Ok(Json(DefaultsResponse { tipo_acesso: tipo, nivel_acesso: nivel, permissoes }))
}

#[utoipa::path(
    get,
    path = "/api/permissions/screens",
    tag = "Permissoes",
    responses(
        (status = 200, description = "Catálogo de telas do sistema"),
        (status = 401, description = "Não autenticado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_screens() -> Json<Value> {
    Json(json!({ "telas": listar_telas() }))
}
