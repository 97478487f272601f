// src/middleware/audit.rs

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use std::net::SocketAddr;

use crate::{
    config::AppState,
    models::audit::{AuditAction, NewAuditEntry},
    models::permissions::UpdatePermissoesPayload,
    services::audit_service,
};

/// Vínculo de um recurso auditável com a tabela física de onde a pré-imagem
/// de updates é lida. Cada módulo de recurso registra o seu com
/// `inventory::submit!`, em vez de um switch central editado a cada
/// entidade nova.
pub struct TableBinding {
    pub resource: &'static str,
    pub table: &'static str,
}

inventory::collect!(TableBinding);

pub fn table_for(resource: &str) -> Option<&'static str> {
    inventory::iter::<TableBinding>
        .into_iter()
        .find(|b| b.resource == resource)
        .map(|b| b.table)
}

/// O que uma rota mutante declara ao se pendurar no tap de auditoria.
#[derive(Debug, Clone, Copy)]
pub struct AuditSpec {
    pub action: AuditAction,
    pub resource: &'static str,
}

impl AuditSpec {
    pub const fn new(action: AuditAction, resource: &'static str) -> Self {
        Self { action, resource }
    }

    /// Ações que comparam estado antes/depois.
    fn tracks_changes(&self) -> bool {
        matches!(
            self.action,
            AuditAction::Update | AuditAction::UserStatusChange | AuditAction::PermissionChange
        )
    }

    fn captures_body(&self) -> bool {
        self.tracks_changes() || self.action == AuditAction::Create
    }
}

/// Middleware de auditoria de mudanças. Uso:
///
/// ```ignore
/// .route("/usuario/{id}", put(handler).layer(
///     axum_middleware::from_fn_with_state(
///         (app_state.clone(), AuditSpec::new(AuditAction::Update, "permissoes")),
///         audit_tap,
///     ),
/// ))
/// ```
///
/// Captura a pré-imagem (updates com binding), roda o handler e, somente em
/// 2xx, monta os detalhes e agenda a gravação via `AuditRecorder`. A
/// resposta volta intacta seja qual for o destino da auditoria.
pub async fn audit_tap(
    State((app_state, spec)): State<(AppState, AuditSpec)>,
    request: Request,
    next: Next,
) -> Response {
    let usuario_id = request.extensions().get::<crate::models::auth::Usuario>().map(|u| u.id);
    let ip = client_ip(
        request.headers(),
        request.extensions().get::<ConnectInfo<SocketAddr>>().map(|c| c.0),
    );
    let method = request.method().to_string();
    let url = request.uri().to_string();
    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let resource_id = path_id(request.uri().path());

    // Pré-imagem só para updates de recursos com binding registrado;
    // permissões não têm linha única e usam o `estado_anterior` declarado.
    let pre_image = if spec.tracks_changes() {
        match (table_for(spec.resource), resource_id) {
            (Some(table), Some(id)) => {
                app_state.audit_repo.load_pre_image(table, id).await.unwrap_or_else(|e| {
                    tracing::warn!("Falha ao capturar pré-imagem de {}/{}: {}", spec.resource, id, e);
                    None
                })
            }
            _ => None,
        }
    } else {
        None
    };

    let (request, body_json) = if spec.captures_body() {
        match buffer_body(request).await {
            Ok(pair) => pair,
            Err(response) => return response,
        }
    } else {
        (request, None)
    };

    let response = next.run(request).await;

    // Registra apenas se a operação foi bem-sucedida.
    if response.status().is_success() {
        let mut detalhes = json!({
            "method": method,
            "url": url,
            "status_code": response.status().as_u16(),
        });
        if let Some(ua) = user_agent {
            detalhes["user_agent"] = Value::from(ua);
        }
        if let Some(id) = resource_id {
            detalhes["resource_id"] = Value::from(id);
        }
        if let Some(body) = &body_json {
            detalhes["request_body"] = audit_service::sanitize_body(body);
        }
        if spec.tracks_changes() {
            detalhes["changes"] = Value::Object(compute_changes(&spec, &pre_image, &body_json));
        }

        app_state.audit_recorder.record(NewAuditEntry {
            usuario_id,
            acao: spec.action,
            recurso: spec.resource.to_string(),
            detalhes: Some(detalhes),
            ip,
        });
    }

    response
}

fn compute_changes(
    spec: &AuditSpec,
    pre_image: &Option<Value>,
    body_json: &Option<Value>,
) -> Map<String, Value> {
    let Some(Value::Object(body)) = body_json else {
        return Map::new();
    };

    // Permissões: não há pré-imagem no servidor; o diff compara o retrato
    // declarado pelo cliente com o estado desejado, chave composta por
    // tela+coluna.
    if spec.resource == "permissoes" {
        let Ok(payload) =
            serde_json::from_value::<UpdatePermissoesPayload>(Value::Object(body.clone()))
        else {
            return Map::new();
        };
        let anterior = payload.estado_anterior.unwrap_or_default();
        return audit_service::diff_permissions(&anterior, &payload.permissoes);
    }

    match pre_image {
        Some(Value::Object(before)) => {
            let tracked: Vec<&str> = body.keys().map(String::as_str).collect();
            audit_service::diff(before, body, &tracked)
        }
        _ => Map::new(),
    }
}

/// Extrai o último segmento numérico do path (`/usuarios/42/status` -> 42).
fn path_id(path: &str) -> Option<i64> {
    path.rsplit('/').find_map(|seg| seg.parse::<i64>().ok())
}

pub fn client_ip(headers: &HeaderMap, connect: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| connect.map(|addr| addr.ip().to_string()))
}

/// Teto de corpo bufferizado nas rotas auditadas.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

async fn buffer_body(request: Request) -> Result<(Request, Option<Value>), Response> {
    let (parts, body) = request.into_parts();
    match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => {
            let parsed = serde_json::from_slice(&bytes).ok();
            Ok((Request::from_parts(parts, Body::from(bytes)), parsed))
        }
        Err(e) => {
            tracing::warn!("Corpo de requisição rejeitado no tap de auditoria: {}", e);
            Err(StatusCode::PAYLOAD_TOO_LARGE.into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_id_takes_the_last_numeric_segment() {
        assert_eq!(path_id("/api/permissions/usuario/42"), Some(42));
        assert_eq!(path_id("/api/usuarios/7/status"), Some(7));
        assert_eq!(path_id("/api/audit/stats"), None);
    }

    #[tokio::test]
    async fn body_within_the_cap_is_buffered_and_parsed() {
        let request = Request::new(Body::from(r#"{"status":"inativo"}"#));
        let (_request, parsed) = buffer_body(request).await.unwrap();
        assert_eq!(parsed.unwrap()["status"], "inativo");
    }

    #[tokio::test]
    async fn body_over_the_cap_is_rejected() {
        let request = Request::new(Body::from(vec![b'x'; MAX_BODY_BYTES + 1]));
        let response = buffer_body(request).await.unwrap_err();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn forwarded_header_wins_over_socket_addr() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(addr)), Some("203.0.113.9".to_string()));
        assert_eq!(client_ip(&HeaderMap::new(), Some(addr)), Some("127.0.0.1".to_string()));
    }
}
