// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::logout,

        // --- Usuarios ---
        handlers::auth::update_status,
        handlers::auth::update_acesso,

        // --- Permissoes ---
        handlers::permissions::get_user_permissions,
        handlers::permissions::update_user_permissions,
        handlers::permissions::get_defaults,
        handlers::permissions::get_screens,

        // --- Auditoria ---
        handlers::audit::list_audit,
        handlers::audit::audit_stats,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::TipoAcesso,
            models::auth::NivelAcesso,
            models::auth::StatusUsuario,
            models::auth::Usuario,
            models::auth::LoginPayload,
            models::auth::AuthResponse,
            models::auth::UpdateStatusPayload,
            models::auth::UpdateAcessoPayload,

            // --- Telas ---
            models::screens::ScreenKey,
            models::screens::Capability,
            models::screens::Tela,

            // --- Permissoes ---
            models::permissions::CapabilitySet,
            models::permissions::PermissionRow,
            models::permissions::PermissaoInput,
            models::permissions::UpdatePermissoesPayload,
            models::permissions::UsuarioResumo,
            models::permissions::PermissoesUsuarioResponse,
            models::permissions::PermissaoPadrao,
            models::permissions::DefaultsResponse,

            // --- Auditoria ---
            models::audit::AuditAction,
            models::audit::Periodo,
            models::audit::AuditEntry,
            models::audit::Pagination,
            models::audit::AuditListResponse,
            models::audit::AcaoCount,
            models::audit::RecursoCount,
            models::audit::DiaCount,
            models::audit::StatsResumo,
            models::audit::AuditStatsResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e sessão"),
        (name = "Usuarios", description = "Status e tier de acesso dos usuários"),
        (name = "Permissoes", description = "Permissões por tela e padrões por tier"),
        (name = "Auditoria", description = "Trilha de auditoria e agregados")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
