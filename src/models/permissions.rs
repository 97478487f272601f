// src/models/permissions.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::auth::{NivelAcesso, TipoAcesso};
use crate::models::screens::{Capability, ScreenKey};

/// Conjunto de capacidades de um usuário sobre uma tela. `mover` é opcional
/// no protocolo e não é persistido; ausente significa `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CapabilitySet {
    pub visualizar: bool,
    pub criar: bool,
    pub editar: bool,
    pub excluir: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub mover: bool,
}

impl CapabilitySet {
    pub const NONE: CapabilitySet = CapabilitySet::new(false, false, false, false);
    pub const VIEW: CapabilitySet = CapabilitySet::new(true, false, false, false);
    /// Visualizar + criar + editar, sem excluir.
    pub const VCE: CapabilitySet = CapabilitySet::new(true, true, true, false);
    pub const FULL: CapabilitySet = CapabilitySet::new(true, true, true, true);

    pub const fn new(visualizar: bool, criar: bool, editar: bool, excluir: bool) -> Self {
        CapabilitySet { visualizar, criar, editar, excluir, mover: false }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Visualizar => self.visualizar,
            Capability::Criar => self.criar,
            Capability::Editar => self.editar,
            Capability::Excluir => self.excluir,
            Capability::Mover => self.mover,
        }
    }

    /// Linhas totalmente vazias não são persistidas (normalização implícita
    /// do `replace_for_actor`).
    pub fn is_empty(&self) -> bool {
        *self == CapabilitySet::NONE
    }
}

/// Linha persistida em `permissoes_usuario`. A *presença* da linha é
/// significativa: quando existe, ela determina o conjunto inteiro, sem
/// mesclar com os padrões da matriz.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct PermissionRow {
    pub usuario_id: i64,
    pub tela: ScreenKey,
    pub pode_visualizar: bool,
    pub pode_criar: bool,
    pub pode_editar: bool,
    pub pode_excluir: bool,
}

impl PermissionRow {
    pub fn capability_set(&self) -> CapabilitySet {
        CapabilitySet::new(self.pode_visualizar, self.pode_criar, self.pode_editar, self.pode_excluir)
    }

    pub fn from_set(usuario_id: i64, tela: ScreenKey, set: CapabilitySet) -> Self {
        PermissionRow {
            usuario_id,
            tela,
            pode_visualizar: set.visualizar,
            pode_criar: set.criar,
            pode_editar: set.editar,
            pode_excluir: set.excluir,
        }
    }
}

/// Uma entrada de `PUT /api/permissions/usuario/{id}`. A tela chega como
/// string e é validada contra o catálogo no serviço (tela desconhecida é
/// erro tipado, nunca gravação silenciosa).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermissaoInput {
    #[schema(example = "marcas")]
    pub tela: String,
    #[serde(default)]
    pub pode_visualizar: bool,
    #[serde(default)]
    pub pode_criar: bool,
    #[serde(default)]
    pub pode_editar: bool,
    #[serde(default)]
    pub pode_excluir: bool,
}

impl PermissaoInput {
    pub fn capability_set(&self) -> CapabilitySet {
        CapabilitySet::new(self.pode_visualizar, self.pode_criar, self.pode_editar, self.pode_excluir)
    }
}

/// Corpo de `PUT /api/permissions/usuario/{id}`.
///
/// `estado_anterior` é o retrato declarado pelo cliente do estado que ele
/// enxergava antes da edição (`tela -> colunas`). O diff de auditoria confia
/// nesse retrato; não existe uma "linha anterior" única no servidor porque a
/// relação é um-para-muitas.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePermissoesPayload {
    #[validate(length(min = 1, message = "Informe ao menos uma permissão."))]
    pub permissoes: Vec<PermissaoInput>,
    #[serde(default)]
    pub estado_anterior: Option<Map<String, Value>>,
}

/// Resumo do usuário embutido nas respostas de permissão, como o frontend
/// original espera.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct UsuarioResumo {
    pub id: i64,
    pub nome: String,
    pub email: String,
    pub tipo_de_acesso: TipoAcesso,
    pub nivel_de_acesso: NivelAcesso,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PermissoesUsuarioResponse {
    pub usuario: UsuarioResumo,
    /// Mapa total sobre o catálogo: telas sem linha aparecem zeradas.
    pub permissoes: Vec<PermissionRow>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PermissaoPadrao {
    pub tela: ScreenKey,
    pub pode_visualizar: bool,
    pub pode_criar: bool,
    pub pode_editar: bool,
    pub pode_excluir: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DefaultsResponse {
    pub tipo_acesso: TipoAcesso,
    pub nivel_acesso: NivelAcesso,
    pub permissoes: Vec<PermissaoPadrao>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_permissoes_payload_fails_validation() {
        let payload = UpdatePermissoesPayload { permissoes: vec![], estado_anterior: None };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("permissoes"));
    }

    #[test]
    fn non_empty_permissoes_payload_validates() {
        let payload = UpdatePermissoesPayload {
            permissoes: vec![PermissaoInput {
                tela: "marcas".into(),
                pode_visualizar: true,
                pode_criar: false,
                pode_editar: false,
                pode_excluir: false,
            }],
            estado_anterior: None,
        };
        assert!(payload.validate().is_ok());
    }
}
