// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::error::AppError;
use crate::models::impl_text_scalar;

/// Tipo de acesso (cargo) de um usuário. `administrador` curto-circuita o
/// resolvedor de permissões; os demais dependem da matriz/linhas persistidas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TipoAcesso {
    Administrador,
    Coordenador,
    Administrativo,
    Gerente,
    Supervisor,
    Nutricionista,
}

impl TipoAcesso {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoAcesso::Administrador => "administrador",
            TipoAcesso::Coordenador => "coordenador",
            TipoAcesso::Administrativo => "administrativo",
            TipoAcesso::Gerente => "gerente",
            TipoAcesso::Supervisor => "supervisor",
            TipoAcesso::Nutricionista => "nutricionista",
        }
    }
}

impl FromStr for TipoAcesso {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "administrador" => Ok(TipoAcesso::Administrador),
            "coordenador" => Ok(TipoAcesso::Coordenador),
            "administrativo" => Ok(TipoAcesso::Administrativo),
            "gerente" => Ok(TipoAcesso::Gerente),
            "supervisor" => Ok(TipoAcesso::Supervisor),
            "nutricionista" => Ok(TipoAcesso::Nutricionista),
            _ => Err(AppError::Validation(format!("Tipo de acesso inválido: {}", s))),
        }
    }
}

impl fmt::Display for TipoAcesso {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl_text_scalar!(TipoAcesso);

/// Nível de acesso dentro do tipo: I < II < III.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum NivelAcesso {
    I,
    II,
    III,
}

impl NivelAcesso {
    pub fn as_str(&self) -> &'static str {
        match self {
            NivelAcesso::I => "I",
            NivelAcesso::II => "II",
            NivelAcesso::III => "III",
        }
    }
}

impl FromStr for NivelAcesso {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "I" => Ok(NivelAcesso::I),
            "II" => Ok(NivelAcesso::II),
            "III" => Ok(NivelAcesso::III),
            _ => Err(AppError::Validation(format!("Nível de acesso inválido: {}", s))),
        }
    }
}

impl fmt::Display for NivelAcesso {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl_text_scalar!(NivelAcesso);

/// Estado de conta. `bloqueado` só volta a `ativo` por reset manual de um
/// administrador; `inativo` é o desligamento administrativo comum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusUsuario {
    Ativo,
    Inativo,
    Bloqueado,
}

impl StatusUsuario {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusUsuario::Ativo => "ativo",
            StatusUsuario::Inativo => "inativo",
            StatusUsuario::Bloqueado => "bloqueado",
        }
    }
}

impl FromStr for StatusUsuario {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ativo" => Ok(StatusUsuario::Ativo),
            "inativo" => Ok(StatusUsuario::Inativo),
            "bloqueado" => Ok(StatusUsuario::Bloqueado),
            _ => Err(AppError::Validation(format!("Status inválido: {}", s))),
        }
    }
}

impl fmt::Display for StatusUsuario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl_text_scalar!(StatusUsuario);

// Representa um usuário vindo do banco de dados. Carregado a cada requisição,
// nunca cacheado: mudança de status vale imediatamente.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Usuario {
    pub id: i64,
    pub nome: String,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub senha_hash: String,

    pub tipo_de_acesso: TipoAcesso,
    pub nivel_de_acesso: NivelAcesso,
    pub status: StatusUsuario,

    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

impl Usuario {
    pub fn is_admin(&self) -> bool {
        self.tipo_de_acesso == TipoAcesso::Administrador
    }
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "maria@escola.gov.br")]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub senha: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub usuario: Usuario,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,   // Subject (ID do usuário)
    pub exp: usize, // Expiration time
    pub iat: usize, // Issued At
}

/// Payload de `PUT /api/usuarios/{id}/status` (reset manual incluído).
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusPayload {
    pub status: StatusUsuario,
}

/// Payload de `PUT /api/usuarios/{id}/acesso`. Trocar o tier reaplica as
/// permissões padrão da matriz, descartando personalizações anteriores.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAcessoPayload {
    pub tipo_de_acesso: TipoAcesso,
    pub nivel_de_acesso: NivelAcesso,
}
