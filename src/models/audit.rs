// src/models/audit.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

use crate::common::error::AppError;
use crate::models::impl_text_scalar;

/// Ações registráveis na trilha de auditoria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Login,
    Logout,
    Create,
    Update,
    Delete,
    View,
    PasswordChange,
    PermissionChange,
    UserStatusChange,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "login",
            AuditAction::Logout => "logout",
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::View => "view",
            AuditAction::PasswordChange => "password_change",
            AuditAction::PermissionChange => "permission_change",
            AuditAction::UserStatusChange => "user_status_change",
        }
    }
}

impl FromStr for AuditAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "login" => Ok(AuditAction::Login),
            "logout" => Ok(AuditAction::Logout),
            "create" => Ok(AuditAction::Create),
            "update" => Ok(AuditAction::Update),
            "delete" => Ok(AuditAction::Delete),
            "view" => Ok(AuditAction::View),
            "password_change" => Ok(AuditAction::PasswordChange),
            "permission_change" => Ok(AuditAction::PermissionChange),
            "user_status_change" => Ok(AuditAction::UserStatusChange),
            _ => Err(AppError::Validation(format!("Ação de auditoria inválida: {}", s))),
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl_text_scalar!(AuditAction);

/// O que o gravador recebe. O `timestamp` é atribuído pelo banco no INSERT.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub usuario_id: Option<i64>,
    pub acao: AuditAction,
    pub recurso: String,
    pub detalhes: Option<Value>,
    pub ip: Option<String>,
}

/// Entrada lida de `auditoria_acoes`, com o JOIN em `usuarios` que o
/// frontend original consome.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct AuditEntry {
    pub id: i64,
    pub usuario_id: Option<i64>,
    pub usuario_nome: Option<String>,
    pub usuario_email: Option<String>,
    pub acao: AuditAction,
    pub recurso: String,
    pub detalhes: Option<Value>,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Atalhos de período aceitos por `GET /api/audit` quando as datas
/// explícitas não vêm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
pub enum Periodo {
    #[serde(rename = "7dias")]
    SeteDias,
    #[serde(rename = "30dias")]
    TrintaDias,
    #[serde(rename = "90dias")]
    NoventaDias,
    #[serde(rename = "todos")]
    Todos,
}

impl Periodo {
    pub fn dias(&self) -> Option<i64> {
        match self {
            Periodo::SeteDias => Some(7),
            Periodo::TrintaDias => Some(30),
            Periodo::NoventaDias => Some(90),
            Periodo::Todos => None,
        }
    }
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    100
}

/// Query string de `GET /api/audit`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditLogQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
    pub acao: Option<AuditAction>,
    pub recurso: Option<String>,
    pub usuario_id: Option<i64>,
    pub periodo: Option<Periodo>,
}

/// Filtros já resolvidos (período expandido em datas).
#[derive(Debug, Clone, Default)]
pub struct AuditFilters {
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
    pub acao: Option<AuditAction>,
    pub recurso: Option<String>,
    pub usuario_id: Option<i64>,
}

impl AuditLogQuery {
    /// `data_inicio`/`data_fim` explícitas têm precedência sobre `periodo`.
    pub fn filters(&self) -> AuditFilters {
        let (mut data_inicio, mut data_fim) = (self.data_inicio, self.data_fim);
        if data_inicio.is_none() && data_fim.is_none() {
            if let Some(dias) = self.periodo.and_then(|p| p.dias()) {
                let hoje = Utc::now().date_naive();
                data_inicio = Some(hoje - chrono::Duration::days(dias));
                data_fim = Some(hoje);
            }
        }
        AuditFilters {
            data_inicio,
            data_fim,
            acao: self.acao,
            recurso: self.recurso.clone(),
            usuario_id: self.usuario_id,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Pagination {
            page,
            limit,
            total,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditListResponse {
    pub data: Vec<AuditEntry>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct AcaoCount {
    pub acao: AuditAction,
    pub total: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct RecursoCount {
    pub recurso: String,
    pub total: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct DiaCount {
    pub dia: NaiveDate,
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResumo {
    pub acoes_hoje: i64,
    pub acoes_ultima_semana: i64,
    pub acoes_ultimo_mes: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditStatsResponse {
    pub acoes_stats: Vec<AcaoCount>,
    pub recursos_stats: Vec<RecursoCount>,
    /// Histograma diário dos últimos 30 dias.
    pub distribuicao_diaria: Vec<DiaCount>,
    pub resumo: StatsResumo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dates_win_over_periodo() {
        let q = AuditLogQuery {
            page: 1,
            limit: 100,
            data_inicio: Some(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()),
            data_fim: None,
            acao: None,
            recurso: None,
            usuario_id: None,
            periodo: Some(Periodo::SeteDias),
        };
        let f = q.filters();
        assert_eq!(f.data_inicio, NaiveDate::from_ymd_opt(2026, 1, 1));
        assert_eq!(f.data_fim, None);
    }

    #[test]
    fn periodo_todos_applies_no_window() {
        let q = AuditLogQuery {
            page: 1,
            limit: 100,
            data_inicio: None,
            data_fim: None,
            acao: None,
            recurso: None,
            usuario_id: None,
            periodo: Some(Periodo::Todos),
        };
        let f = q.filters();
        assert!(f.data_inicio.is_none() && f.data_fim.is_none());
    }

    #[test]
    fn pagination_metadata() {
        let p = Pagination::new(2, 50, 120);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next_page);
        assert!(p.has_prev_page);
    }
}
