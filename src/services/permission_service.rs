// src/services/permission_service.rs

use sqlx::{PgPool, Postgres, Transaction};
use std::env;
use std::str::FromStr;

use crate::common::error::AppError;
use crate::db::{PermissionRepository, UserRepository};
use crate::models::auth::{NivelAcesso, StatusUsuario, TipoAcesso, Usuario};
use crate::models::permissions::{
    CapabilitySet, PermissaoInput, PermissionRow, PermissoesUsuarioResponse,
};
use crate::models::screens::{Capability, ScreenKey};
use crate::services::default_matrix;

/// O que fazer quando não existe linha de permissão para (usuário, tela).
///
/// O comportamento herdado é permitir (`FailOpen`): usuários sem linhas
/// gravadas continuam enxergando o sistema. `FailClosed` é o padrão mais
/// seguro e está disponível via `PERMISSION_FAIL_MODE=fail_closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionPolicy {
    FailOpen,
    FailClosed,
}

impl PermissionPolicy {
    pub fn from_env() -> Self {
        match env::var("PERMISSION_FAIL_MODE").as_deref() {
            Ok("fail_closed") => PermissionPolicy::FailClosed,
            _ => PermissionPolicy::FailOpen,
        }
    }
}

/// Decisão pura de acesso, na ordem fixa: status, administrador, linha
/// gravada, política para linha ausente. A linha, quando existe, determina
/// o conjunto inteiro; nunca há mescla com os padrões da matriz.
pub fn decide(
    usuario: &Usuario,
    capability: Capability,
    stored: Option<CapabilitySet>,
    policy: PermissionPolicy,
) -> bool {
    if usuario.status != StatusUsuario::Ativo {
        return false;
    }
    if usuario.is_admin() {
        return true;
    }
    match stored {
        Some(set) => set.allows(capability),
        None => policy == PermissionPolicy::FailOpen,
    }
}

#[derive(Clone)]
pub struct PermissionService {
    perm_repo: PermissionRepository,
    user_repo: UserRepository,
    pool: PgPool,
    policy: PermissionPolicy,
}

impl PermissionService {
    pub fn new(
        perm_repo: PermissionRepository,
        user_repo: UserRepository,
        pool: PgPool,
        policy: PermissionPolicy,
    ) -> Self {
        Self { perm_repo, user_repo, pool, policy }
    }

    /// O usuário pode exercer `capability` sobre `screen`? Uma leitura
    /// indexada + decisão pura.
    pub async fn resolve(
        &self,
        usuario: &Usuario,
        screen: ScreenKey,
        capability: Capability,
    ) -> Result<bool, AppError> {
        let stored = self
            .perm_repo
            .find_row(usuario.id, screen)
            .await?
            .map(|row| row.capability_set());
        Ok(decide(usuario, capability, stored, self.policy))
    }

    /// Mapa total sobre o catálogo: telas sem linha aparecem zeradas, o
    /// chamador sempre recebe todas as telas.
    pub async fn get_for_actor(&self, usuario_id: i64) -> Result<PermissoesUsuarioResponse, AppError> {
        let usuario = self
            .user_repo
            .find_resumo(usuario_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuário não encontrado".into()))?;

        let rows = self.perm_repo.rows_for_actor(usuario_id).await?;
        let permissoes = ScreenKey::ALL
            .iter()
            .map(|&tela| {
                rows.iter()
                    .find(|r| r.tela == tela)
                    .cloned()
                    .unwrap_or_else(|| PermissionRow::from_set(usuario_id, tela, CapabilitySet::NONE))
            })
            .collect();

        Ok(PermissoesUsuarioResponse { usuario, permissoes })
    }

    /// Valida as telas do payload contra o catálogo e substitui o conjunto
    /// inteiro em uma transação.
    pub async fn replace_for_actor(
        &self,
        usuario_id: i64,
        permissoes: &[PermissaoInput],
    ) -> Result<PermissoesUsuarioResponse, AppError> {
        if self.user_repo.find_resumo(usuario_id).await?.is_none() {
            return Err(AppError::NotFound("Usuário não encontrado".into()));
        }

        let mut rows = Vec::with_capacity(permissoes.len());
        for perm in permissoes {
            let tela = ScreenKey::from_str(&perm.tela)?;
            rows.push((tela, perm.capability_set()));
        }

        self.perm_repo.replace_for_actor(usuario_id, &rows).await?;
        self.get_for_actor(usuario_id).await
    }

    /// Reaplica os padrões da matriz para o tier informado, descartando
    /// personalizações anteriores. Tiers sem entrada na matriz zeram as
    /// linhas (tela ausente da matriz = tudo falso). Participa da transação
    /// do chamador.
    pub async fn reseed_from_defaults(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        usuario_id: i64,
        tipo: TipoAcesso,
        nivel: NivelAcesso,
    ) -> Result<(), AppError> {
        let rows = default_rows(tipo, nivel);
        self.perm_repo.replace_in_tx(tx, usuario_id, &rows).await
    }

    /// Troca de tier + reseed em uma única transação.
    pub async fn update_acesso(
        &self,
        usuario_id: i64,
        tipo: TipoAcesso,
        nivel: NivelAcesso,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let affected = self.user_repo.update_acesso(&mut *tx, usuario_id, tipo, nivel).await?;
        if affected == 0 {
            return Err(AppError::NotFound("Usuário não encontrado".into()));
        }

        self.reseed_from_defaults(&mut tx, usuario_id, tipo, nivel).await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Linhas que o reseed grava para um tier: o mapa da matriz quando existe,
/// nenhuma linha para tiers sem entrada.
fn default_rows(tipo: TipoAcesso, nivel: NivelAcesso) -> Vec<(ScreenKey, CapabilitySet)> {
    default_matrix::get_defaults(tipo, nivel)
        .map(|map| map.into_iter().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn usuario(tipo: TipoAcesso, nivel: NivelAcesso, status: StatusUsuario) -> Usuario {
        Usuario {
            id: 42,
            nome: "Teste".into(),
            email: "teste@escola.gov.br".into(),
            senha_hash: String::new(),
            tipo_de_acesso: tipo,
            nivel_de_acesso: nivel,
            status,
            criado_em: Utc::now(),
            atualizado_em: Utc::now(),
        }
    }

    #[test]
    fn admin_always_allowed_even_with_contradictory_row() {
        let admin = usuario(TipoAcesso::Administrador, NivelAcesso::I, StatusUsuario::Ativo);
        for cap in [
            Capability::Visualizar,
            Capability::Criar,
            Capability::Editar,
            Capability::Excluir,
        ] {
            assert!(decide(&admin, cap, Some(CapabilitySet::NONE), PermissionPolicy::FailClosed));
            assert!(decide(&admin, cap, None, PermissionPolicy::FailClosed));
        }
    }

    #[test]
    fn non_active_status_denies_everything() {
        for status in [StatusUsuario::Inativo, StatusUsuario::Bloqueado] {
            let u = usuario(TipoAcesso::Administrador, NivelAcesso::III, status);
            assert!(!decide(&u, Capability::Visualizar, Some(CapabilitySet::FULL), PermissionPolicy::FailOpen));
        }
    }

    #[test]
    fn stored_row_fully_determines_the_set() {
        let u = usuario(TipoAcesso::Coordenador, NivelAcesso::III, StatusUsuario::Ativo);
        let set = CapabilitySet::new(true, false, true, false);
        assert!(decide(&u, Capability::Visualizar, Some(set), PermissionPolicy::FailClosed));
        assert!(!decide(&u, Capability::Criar, Some(set), PermissionPolicy::FailOpen));
        assert!(decide(&u, Capability::Editar, Some(set), PermissionPolicy::FailClosed));
        assert!(!decide(&u, Capability::Excluir, Some(set), PermissionPolicy::FailOpen));
    }

    // Cenário herdado: coordenador/II sem linha para "marcas" continua
    // enxergando a tela sob a política fail-open.
    #[test]
    fn missing_row_follows_the_configured_policy() {
        let u = usuario(TipoAcesso::Coordenador, NivelAcesso::II, StatusUsuario::Ativo);
        assert!(decide(&u, Capability::Visualizar, None, PermissionPolicy::FailOpen));
        assert!(!decide(&u, Capability::Visualizar, None, PermissionPolicy::FailClosed));
    }

    #[test]
    fn reseed_rows_follow_the_matrix() {
        let rows = default_rows(TipoAcesso::Coordenador, NivelAcesso::III);
        assert_eq!(rows.len(), ScreenKey::ALL.len());
        let permissoes = rows.iter().find(|(t, _)| *t == ScreenKey::Permissoes).unwrap();
        assert_eq!(permissoes.1, CapabilitySet::VCE);
    }

    #[test]
    fn tiers_without_matrix_entry_reseed_to_no_rows() {
        assert!(default_rows(TipoAcesso::Gerente, NivelAcesso::III).is_empty());
    }

    #[test]
    fn mover_defaults_to_false_in_stored_rows() {
        let u = usuario(TipoAcesso::Coordenador, NivelAcesso::III, StatusUsuario::Ativo);
        assert!(!decide(&u, Capability::Mover, Some(CapabilitySet::FULL), PermissionPolicy::FailOpen));
    }
}
