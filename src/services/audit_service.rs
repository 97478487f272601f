// src/services/audit_service.rs

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::common::error::AppError;
use crate::db::AuditRepository;
use crate::models::audit::{
    AuditListResponse, AuditLogQuery, AuditStatsResponse, NewAuditEntry, Pagination,
};
use crate::models::permissions::PermissaoInput;
use crate::models::screens::Capability;

pub const REDACTED: &str = "[REDACTED]";

const QUEUE_CAPACITY: usize = 1024;
const MAX_INSERT_ATTEMPTS: u32 = 3;
const STATS_WINDOW_DAYS: i64 = 30;

// ---
// ChangeDiffer: diffs puros sobre JSON
// ---

/// Campos de credencial nunca chegam à trilha em claro; a chave sobrevive,
/// o valor não.
fn is_credential_field(field: &str) -> bool {
    let f = field.to_lowercase();
    f.contains("senha") || f.contains("password")
}

/// Booleanos codificados como 0/1 comparam iguais a false/true.
fn normalize(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.as_i64() == Some(0) => Value::Bool(false),
        Value::Number(n) if n.as_i64() == Some(1) => Value::Bool(true),
        _ => value.clone(),
    }
}

/// Diff campo a campo: apenas chaves de `tracked` cujo valor normalizado
/// mudou. Registros idênticos produzem um mapa vazio.
pub fn diff(
    before: &Map<String, Value>,
    after: &Map<String, Value>,
    tracked: &[&str],
) -> Map<String, Value> {
    let mut changes = Map::new();
    for &field in tracked {
        let old = before.get(field).cloned().unwrap_or(Value::Null);
        let new = after.get(field).cloned().unwrap_or(Value::Null);
        if normalize(&old) == normalize(&new) {
            continue;
        }
        let (from, to) = if is_credential_field(field) {
            (Value::from(REDACTED), Value::from(REDACTED))
        } else {
            (old, new)
        };
        changes.insert(field.to_string(), json!({ "from": from, "to": to }));
    }
    changes
}

/// Cópia do corpo da requisição com valores de credencial redigidos, para
/// embutir em `detalhes.request_body`.
pub fn sanitize_body(body: &Value) -> Value {
    match body {
        Value::Object(map) => {
            let sanitized = map
                .iter()
                .map(|(k, v)| {
                    if is_credential_field(k) {
                        (k.clone(), Value::from(REDACTED))
                    } else {
                        (k.clone(), v.clone())
                    }
                })
                .collect();
            Value::Object(sanitized)
        }
        other => other.clone(),
    }
}

fn sim_nao(v: bool) -> &'static str {
    if v { "Sim" } else { "Não" }
}

/// Diff de atualização de permissões. Não existe uma "linha anterior" única
/// no servidor (a relação é um-para-muitas), então o retrato anterior vem
/// declarado pelo cliente; telas ausentes dele são puladas. As chaves são
/// compostas (`{tela}_{coluna}`) e os valores renderizados "Sim"/"Não".
pub fn diff_permissions(
    estado_anterior: &Map<String, Value>,
    permissoes: &[PermissaoInput],
) -> Map<String, Value> {
    let mut changes = Map::new();
    for perm in permissoes {
        let Some(Value::Object(prior)) = estado_anterior.get(&perm.tela) else {
            continue;
        };
        let colunas = [
            (Capability::Visualizar, perm.pode_visualizar),
            (Capability::Criar, perm.pode_criar),
            (Capability::Editar, perm.pode_editar),
            (Capability::Excluir, perm.pode_excluir),
        ];
        for (capability, novo) in colunas {
            let coluna = capability.column();
            let antigo = prior
                .get(coluna)
                .map(|v| normalize(v) == Value::Bool(true))
                .unwrap_or(false);
            if antigo != novo {
                changes.insert(
                    format!("{}_{}", perm.tela, coluna),
                    json!({ "from": sim_nao(antigo), "to": sim_nao(novo) }),
                );
            }
        }
    }
    changes
}

// ---
// AuditRecorder: gravação assíncrona, nunca no caminho da resposta
// ---

/// Destino das entradas. É um trait para que os testes injetem um sink que
/// falha sem precisar de banco.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn persist(&self, entry: &NewAuditEntry) -> Result<(), AppError>;
}

#[async_trait]
impl AuditSink for AuditRepository {
    async fn persist(&self, entry: &NewAuditEntry) -> Result<(), AppError> {
        self.insert(entry).await
    }
}

/// Enfileira entradas de auditoria para um worker dedicado. `record` nunca
/// retorna erro: falha de auditoria jamais altera a resposta da requisição
/// primária.
#[derive(Clone)]
pub struct AuditRecorder {
    tx: mpsc::Sender<NewAuditEntry>,
}

impl AuditRecorder {
    /// Sobe o worker. O `JoinHandle` deve ser aguardado após o shutdown do
    /// servidor: quando o último `AuditRecorder` é dropado o canal fecha e o
    /// worker drena o que restou antes de encerrar.
    pub fn spawn(sink: Arc<dyn AuditSink>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<NewAuditEntry>(QUEUE_CAPACITY);
        let handle = tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                persist_with_retry(sink.as_ref(), &entry).await;
            }
            tracing::info!("Fila de auditoria drenada.");
        });
        (Self { tx }, handle)
    }

    pub fn record(&self, entry: NewAuditEntry) {
        if let Err(e) = self.tx.try_send(entry) {
            // Fila cheia ou worker encerrado: descarta com log operacional.
            tracing::warn!("Entrada de auditoria descartada: {}", e);
        }
    }
}

async fn persist_with_retry(sink: &dyn AuditSink, entry: &NewAuditEntry) {
    for attempt in 1..=MAX_INSERT_ATTEMPTS {
        match sink.persist(entry).await {
            Ok(()) => {
                tracing::debug!(
                    "Auditoria: usuário {:?} executou {} em {}",
                    entry.usuario_id,
                    entry.acao,
                    entry.recurso
                );
                return;
            }
            Err(e) if attempt < MAX_INSERT_ATTEMPTS => {
                tracing::warn!(
                    "Falha ao gravar auditoria (tentativa {}/{}): {}",
                    attempt,
                    MAX_INSERT_ATTEMPTS,
                    e
                );
                tokio::time::sleep(Duration::from_millis(50 << attempt)).await;
            }
            Err(e) => {
                tracing::error!(
                    "Entrada de auditoria perdida após {} tentativas ({} em {}): {}",
                    MAX_INSERT_ATTEMPTS,
                    entry.acao,
                    entry.recurso,
                    e
                );
            }
        }
    }
}

// ---
// AuditQuery: leitura filtrada e agregados
// ---

#[derive(Clone)]
pub struct AuditQueryService {
    repo: AuditRepository,
}

impl AuditQueryService {
    pub fn new(repo: AuditRepository) -> Self {
        Self { repo }
    }

    pub async fn list(&self, query: &AuditLogQuery) -> Result<AuditListResponse, AppError> {
        let filters = query.filters();
        let limit = query.limit.clamp(1, 1000);
        let page = query.page.max(1);
        let offset = (page - 1) * limit;

        let data = self.repo.list(&filters, limit, offset).await?;
        let total = self.repo.count(&filters).await?;

        Ok(AuditListResponse { data, pagination: Pagination::new(page, limit, total) })
    }

    pub async fn stats(&self) -> Result<AuditStatsResponse, AppError> {
        let acoes_stats = self.repo.count_by_acao(STATS_WINDOW_DAYS).await?;
        let recursos_stats = self.repo.count_by_recurso(STATS_WINDOW_DAYS).await?;
        let distribuicao_diaria = self.repo.daily_histogram().await?;
        let resumo = self.repo.resumo().await?;

        Ok(AuditStatsResponse { acoes_stats, recursos_stats, distribuicao_diaria, resumo })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audit::AuditAction;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("esperado objeto"),
        }
    }

    #[test]
    fn identical_records_yield_empty_changeset() {
        let before = obj(json!({ "nome": "Marca A", "status": "ativo" }));
        let changes = diff(&before, &before.clone(), &["nome", "status"]);
        assert!(changes.is_empty());
    }

    #[test]
    fn unchanged_fields_never_appear() {
        let before = obj(json!({ "nome": "Marca A", "status": "ativo" }));
        let after = obj(json!({ "nome": "Marca B", "status": "ativo" }));
        let changes = diff(&before, &after, &["nome", "status"]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["nome"], json!({ "from": "Marca A", "to": "Marca B" }));
    }

    #[test]
    fn untracked_fields_are_ignored() {
        let before = obj(json!({ "nome": "A", "interno": 1 }));
        let after = obj(json!({ "nome": "A", "interno": 2 }));
        assert!(diff(&before, &after, &["nome"]).is_empty());
    }

    #[test]
    fn integer_encoded_booleans_compare_equal() {
        let before = obj(json!({ "ativo": 1 }));
        let after = obj(json!({ "ativo": true }));
        assert!(diff(&before, &after, &["ativo"]).is_empty());
    }

    #[test]
    fn credential_values_are_redacted_on_both_sides() {
        let before = obj(json!({ "senha": "a" }));
        let after = obj(json!({ "senha": "b" }));
        let changes = diff(&before, &after, &["senha"]);
        assert_eq!(changes["senha"], json!({ "from": REDACTED, "to": REDACTED }));
    }

    #[test]
    fn sanitize_redacts_credentials_and_keeps_the_rest() {
        let body = json!({ "nome": "Ana", "senha": "segredo" });
        let sanitized = sanitize_body(&body);
        assert_eq!(sanitized["nome"], "Ana");
        assert_eq!(sanitized["senha"], REDACTED);
    }

    fn permissao(tela: &str, v: bool, c: bool, e: bool, x: bool) -> PermissaoInput {
        PermissaoInput {
            tela: tela.to_string(),
            pode_visualizar: v,
            pode_criar: c,
            pode_editar: e,
            pode_excluir: x,
        }
    }

    #[test]
    fn permission_diff_uses_composite_keys_and_sim_nao() {
        let anterior = obj(json!({
            "marcas": { "pode_visualizar": true, "pode_criar": false }
        }));
        let novas = vec![permissao("marcas", true, true, false, false)];
        let changes = diff_permissions(&anterior, &novas);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["marcas_pode_criar"], json!({ "from": "Não", "to": "Sim" }));
    }

    #[test]
    fn screens_missing_from_declared_state_are_skipped() {
        let anterior = Map::new();
        let novas = vec![permissao("marcas", true, true, true, true)];
        assert!(diff_permissions(&anterior, &novas).is_empty());
    }

    #[test]
    fn integer_encoded_prior_permissions_are_normalized() {
        let anterior = obj(json!({
            "produtos": { "pode_visualizar": 1, "pode_criar": 0 }
        }));
        let novas = vec![permissao("produtos", true, false, false, false)];
        assert!(diff_permissions(&anterior, &novas).is_empty());
    }

    struct FailingSink {
        attempts: AtomicU32,
    }

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn persist(&self, _entry: &NewAuditEntry) -> Result<(), AppError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(AppError::InternalServerError(anyhow::anyhow!("banco indisponível")))
        }
    }

    struct CollectingSink {
        entries: std::sync::Mutex<Vec<NewAuditEntry>>,
    }

    #[async_trait]
    impl AuditSink for CollectingSink {
        async fn persist(&self, entry: &NewAuditEntry) -> Result<(), AppError> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    fn entrada() -> NewAuditEntry {
        NewAuditEntry {
            usuario_id: Some(7),
            acao: AuditAction::Create,
            recurso: "marcas".into(),
            detalhes: Some(json!({ "status_code": 201 })),
            ip: Some("10.0.0.1".into()),
        }
    }

    // Indisponibilidade do armazenamento durante o record não chega ao
    // chamador: o retorno é imediato e o erro fica no log operacional.
    #[tokio::test]
    async fn store_outage_never_reaches_the_caller() {
        let sink = Arc::new(FailingSink { attempts: AtomicU32::new(0) });
        let (recorder, handle) = AuditRecorder::spawn(sink.clone());

        recorder.record(entrada());
        drop(recorder);
        handle.await.unwrap();

        assert_eq!(sink.attempts.load(Ordering::SeqCst), MAX_INSERT_ATTEMPTS);
    }

    #[tokio::test]
    async fn entries_drain_on_shutdown() {
        let sink = Arc::new(CollectingSink { entries: std::sync::Mutex::new(Vec::new()) });
        let (recorder, handle) = AuditRecorder::spawn(sink.clone());

        for _ in 0..5 {
            recorder.record(entrada());
        }
        drop(recorder);
        handle.await.unwrap();

        assert_eq!(sink.entries.lock().unwrap().len(), 5);
    }
}
