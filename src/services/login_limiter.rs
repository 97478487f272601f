// src/services/login_limiter.rs

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const MAX_ATTEMPTS: u32 = 5;
const ATTEMPT_WINDOW: Duration = Duration::from_secs(15 * 60);
const BLOCK_DURATION: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy)]
pub struct FailureOutcome {
    pub attempts: u32,
    /// `true` quando esta falha atingiu o limite. Quem chama decide o que
    /// persistir (o status `bloqueado` do usuário sai de `AuthService`).
    pub blocked: bool,
}

/// Contador de tentativas de login. É uma interface injetada para que uma
/// implementação durável/compartilhada possa substituir a versão em memória
/// sem tocar no fluxo de autenticação.
#[async_trait]
pub trait LoginRateLimiter: Send + Sync {
    async fn record_failure(&self, key: &str) -> FailureOutcome;
    async fn record_success(&self, key: &str);
    async fn is_blocked(&self, key: &str) -> bool;
}

#[derive(Debug)]
struct AttemptState {
    count: u32,
    last_attempt: Instant,
    blocked_until: Option<Instant>,
}

/// Implementação local ao processo. O lock do mapa serializa atualizações
/// concorrentes da mesma chave; um restart zera os contadores (o status
/// `bloqueado` persistido no banco não é afetado por isso).
pub struct InMemoryLoginLimiter {
    max_attempts: u32,
    window: Duration,
    block_duration: Duration,
    inner: Mutex<HashMap<String, AttemptState>>,
}

impl InMemoryLoginLimiter {
    pub fn new(max_attempts: u32, window: Duration, block_duration: Duration) -> Self {
        Self {
            max_attempts,
            window,
            block_duration,
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryLoginLimiter {
    fn default() -> Self {
        Self::new(MAX_ATTEMPTS, ATTEMPT_WINDOW, BLOCK_DURATION)
    }
}

#[async_trait]
impl LoginRateLimiter for InMemoryLoginLimiter {
    async fn record_failure(&self, key: &str) -> FailureOutcome {
        let now = Instant::now();
        let mut map = self.inner.lock().expect("lock do limiter envenenado");
        let state = map.entry(key.to_string()).or_insert(AttemptState {
            count: 0,
            last_attempt: now,
            blocked_until: None,
        });

        // Falhas fora da janela recomeçam a contagem.
        if now.duration_since(state.last_attempt) > self.window {
            state.count = 0;
        }
        state.count += 1;
        state.last_attempt = now;

        let blocked = state.count >= self.max_attempts;
        if blocked {
            state.blocked_until = Some(now + self.block_duration);
        }
        FailureOutcome { attempts: state.count, blocked }
    }

    async fn record_success(&self, key: &str) {
        let mut map = self.inner.lock().expect("lock do limiter envenenado");
        map.remove(key);
    }

    async fn is_blocked(&self, key: &str) -> bool {
        let map = self.inner.lock().expect("lock do limiter envenenado");
        map.get(key)
            .and_then(|s| s.blocked_until)
            .is_some_and(|until| Instant::now() < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifth_consecutive_failure_blocks() {
        let limiter = InMemoryLoginLimiter::default();
        for i in 1..=4 {
            let outcome = limiter.record_failure("ana@escola.gov.br").await;
            assert_eq!(outcome.attempts, i);
            assert!(!outcome.blocked);
        }
        let outcome = limiter.record_failure("ana@escola.gov.br").await;
        assert!(outcome.blocked);
        assert!(limiter.is_blocked("ana@escola.gov.br").await);
    }

    #[tokio::test]
    async fn success_resets_the_counter() {
        let limiter = InMemoryLoginLimiter::default();
        for _ in 0..3 {
            limiter.record_failure("bia@escola.gov.br").await;
        }
        limiter.record_success("bia@escola.gov.br").await;
        let outcome = limiter.record_failure("bia@escola.gov.br").await;
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn failures_outside_the_window_restart_the_count() {
        let limiter =
            InMemoryLoginLimiter::new(5, Duration::from_millis(10), Duration::from_secs(60));
        for _ in 0..4 {
            limiter.record_failure("caio@escola.gov.br").await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        let outcome = limiter.record_failure("caio@escola.gov.br").await;
        assert_eq!(outcome.attempts, 1);
        assert!(!outcome.blocked);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = InMemoryLoginLimiter::default();
        for _ in 0..5 {
            limiter.record_failure("um@escola.gov.br").await;
        }
        assert!(limiter.is_blocked("um@escola.gov.br").await);
        assert!(!limiter.is_blocked("dois@escola.gov.br").await);
    }
}
