// DANS : src/rpc/resilient_client.rs

use crate::error::SourceError;
use serde_json::json;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_config::{RpcSignaturesForAddressConfig, RpcTransactionConfig},
    rpc_request::{RpcError, RpcRequest},
    rpc_response::RpcConfirmedTransactionStatusWithSignature,
};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use solana_transaction_status::{EncodedConfirmedTransactionWithStatusMeta, UiTransactionEncoding};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::time::{sleep, timeout};
use tracing::warn;

const HTTP_TOO_MANY_REQUESTS: u16 = 429;

/// Un "wrapper" autour du RpcClient de Solana qui ajoute :
/// - un timeout strict par appel,
/// - une logique de ré-essai (backoff exponentiel) pour les erreurs temporaires,
/// - la classification de chaque échec en `SourceError`.
#[derive(Clone)]
pub struct ResilientRpcClient {
    client: Arc<RpcClient>,
    request_timeout: Duration,
    max_retries: u8,
    delay_ms: u64,
}

impl std::fmt::Debug for ResilientRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // L'URL peut contenir une clé d'API (Helius, QuickNode...).
        f.debug_struct("ResilientRpcClient")
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .field("delay_ms", &self.delay_ms)
            .finish()
    }
}

impl ResilientRpcClient {
    /// Construit un nouveau client RPC résilient, en commitment `confirmed`.
    pub fn new(rpc_url: String, request_timeout: Duration, max_retries: u8, delay_ms: u64) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(
            rpc_url,
            request_timeout,
            CommitmentConfig::confirmed(),
        );
        Self {
            client: Arc::new(client),
            request_timeout,
            max_retries,
            delay_ms,
        }
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.client.commitment()
    }

    /// Une page de `getSignaturesForAddress`, de la plus récente à la plus ancienne.
    pub async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<RpcConfirmedTransactionStatusWithSignature>, SourceError> {
        let config = RpcSignaturesForAddressConfig {
            before: before.map(str::to_string),
            until: None,
            limit: Some(limit),
            commitment: Some(self.commitment()),
            ..Default::default()
        };
        let params = json!([address.to_string(), config]);

        self.with_retry("getSignaturesForAddress", || {
            self.client
                .send::<Vec<RpcConfirmedTransactionStatusWithSignature>>(
                    RpcRequest::GetSignaturesForAddress,
                    params.clone(),
                )
        })
        .await
    }

    /// Le corps complet d'une transaction, encodé en base64. `None` si le nœud ne la connaît pas (encore).
    pub async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<EncodedConfirmedTransactionWithStatusMeta>, SourceError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(self.commitment()),
            max_supported_transaction_version: Some(0),
        };
        let params = json!([signature, config]);

        self.with_retry("getTransaction", || {
            self.client
                .send::<Option<EncodedConfirmedTransactionWithStatusMeta>>(
                    RpcRequest::GetTransaction,
                    params.clone(),
                )
        })
        .await
    }

    // --- LOGIQUE DE RÉ-ESSAI COMMUNE ---

    async fn with_retry<T, F, Fut>(&self, method: &'static str, mut call: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt: u8 = 0;
        loop {
            let outcome = match timeout(self.request_timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => classify_client_error(&e),
                Err(_) => SourceError::Transport(format!(
                    "{} : pas de réponse après {:?}",
                    method, self.request_timeout
                )),
            };

            if !outcome.is_retryable() || attempt >= self.max_retries {
                return Err(outcome);
            }

            let delay = backoff_delay(self.delay_ms, attempt);
            warn!(
                method,
                attempt = attempt + 1,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %outcome,
                "Appel RPC échoué, nouvel essai."
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Délai avant le ré-essai numéro `attempt` (0-indexé) : base, 2×base, 4×base...
pub fn backoff_delay(base_ms: u64, attempt: u8) -> Duration {
    let factor = 1u64 << u32::from(attempt.min(10));
    Duration::from_millis(base_ms.saturating_mul(factor))
}

/// Range une erreur du client Solana dans notre taxonomie.
pub fn classify_client_error(error: &ClientError) -> SourceError {
    match error.kind() {
        ClientErrorKind::Reqwest(e) => match e.status().map(|s| s.as_u16()) {
            Some(HTTP_TOO_MANY_REQUESTS) => SourceError::RateLimited(e.to_string()),
            Some(status) => SourceError::Upstream(format!("HTTP {} : {}", status, e)),
            None => SourceError::Transport(e.to_string()),
        },
        ClientErrorKind::Io(e) => SourceError::Transport(e.to_string()),
        ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) => {
            if *code == i64::from(HTTP_TOO_MANY_REQUESTS) {
                SourceError::RateLimited(message.clone())
            } else {
                SourceError::Upstream(format!("code {} : {}", code, message))
            }
        }
        _ => SourceError::Upstream(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_delay(500, 0), Duration::from_millis(500));
        assert_eq!(backoff_delay(500, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(500, 3), Duration::from_millis(4000));
        assert_eq!(backoff_delay(u64::MAX, 4), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn io_errors_are_transport_errors() {
        let err = ClientError::from(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"));
        assert!(matches!(classify_client_error(&err), SourceError::Transport(_)));
    }

    #[test]
    fn rpc_response_errors_are_upstream_unless_throttled() {
        let upstream = ClientError::from(RpcError::RpcResponseError {
            code: -32602,
            message: "Invalid param".to_string(),
            data: solana_client::rpc_request::RpcResponseErrorData::Empty,
        });
        assert!(matches!(classify_client_error(&upstream), SourceError::Upstream(_)));

        let throttled = ClientError::from(RpcError::RpcResponseError {
            code: 429,
            message: "Too many requests".to_string(),
            data: solana_client::rpc_request::RpcResponseErrorData::Empty,
        });
        assert!(matches!(classify_client_error(&throttled), SourceError::RateLimited(_)));
    }

    fn test_client(request_timeout: Duration, max_retries: u8) -> ResilientRpcClient {
        // Aucune requête réelle : `with_retry` est piloté par une closure.
        ResilientRpcClient::new("http://127.0.0.1:8899".to_string(), request_timeout, max_retries, 1)
    }

    fn rpc_error(code: i64) -> ClientError {
        ClientError::from(RpcError::RpcResponseError {
            code,
            message: "erreur simulée".to_string(),
            data: solana_client::rpc_request::RpcResponseErrorData::Empty,
        })
    }

    #[tokio::test]
    async fn throttling_is_retried_until_success() {
        let client = test_client(Duration::from_secs(1), 3);
        let calls = AtomicUsize::new(0);

        let result = client
            .with_retry("getTransaction", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err(rpc_error(429)) } else { Ok(7u32) } }
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn throttling_gives_up_after_max_retries() {
        let client = test_client(Duration::from_secs(1), 2);
        let calls = AtomicUsize::new(0);

        let result: Result<u32, SourceError> = client
            .with_retry("getTransaction", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(rpc_error(429)) }
            })
            .await;

        assert!(matches!(result, Err(SourceError::RateLimited(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn upstream_errors_are_not_retried() {
        let client = test_client(Duration::from_secs(1), 3);
        let calls = AtomicUsize::new(0);

        let result: Result<u32, SourceError> = client
            .with_retry("getTransaction", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(rpc_error(-32602)) }
            })
            .await;

        assert!(matches!(result, Err(SourceError::Upstream(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_hanging_call_becomes_a_transport_error() {
        let client = test_client(Duration::from_millis(50), 3);
        let calls = AtomicUsize::new(0);

        let result: Result<u32, SourceError> = client
            .with_retry("getSignaturesForAddress", || {
                calls.fetch_add(1, Ordering::SeqCst);
                std::future::pending::<Result<u32, ClientError>>()
            })
            .await;

        match result {
            Err(SourceError::Transport(message)) => assert!(message.contains("getSignaturesForAddress")),
            other => panic!("Transport attendu, obtenu {:?}", other),
        }
        // Un timeout est ré-essayable : premier essai + 3 ré-essais.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn parse_failures_are_upstream() {
        let err = ClientError::from(RpcError::ParseError("enveloppe".to_string()));
        assert!(matches!(classify_client_error(&err), SourceError::Upstream(_)));
    }
}
