// DANS : src/communication/telegram.rs

use super::MessageSink;
use crate::error::DeliveryError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT_SECS: u64 = 15;
const RETRY_DELAY_SECS: u64 = 2;
const MAX_RETRY_AFTER_SECS: u64 = 30;

#[derive(Clone, Default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    /// Ré-essais sur erreur temporaire (429, 5xx, réseau).
    pub max_retries: u32,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Réponse d'erreur de l'API Bot.
#[derive(Debug, Default, Deserialize)]
struct TelegramErrorBody {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<TelegramErrorParameters>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramErrorParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// `sendMessage` de l'API Bot Telegram.
#[derive(Clone)]
pub struct TelegramSink {
    chat_id: String,
    client: Client,
    send_url: String,
    max_retries: u32,
}

impl std::fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSink")
            .field("chat_id", &self.chat_id)
            .field("send_url", &"<redacted>")
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl TelegramSink {
    pub fn new(config: TelegramConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            send_url: format!("{}/bot{}/sendMessage", TELEGRAM_API_BASE, config.bot_token),
            chat_id: config.chat_id,
            client,
            max_retries: config.max_retries,
        })
    }

    async fn send_once(&self, text: &str) -> Result<(), (DeliveryError, Option<u64>)> {
        let response = self
            .client
            .post(&self.send_url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }))
            .send()
            .await
            // L'URL contient le token : on la retire du message d'erreur.
            .map_err(|e| (DeliveryError::Transient(e.without_url().to_string()), None))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body: TelegramErrorBody = response.json().await.unwrap_or_default();
        let retry_after = body.parameters.and_then(|p| p.retry_after);
        let description = body.description.unwrap_or_else(|| status.to_string());
        Err((classify_status(status.as_u16(), description), retry_after))
    }
}

/// Range une réponse HTTP non-2xx de Telegram dans notre taxonomie.
pub fn classify_status(status: u16, description: String) -> DeliveryError {
    match status {
        // Telegram répond 404 quand le token du bot est invalide.
        401 | 404 => DeliveryError::Unauthorized(description),
        429 => DeliveryError::Transient(description),
        500..=599 => DeliveryError::Transient(description),
        _ => DeliveryError::RecipientUnreachable(description),
    }
}

/// Délai avant le ré-essai numéro `attempt` : le `retry_after` de Telegram s'il est
/// fourni (plafonné), sinon un backoff linéaire.
pub fn retry_delay(attempt: u32, retry_after: Option<u64>) -> Duration {
    match retry_after {
        Some(secs) => Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)),
        None => Duration::from_secs(RETRY_DELAY_SECS * (u64::from(attempt) + 1)),
    }
}

#[async_trait]
impl MessageSink for TelegramSink {
    async fn send_message(&self, text: &str) -> Result<(), DeliveryError> {
        let mut attempt = 0;
        loop {
            let (error, retry_after) = match self.send_once(text).await {
                Ok(()) => return Ok(()),
                Err(failure) => failure,
            };

            if !error.is_transient() || attempt >= self.max_retries {
                return Err(error);
            }

            let delay = retry_delay(attempt, retry_after);
            warn!(
                attempt = attempt + 1,
                max_retries = self.max_retries,
                delay_secs = delay.as_secs(),
                error = %error,
                "Envoi Telegram échoué, nouvel essai."
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
