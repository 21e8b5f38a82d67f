// DANS : src/config.rs

use crate::error::ConfigurationError;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::{fmt, str::FromStr, time::Duration};

/// Programme Raydium AMM V4, surveillé par défaut.
pub const DEFAULT_PROGRAM_ID: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";

/// Limite imposée par `getSignaturesForAddress`.
pub const MAX_SIGNATURE_BATCH_LIMIT: usize = 1000;

fn default_poll_interval_secs() -> u64 { 60 }
fn default_program_id() -> String { DEFAULT_PROGRAM_ID.to_string() }
fn default_signature_batch_limit() -> usize { 100 }
fn default_max_pages_per_cycle() -> usize { 10 }
fn default_decode_concurrency() -> usize { 4 }
fn default_rpc_timeout_secs() -> u64 { 30 }
fn default_rpc_max_retries() -> u8 { 3 }
fn default_rpc_retry_delay_ms() -> u64 { 500 }
fn default_delivery_retries() -> u32 { 2 }

#[derive(Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub telegram_bot_token: String,
    #[serde(default)]
    pub telegram_chat_id: String,
    #[serde(default)]
    pub solana_rpc_url: String,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_program_id")]
    pub program_id: String,
    #[serde(default = "default_signature_batch_limit")]
    pub signature_batch_limit: usize,
    #[serde(default = "default_max_pages_per_cycle")]
    pub max_pages_per_cycle: usize,
    #[serde(default = "default_decode_concurrency")]
    pub decode_concurrency: usize,
    /// 0 = registre illimité.
    #[serde(default)]
    pub dedup_capacity: usize,

    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
    #[serde(default = "default_rpc_max_retries")]
    pub rpc_max_retries: u8,
    #[serde(default = "default_rpc_retry_delay_ms")]
    pub rpc_retry_delay_ms: u64,
    #[serde(default = "default_delivery_retries")]
    pub delivery_retries: u32,
}

// Le token du bot ne doit jamais finir dans les logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("telegram_bot_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("solana_rpc_url", &self.solana_rpc_url)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("program_id", &self.program_id)
            .field("signature_batch_limit", &self.signature_batch_limit)
            .field("max_pages_per_cycle", &self.max_pages_per_cycle)
            .field("decode_concurrency", &self.decode_concurrency)
            .field("dedup_capacity", &self.dedup_capacity)
            .field("rpc_timeout_secs", &self.rpc_timeout_secs)
            .field("rpc_max_retries", &self.rpc_max_retries)
            .field("rpc_retry_delay_ms", &self.rpc_retry_delay_ms)
            .field("delivery_retries", &self.delivery_retries)
            .finish()
    }
}

impl Config {
    /// Charge le `.env` (s'il existe) puis l'environnement du processus, et valide le tout.
    pub fn load() -> Result<Self, ConfigurationError> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Même chose que `load`, mais depuis une liste de paires clé/valeur (tests).
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(pairs)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("TELEGRAM_BOT_TOKEN", &self.telegram_bot_token),
            ("TELEGRAM_CHAT_ID", &self.telegram_chat_id),
            ("SOLANA_RPC_URL", &self.solana_rpc_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigurationError::Missing(name.to_string()));
            }
        }

        if self.poll_interval_secs == 0 {
            return Err(invalid("POLL_INTERVAL_SECS", "doit être > 0"));
        }
        if self.signature_batch_limit == 0 || self.signature_batch_limit > MAX_SIGNATURE_BATCH_LIMIT {
            return Err(invalid(
                "SIGNATURE_BATCH_LIMIT",
                format!("doit être entre 1 et {}", MAX_SIGNATURE_BATCH_LIMIT),
            ));
        }
        if self.max_pages_per_cycle == 0 {
            return Err(invalid("MAX_PAGES_PER_CYCLE", "doit être > 0"));
        }
        if self.decode_concurrency == 0 {
            return Err(invalid("DECODE_CONCURRENCY", "doit être > 0"));
        }
        if self.rpc_timeout_secs == 0 {
            return Err(invalid("RPC_TIMEOUT_SECS", "doit être > 0"));
        }
        self.program_pubkey()?;
        Ok(())
    }

    pub fn program_pubkey(&self) -> Result<Pubkey, ConfigurationError> {
        Pubkey::from_str(self.program_id.trim())
            .map_err(|e| invalid("PROGRAM_ID", e.to_string()))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::Invalid { field, reason: reason.into() }
}
