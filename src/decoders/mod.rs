// src/decoders/mod.rs

use crate::error::DecodeError;
use async_trait::async_trait;

pub mod raydium_amm_v4;
pub mod rpc_decoder;
pub mod symbols;
pub mod transaction;

pub use rpc_decoder::RpcTransactionDecoder;
pub use transaction::{RawInstruction, RawTransaction};

/// Un token d'une paire. Le symbole est un bonus : il peut rester inconnu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: Option<String>,
    pub mint: String,
}

impl TokenInfo {
    pub fn new(mint: impl Into<String>) -> Self {
        let mint = mint.into();
        let symbol = symbols::resolve_symbol(&mint).map(str::to_string);
        Self { symbol, mint }
    }
}

/// Une création de pool détectée dans une transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolCreationEvent {
    /// L'adresse du compte du pool. Clé de déduplication.
    pub pool_id: String,
    /// Le mint "coin" (base) de la paire.
    pub token_a: TokenInfo,
    /// Le mint "pc" (quote) de la paire.
    pub token_b: TokenInfo,
    pub source_signature: String,
    pub slot: Option<u64>,
    pub block_time: Option<i64>,
}

/// Résultat du décodage d'une signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    PoolCreation(PoolCreationEvent),
    NotAPoolCreation,
}

/// Transforme une signature en zéro ou une création de pool.
#[async_trait]
pub trait TransactionDecoder: Send + Sync {
    async fn decode(&self, signature: &str) -> Result<Decoded, DecodeError>;
}
