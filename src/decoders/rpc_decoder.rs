// DANS : src/decoders/rpc_decoder.rs

use super::{raydium_amm_v4::parse_pool_creation, Decoded, RawTransaction, TransactionDecoder};
use crate::error::DecodeError;
use crate::rpc::ResilientRpcClient;
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::debug;

/// Décodeur branché sur le nœud RPC : `getTransaction` puis recherche de l'instruction
/// de création de pool du programme surveillé.
pub struct RpcTransactionDecoder {
    rpc_client: Arc<ResilientRpcClient>,
    program_id: Pubkey,
}

impl RpcTransactionDecoder {
    pub fn new(rpc_client: Arc<ResilientRpcClient>, program_id: Pubkey) -> Self {
        Self { rpc_client, program_id }
    }
}

#[async_trait]
impl TransactionDecoder for RpcTransactionDecoder {
    async fn decode(&self, signature: &str) -> Result<Decoded, DecodeError> {
        let encoded = self
            .rpc_client
            .get_transaction(signature)
            .await?
            .ok_or(DecodeError::MissingBody)?;

        let tx = RawTransaction::try_from(encoded)?;
        debug!(
            signature,
            instructions = tx.instructions.len(),
            accounts = tx.account_keys.len(),
            "Transaction récupérée."
        );

        Ok(match parse_pool_creation(&self.program_id, signature, &tx)? {
            Some(event) => Decoded::PoolCreation(event),
            None => Decoded::NotAPoolCreation,
        })
    }
}
