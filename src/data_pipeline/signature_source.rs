// src/data_pipeline/signature_source.rs

use crate::error::SourceError;
use crate::rpc::ResilientRpcClient;
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::{debug, warn};

/// Une page de signatures, de la plus récente à la plus ancienne.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignaturePage {
    pub signatures: Vec<String>,
    /// Curseur `before` pour la page suivante (la signature la plus ancienne de celle-ci).
    pub next_cursor: Option<String>,
}

impl SignaturePage {
    pub fn new(signatures: Vec<String>) -> Self {
        let next_cursor = signatures.last().cloned();
        Self { signatures, next_cursor }
    }
}

#[async_trait]
pub trait SignatureSource: Send + Sync {
    async fn fetch(&self, limit: usize, before: Option<&str>) -> Result<SignaturePage, SourceError>;
}

/// `getSignaturesForAddress` sur l'adresse du programme surveillé.
pub struct RpcSignatureSource {
    rpc_client: Arc<ResilientRpcClient>,
    program_id: Pubkey,
}

impl RpcSignatureSource {
    pub fn new(rpc_client: Arc<ResilientRpcClient>, program_id: Pubkey) -> Self {
        Self { rpc_client, program_id }
    }
}

#[async_trait]
impl SignatureSource for RpcSignatureSource {
    async fn fetch(&self, limit: usize, before: Option<&str>) -> Result<SignaturePage, SourceError> {
        let statuses = self
            .rpc_client
            .get_signatures_for_address(&self.program_id, limit, before)
            .await?;
        Ok(SignaturePage::new(statuses.into_iter().map(|s| s.signature).collect()))
    }
}

/// Les signatures nouvelles depuis le dernier checkpoint, de la plus récente à la plus ancienne.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedSignatures {
    pub signatures: Vec<String>,
    pub pages: usize,
    /// Le checkpoint a été retrouvé dans l'historique.
    pub reached_checkpoint: bool,
    /// `max_pages` atteint sans retrouver le checkpoint : des signatures plus anciennes ont été sautées.
    pub window_overflow: bool,
}

/// Remonte l'historique page par page jusqu'au checkpoint (exclu).
///
/// Sans checkpoint (démarrage à froid) on ne lit qu'une page : la fenêtre récente.
/// Un échec sur n'importe quelle page fait échouer toute la collecte, rien n'est consommé.
pub async fn collect_new_signatures(
    source: &dyn SignatureSource,
    limit: usize,
    max_pages: usize,
    checkpoint: Option<&str>,
) -> Result<CollectedSignatures, SourceError> {
    let mut collected = CollectedSignatures::default();
    let mut before: Option<String> = None;
    let mut history_exhausted = false;

    loop {
        let page = source.fetch(limit, before.as_deref()).await?;
        collected.pages += 1;
        let page_len = page.signatures.len();

        for signature in page.signatures {
            if Some(signature.as_str()) == checkpoint {
                collected.reached_checkpoint = true;
                break;
            }
            collected.signatures.push(signature);
        }

        if collected.reached_checkpoint || checkpoint.is_none() {
            break;
        }
        // Page incomplète : on est au début de l'historique du programme.
        if page_len < limit {
            history_exhausted = true;
            break;
        }
        if collected.pages >= max_pages.max(1) {
            break;
        }
        match page.next_cursor {
            Some(cursor) => before = Some(cursor),
            None => {
                history_exhausted = true;
                break;
            }
        }
    }

    if checkpoint.is_some() && !collected.reached_checkpoint && !history_exhausted {
        collected.window_overflow = true;
        warn!(
            pages = collected.pages,
            collected = collected.signatures.len(),
            "Checkpoint introuvable dans la fenêtre : les signatures plus anciennes sont abandonnées."
        );
    }

    debug!(
        pages = collected.pages,
        new_signatures = collected.signatures.len(),
        reached_checkpoint = collected.reached_checkpoint,
        "Collecte des signatures terminée."
    );
    Ok(collected)
}
