// DANS : src/watcher/mod.rs
//
// La boucle de polling : signatures -> décodage -> déduplication -> notification.

use crate::communication::Notifier;
use crate::config::Config;
use crate::data_pipeline::{collect_new_signatures, SignatureSource};
use crate::decoders::{Decoded, PoolCreationEvent, TransactionDecoder};
use crate::error::{DeliveryError, SourceError};
use crate::filtering::DedupRegistry;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Fetching,
    Decoding,
    Notifying,
    Sleeping,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct PollLoopSettings {
    pub poll_interval: Duration,
    pub signature_batch_limit: usize,
    pub max_pages: usize,
    pub decode_concurrency: usize,
}

impl From<&Config> for PollLoopSettings {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            signature_batch_limit: config.signature_batch_limit,
            max_pages: config.max_pages_per_cycle,
            decode_concurrency: config.decode_concurrency,
        }
    }
}

/// Bilan d'un cycle, loggé en `info`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub decoded: usize,
    pub pool_events: usize,
    pub duplicates: usize,
    pub delivered: usize,
    pub delivery_failures: usize,
    pub decode_failures: usize,
    pub window_overflow: bool,
    pub source_error: Option<SourceError>,
    pub cancelled: bool,
}

pub struct PollLoop {
    source: Arc<dyn SignatureSource>,
    decoder: Arc<dyn TransactionDecoder>,
    notifier: Arc<dyn Notifier>,
    registry: Box<dyn DedupRegistry>,
    settings: PollLoopSettings,
    state: LoopState,
    checkpoint: Option<String>,
}

impl PollLoop {
    pub fn new(
        source: Arc<dyn SignatureSource>,
        decoder: Arc<dyn TransactionDecoder>,
        notifier: Arc<dyn Notifier>,
        registry: Box<dyn DedupRegistry>,
        settings: PollLoopSettings,
    ) -> Self {
        Self {
            source,
            decoder,
            notifier,
            registry,
            settings,
            state: LoopState::Idle,
            checkpoint: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn checkpoint(&self) -> Option<&str> {
        self.checkpoint.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn registry_mut(&mut self) -> &mut dyn DedupRegistry {
        self.registry.as_mut()
    }

    fn transition(&mut self, next: LoopState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "Transition de la boucle.");
            self.state = next;
        }
    }

    /// Un passage complet Fetching -> Decoding -> Notifying. Se termine en `Sleeping`.
    pub async fn run_cycle(&mut self, cancel: &CancellationToken) -> CycleReport {
        let mut report = CycleReport::default();
        self.transition(LoopState::Fetching);

        if cancel.is_cancelled() {
            report.cancelled = true;
            return report;
        }

        let collected = match collect_new_signatures(
            self.source.as_ref(),
            self.settings.signature_batch_limit,
            self.settings.max_pages,
            self.checkpoint.as_deref(),
        )
        .await
        {
            Ok(collected) => collected,
            Err(e) => {
                warn!(error = %e, "Récupération des signatures échouée, on réessaie au prochain cycle.");
                report.source_error = Some(e);
                self.transition(LoopState::Sleeping);
                return report;
            }
        };
        report.fetched = collected.signatures.len();
        report.window_overflow = collected.window_overflow;

        // --- DÉCODAGE ---
        self.transition(LoopState::Decoding);
        let decoder = Arc::clone(&self.decoder);
        let outcomes: Vec<_> = stream::iter(collected.signatures.iter().cloned())
            .map(|signature| {
                let decoder = Arc::clone(&decoder);
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    Some(decoder.decode(&signature).await)
                }
            })
            .buffered(self.settings.decode_concurrency.max(1))
            .collect()
            .await;

        // Index (dans `collected.signatures`) des signatures à revoir au prochain cycle.
        let mut retry_indices: Vec<usize> = Vec::new();
        let mut events: Vec<(usize, PoolCreationEvent)> = Vec::new();

        for (index, outcome) in outcomes.into_iter().enumerate() {
            let signature = &collected.signatures[index];
            match outcome {
                None => {
                    report.cancelled = true;
                    retry_indices.push(index);
                }
                Some(Ok(Decoded::PoolCreation(event))) => {
                    report.decoded += 1;
                    report.pool_events += 1;
                    events.push((index, event));
                }
                Some(Ok(Decoded::NotAPoolCreation)) => report.decoded += 1,
                Some(Err(e)) => {
                    report.decode_failures += 1;
                    warn!(signature = %signature, error = %e, "Décodage impossible, signature ignorée.");
                    if e.is_retryable() {
                        retry_indices.push(index);
                    }
                }
            }
        }

        // --- DÉDUPLICATION ---
        // Ordre chronologique : la plus ancienne signature d'abord.
        let mut seen_this_cycle: HashSet<String> = HashSet::new();
        let mut pending: Vec<(usize, PoolCreationEvent)> = Vec::new();
        for (index, event) in events.into_iter().rev() {
            if !seen_this_cycle.insert(event.pool_id.clone()) || self.registry.has(&event.pool_id) {
                report.duplicates += 1;
                debug!(pool_id = %event.pool_id, "Pool déjà notifié.");
                continue;
            }
            pending.push((index, event));
        }

        // --- NOTIFICATION ---
        if !pending.is_empty() {
            self.transition(LoopState::Notifying);
        }
        for (index, event) in pending {
            if cancel.is_cancelled() {
                report.cancelled = true;
                retry_indices.push(index);
                continue;
            }
            match self.notifier.notify(&event).await {
                Ok(()) => {
                    self.registry.add(&event.pool_id);
                    report.delivered += 1;
                    info!(
                        pool_id = %event.pool_id,
                        mint_a = %event.token_a.mint,
                        mint_b = %event.token_b.mint,
                        signature = %event.source_signature,
                        slot = ?event.slot,
                        block_time = ?event.block_time,
                        "Nouveau pool notifié."
                    );
                }
                Err(e) => {
                    report.delivery_failures += 1;
                    retry_indices.push(index);
                    match &e {
                        DeliveryError::Unauthorized(_) => {
                            error!(pool_id = %event.pool_id, error = %e, "Notification refusée : vérifiez le token du bot.")
                        }
                        _ => warn!(pool_id = %event.pool_id, error = %e, "Notification échouée, nouvel essai au prochain cycle."),
                    }
                }
            }
        }

        self.checkpoint = next_checkpoint(&collected.signatures, &retry_indices, self.checkpoint.take());
        self.transition(LoopState::Sleeping);

        info!(
            fetched = report.fetched,
            decoded = report.decoded,
            pool_events = report.pool_events,
            duplicates = report.duplicates,
            delivered = report.delivered,
            delivery_failures = report.delivery_failures,
            decode_failures = report.decode_failures,
            window_overflow = report.window_overflow,
            registry_size = self.registry.len(),
            "Cycle terminé."
        );
        report
    }

    /// Enchaîne les cycles jusqu'à l'annulation du token.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(
            poll_interval_secs = self.settings.poll_interval.as_secs(),
            registry = self.registry.kind(),
            "Boucle de polling démarrée."
        );

        loop {
            let report = self.run_cycle(&cancel).await;
            if report.cancelled || cancel.is_cancelled() {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }

        self.transition(LoopState::Stopped);
        info!(registry_size = self.registry.len(), "Boucle de polling arrêtée.");
    }
}

/// Nouveau checkpoint après un cycle. `signatures` va de la plus récente à la plus ancienne.
///
/// Sans ré-essai : la plus récente collectée (ou l'actuel si rien de neuf).
/// Avec ré-essais : la signature juste plus ancienne que la plus ancienne à revoir,
/// l'actuel si elle n'existe pas dans la liste.
pub fn next_checkpoint(signatures: &[String], retry_indices: &[usize], current: Option<String>) -> Option<String> {
    match retry_indices.iter().max() {
        None => signatures.first().cloned().or(current),
        Some(&oldest_retry) => signatures.get(oldest_retry + 1).cloned().or(current),
    }
}
