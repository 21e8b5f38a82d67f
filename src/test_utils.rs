// DANS : src/test_utils.rs
//
// Doublures en mémoire des composants de la boucle, pour les tests.

use crate::communication::{MessageSink, Notifier};
use crate::data_pipeline::{SignaturePage, SignatureSource};
use crate::decoders::{Decoded, PoolCreationEvent, TokenInfo, TransactionDecoder};
use crate::error::{DecodeError, DeliveryError, SourceError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub fn pool_event(pool_id: &str, signature: &str) -> PoolCreationEvent {
    PoolCreationEvent {
        pool_id: pool_id.to_string(),
        token_a: TokenInfo {
            symbol: None,
            mint: "Ma".to_string(),
        },
        token_b: TokenInfo {
            symbol: Some("SOL".to_string()),
            mint: "So11111111111111111111111111111111111111112".to_string(),
        },
        source_signature: signature.to_string(),
        slot: Some(1_000),
        block_time: None,
    }
}

/// Un historique de signatures (plus récente en tête) paginé comme `getSignaturesForAddress`.
#[derive(Default)]
pub struct HistorySource {
    history: Mutex<Vec<String>>,
    cursors: Mutex<Vec<Option<String>>>,
    /// (appels réussis restants avant l'échec, erreur)
    failure: Mutex<Option<(usize, SourceError)>>,
}

impl HistorySource {
    pub fn new(history: Vec<String>) -> Self {
        Self {
            history: Mutex::new(history),
            ..Default::default()
        }
    }

    /// Ajoute de nouvelles transactions en tête (`newest` en premier).
    pub fn push_newest(&self, newest: &[&str]) {
        let mut history = self.history.lock().unwrap();
        let mut updated: Vec<String> = newest.iter().map(|s| s.to_string()).collect();
        updated.extend(history.drain(..));
        *history = updated;
    }

    /// Le prochain appel échoue.
    pub fn fail_next(&self, error: SourceError) {
        self.fail_after(0, error);
    }

    /// Les `successes` prochains appels réussissent, le suivant échoue (une seule fois).
    pub fn fail_after(&self, successes: usize, error: SourceError) {
        *self.failure.lock().unwrap() = Some((successes, error));
    }

    pub fn fetch_count(&self) -> usize {
        self.cursors.lock().unwrap().len()
    }

    pub fn cursors(&self) -> Vec<Option<String>> {
        self.cursors.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignatureSource for HistorySource {
    async fn fetch(&self, limit: usize, before: Option<&str>) -> Result<SignaturePage, SourceError> {
        self.cursors.lock().unwrap().push(before.map(str::to_string));

        {
            let mut failure = self.failure.lock().unwrap();
            match failure.as_mut() {
                Some((0, _)) => {
                    let (_, error) = failure.take().unwrap();
                    return Err(error);
                }
                Some((remaining, _)) => *remaining -= 1,
                None => {}
            }
        }

        let history = self.history.lock().unwrap();
        let start = match before {
            Some(cursor) => match history.iter().position(|s| s == cursor) {
                Some(i) => i + 1,
                None => return Ok(SignaturePage::default()),
            },
            None => 0,
        };
        let page: Vec<String> = history.iter().skip(start).take(limit).cloned().collect();
        Ok(SignaturePage::new(page))
    }
}

/// Décodeur à réponses programmées. Une signature inconnue n'est pas une création de pool.
#[derive(Default)]
pub struct ScriptedDecoder {
    outcomes: Mutex<HashMap<String, VecDeque<Result<Decoded, DecodeError>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedDecoder {
    /// La signature décode toujours en création de `pool_id`.
    pub fn pool(self, signature: &str, pool_id: &str) -> Self {
        self.script(signature, vec![Ok(Decoded::PoolCreation(pool_event(pool_id, signature)))])
    }

    /// Réponses successives ; la dernière est répétée ensuite.
    pub fn script(self, signature: &str, outcomes: Vec<Result<Decoded, DecodeError>>) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .insert(signature.to_string(), outcomes.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl TransactionDecoder for ScriptedDecoder {
    async fn decode(&self, signature: &str) -> Result<Decoded, DecodeError> {
        self.calls.lock().unwrap().push(signature.to_string());
        let mut outcomes = self.outcomes.lock().unwrap();
        match outcomes.get_mut(signature) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Ok(Decoded::NotAPoolCreation)),
            Some(queue) => queue.front().cloned().unwrap_or(Ok(Decoded::NotAPoolCreation)),
            None => Ok(Decoded::NotAPoolCreation),
        }
    }
}

/// Notifier qui enregistre les pools notifiés et peut échouer sur demande.
#[derive(Default)]
pub struct RecordingNotifier {
    attempts: Mutex<Vec<String>>,
    /// pool_id -> nombre d'échecs restants
    failures: Mutex<HashMap<String, usize>>,
}

impl RecordingNotifier {
    pub fn fail_times(&self, pool_id: &str, times: usize) {
        self.failures.lock().unwrap().insert(pool_id.to_string(), times);
    }

    /// Tous les appels à `notify`, réussis ou non.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &PoolCreationEvent) -> Result<(), DeliveryError> {
        self.attempts.lock().unwrap().push(event.pool_id.clone());
        let mut failures = self.failures.lock().unwrap();
        if let Some(remaining) = failures.get_mut(&event.pool_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DeliveryError::Transient("panne simulée".to_string()));
            }
        }
        Ok(())
    }
}

/// `MessageSink` qui garde les textes envoyés.
#[derive(Clone, Default)]
pub struct RecordingSink {
    messages: Arc<Mutex<Vec<String>>>,
    failure: Arc<Mutex<Option<DeliveryError>>>,
}

impl RecordingSink {
    pub fn fail_with(&self, error: DeliveryError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send_message(&self, text: &str) -> Result<(), DeliveryError> {
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
