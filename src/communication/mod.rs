// DANS : src/communication/mod.rs

use crate::decoders::PoolCreationEvent;
use crate::error::DeliveryError;
use async_trait::async_trait;

pub mod format;
pub mod telegram;

pub use format::format_pool_message;
pub use telegram::{TelegramConfig, TelegramSink};

/// Le canal de messagerie brut : "envoie ce texte au destinataire configuré".
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<(), DeliveryError>;
}

/// Formate puis livre une création de pool.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &PoolCreationEvent) -> Result<(), DeliveryError>;
}

/// Le `Notifier` standard : template HTML fixe + un `MessageSink`.
pub struct MessageNotifier<S> {
    sink: S,
}

impl<S: MessageSink> MessageNotifier<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl<S: MessageSink> Notifier for MessageNotifier<S> {
    async fn notify(&self, event: &PoolCreationEvent) -> Result<(), DeliveryError> {
        let text = format_pool_message(event);
        self.sink.send_message(&text).await
    }
}
