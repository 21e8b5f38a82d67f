// DANS : src/bin/pool_listener.rs

use anyhow::{Context, Result};
use std::{future::Future, io, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pool_notifier::{
    communication::{MessageNotifier, TelegramConfig, TelegramSink},
    config::Config,
    data_pipeline::RpcSignatureSource,
    decoders::RpcTransactionDecoder,
    filtering::build_registry,
    monitoring::logging,
    rpc::ResilientRpcClient,
    watcher::{PollLoop, PollLoopSettings},
};

#[tokio::main]
async fn main() -> Result<()> {
    logging::setup_logging();

    // --- 1. CONFIGURATION ---
    // Une config invalide arrête tout ici, avant de construire la boucle.
    let config = Config::load().context("Configuration invalide")?;
    let program_id = config.program_pubkey().context("PROGRAM_ID invalide")?;

    // --- 2. COMPOSANTS ---
    let rpc_client = Arc::new(ResilientRpcClient::new(
        config.solana_rpc_url.clone(),
        config.rpc_timeout(),
        config.rpc_max_retries,
        config.rpc_retry_delay_ms,
    ));
    let source = Arc::new(RpcSignatureSource::new(rpc_client.clone(), program_id));
    let decoder = Arc::new(RpcTransactionDecoder::new(rpc_client, program_id));

    let sink = TelegramSink::new(TelegramConfig {
        bot_token: config.telegram_bot_token.clone(),
        chat_id: config.telegram_chat_id.clone(),
        max_retries: config.delivery_retries,
    })
    .context("Impossible de construire le client HTTP Telegram")?;
    let notifier = Arc::new(MessageNotifier::new(sink));

    let registry = build_registry(config.dedup_capacity);
    info!(
        program_id = %program_id,
        poll_interval_secs = config.poll_interval_secs,
        registry = registry.kind(),
        chat_id = %config.telegram_chat_id,
        "🚀 Pool listener démarré (token Telegram masqué)."
    );

    let mut poll_loop = PollLoop::new(source, decoder, notifier, registry, PollLoopSettings::from(&config));

    // --- 3. ARRÊT PROPRE ---
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Signal d'arrêt reçu, fin de la boucle...");
        shutdown.cancel();
    });

    poll_loop.run(cancel).await;
    Ok(())
}

/// Attend `signal`. Si l'écoute échoue, on ne déclenche pas l'arrêt : on attend indéfiniment.
async fn signal_or_pending<F>(signal: F, name: &'static str)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(signal = name, error = %e, "Écoute du signal impossible, il sera ignoré.");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = signal_or_pending(tokio::signal::ctrl_c(), "Ctrl+C");
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            let terminate = signal_or_pending(
                async move {
                    sigterm
                        .recv()
                        .await
                        .ok_or_else(|| io::Error::other("flux SIGTERM fermé"))
                },
                "SIGTERM",
            );
            tokio::select! {
                _ = ctrl_c => {}
                _ = terminate => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "SIGTERM non disponible, seul Ctrl+C arrêtera la boucle.");
            ctrl_c.await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    signal_or_pending(tokio::signal::ctrl_c(), "Ctrl+C").await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn received_signal_returns() {
        tokio::time::timeout(Duration::from_secs(1), signal_or_pending(async { Ok(()) }, "test"))
            .await
            .expect("le signal reçu doit terminer l'attente");
    }

    #[tokio::test]
    async fn failed_listener_never_triggers_shutdown() {
        let waited = tokio::time::timeout(
            Duration::from_millis(50),
            signal_or_pending(async { Err(io::Error::other("handler indisponible")) }, "test"),
        )
        .await;
        assert!(waited.is_err(), "une écoute en échec ne doit pas déclencher l'arrêt");
    }
}
