use std::sync::Arc;

use anyhow::Context;
use relay_config::RelayConfig;
use relay_db::events::BoardFeed;
use relay_db::service::RelayService;
use relay_mail::worker::EmailWorker;
use relay_server::AppState;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;

/// Run the API and the email worker; both stop on Ctrl+C or SIGTERM.
pub async fn handle(config: RelayConfig) -> anyhow::Result<()> {
    let service = Arc::new(
        RelayService::open(&config, BoardFeed::default())
            .await
            .context("failed to open database")?,
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let worker = if config.email.is_configured() {
        let transport = relay_mail::transport::from_config(&config.email);
        let worker = EmailWorker::new(Arc::clone(&service), transport, &config.email);
        Some(tokio::spawn(worker.run(stop_rx)))
    } else {
        tracing::warn!("email is not configured; queued messages will stay pending");
        None
    };

    let state = AppState::new(config, service);
    let served = relay_server::serve(state, shutdown_signal()).await;

    let _ = stop_tx.send(true);
    if let Some(handle) = worker {
        if let Err(error) = handle.await {
            tracing::error!(%error, "email worker panicked");
        }
    }
    served.context("HTTP server failed")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = ctrl_c().await {
            tracing::error!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(error) => {
                tracing::error!(%error, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
