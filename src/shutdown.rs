use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long in-flight requests may keep writing after the shutdown signal.
pub const DRAIN_GRACE: Duration = Duration::from_secs(10);

/// shutdown_signal
///
/// Resolves on Ctrl-C (or SIGTERM on unix), which makes axum stop accepting
/// connections and drain the open ones. `token` is only cancelled once
/// `DRAIN_GRACE` has elapsed, so requests that finish within the grace period
/// complete normally.
pub async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!(grace_secs = DRAIN_GRACE.as_secs(), "shutdown signal received, draining");
    cancel_after(token, DRAIN_GRACE);
}

/// cancel_after
///
/// Cancels `token` once `grace` has elapsed, unless it was cancelled already.
pub fn cancel_after(token: CancellationToken, grace: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {},
            _ = tokio::time::sleep(grace) => {
                tracing::warn!("drain grace elapsed, cancelling in-flight requests");
                token.cancel();
            }
        }
    })
}
