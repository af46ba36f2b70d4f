use tokio::sync::watch;
use tracing::{info, warn};

/// Wait for Ctrl-C or SIGTERM, then flip `shutdown` to `true`.
///
/// Returns early without signalling if every receiver is already gone.
pub async fn wait_for_signal(shutdown: watch::Sender<bool>) {
    tokio::select! {
        name = recv_signal() => {
            info!(signal = name, "received signal, exiting gracefully");
            if shutdown.send(true).is_err() {
                warn!("no shutdown listeners left");
            }
        }
        _ = shutdown.closed() => {
            info!("service done, no shutdown signal needed");
        }
    }
}

#[cfg(unix)]
async fn recv_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "cannot install SIGTERM handler; Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
            return "SIGINT";
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = term.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn recv_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "SIGINT"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_returns_when_listeners_drop() {
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(wait_for_signal(tx));
        drop(rx);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish once receivers are gone")
            .unwrap();
    }
}
