use std::future::Future;

use tokio::sync::watch;

/// Flip `shutdown` to `true` once `signal` fires.
///
/// If the signal cannot be registered the sender is parked instead of dropped:
/// a dropped sender makes every `changed()` resolve at once, which receivers
/// would read as a shutdown request.
pub async fn forward_signal<F>(signal: F, shutdown: watch::Sender<bool>)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            tracing::info!("Ctrl+C received");
            let _ = shutdown.send(true);
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn signal_requests_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        tokio::spawn(forward_signal(async { Ok(()) }, tx));
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn failed_registration_keeps_running() {
        let (tx, mut rx) = watch::channel(false);
        let task = tokio::spawn(forward_signal(
            async { Err(std::io::Error::other("no signal handler")) },
            tx,
        ));
        let changed = tokio::time::timeout(Duration::from_millis(100), rx.changed()).await;
        assert!(changed.is_err(), "receiver saw a change: {:?}", changed);
        assert!(!*rx.borrow());
        task.abort();
    }
}
