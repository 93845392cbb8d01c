//! Shutdown coordination for the action server.

use std::future::Future;

use tokio::sync::broadcast;

/// Cloneable shutdown handle.
///
/// Each [`signalled`](Shutdown::signalled) future registers at call time, so a trigger
/// that happens before the future is first polled is not lost.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Resolves once [`trigger`](Shutdown::trigger) has been called.
    pub fn signalled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    pub fn trigger(&self) {
        if self.tx.send(()).is_err() {
            tracing::debug!("Shutdown triggered with nothing listening");
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_before_poll_is_seen() {
        let shutdown = Shutdown::new();
        let first = shutdown.signalled();
        let second = shutdown.clone().signalled();

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), async {
            first.await;
            second.await;
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_pending_until_triggered() {
        let shutdown = Shutdown::new();
        let waiting = shutdown.signalled();
        assert!(tokio::time::timeout(Duration::from_millis(20), waiting).await.is_err());
    }
}
