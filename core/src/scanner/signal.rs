use std::sync::Arc;

use tokio::sync::watch;

/// Cancellation flag shared between a scan and whoever may abort it.
///
/// Clones observe the same flag. Once stopped it stays stopped.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`stop`](Self::stop) has been called on any clone.
    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn clones_share_the_flag() {
        let signal = StopSignal::new();
        let other = signal.clone();
        assert!(!other.is_stopped());

        let waiter = tokio::spawn(async move { other.stopped().await });
        signal.stop();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter not woken")
            .unwrap();
        assert!(signal.is_stopped());
    }

    #[tokio::test]
    async fn stopped_returns_immediately_when_already_stopped() {
        let signal = StopSignal::new();
        signal.stop();
        tokio::time::timeout(Duration::from_millis(50), signal.stopped())
            .await
            .expect("already stopped signal must not block");
    }
}
