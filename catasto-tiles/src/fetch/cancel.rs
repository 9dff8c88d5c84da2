//! Signal d'annulation coopératif

use std::sync::Arc;

use tokio::sync::watch;

/// Signal partagé entre le déclencheur (Ctrl-C, interface) et la boucle de
/// téléchargement. Une fois levé, il ne retombe plus.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Se résout dès que le signal est levé
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // l'émetteur vit aussi longtemps que `self` : wait_for ne peut pas échouer ici
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let signal = CancelSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        assert!(!signal.is_cancelled());
        signal.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let signal = CancelSignal::new();
        signal.cancel();
        signal.cancelled().await;
    }
}
