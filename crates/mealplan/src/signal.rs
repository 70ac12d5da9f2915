use std::sync::Arc;

use tokio::sync::watch;

/// Process-wide change counter bumped after every successful persist.
///
/// Carries no payload, subscribers re-fetch what they display.
#[derive(Clone, Debug)]
pub struct SyncSignal(Arc<watch::Sender<u64>>);

impl SyncSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self(Arc::new(tx))
    }

    pub fn bump(&self) {
        self.0.send_modify(|version| *version = version.wrapping_add(1));
    }

    pub fn version(&self) -> u64 {
        *self.0.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.0.subscribe()
    }
}

impl Default for SyncSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bump_wakes_subscribers() {
        let signal = SyncSignal::new();
        let mut rx = signal.subscribe();

        signal.clone().bump();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);
        assert_eq!(signal.version(), 1);
    }
}
