//! Host document readiness.

use tokio::sync::watch;

/// Resolves once the hosting page has finished loading.
#[derive(Debug, Clone)]
pub struct PageLoad {
    rx: watch::Receiver<bool>,
}

/// Sender half, fired by the host when its document is fully parsed.
#[derive(Debug)]
pub struct PageLoadSignal {
    tx: watch::Sender<bool>,
}

impl PageLoad {
    /// A page that has already loaded.
    pub fn loaded() -> Self {
        let (_tx, rx) = watch::channel(true);
        Self { rx }
    }

    /// A page still loading, plus the signal that completes it.
    pub fn pending() -> (PageLoadSignal, Self) {
        let (tx, rx) = watch::channel(false);
        (PageLoadSignal { tx }, Self { rx })
    }

    pub fn is_loaded(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the load event. Returns `false` if the host dropped the
    /// signal without ever firing it.
    pub async fn wait(&mut self) -> bool {
        self.rx.wait_for(|loaded| *loaded).await.is_ok()
    }
}

impl PageLoadSignal {
    pub fn fire(&self) {
        self.tx.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_loaded_resolves_immediately() {
        let mut page = PageLoad::loaded();
        assert!(page.is_loaded());
        assert!(page.wait().await);
    }

    #[tokio::test]
    async fn test_pending_waits_for_signal() {
        let (signal, mut page) = PageLoad::pending();
        assert!(!page.is_loaded());

        let waiter = tokio::spawn(async move { page.wait().await });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        signal.fire();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_dropped_signal_never_loads() {
        let (signal, mut page) = PageLoad::pending();
        drop(signal);
        assert!(!page.wait().await);
    }
}
