//! Subscriber notify hub (C8, §4.7): one `tokio::sync::watch` channel per
//! Datacapsule carrying the latest committed sequence number, grounded on
//! the penumbra storage reference's use of `watch` to publish new state
//! versions to readers.

use tokio::sync::watch;

pub struct NotifyHub {
    tx: watch::Sender<u64>,
}

impl NotifyHub {
    /// `initial` is the Datacapsule's `latest_seq` at construction time, or
    /// `u64::MAX` if nothing has been committed yet (mirrors the pre-genesis
    /// sentinel convention the penumbra reference uses for its own version
    /// counter).
    pub fn new(initial: u64) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn publish(&self, seq: u64) {
        // A lagging or entirely unsubscribed hub is not an error: waiters
        // simply weren't listening.
        let _ = self.tx.send(seq);
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

/// `wait_after(s)` (§4.4.4): returns immediately if `latest_seq > s`
/// already, otherwise suspends until a commit publishes a value past `s`.
pub async fn wait_after(rx: &mut watch::Receiver<u64>, after: u64) -> u64 {
    loop {
        let current = *rx.borrow();
        if current != u64::MAX && current > after {
            return current;
        }
        if rx.changed().await.is_err() {
            return *rx.borrow();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_after_returns_immediately_when_already_past() {
        let hub = NotifyHub::new(5);
        let mut rx = hub.subscribe();
        let got = wait_after(&mut rx, 2).await;
        assert_eq!(got, 5);
    }

    #[tokio::test]
    async fn wait_after_suspends_until_publish() {
        let hub = NotifyHub::new(0);
        let mut rx = hub.subscribe();
        let waiter = tokio::spawn(async move { wait_after(&mut rx, 0).await });
        tokio::task::yield_now().await;
        hub.publish(1);
        let got = waiter.await.unwrap();
        assert_eq!(got, 1);
    }
}
