//! Cross-tab change notifications.
//!
//! Every open client instance joins the same [`CrossTabBus`] and gets a
//! [`TabChannel`]. A signal published on one channel reaches every other
//! channel; the publisher never hears itself. Signals only say "local
//! state changed, re-read it"; no data travels on the bus.

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::types::{SignalKind, SyncSignal};
use crate::progress::identity::TabId;

const DEFAULT_CAPACITY: usize = 64;

/// Shared hub all tabs of one learner join.
#[derive(Debug, Clone)]
pub struct CrossTabBus {
    sender: broadcast::Sender<SyncSignal>,
}

impl CrossTabBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Slow subscribers that fall more than `capacity` signals behind
    /// skip the oldest ones.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Open a channel for a new client instance.
    pub fn join(&self) -> TabChannel {
        TabChannel {
            tab_id: TabId::new(),
            sender: self.sender.clone(),
        }
    }

    /// Number of live subscriptions across all tabs.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for CrossTabBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One tab's view of the bus.
#[derive(Debug, Clone)]
pub struct TabChannel {
    tab_id: TabId,
    sender: broadcast::Sender<SyncSignal>,
}

impl TabChannel {
    pub fn tab_id(&self) -> &TabId {
        &self.tab_id
    }

    /// Tell the other tabs to re-read local state.
    pub fn publish(&self, kind: SignalKind) -> SyncSignal {
        let signal = SyncSignal {
            kind,
            timestamp: Utc::now(),
            origin: Some(self.tab_id.clone()),
        };
        // No receivers is not an error: this may be the only tab.
        let delivered = self.sender.send(signal.clone()).unwrap_or(0);
        tracing::trace!(tab = %self.tab_id, delivered, "published sync signal");
        signal
    }

    /// Pull-style receiver that skips this tab's own signals.
    pub fn listen(&self) -> Listener {
        Listener {
            tab_id: self.tab_id.clone(),
            receiver: self.sender.subscribe(),
        }
    }

    /// Run `handler` for every signal from another tab until the returned
    /// [`Subscription`] is dropped or cancelled. Must be called inside a
    /// tokio runtime.
    pub fn subscribe<F>(&self, mut handler: F) -> Subscription
    where
        F: FnMut(SyncSignal) + Send + 'static,
    {
        let mut listener = self.listen();
        let handle = tokio::spawn(async move {
            while let Some(signal) = listener.recv().await {
                handler(signal);
            }
        });
        Subscription { handle }
    }
}

/// Receiver half returned by [`TabChannel::listen`].
#[derive(Debug)]
pub struct Listener {
    tab_id: TabId,
    receiver: broadcast::Receiver<SyncSignal>,
}

impl Listener {
    /// Next signal from another tab, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<SyncSignal> {
        loop {
            match self.receiver.recv().await {
                Ok(signal) if signal.origin.as_ref() == Some(&self.tab_id) => continue,
                Ok(signal) => return Some(signal),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(tab = %self.tab_id, skipped, "sync listener lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Listener::recv`].
    pub fn try_recv(&mut self) -> Option<SyncSignal> {
        loop {
            match self.receiver.try_recv() {
                Ok(signal) if signal.origin.as_ref() == Some(&self.tab_id) => continue,
                Ok(signal) => return Some(signal),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

/// Live handler registration. Dropping it stops delivery.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn cancel(self) {
        // Drop does the work.
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn other_tabs_receive_but_sender_does_not() {
        let bus = CrossTabBus::new();
        let a = bus.join();
        let b = bus.join();
        let mut a_rx = a.listen();
        let mut b_rx = b.listen();

        a.publish(SignalKind::SyncUpdate);

        let got = b_rx.recv().await.expect("b hears a");
        assert_eq!(got.kind, SignalKind::SyncUpdate);
        assert_eq!(got.origin.as_ref(), Some(a.tab_id()));
        assert!(a_rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn publish_without_listeners_is_fine() {
        let bus = CrossTabBus::new();
        let signal = bus.join().publish(SignalKind::SyncUpdate);
        assert_eq!(signal.kind, SignalKind::SyncUpdate);
    }

    #[tokio::test]
    async fn handler_runs_until_subscription_dropped() {
        let bus = CrossTabBus::new();
        let a = bus.join();
        let b = bus.join();
        let seen = Arc::new(Mutex::new(0u32));

        let counter = Arc::clone(&seen);
        let subscription = b.subscribe(move |_| *counter.lock().unwrap() += 1);
        assert!(subscription.is_active());

        a.publish(SignalKind::SyncUpdate);
        a.publish(SignalKind::SyncUpdate);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*seen.lock().unwrap(), 2);

        subscription.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;
        a.publish(SignalKind::SyncUpdate);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*seen.lock().unwrap(), 2);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn lagged_listener_keeps_receiving() {
        let bus = CrossTabBus::with_capacity(2);
        let a = bus.join();
        let mut rx = bus.join().listen();
        for _ in 0..5 {
            a.publish(SignalKind::SyncUpdate);
        }
        assert!(rx.recv().await.is_some());
    }
}
