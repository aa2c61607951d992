// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Session registry and fan-out.
//!
//! The registry sits behind one async mutex; every mutation and every
//! broadcast takes it, so the session set is never observed half-updated.
//! Broadcast never waits on a session: a full or closed outbox gets the
//! session evicted, which drops its sender and ends its writer.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Session identifier, unique for the life of the hub.
pub type SessionId = u64;

#[derive(Debug, Default)]
struct HubState {
    next_id: SessionId,
    sessions: HashMap<SessionId, mpsc::Sender<Bytes>>,
}

/// Outcome of one [`Hub::broadcast`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sessions that accepted the payload.
    pub delivered: usize,
    /// Sessions removed because their outbox was full or closed.
    pub evicted: usize,
}

/// Shared handle to the registry.
#[derive(Debug, Clone, Default)]
pub struct Hub {
    state: Arc<Mutex<HubState>>,
}

impl Hub {
    /// Empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session whose outbox holds `buffer` payloads.
    pub async fn register(&self, buffer: usize) -> (SessionId, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id += 1;
        state.sessions.insert(id, tx);
        debug!(session = id, sessions = state.sessions.len(), "session registered");
        (id, rx)
    }

    /// Removes a session. Unknown ids are ignored.
    pub async fn unregister(&self, id: SessionId) {
        let mut state = self.state.lock().await;
        if state.sessions.remove(&id).is_some() {
            debug!(session = id, sessions = state.sessions.len(), "session unregistered");
        }
    }

    /// Offers `payload` to every session without waiting.
    pub async fn broadcast(&self, payload: Bytes) -> BroadcastReport {
        let mut state = self.state.lock().await;
        let mut report = BroadcastReport::default();
        state.sessions.retain(|&id, tx| match tx.try_send(payload.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(session = id, "session outbox full; evicting");
                report.evicted += 1;
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(session = id, "session gone; evicting");
                report.evicted += 1;
                false
            }
        });
        report
    }

    /// Registered sessions.
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// True while `id` is registered.
    pub async fn contains(&self, id: SessionId) -> bool {
        self.state.lock().await.sessions.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_every_session() {
        let hub = Hub::new();
        let (_, mut a) = hub.register(4).await;
        let (_, mut b) = hub.register(4).await;

        let report = hub.broadcast(Bytes::from_static(b"cmd")).await;
        assert_eq!(report, BroadcastReport { delivered: 2, evicted: 0 });
        assert_eq!(a.recv().await.unwrap(), Bytes::from_static(b"cmd"));
        assert_eq!(b.recv().await.unwrap(), Bytes::from_static(b"cmd"));
    }

    #[tokio::test]
    async fn saturated_session_is_evicted_without_blocking_others() {
        let hub = Hub::new();
        let (slow_id, mut slow) = hub.register(1).await;
        let (fast_id, mut fast) = hub.register(8).await;

        hub.broadcast(Bytes::from_static(b"1")).await;
        fast.recv().await.unwrap();
        let report = hub.broadcast(Bytes::from_static(b"2")).await;

        assert_eq!(report, BroadcastReport { delivered: 1, evicted: 1 });
        assert!(!hub.contains(slow_id).await);
        assert!(hub.contains(fast_id).await);
        assert_eq!(fast.recv().await.unwrap(), Bytes::from_static(b"2"));
        // The buffered message survives; then the channel reports closed.
        assert_eq!(slow.recv().await.unwrap(), Bytes::from_static(b"1"));
        assert!(slow.recv().await.is_none());
    }

    #[tokio::test]
    async fn closed_receiver_is_evicted() {
        let hub = Hub::new();
        let (_, rx) = hub.register(4).await;
        drop(rx);
        let report = hub.broadcast(Bytes::new()).await;
        assert_eq!(report.evicted, 1);
        assert_eq!(hub.session_count().await, 0);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let hub = Hub::new();
        let (id, _rx) = hub.register(4).await;
        hub.unregister(id).await;
        hub.unregister(id).await;
        hub.unregister(999).await;
        assert_eq!(hub.session_count().await, 0);
        let (next, _rx2) = hub.register(4).await;
        assert_ne!(next, id);
    }
}
