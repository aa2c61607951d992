// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-process bus.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::subject;
use crate::{BusError, BusMessage, MessageBus, Subscription};

const DEFAULT_BUFFER: usize = 1024;

#[derive(Debug)]
struct LocalSub {
    pattern: String,
    tx: mpsc::Sender<BusMessage>,
}

/// Fan-out bus living in this process.
///
/// Delivery is at-most-once: a subscriber whose buffer is full misses the
/// message, and dropped subscriptions are pruned on the next publish.
#[derive(Debug, Clone)]
pub struct LocalBus {
    subs: Arc<Mutex<Vec<LocalSub>>>,
    buffer: usize,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBus {
    /// Bus with the default per-subscriber buffer.
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    /// Bus whose subscribers buffer up to `buffer` messages.
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            subs: Arc::new(Mutex::new(Vec::new())),
            buffer: buffer.max(1),
        }
    }

    /// Live subscriptions.
    pub async fn subscriber_count(&self) -> usize {
        let mut subs = self.subs.lock().await;
        subs.retain(|s| !s.tx.is_closed());
        subs.len()
    }
}

impl MessageBus for LocalBus {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError> {
        subject::validate(subject, false)?;
        let mut subs = self.subs.lock().await;
        subs.retain(|s| !s.tx.is_closed());
        for sub in subs.iter().filter(|s| subject::matches(&s.pattern, subject)) {
            let msg = BusMessage {
                subject: subject.to_owned(),
                payload: payload.clone(),
            };
            if sub.tx.try_send(msg).is_err() {
                warn!(%subject, pattern = %sub.pattern, "subscriber full; message dropped");
            }
        }
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> Result<Subscription, BusError> {
        subject::validate(pattern, true)?;
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subs.lock().await.push(LocalSub {
            pattern: pattern.to_owned(),
            tx,
        });
        debug!(%pattern, "local subscription added");
        Ok(Subscription::new(pattern.to_owned(), rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_matching_patterns_only() {
        let bus = LocalBus::new();
        let mut all = bus.subscribe("meshcat.>").await.unwrap();
        let mut url = bus.subscribe("meshcat.url").await.unwrap();

        bus.publish("meshcat.objects", Bytes::from_static(b"o")).await.unwrap();
        bus.publish("meshcat.url", Bytes::from_static(b"u")).await.unwrap();

        assert_eq!(all.next().await.unwrap().subject, "meshcat.objects");
        assert_eq!(all.next().await.unwrap().payload, Bytes::from_static(b"u"));
        assert_eq!(url.next().await.unwrap().subject, "meshcat.url");
    }

    #[tokio::test]
    async fn full_subscriber_drops_instead_of_blocking() {
        let bus = LocalBus::with_buffer(1);
        let mut sub = bus.subscribe("a").await.unwrap();
        bus.publish("a", Bytes::from_static(b"1")).await.unwrap();
        bus.publish("a", Bytes::from_static(b"2")).await.unwrap();
        assert_eq!(sub.next().await.unwrap().payload, Bytes::from_static(b"1"));
        assert!(sub.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_subscriptions_are_pruned() {
        let bus = LocalBus::new();
        let sub = bus.subscribe("a.*").await.unwrap();
        assert_eq!(bus.subscriber_count().await, 1);
        drop(sub);
        bus.publish("a.b", Bytes::new()).await.unwrap();
        assert_eq!(bus.subscriber_count().await, 0);
        assert!(bus.publish("a.*", Bytes::new()).await.is_err());
    }
}
