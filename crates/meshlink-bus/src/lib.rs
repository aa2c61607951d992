// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Message-bus seam.
//!
//! The relay only needs fire-and-forget publish and wildcard subscribe, so
//! [`MessageBus`] is that and nothing more. [`LocalBus`] fans out inside the
//! process (tests, single-binary setups); [`NatsBus`] rides on the `async-nats`
//! client. [`Bus`] picks one from a connection string.

use std::future::Future;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

mod backoff;
mod local;
mod nats;
pub mod subject;

pub use backoff::{connect_with_backoff, Backoff};
pub use local::LocalBus;
pub use nats::{NatsBus, NatsOptions};

/// Connection string selecting the in-process bus.
pub const LOCAL_URL: &str = "local";

/// Bus failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Could not reach or lost the broker.
    #[error("bus connection error: {0}")]
    Connection(String),
    /// Broker sent something unexpected or rejected a request.
    #[error("bus protocol error: {0}")]
    Protocol(String),
    /// The bus was closed locally.
    #[error("bus closed")]
    Closed,
    /// Subject or pattern is malformed.
    #[error("invalid subject `{0}`")]
    InvalidSubject(String),
}

/// One delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Concrete subject it was published on.
    pub subject: String,
    /// Raw payload.
    pub payload: Bytes,
}

/// Stream of messages matching one pattern.
#[derive(Debug)]
pub struct Subscription {
    pattern: String,
    rx: mpsc::Receiver<BusMessage>,
}

impl Subscription {
    pub(crate) fn new(pattern: String, rx: mpsc::Receiver<BusMessage>) -> Self {
        Self { pattern, rx }
    }

    /// Pattern this subscription was created with.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Next message; `None` once the bus side is gone.
    pub async fn next(&mut self) -> Option<BusMessage> {
        self.rx.recv().await
    }
}

/// Publish/subscribe transport with at-most-once delivery.
pub trait MessageBus: Send + Sync + 'static {
    /// Publishes `payload` on a concrete subject.
    fn publish(
        &self,
        subject: &str,
        payload: Bytes,
    ) -> impl Future<Output = Result<(), BusError>> + Send;

    /// Subscribes to a subject pattern (`*` and `>` wildcards allowed).
    fn subscribe(
        &self,
        pattern: &str,
    ) -> impl Future<Output = Result<Subscription, BusError>> + Send;
}

/// Runtime-selected bus.
#[derive(Debug, Clone)]
pub enum Bus {
    /// In-process.
    Local(LocalBus),
    /// NATS broker.
    Nats(NatsBus),
}

impl Bus {
    /// Connects according to `url`: [`LOCAL_URL`] or a `nats://host:port`
    /// address, retried per `backoff`.
    pub async fn connect(url: &str, backoff: &Backoff) -> Result<Self, BusError> {
        if url == LOCAL_URL {
            tracing::info!("using in-process bus");
            return Ok(Bus::Local(LocalBus::new()));
        }
        let options = NatsOptions::from_url(url)?;
        let bus = connect_with_backoff(backoff, || NatsBus::connect(options.clone())).await?;
        Ok(Bus::Nats(bus))
    }
}

impl MessageBus for Bus {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), BusError> {
        match self {
            Bus::Local(bus) => bus.publish(subject, payload).await,
            Bus::Nats(bus) => bus.publish(subject, payload).await,
        }
    }

    async fn subscribe(&self, pattern: &str) -> Result<Subscription, BusError> {
        match self {
            Bus::Local(bus) => bus.subscribe(pattern).await,
            Bus::Nats(bus) => bus.subscribe(pattern).await,
        }
    }
}
