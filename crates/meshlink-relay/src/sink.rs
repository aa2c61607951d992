// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Mission output onto the bus.

use std::sync::Arc;

use bytes::Bytes;
use meshlink_bus::MessageBus;
use meshlink_missions::{MissionError, MissionSink};

/// Publishes mission updates with the mission path as the subject.
#[derive(Debug)]
pub struct BusSink<B> {
    bus: Arc<B>,
}

impl<B> BusSink<B> {
    /// Wraps a shared bus handle.
    pub fn new(bus: Arc<B>) -> Self {
        Self { bus }
    }
}

impl<B: MessageBus> MissionSink for BusSink<B> {
    async fn publish(&self, path: &str, payload: Vec<u8>) -> Result<(), MissionError> {
        self.bus
            .publish(path, Bytes::from(payload))
            .await
            .map_err(|err| MissionError::Publish(err.to_string()))
    }
}
