// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Long-running synthetic trajectories.
//!
//! A [`MissionPool`] owns a bounded job queue and a fixed set of workers.
//! Each worker runs one mission at a time; a mission turns its profile into
//! [`Waypoint`]s and hands them to [`stream`], which publishes one pose per
//! tick through a [`MissionSink`].
//!
//! Every loop observes a shared `CancellationToken`, so
//! [`MissionPool::shutdown`] stops in-flight orbits as well as ingestion.

use std::future::Future;

use thiserror::Error;

mod pool;
mod streamer;
mod waypoint;

pub use pool::{
    MissionKind, MissionPool, MissionReport, MissionRequest, MissionTicket, MissionWork,
    PoolConfig,
};
pub use streamer::{encode_waypoint, stream, StreamOutcome, MIN_TICK};
pub use waypoint::{
    orbit_samples, orbit_waypoints, Waypoint, MAX_ORBIT_SAMPLES, ORBIT_DURATION_SECS,
    ORBIT_SAMPLE_RATE_HZ,
};

/// Mission failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MissionError {
    /// The pending-job queue is at capacity.
    #[error("mission queue is full")]
    QueueFull,
    /// The pool has been shut down.
    #[error("mission pool is closed")]
    Closed,
    /// Mission parameters are unusable.
    #[error("invalid mission: {0}")]
    Validation(String),
    /// The sink rejected an update.
    #[error("publish failed: {0}")]
    Publish(String),
}

impl From<meshlink_scene::SceneError> for MissionError {
    fn from(err: meshlink_scene::SceneError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Destination for mission pose updates.
pub trait MissionSink: Send + Sync + 'static {
    /// Publishes one encoded update addressed to `path`.
    fn publish(&self, path: &str, payload: Vec<u8>)
        -> impl Future<Output = Result<(), MissionError>> + Send;
}
