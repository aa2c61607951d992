// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bounded mission queue and its workers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use meshlink_scene::WireFormat;
use serde::Deserialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::streamer::{encode_waypoint, stream, StreamOutcome};
use crate::waypoint::{orbit_samples, orbit_waypoints, Waypoint, ORBIT_SAMPLE_RATE_HZ};
use crate::{MissionError, MissionSink};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Pool sizing and output settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Concurrent missions.
    pub workers: usize,
    /// Pending missions before `enqueue` reports [`MissionError::QueueFull`].
    pub capacity: usize,
    /// Period between waypoints of explicit waypoint missions.
    pub tick: Duration,
    /// Encoding of published pose updates.
    pub format: WireFormat,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            capacity: 16,
            tick: Duration::from_millis(50),
            format: WireFormat::MsgPack,
        }
    }
}

/// Trajectory profile.
#[derive(Debug, Clone, PartialEq)]
pub enum MissionKind {
    /// Circle forever at the work item's radius and rate.
    Orbit,
    /// Fly the given waypoints once.
    Waypoints(Vec<Waypoint>),
}

/// One queued mission.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionWork {
    /// Where pose updates are published.
    pub path: String,
    /// Profile.
    pub kind: MissionKind,
    /// Orbit radius.
    pub radius: f64,
    /// Orbit rate; one lap takes `1 / angular_rate` orbit profiles.
    pub angular_rate: f64,
    /// Orbit height.
    pub altitude: f64,
}

impl MissionWork {
    /// Unit orbit at altitude 1.
    pub fn orbit(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: MissionKind::Orbit,
            radius: 1.0,
            angular_rate: 1.0,
            altitude: 1.0,
        }
    }

    /// Single pass over `waypoints`.
    pub fn waypoints(path: impl Into<String>, waypoints: Vec<Waypoint>) -> Self {
        Self {
            kind: MissionKind::Waypoints(waypoints),
            ..Self::orbit(path)
        }
    }

    /// Checks the work item without running it.
    pub fn validate(&self) -> Result<(), MissionError> {
        if self.path.is_empty() {
            return Err(MissionError::Validation("mission path is empty".into()));
        }
        match &self.kind {
            MissionKind::Orbit => {
                orbit_samples(self.radius, self.angular_rate, self.altitude).map(drop)
            }
            MissionKind::Waypoints(points) if points.is_empty() => {
                Err(MissionError::Validation("waypoint mission has no waypoints".into()))
            }
            MissionKind::Waypoints(_) => Ok(()),
        }
    }
}

/// Mission request as published on the bus; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MissionRequest {
    /// `orbit` or `waypoints`; inferred from `waypoints` when absent.
    #[serde(default)]
    pub kind: Option<String>,
    /// Orbit radius.
    #[serde(default)]
    pub radius: Option<f64>,
    /// Orbit rate.
    #[serde(default, alias = "omega")]
    pub angular_rate: Option<f64>,
    /// Orbit height.
    #[serde(default)]
    pub altitude: Option<f64>,
    /// `[x, y, z]` or `[x, y, z, dwell_ms]` entries.
    #[serde(default)]
    pub waypoints: Option<Vec<Vec<f64>>>,
}

impl MissionRequest {
    /// Resolves defaults into a work item publishing to `path`.
    pub fn into_work(self, path: impl Into<String>) -> Result<MissionWork, MissionError> {
        let base = MissionWork::orbit(path);
        let kind = match (self.kind.as_deref(), self.waypoints) {
            (Some("orbit"), _) | (None, None) => MissionKind::Orbit,
            (Some("waypoints") | None, Some(raw)) => MissionKind::Waypoints(
                raw.iter()
                    .map(|w| Waypoint::from_slice(w))
                    .collect::<Result<_, _>>()?,
            ),
            (Some("waypoints"), None) => {
                return Err(MissionError::Validation("waypoint mission has no waypoints".into()))
            }
            (Some(other), _) => {
                return Err(MissionError::Validation(format!("unknown mission kind `{other}`")))
            }
        };
        let work = MissionWork {
            kind,
            radius: self.radius.unwrap_or(base.radius),
            angular_rate: self.angular_rate.unwrap_or(base.angular_rate),
            altitude: self.altitude.unwrap_or(base.altitude),
            ..base
        };
        work.validate()?;
        Ok(work)
    }
}

/// Receipt for an accepted mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MissionTicket {
    /// Pool-unique id.
    pub id: u64,
}

/// Terminal state of a mission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionReport {
    /// Finite mission ran to the end.
    Completed {
        /// Mission.
        ticket: MissionTicket,
        /// Publish path.
        path: String,
        /// Updates sent.
        emitted: usize,
    },
    /// Stopped by shutdown.
    Cancelled {
        /// Mission.
        ticket: MissionTicket,
        /// Publish path.
        path: String,
        /// Updates sent.
        emitted: usize,
    },
    /// Aborted by an error.
    Failed {
        /// Mission.
        ticket: MissionTicket,
        /// Publish path.
        path: String,
        /// Cause.
        error: MissionError,
    },
}

impl MissionReport {
    /// Mission this report is about.
    pub fn ticket(&self) -> MissionTicket {
        match self {
            MissionReport::Completed { ticket, .. }
            | MissionReport::Cancelled { ticket, .. }
            | MissionReport::Failed { ticket, .. } => *ticket,
        }
    }
}

#[derive(Debug)]
struct Job {
    ticket: MissionTicket,
    work: MissionWork,
}

/// Fixed-size worker pool fed by a bounded queue.
#[derive(Debug)]
pub struct MissionPool {
    queue: StdMutex<Option<mpsc::Sender<Job>>>,
    reports: Mutex<mpsc::UnboundedReceiver<MissionReport>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
    next_id: AtomicU64,
}

impl MissionPool {
    /// Spawns the workers on the current runtime.
    pub fn start<S: MissionSink>(config: PoolConfig, sink: Arc<S>) -> Self {
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let rx = Arc::new(Mutex::new(rx));
        let shutdown = CancellationToken::new();

        let workers = (0..config.workers.max(1))
            .map(|index| {
                tokio::spawn(worker_loop(
                    index,
                    Arc::clone(&rx),
                    Arc::clone(&sink),
                    report_tx.clone(),
                    shutdown.clone(),
                    config,
                ))
            })
            .collect();
        info!(
            workers = config.workers.max(1),
            capacity = config.capacity.max(1),
            "mission pool started"
        );

        Self {
            queue: StdMutex::new(Some(tx)),
            reports: Mutex::new(report_rx),
            workers: Mutex::new(workers),
            shutdown,
            next_id: AtomicU64::new(1),
        }
    }

    /// Queues `work` without waiting.
    ///
    /// Fails with [`MissionError::QueueFull`] at capacity and
    /// [`MissionError::Closed`] after shutdown.
    pub fn enqueue(&self, work: MissionWork) -> Result<MissionTicket, MissionError> {
        work.validate()?;
        let guard = self.queue.lock().map_err(|_| MissionError::Closed)?;
        let sender = guard.as_ref().ok_or(MissionError::Closed)?;
        let ticket = MissionTicket {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        let path = work.path.clone();
        sender
            .try_send(Job { ticket, work })
            .map_err(|err| match err {
                TrySendError::Full(_) => MissionError::QueueFull,
                TrySendError::Closed(_) => MissionError::Closed,
            })?;
        debug!(mission = ticket.id, %path, "mission queued");
        Ok(ticket)
    }

    /// Waits for the next finished mission; `None` once every worker exited.
    pub async fn next_report(&self) -> Option<MissionReport> {
        self.reports.lock().await.recv().await
    }

    /// Collects reports that are already available.
    pub async fn drain(&self) -> Vec<MissionReport> {
        let mut rx = self.reports.lock().await;
        let mut out = Vec::new();
        while let Ok(report) = rx.try_recv() {
            out.push(report);
        }
        out
    }

    /// Cancels running missions, closes the queue and joins the workers.
    pub async fn shutdown(&self) {
        info!("shutting down mission pool");
        self.shutdown.cancel();
        if let Ok(mut queue) = self.queue.lock() {
            queue.take();
        }
        let handles = std::mem::take(&mut *self.workers.lock().await);
        for handle in handles {
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(?err, "mission worker task failed"),
                Err(_) => warn!("mission worker did not stop in time"),
            }
        }
        info!("mission pool stopped");
    }
}

async fn worker_loop<S: MissionSink>(
    index: usize,
    queue: Arc<Mutex<mpsc::Receiver<Job>>>,
    sink: Arc<S>,
    reports: mpsc::UnboundedSender<MissionReport>,
    shutdown: CancellationToken,
    config: PoolConfig,
) {
    loop {
        let job = {
            let mut rx = queue.lock().await;
            tokio::select! {
                biased;
                () = shutdown.cancelled() => None,
                job = rx.recv() => job,
            }
        };
        let Some(job) = job else {
            break;
        };
        info!(worker = index, mission = job.ticket.id, path = %job.work.path, "mission started");
        let report = run_mission(job, sink.as_ref(), &config, &shutdown).await;
        match &report {
            MissionReport::Completed { ticket, emitted, .. } => {
                info!(worker = index, mission = ticket.id, emitted, "mission completed");
            }
            MissionReport::Cancelled { ticket, emitted, .. } => {
                info!(worker = index, mission = ticket.id, emitted, "mission cancelled");
            }
            MissionReport::Failed { ticket, error, .. } => {
                warn!(worker = index, mission = ticket.id, %error, "mission failed");
            }
        }
        // Nobody listening is fine.
        let _ = reports.send(report);
    }
    debug!(worker = index, "mission worker stopped");
}

async fn run_mission<S: MissionSink>(
    job: Job,
    sink: &S,
    config: &PoolConfig,
    shutdown: &CancellationToken,
) -> MissionReport {
    let Job { ticket, work } = job;
    let format = config.format;
    let result = match &work.kind {
        MissionKind::Waypoints(points) => {
            stream(
                sink,
                &work.path,
                points,
                |wp| encode_waypoint(wp, format),
                config.tick,
                shutdown,
            )
            .await
        }
        MissionKind::Orbit => orbit(sink, &work, format, shutdown).await,
    };
    let path = work.path;
    match result {
        Ok(StreamOutcome::Completed { emitted }) => MissionReport::Completed {
            ticket,
            path,
            emitted,
        },
        Ok(StreamOutcome::Cancelled { emitted }) => MissionReport::Cancelled {
            ticket,
            path,
            emitted,
        },
        Err(error) => MissionReport::Failed {
            ticket,
            path,
            error,
        },
    }
}

// Laps repeat until cancelled.
async fn orbit<S: MissionSink>(
    sink: &S,
    work: &MissionWork,
    format: WireFormat,
    shutdown: &CancellationToken,
) -> Result<StreamOutcome, MissionError> {
    let tick = Duration::from_secs_f64(1.0 / ORBIT_SAMPLE_RATE_HZ);
    let mut total = 0;
    loop {
        let lap = orbit_waypoints(work.radius, work.angular_rate, work.altitude)?;
        match stream(
            sink,
            &work.path,
            &lap,
            |wp| encode_waypoint(wp, format),
            tick,
            shutdown,
        )
        .await?
        {
            StreamOutcome::Completed { emitted } => total += emitted,
            StreamOutcome::Cancelled { emitted } => {
                return Ok(StreamOutcome::Cancelled {
                    emitted: total + emitted,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(v: serde_json::Value) -> MissionRequest {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn empty_request_is_unit_orbit() {
        let work = request(json!({})).into_work("meshcat.transformations.drone").unwrap();
        assert_eq!(work, MissionWork::orbit("meshcat.transformations.drone"));
    }

    #[test]
    fn waypoints_imply_waypoint_kind() {
        let work = request(json!({"waypoints": [[0, 0, 1], [1, 1, 1, 20]]}))
            .into_work("p")
            .unwrap();
        let MissionKind::Waypoints(points) = work.kind else {
            panic!("expected waypoints");
        };
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].dwell, Some(Duration::from_millis(20)));
    }

    #[test]
    fn omega_alias_and_unknown_kind() {
        let work = request(json!({"radius": 3.0, "omega": 0.5})).into_work("p").unwrap();
        assert_eq!((work.radius, work.angular_rate), (3.0, 0.5));
        assert!(request(json!({"kind": "spiral"})).into_work("p").is_err());
        assert!(request(json!({"kind": "waypoints"})).into_work("p").is_err());
    }

    #[test]
    fn unusable_orbits_are_rejected_when_decoded() {
        for bad in [
            json!({"angular_rate": 0}),
            json!({"radius": -1.0}),
            json!({"angular_rate": 1e17}),
            json!({"waypoints": []}),
        ] {
            let err = request(bad.clone()).into_work("p").unwrap_err();
            assert!(matches!(err, MissionError::Validation(_)), "{bad}: {err:?}");
        }
    }
}
