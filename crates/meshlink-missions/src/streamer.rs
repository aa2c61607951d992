// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Timed waypoint emission.

use std::time::Duration;

use meshlink_scene::{TransformationCommand, WireFormat};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{MissionError, MissionSink, Waypoint};

/// Shortest allowed gap between two emissions.
pub const MIN_TICK: Duration = Duration::from_millis(8);

/// How a [`stream`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Every waypoint was published.
    Completed {
        /// Updates sent.
        emitted: usize,
    },
    /// The token fired before the sequence finished.
    Cancelled {
        /// Updates sent before cancellation.
        emitted: usize,
    },
}

/// Encodes a waypoint as a pose update facing the direction of travel.
pub fn encode_waypoint(waypoint: &Waypoint, format: WireFormat) -> Result<Vec<u8>, MissionError> {
    let command = TransformationCommand::from_pose(waypoint.position, waypoint.attitude());
    Ok(format.encode(&command)?)
}

/// Publishes one update per tick, in input order.
///
/// `tick` is raised to [`MIN_TICK`]. The first emission happens one period
/// after the call. A waypoint's dwell replaces the period before the next
/// emission only, and is itself floored at [`MIN_TICK`]. The wait is raced
/// against `cancel`.
pub async fn stream<S, F>(
    sink: &S,
    path: &str,
    waypoints: &[Waypoint],
    mut publish_fn: F,
    tick: Duration,
    cancel: &CancellationToken,
) -> Result<StreamOutcome, MissionError>
where
    S: MissionSink,
    F: FnMut(&Waypoint) -> Result<Vec<u8>, MissionError>,
{
    let tick = tick.max(MIN_TICK);
    let mut deadline = Instant::now() + tick;
    let mut emitted = 0;
    for waypoint in waypoints {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(path, emitted, "waypoint stream cancelled");
                return Ok(StreamOutcome::Cancelled { emitted });
            }
            () = sleep_until(deadline) => {}
        }
        let payload = publish_fn(waypoint)?;
        sink.publish(path, payload).await?;
        emitted += 1;
        let period = waypoint.dwell.map_or(tick, |d| d.max(MIN_TICK));
        deadline = Instant::now() + period;
    }
    Ok(StreamOutcome::Completed { emitted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(Instant, String, Vec<u8>)>>,
    }

    impl MissionSink for RecordingSink {
        async fn publish(&self, path: &str, payload: Vec<u8>) -> Result<(), MissionError> {
            self.sent
                .lock()
                .unwrap()
                .push((Instant::now(), path.to_owned(), payload));
            Ok(())
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn index_bytes(w: &Waypoint) -> Result<Vec<u8>, MissionError> {
        Ok(vec![w.position[0] as u8])
    }

    #[tokio::test(start_paused = true)]
    async fn emits_in_order_with_floor_spacing() {
        let sink = RecordingSink::default();
        let waypoints: Vec<_> = (0..5).map(|i| Waypoint::new(f64::from(i), 0.0, 0.0)).collect();
        let start = Instant::now();
        let outcome = stream(
            &sink,
            "meshcat.transformations.drone",
            &waypoints,
            index_bytes,
            Duration::from_millis(1),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, StreamOutcome::Completed { emitted: 5 });
        let sent = sink.sent.lock().unwrap();
        let order: Vec<u8> = sent.iter().map(|(_, _, p)| p[0]).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert!(sent[0].0 - start >= MIN_TICK);
        for pair in sent.windows(2) {
            assert!(pair[1].0 - pair[0].0 >= MIN_TICK);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dwell_overrides_only_the_next_period() {
        let sink = RecordingSink::default();
        let waypoints = vec![
            Waypoint::from_slice(&[0.0, 0.0, 0.0, 500.0]).unwrap(),
            Waypoint::new(1.0, 0.0, 0.0),
            Waypoint::new(2.0, 0.0, 0.0),
        ];
        stream(
            &sink,
            "p",
            &waypoints,
            index_bytes,
            Duration::from_millis(20),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let sent = sink.sent.lock().unwrap();
        assert!(sent[1].0 - sent[0].0 >= Duration::from_millis(500));
        let last_gap = sent[2].0 - sent[1].0;
        assert!(last_gap >= Duration::from_millis(20) && last_gap < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_tick_wait() {
        let sink = RecordingSink::default();
        let waypoints = vec![Waypoint::new(0.0, 0.0, 0.0); 100];
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(35)).await;
            trigger.cancel();
        });
        let outcome = stream(
            &sink,
            "p",
            &waypoints,
            index_bytes,
            Duration::from_millis(10),
            &cancel,
        )
        .await
        .unwrap();
        assert_eq!(outcome, StreamOutcome::Cancelled { emitted: 3 });
    }

    #[test]
    fn encoded_waypoint_is_a_pose() {
        let bytes = encode_waypoint(&Waypoint::new(1.0, 2.0, 3.0), WireFormat::Json).unwrap();
        let cmd: TransformationCommand = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(cmd.translation, Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(cmd.rotation.as_ref().map(Vec::len), Some(3));
        assert!(cmd.matrix.is_none());
    }
}
