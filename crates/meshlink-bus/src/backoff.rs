// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::BusError;

/// Exponential retry schedule bounded by total elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// First delay.
    pub initial: Duration,
    /// Growth factor per attempt.
    pub multiplier: f64,
    /// Largest single delay.
    pub max_interval: Duration,
    /// Give up once this much time has passed.
    pub max_elapsed: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            multiplier: 1.5,
            max_interval: Duration::from_secs(10),
            max_elapsed: Duration::from_secs(60),
        }
    }
}

impl Backoff {
    /// Delay following `current`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        current.mul_f64(self.multiplier).min(self.max_interval)
    }
}

/// Retries `attempt` until it succeeds or the schedule runs out.
pub async fn connect_with_backoff<T, F, Fut>(policy: &Backoff, mut attempt: F) -> Result<T, BusError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BusError>>,
{
    let started = Instant::now();
    let mut interval = policy.initial;
    let mut tries = 0u32;
    loop {
        tries += 1;
        match attempt().await {
            Ok(value) => {
                info!(tries, "bus connected");
                return Ok(value);
            }
            Err(err) => {
                let elapsed = started.elapsed();
                if elapsed + interval > policy.max_elapsed {
                    return Err(BusError::Connection(format!(
                        "gave up after {tries} attempts in {elapsed:?}: {err}"
                    )));
                }
                warn!(tries, %err, retry_in = ?interval, "bus connect failed");
                tokio::time::sleep(interval).await;
                interval = policy.next_interval(interval);
            }
        }
    }
}
