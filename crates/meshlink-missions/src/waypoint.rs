// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::f64::consts::{FRAC_PI_2, PI};
use std::time::Duration;

use meshlink_transform::{circspace, EulerAngles};

use crate::MissionError;

/// Length of one orbit lap profile in seconds.
pub const ORBIT_DURATION_SECS: f64 = 10.0;
/// Orbit samples per second; also the orbit tick rate.
pub const ORBIT_SAMPLE_RATE_HZ: f64 = 60.0;

/// Position along a trajectory, with an optional dwell before the next one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    /// `[x, y, z]`.
    pub position: [f64; 3],
    /// Period to wait after this waypoint instead of the regular tick.
    pub dwell: Option<Duration>,
}

impl Waypoint {
    /// Waypoint without dwell.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: [x, y, z],
            dwell: None,
        }
    }

    /// Parses `[x, y, z]` or `[x, y, z, dwell_ms]`.
    pub fn from_slice(values: &[f64]) -> Result<Self, MissionError> {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(MissionError::Validation("waypoint values must be finite".into()));
        }
        match *values {
            [x, y, z] => Ok(Self::new(x, y, z)),
            [x, y, z, dwell_ms] if dwell_ms >= 0.0 => Ok(Self {
                position: [x, y, z],
                dwell: Some(Duration::from_secs_f64(dwell_ms / 1000.0)),
            }),
            [_, _, _, _] => Err(MissionError::Validation("dwell must be non-negative".into())),
            _ => Err(MissionError::Validation(format!(
                "waypoint expects 3 or 4 values, got {}",
                values.len()
            ))),
        }
    }

    /// Planar heading `atan2(-y, x)`.
    pub fn heading(&self) -> f64 {
        (-self.position[1]).atan2(self.position[0])
    }

    /// Attitude facing the direction of travel: level, yaw = heading − 90°.
    pub fn attitude(&self) -> EulerAngles {
        EulerAngles::new(0.0, 0.0, self.heading() - FRAC_PI_2)
    }
}

/// Largest orbit lap accepted; 100 rad/s at the default profile.
pub const MAX_ORBIT_SAMPLES: usize = 60_000;

/// Number of samples in one orbit lap, `round(duration × rate × angular_rate)`.
///
/// Checks every orbit parameter without allocating.
pub fn orbit_samples(radius: f64, angular_rate: f64, altitude: f64) -> Result<usize, MissionError> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(MissionError::Validation(format!(
            "orbit radius must be positive, got {radius}"
        )));
    }
    if !altitude.is_finite() {
        return Err(MissionError::Validation("orbit altitude must be finite".into()));
    }
    let samples = (ORBIT_DURATION_SECS * ORBIT_SAMPLE_RATE_HZ * angular_rate).round();
    if !samples.is_finite() || samples < 1.0 {
        return Err(MissionError::Validation(format!(
            "angular rate {angular_rate} yields no orbit samples"
        )));
    }
    #[allow(clippy::cast_precision_loss)]
    let max = MAX_ORBIT_SAMPLES as f64;
    if samples > max {
        return Err(MissionError::Validation(format!(
            "angular rate {angular_rate} needs {samples} samples per lap (max {MAX_ORBIT_SAMPLES})"
        )));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = samples as usize;
    Ok(n)
}

/// Closed circle of waypoints at `altitude` for one orbit lap.
///
/// Samples [`orbit_samples`] points over `[0, 2π)`.
pub fn orbit_waypoints(
    radius: f64,
    angular_rate: f64,
    altitude: f64,
) -> Result<Vec<Waypoint>, MissionError> {
    let n = orbit_samples(radius, angular_rate, altitude)?;
    Ok(circspace(0.0, 2.0 * PI, radius, n, false)
        .into_iter()
        .map(|[x, y]| Waypoint::new(x, y, altitude))
        .collect())
}
