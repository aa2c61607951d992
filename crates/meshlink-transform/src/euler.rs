// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::{check_len, TransformError};

/// ZYX (aerospace) Euler triple in radians.
///
/// The rotation is applied yaw about Z, then pitch about the new Y, then roll
/// about the new X.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct EulerAngles {
    /// Rotation about the body X axis.
    pub roll: f64,
    /// Rotation about the body Y axis.
    pub pitch: f64,
    /// Rotation about the body Z axis.
    pub yaw: f64,
}

impl EulerAngles {
    /// Creates a triple from `roll`, `pitch`, `yaw`.
    pub const fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }

    /// Reads `[roll, pitch, yaw]` from a slice.
    pub fn from_slice(values: &[f64]) -> Result<Self, TransformError> {
        check_len("euler angles", values, 3)?;
        Ok(Self::new(values[0], values[1], values[2]))
    }

    /// Returns `[roll, pitch, yaw]`.
    pub fn to_array(self) -> [f64; 3] {
        [self.roll, self.pitch, self.yaw]
    }
}
