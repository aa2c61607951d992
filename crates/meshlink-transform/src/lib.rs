// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Attitude-representation helpers covering Euler angles, quaternions,
//! direction-cosine matrices and 4×4 homogeneous transforms.
//!
//! Conventions used across the crate:
//!
//! * Angles are radians. Euler triples are `[roll, pitch, yaw]` applied in the
//!   ZYX (aerospace) sequence.
//! * Matrices are stored **row-major**; homogeneous transforms carry the
//!   translation in the last column.
//! * Quaternions use the scalar-last wire layout `[x, y, z, w]`.
//!
//! Every function here is pure and safe to call from any number of threads.

use std::f64::consts::TAU;

use thiserror::Error;

mod euler;
mod mat3;
mod mat4;
mod quat;
mod space;

pub use euler::EulerAngles;
pub use mat3::Mat3;
pub use mat4::Mat4;
pub use quat::Quat;
pub use space::{circspace, linspace};

/// Tolerance used when checking quaternions for unit norm.
pub const NORM_TOLERANCE: f64 = 1e-9;

/// Errors raised while validating or composing attitude representations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// Quaternion norm deviates from one by more than [`NORM_TOLERANCE`].
    #[error("quaternion is not normalized (norm {norm})")]
    NotNormalized {
        /// Norm that was observed.
        norm: f64,
    },
    /// A slice did not have the number of components the representation needs.
    #[error("{what} expects {expected} values, got {got}")]
    InvalidLength {
        /// Name of the representation being built.
        what: &'static str,
        /// Required component count.
        expected: usize,
        /// Supplied component count.
        got: usize,
    },
    /// Rotation slice was neither an Euler triple nor a quaternion.
    #[error("rotation expects 3 (euler) or 4 (quaternion) values, got {got}")]
    InvalidRotationLength {
        /// Supplied component count.
        got: usize,
    },
    /// Scale component is zero or not finite.
    #[error("invalid scale component {value} on axis {axis}")]
    InvalidScale {
        /// Axis index (0 = x).
        axis: usize,
        /// Offending value.
        value: f64,
    },
    /// Input contained NaN or infinity.
    #[error("{what} contains non-finite values")]
    NonFinite {
        /// Name of the representation being built.
        what: &'static str,
    },
}

/// Rotation supplied to [`build_homogeneous_transform`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Rotation {
    /// ZYX Euler triple.
    Euler(EulerAngles),
    /// Unit quaternion.
    Quaternion(Quat),
}

impl Rotation {
    /// Interprets a wire slice: three values are Euler angles, four values a
    /// scalar-last quaternion (validated for unit norm).
    pub fn from_slice(values: &[f64]) -> Result<Self, TransformError> {
        match values.len() {
            3 => Ok(Self::Euler(EulerAngles::from_slice(values)?)),
            4 => Ok(Self::Quaternion(Quat::from_slice(values)?)),
            got => Err(TransformError::InvalidRotationLength { got }),
        }
    }

    /// Normalises the rotation to quaternion form.
    pub fn to_quat(self) -> Quat {
        match self {
            Self::Euler(e) => Quat::from_euler(e),
            Self::Quaternion(q) => q,
        }
    }
}

/// Converts a ZYX Euler triple to a quaternion using the half-angle product.
pub fn euler_to_quaternion(roll: f64, pitch: f64, yaw: f64) -> Quat {
    Quat::from_euler(EulerAngles::new(roll, pitch, yaw))
}

/// Direction-cosine matrix for a ZYX Euler triple.
pub fn euler_to_dcm(roll: f64, pitch: f64, yaw: f64) -> Mat3 {
    Mat3::from_euler(EulerAngles::new(roll, pitch, yaw))
}

/// [`euler_to_dcm`] embedded in a 4×4 homogeneous matrix with zero translation.
pub fn euler_to_dcm4(roll: f64, pitch: f64, yaw: f64) -> Mat4 {
    Mat4::from_rotation(&euler_to_dcm(roll, pitch, yaw))
}

/// Rotation matrix for a unit quaternion, in the same convention as
/// [`euler_to_dcm`].
pub fn quaternion_to_rotation_matrix(q: &Quat) -> Result<Mat3, TransformError> {
    q.to_rotation_matrix()
}

/// Returns `true` when `|‖q‖ − 1| < 1e-9`.
pub fn is_normal(q: &Quat) -> bool {
    q.is_normal(NORM_TOLERANCE)
}

/// Composes rotation, optional scale and optional translation into a
/// row-major homogeneous transform `T · R · S`, i.e. `[R · diag(s) | t]`.
///
/// Missing pieces default to identity rotation, unit scale and zero
/// translation.
pub fn build_homogeneous_transform(
    translation: Option<[f64; 3]>,
    rotation: Option<Rotation>,
    scale: Option<[f64; 3]>,
) -> Result<Mat4, TransformError> {
    let rot = match rotation {
        Some(r) => r.to_quat().to_rotation_matrix()?,
        None => Mat3::identity(),
    };
    let mut m = Mat4::from_rotation(&rot);
    if let Some(s) = scale {
        for (axis, value) in s.iter().copied().enumerate() {
            if !value.is_finite() || value == 0.0 {
                return Err(TransformError::InvalidScale { axis, value });
            }
        }
        m = m * Mat4::scale(s[0], s[1], s[2]);
    }
    let [tx, ty, tz] = translation.unwrap_or([0.0; 3]);
    if [tx, ty, tz].iter().any(|v| !v.is_finite()) {
        return Err(TransformError::NonFinite {
            what: "translation",
        });
    }
    Ok(Mat4::translation(tx, ty, tz) * m)
}

/// Converts degrees to radians.
pub fn deg_to_rad(value: f64) -> f64 {
    value * (TAU / 360.0)
}

/// Converts radians to degrees.
pub fn rad_to_deg(value: f64) -> f64 {
    value * (360.0 / TAU)
}

pub(crate) fn check_len(
    what: &'static str,
    values: &[f64],
    expected: usize,
) -> Result<(), TransformError> {
    if values.len() != expected {
        return Err(TransformError::InvalidLength {
            what,
            expected,
            got: values.len(),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(TransformError::NonFinite { what });
    }
    Ok(())
}
