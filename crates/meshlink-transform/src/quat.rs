// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::{check_len, EulerAngles, Mat3, TransformError, NORM_TOLERANCE};

/// Quaternion stored as `(x, y, z, w)` with `w` the scalar part.
///
/// Construction from untrusted input goes through [`Quat::from_slice`], which
/// refuses anything that is not unit-norm within [`NORM_TOLERANCE`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quat {
    data: [f64; 4],
}

impl Quat {
    /// Creates a quaternion from components without validation.
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { data: [x, y, z, w] }
    }

    /// Returns the identity quaternion.
    pub const fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Reads a scalar-last `[x, y, z, w]` slice and checks it is unit-norm.
    pub fn from_slice(values: &[f64]) -> Result<Self, TransformError> {
        check_len("quaternion", values, 4)?;
        let q = Self::new(values[0], values[1], values[2], values[3]);
        if !q.is_normal(NORM_TOLERANCE) {
            return Err(TransformError::NotNormalized { norm: q.norm() });
        }
        Ok(q)
    }

    /// Half-angle product for a ZYX Euler triple.
    pub fn from_euler(e: EulerAngles) -> Self {
        let (s1, c1) = (e.roll * 0.5).sin_cos();
        let (s2, c2) = (e.pitch * 0.5).sin_cos();
        let (s3, c3) = (e.yaw * 0.5).sin_cos();
        Self::new(
            s1 * c2 * c3 - c1 * s2 * s3,
            c1 * s2 * c3 + s1 * c2 * s3,
            c1 * c2 * s3 - s1 * s2 * c3,
            c1 * c2 * c3 + s1 * s2 * s3,
        )
    }

    /// Returns `[x, y, z, w]`.
    pub fn to_array(self) -> [f64; 4] {
        self.data
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.data.iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    /// `|‖q‖ − 1| < tol`.
    pub fn is_normal(&self, tol: f64) -> bool {
        (self.norm() - 1.0).abs() < tol
    }

    /// Rotation matrix in direction-cosine convention; agrees with
    /// [`Mat3::from_euler`] for the same attitude.
    pub fn to_rotation_matrix(&self) -> Result<Mat3, TransformError> {
        if !self.is_normal(NORM_TOLERANCE) {
            return Err(TransformError::NotNormalized { norm: self.norm() });
        }
        let [x, y, z, w] = self.data;
        let (xx, yy, zz) = (x * x, y * y, z * z);
        let (xy, xz, yz) = (x * y, x * z, y * z);
        let (wx, wy, wz) = (w * x, w * y, w * z);
        #[rustfmt::skip]
        let data = [
            1.0 - 2.0 * (yy + zz), 2.0 * (xy + wz),       2.0 * (xz - wy),
            2.0 * (xy - wz),       1.0 - 2.0 * (xx + zz), 2.0 * (yz + wx),
            2.0 * (xz + wy),       2.0 * (yz - wx),       1.0 - 2.0 * (xx + yy),
        ];
        Ok(Mat3::new(data))
    }
}
