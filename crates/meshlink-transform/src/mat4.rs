// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::{check_len, Mat3, TransformError};

/// Row-major 4×4 homogeneous transform.
///
/// - Rotation/scale occupy the upper-left 3×3 block.
/// - Translation occupies the last column; the last row is `[0, 0, 0, 1]`
///   for affine transforms.
///
/// # Examples
/// ```
/// use meshlink_transform::Mat4;
/// let pose = Mat4::translation(0.5, 0.0, 2.0) * Mat4::scale(2.0, 2.0, 2.0);
/// assert_eq!(pose.translation_part(), [0.5, 0.0, 2.0]);
/// assert_eq!(pose.at(1, 1), 2.0);
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    data: [f64; 16],
}

impl Mat4 {
    /// Returns the identity matrix.
    pub const fn identity() -> Self {
        Self {
            data: [
                1.0, 0.0, 0.0, 0.0, // row 0
                0.0, 1.0, 0.0, 0.0, // row 1
                0.0, 0.0, 1.0, 0.0, // row 2
                0.0, 0.0, 0.0, 1.0, // row 3
            ],
        }
    }

    /// Builds a translation-only matrix.
    pub const fn translation(tx: f64, ty: f64, tz: f64) -> Self {
        Self {
            data: [
                1.0, 0.0, 0.0, tx, // row 0
                0.0, 1.0, 0.0, ty, // row 1
                0.0, 0.0, 1.0, tz, // row 2
                0.0, 0.0, 0.0, 1.0, // row 3
            ],
        }
    }

    /// Builds a non-uniform scale matrix.
    pub const fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            data: [
                sx, 0.0, 0.0, 0.0, // row 0
                0.0, sy, 0.0, 0.0, // row 1
                0.0, 0.0, sz, 0.0, // row 2
                0.0, 0.0, 0.0, 1.0, // row 3
            ],
        }
    }

    /// Creates a matrix from row-major data.
    pub const fn new(data: [f64; 16]) -> Self {
        Self { data }
    }

    /// Reads 16 row-major values, rejecting wrong lengths and non-finite
    /// entries.
    pub fn from_slice(values: &[f64]) -> Result<Self, TransformError> {
        check_len("matrix", values, 16)?;
        let mut data = [0.0; 16];
        data.copy_from_slice(values);
        Ok(Self::new(data))
    }

    /// Embeds a 3×3 rotation: translation column zeroed, identity last
    /// row/column.
    pub fn from_rotation(r: &Mat3) -> Self {
        let mut data = Self::identity().data;
        for row in 0..3 {
            for col in 0..3 {
                data[row * 4 + col] = r.at(row, col);
            }
        }
        Self::new(data)
    }

    /// Returns the matrix as a row-major array.
    pub fn to_array(self) -> [f64; 16] {
        self.data
    }

    /// Element at `(row, col)`.
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.data[row * 4 + col]
    }

    /// Upper-left 3×3 block.
    pub fn rotation(&self) -> Mat3 {
        let mut out = [0.0; 9];
        for row in 0..3 {
            for col in 0..3 {
                out[row * 3 + col] = self.at(row, col);
            }
        }
        Mat3::new(out)
    }

    /// Translation column.
    pub fn translation_part(&self) -> [f64; 3] {
        [self.at(0, 3), self.at(1, 3), self.at(2, 3)]
    }

    /// An all-zero matrix carries no transform and is treated as absent.
    pub fn is_degenerate(&self) -> bool {
        self.data.iter().all(|v| *v == 0.0)
    }

    /// Matrix product `self * rhs`.
    pub fn multiply(&self, rhs: &Self) -> Self {
        let mut out = [0.0; 16];
        for row in 0..4 {
            for col in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += self.at(row, k) * rhs.at(k, col);
                }
                out[row * 4 + col] = sum;
            }
        }
        Self::new(out)
    }
}

impl core::ops::Mul for Mat4 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        self.multiply(&rhs)
    }
}
