// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::EulerAngles;

/// Row-major 3×3 matrix used for direction-cosine matrices.
///
/// A DCM maps vectors expressed in the reference frame into the body frame,
/// so `euler_to_dcm([π/2, 0, 0])` sends `+Y` to `-Z` in its third row.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat3 {
    data: [f64; 9],
}

impl Mat3 {
    /// Returns the identity matrix.
    pub const fn identity() -> Self {
        Self {
            data: [
                1.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, //
                0.0, 0.0, 1.0, //
            ],
        }
    }

    /// Creates a matrix from row-major data.
    pub const fn new(data: [f64; 9]) -> Self {
        Self { data }
    }

    /// Direction-cosine matrix for a ZYX Euler triple.
    pub fn from_euler(e: EulerAngles) -> Self {
        let (s1, c1) = e.roll.sin_cos();
        let (s2, c2) = e.pitch.sin_cos();
        let (s3, c3) = e.yaw.sin_cos();
        #[rustfmt::skip]
        let data = [
            c2 * c3,                c2 * s3,                -s2,
            s1 * s2 * c3 - c1 * s3, s1 * s2 * s3 + c1 * c3, s1 * c2,
            c1 * s2 * c3 + s1 * s3, c1 * s2 * s3 - s1 * c3, c1 * c2,
        ];
        Self::new(data)
    }

    /// Returns the matrix as a row-major array.
    pub fn to_array(self) -> [f64; 9] {
        self.data
    }

    /// Element at `(row, col)`.
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.data[row * 3 + col]
    }

    /// Returns the transpose (the inverse for orthonormal matrices).
    pub fn transpose(&self) -> Self {
        let mut out = [0.0; 9];
        for row in 0..3 {
            for col in 0..3 {
                out[col * 3 + row] = self.at(row, col);
            }
        }
        Self::new(out)
    }

    /// Matrix product `self * rhs`.
    pub fn multiply(&self, rhs: &Self) -> Self {
        let mut out = [0.0; 9];
        for row in 0..3 {
            for col in 0..3 {
                let mut sum = 0.0;
                for k in 0..3 {
                    sum += self.at(row, k) * rhs.at(k, col);
                }
                out[row * 3 + col] = sum;
            }
        }
        Self::new(out)
    }

    /// Largest absolute elementwise difference to `other`.
    pub fn max_abs_diff(&self, other: &Self) -> f64 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}
