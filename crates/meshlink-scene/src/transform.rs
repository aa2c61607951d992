// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Inbound transform payloads.

use meshlink_transform::{build_homogeneous_transform, EulerAngles, Mat4, Rotation};
use serde::{Deserialize, Serialize};

use crate::SceneError;

/// Pose update as published on the bus.
///
/// Either an explicit 16-element `matrix`, or any mix of `translation`,
/// `rotation` (3 Euler angles or a 4 element `[x, y, z, w]` quaternion) and
/// `scale`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationCommand {
    /// Row-major homogeneous matrix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Vec<f64>>,
    /// `[x, y, z]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Vec<f64>>,
    /// Euler triple or quaternion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Vec<f64>>,
    /// Per-axis scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec<f64>>,
}

impl TransformationCommand {
    /// Pose from a position and Euler attitude.
    pub fn from_pose(translation: [f64; 3], attitude: EulerAngles) -> Self {
        Self {
            matrix: None,
            translation: Some(translation.to_vec()),
            rotation: Some(attitude.to_array().to_vec()),
            scale: None,
        }
    }

    /// Resolves the payload to a single matrix.
    ///
    /// A supplied matrix that is not all zeros wins outright. Otherwise the
    /// rotation, translation and scale are composed; missing parts default to
    /// identity.
    pub fn resolve(&self) -> Result<Mat4, SceneError> {
        if let Some(values) = &self.matrix {
            let matrix = Mat4::from_slice(values)?;
            if !matrix.is_degenerate() {
                return Ok(matrix);
            }
        }
        let rotation = self
            .rotation
            .as_deref()
            .map(Rotation::from_slice)
            .transpose()?;
        let translation = self
            .translation
            .as_deref()
            .map(|v| triple("translation", v))
            .transpose()?;
        let scale = self
            .scale
            .as_deref()
            .map(|v| triple("scale", v))
            .transpose()?;
        Ok(build_homogeneous_transform(translation, rotation, scale)?)
    }
}

fn triple(what: &str, values: &[f64]) -> Result<[f64; 3], SceneError> {
    <[f64; 3]>::try_from(values).map_err(|_| {
        SceneError::Validation(format!("{what} expects 3 values, got {}", values.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn explicit_matrix_passes_through() {
        let m = Mat4::translation(1.0, 2.0, 3.0);
        let cmd = TransformationCommand {
            matrix: Some(m.to_array().to_vec()),
            rotation: Some(vec![0.0, 0.0, 1.0]),
            ..TransformationCommand::default()
        };
        assert_eq!(cmd.resolve().unwrap(), m);
    }

    #[test]
    fn zero_matrix_falls_back_to_pose() {
        let cmd = TransformationCommand {
            matrix: Some(vec![0.0; 16]),
            translation: Some(vec![4.0, 5.0, 6.0]),
            ..TransformationCommand::default()
        };
        assert_eq!(cmd.resolve().unwrap(), Mat4::translation(4.0, 5.0, 6.0));
    }

    #[test]
    fn short_matrix_is_rejected() {
        let cmd = TransformationCommand {
            matrix: Some(vec![1.0; 9]),
            ..TransformationCommand::default()
        };
        assert!(matches!(cmd.resolve(), Err(SceneError::Validation(_))));
    }

    #[test]
    fn unnormalised_quaternion_is_rejected() {
        let cmd = TransformationCommand {
            rotation: Some(vec![0.0, 0.0, 0.0, 2.0]),
            ..TransformationCommand::default()
        };
        assert!(matches!(cmd.resolve(), Err(SceneError::Validation(_))));
    }

    #[test]
    fn empty_payload_is_identity() {
        assert_eq!(
            TransformationCommand::default().resolve().unwrap(),
            Mat4::identity()
        );
    }

    #[test]
    fn pose_places_translation_in_last_column() {
        let cmd = TransformationCommand::from_pose([1.0, 2.0, 3.0], EulerAngles::new(0.0, 0.0, FRAC_PI_2));
        let m = cmd.resolve().unwrap();
        assert_eq!(m.translation_part(), [1.0, 2.0, 3.0]);
        assert!((m.at(0, 1) - 1.0).abs() < 1e-12);
    }
}
