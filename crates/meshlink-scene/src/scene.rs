// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scene assembly.

use serde::{Deserialize, Serialize};

use crate::geometry::{Geometry, SceneElement};
use crate::material::{LambertMaterial, Material};
use crate::SceneError;

/// three.js object-format header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMetadata {
    /// Always `Object`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Format version understood by the renderer.
    pub version: f64,
}

impl Default for SceneMetadata {
    fn default() -> Self {
        Self {
            kind: "Object".to_owned(),
            version: 4.5,
        }
    }
}

/// The single mesh object in a [`Scene`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneObject {
    /// Identity; shares its uuid with the geometry and has type `Mesh`.
    #[serde(flatten)]
    pub element: SceneElement,
    /// Geometry uuid.
    pub geometry: String,
    /// Material uuid.
    pub material: String,
    /// Row-major homogeneous transform.
    pub matrix: [f64; 16],
}

/// Self-contained scene payload for one `set_object` command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    /// Format header.
    pub metadata: SceneMetadata,
    /// Exactly one geometry.
    pub geometries: Vec<Geometry>,
    /// Exactly one material.
    pub materials: Vec<Material>,
    /// Object joining the two.
    pub object: SceneObject,
}

impl Scene {
    /// Checks that the object references geometry and material present in
    /// the scene.
    pub fn validate(&self) -> Result<(), SceneError> {
        if !self
            .geometries
            .iter()
            .any(|g| g.element().uuid == self.object.geometry)
        {
            return Err(SceneError::Validation(format!(
                "object references unknown geometry {}",
                self.object.geometry
            )));
        }
        if !self
            .materials
            .iter()
            .any(|m| m.uuid() == self.object.material)
        {
            return Err(SceneError::Validation(format!(
                "object references unknown material {}",
                self.object.material
            )));
        }
        Ok(())
    }
}

/// Options applied when wrapping geometries into scenes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneConfig {
    /// Material attached to every objectified geometry.
    pub default_material: LambertMaterial,
}

/// Wraps geometries into renderable scenes.
#[derive(Debug, Clone, Default)]
pub struct SceneBuilder {
    config: SceneConfig,
}

impl SceneBuilder {
    /// Builder using `config`.
    pub fn new(config: SceneConfig) -> Self {
        Self { config }
    }

    /// The material every scene gets.
    pub fn default_material(&self) -> &LambertMaterial {
        &self.config.default_material
    }

    /// Wraps `geometry` with the default material into a one-object scene.
    ///
    /// The object reuses the geometry's uuid and its transform comes from
    /// [`Geometry::matrix`].
    pub fn objectify(&self, geometry: Geometry) -> Result<Scene, SceneError> {
        let element = geometry.element();
        if element.kind.is_empty() {
            return Err(SceneError::Validation("geometry type is empty".into()));
        }
        let material = self.config.default_material.clone();
        let object = SceneObject {
            element: SceneElement {
                uuid: element.uuid.clone(),
                kind: "Mesh".to_owned(),
            },
            geometry: element.uuid.clone(),
            material: material.uuid.clone(),
            matrix: geometry.matrix().to_array(),
        };
        let scene = Scene {
            metadata: SceneMetadata::default(),
            geometries: vec![geometry],
            materials: vec![material.into()],
            object,
        };
        scene.validate()?;
        Ok(scene)
    }
}
