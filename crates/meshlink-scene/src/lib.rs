// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scene command model for meshlink renderers.
//!
//! Entities here mirror the three.js JSON object format consumed by meshcat
//! style viewers: a [`Scene`] bundles geometries, materials and one
//! [`SceneObject`] joining them, and a [`Command`] wraps a payload with the
//! scene path it targets.
//!
//! # Lifecycle
//!
//! Nothing is stored between commands. Entities are built fresh from each
//! decoded bus payload, encoded, handed downstream and dropped.

use thiserror::Error;

mod command;
mod geometry;
mod material;
mod scene;
mod transform;
pub mod wire;

pub use command::{AnimationOptions, Command, CommandKind, ServerResource};
pub use geometry::{
    BoxGeometry, BufferAttribute, BufferAttributes, BufferData, BufferGeometry, GenericGeometry,
    Geometry, GeometryAttributes, InlineData, MeshData, MeshGeometry, SceneElement,
    SphereGeometry, BOX_GEOMETRY, BUFFER_GEOMETRY, MESH_FILE_GEOMETRY, SPHERE_GEOMETRY,
};
pub use material::{LambertMaterial, Material, DEFAULT_MATERIAL_UUID};
pub use scene::{Scene, SceneBuilder, SceneConfig, SceneMetadata, SceneObject};
pub use transform::TransformationCommand;
pub use wire::WireFormat;

/// Errors raised while building, validating or encoding scene commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// Payload bytes could not be decoded into the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
    /// Payload decoded but violates a model invariant.
    #[error("validation error: {0}")]
    Validation(String),
    /// Command could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),
}

impl From<meshlink_transform::TransformError> for SceneError {
    fn from(err: meshlink_transform::TransformError) -> Self {
        Self::Validation(err.to_string())
    }
}
