// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Materials.

use serde::{Deserialize, Serialize};

/// Fixed uuid of the shared default material. Renderers cache by uuid, so
/// this must stay stable across releases.
pub const DEFAULT_MATERIAL_UUID: &str = "396744fe-087d-11ec-9957-7fbbaaa96777";

/// `MeshLambertMaterial` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambertMaterial {
    /// Material id referenced by scene objects.
    pub uuid: String,
    /// Always `MeshLambertMaterial`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Packed 0xRRGGBB colour.
    pub color: u32,
    /// Environment reflectivity.
    pub reflectivity: f64,
    /// three.js side constant (2 = double sided).
    pub side: u8,
    /// Enables alpha blending.
    pub transparent: bool,
    /// Alpha when `transparent` is set.
    pub opacity: f64,
    /// Line width for line primitives.
    pub linewidth: f64,
    /// Render as wireframe.
    pub wireframe: bool,
    /// Wireframe line width.
    #[serde(rename = "wireframeLinewidth")]
    pub wireframe_linewidth: f64,
    /// three.js vertex-colour mode.
    #[serde(rename = "vertexColors")]
    pub vertex_colors: u32,
}

impl Default for LambertMaterial {
    fn default() -> Self {
        Self {
            uuid: DEFAULT_MATERIAL_UUID.to_owned(),
            kind: "MeshLambertMaterial".to_owned(),
            color: 16_711_935,
            reflectivity: 0.5,
            side: 2,
            transparent: false,
            opacity: 0.5,
            linewidth: 1.0,
            wireframe: false,
            wireframe_linewidth: 1.0,
            vertex_colors: 0,
        }
    }
}

/// Closed set of material variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Material {
    /// Lambert shading.
    Lambert(LambertMaterial),
}

impl Material {
    /// Id objects reference this material by.
    pub fn uuid(&self) -> &str {
        match self {
            Material::Lambert(m) => &m.uuid,
        }
    }
}

impl From<LambertMaterial> for Material {
    fn from(value: LambertMaterial) -> Self {
        Material::Lambert(value)
    }
}
