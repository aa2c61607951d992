// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Geometry variants and attribute-map decoding.

use std::fmt;

use meshlink_transform::Mat4;
use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::SceneError;

/// three.js type name for boxes.
pub const BOX_GEOMETRY: &str = "BoxGeometry";
/// three.js type name for spheres.
pub const SPHERE_GEOMETRY: &str = "SphereGeometry";
/// Type name meshcat uses for inline mesh files.
pub const MESH_FILE_GEOMETRY: &str = "_meshfile_geometry";
/// three.js type name for raw buffer geometry.
pub const BUFFER_GEOMETRY: &str = "BufferGeometry";

/// Identity shared by every scene entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneElement {
    /// Unique id, assigned once when the entity is created.
    pub uuid: String,
    /// three.js type name.
    #[serde(rename = "type")]
    pub kind: String,
}

impl SceneElement {
    /// Creates an element of `kind` with a freshly generated v4 uuid.
    pub fn fresh(kind: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            kind: kind.into(),
        }
    }
}

/// Axis-aligned box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxGeometry {
    /// Identity.
    #[serde(flatten)]
    pub element: SceneElement,
    /// Extent along X.
    pub width: f64,
    /// Extent along Y.
    pub height: f64,
    /// Extent along Z.
    pub depth: f64,
    /// Optional placement; folded into the object matrix, not sent.
    #[serde(skip)]
    pub position: Option<[f64; 3]>,
}

impl BoxGeometry {
    /// New box centred at the origin.
    pub fn new(width: f64, height: f64, depth: f64) -> Self {
        Self {
            element: SceneElement::fresh(BOX_GEOMETRY),
            width,
            height,
            depth,
            position: None,
        }
    }
}

/// Sphere.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SphereGeometry {
    /// Identity.
    #[serde(flatten)]
    pub element: SceneElement,
    /// Radius.
    pub radius: f64,
    /// Optional placement; folded into the object matrix, not sent.
    #[serde(skip)]
    pub position: Option<[f64; 3]>,
}

impl SphereGeometry {
    /// New sphere centred at the origin.
    pub fn new(radius: f64) -> Self {
        Self {
            element: SceneElement::fresh(SPHERE_GEOMETRY),
            radius,
            position: None,
        }
    }
}

/// Raw mesh file bytes, encoded as a binary blob rather than an integer list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MeshData(pub Vec<u8>);

impl Serialize for MeshData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for MeshData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MeshDataVisitor;

        impl<'de> Visitor<'de> for MeshDataVisitor {
            type Value = MeshData;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a binary blob or a list of bytes")
            }

            fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<MeshData, E> {
                Ok(MeshData(v.to_vec()))
            }

            fn visit_byte_buf<E: serde::de::Error>(self, v: Vec<u8>) -> Result<MeshData, E> {
                Ok(MeshData(v))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<MeshData, A::Error> {
                let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(byte) = seq.next_element::<u8>()? {
                    out.push(byte);
                }
                Ok(MeshData(out))
            }
        }

        deserializer.deserialize_bytes(MeshDataVisitor)
    }
}

/// Inline `data` attribute: raw bytes (msgpack `bin` or a byte list) or any
/// other structured value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InlineData {
    /// Byte payload.
    Bytes(MeshData),
    /// Anything else.
    Value(Value),
}

impl InlineData {
    fn into_value(self) -> Value {
        match self {
            InlineData::Bytes(MeshData(bytes)) => {
                Value::Array(bytes.into_iter().map(Value::from).collect())
            }
            InlineData::Value(value) => value,
        }
    }

    fn into_bytes(self) -> Result<Vec<u8>, SceneError> {
        match self {
            InlineData::Bytes(MeshData(bytes)) => Ok(bytes),
            InlineData::Value(value) => serde_json::from_value(value)
                .map_err(|e| SceneError::Validation(format!("mesh data: {e}"))),
        }
    }
}

/// Geometry attributes as they arrive on the bus. `data` is split out so a
/// msgpack binary blob survives decoding.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeometryAttributes {
    /// Mesh file bytes or buffer arrays.
    #[serde(default)]
    pub data: Option<InlineData>,
    /// Every other attribute.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Mesh loaded by the renderer from an inline file (`stl`, `obj`, `dae`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshGeometry {
    /// Identity.
    #[serde(flatten)]
    pub element: SceneElement,
    /// File format understood by the renderer.
    pub format: String,
    /// File contents.
    pub data: MeshData,
    /// Optional placement; folded into the object matrix, not sent.
    #[serde(skip)]
    pub position: Option<[f64; 3]>,
}

/// One typed array of a buffer geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferAttribute {
    /// Components per vertex.
    #[serde(rename = "itemSize")]
    pub item_size: u32,
    /// Typed-array name the renderer allocates.
    #[serde(rename = "type", default = "float32_array")]
    pub array_type: String,
    /// Flattened component data.
    pub array: Vec<f32>,
    /// Whether integer data is normalized on upload.
    #[serde(default)]
    pub normalized: bool,
}

fn float32_array() -> String {
    "Float32Array".to_owned()
}

impl BufferAttribute {
    /// Float attribute with `item_size` components per vertex.
    pub fn new(item_size: u32, array: Vec<f32>) -> Self {
        Self {
            item_size,
            array_type: float32_array(),
            array,
            normalized: false,
        }
    }

    /// Number of vertices described.
    pub fn count(&self) -> usize {
        if self.item_size == 0 {
            return 0;
        }
        self.array.len() / self.item_size as usize
    }

    fn validate(&self, name: &str) -> Result<(), SceneError> {
        if self.item_size == 0 || self.array.len() % self.item_size as usize != 0 {
            return Err(SceneError::Validation(format!(
                "{name} attribute length {} is not a multiple of item size {}",
                self.array.len(),
                self.item_size
            )));
        }
        Ok(())
    }
}

/// Vertex attributes of a buffer geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferAttributes {
    /// Vertex positions (required).
    pub position: BufferAttribute,
    /// Vertex normals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<BufferAttribute>,
    /// Texture coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv: Option<BufferAttribute>,
}

/// `data` block of a buffer geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferData {
    /// Attribute table.
    pub attributes: BufferAttributes,
}

/// Raw vertex data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferGeometry {
    /// Identity.
    #[serde(flatten)]
    pub element: SceneElement,
    /// Attribute arrays.
    pub data: BufferData,
}

impl BufferGeometry {
    /// Checks each attribute array against its item size and that normals and
    /// uvs describe as many vertices as the positions.
    pub fn validate(&self) -> Result<(), SceneError> {
        let attrs = &self.data.attributes;
        attrs.position.validate("position")?;
        let count = attrs.position.count();
        for (name, attr) in [("normal", &attrs.normal), ("uv", &attrs.uv)] {
            if let Some(attr) = attr {
                attr.validate(name)?;
                if attr.count() != count {
                    return Err(SceneError::Validation(format!(
                        "{name} describes {} vertices, position describes {count}",
                        attr.count()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Geometry whose type the relay does not model; attributes pass through.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericGeometry {
    /// Identity.
    #[serde(flatten)]
    pub element: SceneElement,
    /// Remaining attributes, forwarded as-is.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Closed set of geometry variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Geometry {
    /// Box primitive.
    Box(BoxGeometry),
    /// Sphere primitive.
    Sphere(SphereGeometry),
    /// Inline mesh file.
    Mesh(MeshGeometry),
    /// Raw vertex buffers.
    Buffer(BufferGeometry),
    /// Anything else, carried as an attribute map.
    Generic(GenericGeometry),
}

impl Geometry {
    /// Identity of the geometry.
    pub fn element(&self) -> &SceneElement {
        match self {
            Geometry::Box(g) => &g.element,
            Geometry::Sphere(g) => &g.element,
            Geometry::Mesh(g) => &g.element,
            Geometry::Buffer(g) => &g.element,
            Geometry::Generic(g) => &g.element,
        }
    }

    /// Short name used for default scene paths.
    pub fn label(&self) -> &'static str {
        match self {
            Geometry::Box(_) => "box",
            Geometry::Sphere(_) => "sphere",
            Geometry::Mesh(_) => "mesh",
            Geometry::Buffer(_) => "buffer",
            Geometry::Generic(_) => "generic",
        }
    }

    /// Object transform for this geometry: identity, or translation-only when
    /// the variant carries a position.
    pub fn matrix(&self) -> Mat4 {
        let position = match self {
            Geometry::Box(g) => g.position,
            Geometry::Sphere(g) => g.position,
            Geometry::Mesh(g) => g.position,
            Geometry::Buffer(_) => None,
            Geometry::Generic(g) => generic_position(&g.attributes),
        };
        match position {
            Some([x, y, z]) => Mat4::translation(x, y, z),
            None => Mat4::identity(),
        }
    }

    /// Decodes an attribute map into a typed variant.
    ///
    /// The type comes from `type`, then from the `shape` alias, then from
    /// field presence (`radius` ⇒ sphere, `width` ⇒ box). Unknown explicit
    /// types become [`Geometry::Generic`]. Any incoming `uuid` is replaced.
    pub fn from_attributes(mut attrs: Map<String, Value>) -> Result<Self, SceneError> {
        let data = attrs.remove("data").map(InlineData::Value);
        Self::decode(GeometryAttributes {
            data,
            attributes: attrs,
        })
    }

    /// Like [`Geometry::from_attributes`], for attributes decoded straight
    /// from a bus payload.
    pub fn decode(payload: GeometryAttributes) -> Result<Self, SceneError> {
        let GeometryAttributes {
            data,
            attributes: mut attrs,
        } = payload;
        let kind = resolve_kind(&attrs)
            .ok_or_else(|| SceneError::Validation("geometry type not found".into()))?;
        attrs.remove("uuid");
        attrs.remove("type");
        attrs.remove("shape");
        match kind.as_str() {
            BOX_GEOMETRY => Ok(Geometry::Box(BoxGeometry {
                element: SceneElement::fresh(BOX_GEOMETRY),
                width: dimension(&attrs, "width")?,
                height: dimension(&attrs, "height")?,
                depth: dimension(&attrs, "depth")?,
                position: position(&attrs)?,
            })),
            SPHERE_GEOMETRY => Ok(Geometry::Sphere(SphereGeometry {
                element: SceneElement::fresh(SPHERE_GEOMETRY),
                radius: dimension(&attrs, "radius")?,
                position: position(&attrs)?,
            })),
            MESH_FILE_GEOMETRY => {
                let format = attrs
                    .get("format")
                    .and_then(Value::as_str)
                    .ok_or_else(|| SceneError::Validation("mesh geometry needs `format`".into()))?
                    .to_owned();
                let data = data.map(InlineData::into_bytes).transpose()?.unwrap_or_default();
                Ok(Geometry::Mesh(MeshGeometry {
                    element: SceneElement::fresh(MESH_FILE_GEOMETRY),
                    format,
                    data: MeshData(data),
                    position: position(&attrs)?,
                }))
            }
            BUFFER_GEOMETRY => {
                let data = data.ok_or_else(|| {
                    SceneError::Validation("buffer geometry needs `data`".into())
                })?;
                let data: BufferData = serde_json::from_value(data.into_value())
                    .map_err(|e| SceneError::Validation(format!("buffer data: {e}")))?;
                let geom = BufferGeometry {
                    element: SceneElement::fresh(BUFFER_GEOMETRY),
                    data,
                };
                geom.validate()?;
                Ok(Geometry::Buffer(geom))
            }
            _ => {
                if let Some(data) = data {
                    attrs.insert("data".to_owned(), data.into_value());
                }
                Ok(Geometry::Generic(GenericGeometry {
                    element: SceneElement::fresh(kind),
                    attributes: attrs,
                }))
            }
        }
    }
}

impl From<BoxGeometry> for Geometry {
    fn from(value: BoxGeometry) -> Self {
        Geometry::Box(value)
    }
}

impl From<SphereGeometry> for Geometry {
    fn from(value: SphereGeometry) -> Self {
        Geometry::Sphere(value)
    }
}

fn resolve_kind(attrs: &Map<String, Value>) -> Option<String> {
    if let Some(kind) = attrs.get("type").and_then(Value::as_str) {
        return Some(kind.to_owned());
    }
    if let Some(shape) = attrs.get("shape").and_then(Value::as_str) {
        let kind = match shape.to_ascii_lowercase().as_str() {
            "box" | "cube" => BOX_GEOMETRY.to_owned(),
            "sphere" => SPHERE_GEOMETRY.to_owned(),
            "mesh" => MESH_FILE_GEOMETRY.to_owned(),
            "buffer" => BUFFER_GEOMETRY.to_owned(),
            _ => shape.to_owned(),
        };
        return Some(kind);
    }
    if attrs.contains_key("radius") {
        Some(SPHERE_GEOMETRY.to_owned())
    } else if attrs.contains_key("width") {
        Some(BOX_GEOMETRY.to_owned())
    } else {
        None
    }
}

fn dimension(attrs: &Map<String, Value>, key: &str) -> Result<f64, SceneError> {
    let value = attrs
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| SceneError::Validation(format!("missing numeric field `{key}`")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(SceneError::Validation(format!(
            "`{key}` must be a finite non-negative number, got {value}"
        )));
    }
    Ok(value)
}

fn position(attrs: &Map<String, Value>) -> Result<Option<[f64; 3]>, SceneError> {
    let Some(value) = attrs.get("position") else {
        return Ok(None);
    };
    let coords: Vec<f64> = serde_json::from_value(value.clone())
        .map_err(|e| SceneError::Validation(format!("position: {e}")))?;
    <[f64; 3]>::try_from(coords.as_slice())
        .map(Some)
        .map_err(|_| SceneError::Validation(format!("position expects 3 values, got {}", coords.len())))
}

// Generic maps fall back to loose `x`/`y`/`z` keys, defaulting each to zero.
fn generic_position(attrs: &Map<String, Value>) -> Option<[f64; 3]> {
    if let Ok(Some(p)) = position(attrs) {
        return Some(p);
    }
    let axis = |k: &str| attrs.get(k).and_then(Value::as_f64);
    match (axis("x"), axis("y"), axis("z")) {
        (None, None, None) => None,
        (x, y, z) => Some([x.unwrap_or(0.0), y.unwrap_or(0.0), z.unwrap_or(0.0)]),
    }
}
