// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Command envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scene::Scene;

/// Playback settings for `set_animation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationOptions {
    /// Start playing immediately.
    #[serde(default = "default_play")]
    pub play: bool,
    /// Number of loops.
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
}

fn default_play() -> bool {
    true
}

fn default_repetitions() -> u32 {
    1
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            play: default_play(),
            repetitions: default_repetitions(),
        }
    }
}

/// Asset the renderer loads from its own static resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResource {
    /// Resource file name on the renderer host.
    pub resource_name: String,
    /// Scene path to attach it under.
    pub path: String,
    /// Placement along X.
    #[serde(default)]
    pub x: f64,
    /// Placement along Y.
    #[serde(default)]
    pub y: f64,
    /// Placement along Z.
    #[serde(default)]
    pub z: f64,
}

impl ServerResource {
    /// Parses the whitespace-separated `name path x y z` text form.
    pub fn parse_text(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let resource_name = parts.next()?.to_owned();
        let path = parts.next()?.to_owned();
        let mut coord = || parts.next().and_then(|p| p.parse::<f64>().ok());
        let (x, y, z) = (coord()?, coord()?, coord()?);
        Some(Self {
            resource_name,
            path,
            x,
            y,
            z,
        })
    }
}

/// Discriminator of a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Create or replace an object.
    SetObject,
    /// Replace an object's transform.
    SetTransform,
    /// Remove a subtree.
    Delete,
    /// Set one property on a node.
    SetProperty,
    /// Attach animation clips.
    SetAnimation,
    /// Ask the renderer for a screenshot.
    CaptureImage,
    /// Load an asset hosted by the renderer.
    SetObjectFromServer,
}

impl CommandKind {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::SetObject => "set_object",
            CommandKind::SetTransform => "set_transform",
            CommandKind::Delete => "delete",
            CommandKind::SetProperty => "set_property",
            CommandKind::SetAnimation => "set_animation",
            CommandKind::CaptureImage => "capture_image",
            CommandKind::SetObjectFromServer => "set_object_from_server",
        }
    }
}

/// A renderer command: `{type, path, ...payload}` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Create or replace the object at `path`.
    SetObject {
        /// Scene path.
        path: String,
        /// Scene to attach.
        object: Scene,
    },
    /// Replace the transform at `path`.
    SetTransform {
        /// Scene path.
        path: String,
        /// Row-major homogeneous matrix.
        matrix: [f64; 16],
    },
    /// Remove the subtree rooted at `path`.
    Delete {
        /// Scene path.
        path: String,
    },
    /// Set `property` on the node at `path`.
    SetProperty {
        /// Scene path.
        path: String,
        /// Property name, e.g. `visible`.
        property: String,
        /// New value.
        value: Value,
    },
    /// Attach animation clips.
    SetAnimation {
        /// Scene path.
        path: String,
        /// Clip payload, forwarded as-is.
        animations: Value,
        /// Playback settings.
        options: AnimationOptions,
    },
    /// Request a screenshot.
    CaptureImage {
        /// Scene path (usually empty).
        path: String,
        /// Horizontal resolution.
        xres: u32,
        /// Vertical resolution.
        yres: u32,
    },
    /// Load a renderer-hosted asset.
    SetObjectFromServer {
        /// Scene path.
        path: String,
        /// Asset reference.
        object: ServerResource,
    },
}

impl Command {
    /// Discriminator.
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::SetObject { .. } => CommandKind::SetObject,
            Command::SetTransform { .. } => CommandKind::SetTransform,
            Command::Delete { .. } => CommandKind::Delete,
            Command::SetProperty { .. } => CommandKind::SetProperty,
            Command::SetAnimation { .. } => CommandKind::SetAnimation,
            Command::CaptureImage { .. } => CommandKind::CaptureImage,
            Command::SetObjectFromServer { .. } => CommandKind::SetObjectFromServer,
        }
    }

    /// Target scene path.
    pub fn path(&self) -> &str {
        match self {
            Command::SetObject { path, .. }
            | Command::SetTransform { path, .. }
            | Command::Delete { path }
            | Command::SetProperty { path, .. }
            | Command::SetAnimation { path, .. }
            | Command::CaptureImage { path, .. }
            | Command::SetObjectFromServer { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_is_internally_tagged() {
        let cmd = Command::SetProperty {
            path: "/robot".into(),
            property: "visible".into(),
            value: json!(false),
        };
        let v = serde_json::to_value(&cmd).unwrap();
        assert_eq!(
            v,
            json!({"type": "set_property", "path": "/robot", "property": "visible", "value": false})
        );
        assert_eq!(cmd.kind().as_str(), "set_property");
        assert_eq!(cmd.path(), "/robot");
    }

    #[test]
    fn kind_names_match_serde_tags() {
        let cmd = Command::CaptureImage {
            path: String::new(),
            xres: 640,
            yres: 480,
        };
        let v = serde_json::to_value(&cmd).unwrap();
        assert_eq!(v["type"], json!(cmd.kind().as_str()));
        let tag: CommandKind = serde_json::from_value(v["type"].clone()).unwrap();
        assert_eq!(tag, CommandKind::CaptureImage);
    }

    #[test]
    fn resource_text_form_parses() {
        let r = ServerResource::parse_text("robot.dae /robots/r1 1 2.5 -3").unwrap();
        assert_eq!(r.resource_name, "robot.dae");
        assert_eq!(r.path, "/robots/r1");
        assert_eq!((r.x, r.y, r.z), (1.0, 2.5, -3.0));
        assert!(ServerResource::parse_text("robot.dae /robots/r1 1 2").is_none());
        assert!(ServerResource::parse_text("robot.dae /robots/r1 a b c").is_none());
    }
}
