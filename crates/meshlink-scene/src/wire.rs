// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire codec adapter.
//!
//! Outbound commands are msgpack maps with named fields by default, which is
//! what meshcat-style viewers decode. JSON is available for debugging.
//! Inbound payloads may be either; the first significant byte decides.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::SceneError;

/// Encoding used for outbound commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// msgpack with field names.
    #[default]
    MsgPack,
    /// UTF-8 JSON.
    Json,
}

impl WireFormat {
    /// Serializes `value` in this format.
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> Result<Vec<u8>, SceneError> {
        match self {
            WireFormat::MsgPack => {
                rmp_serde::to_vec_named(value).map_err(|e| SceneError::Encode(e.to_string()))
            }
            WireFormat::Json => {
                serde_json::to_vec(value).map_err(|e| SceneError::Encode(e.to_string()))
            }
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WireFormat::MsgPack => "msgpack",
            WireFormat::Json => "json",
        })
    }
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "msgpack" | "messagepack" => Ok(WireFormat::MsgPack),
            "json" => Ok(WireFormat::Json),
            other => Err(format!("unknown wire format `{other}` (expected msgpack or json)")),
        }
    }
}

/// Encodes a command for delivery to renderers.
pub fn encode_command(command: &Command, format: WireFormat) -> Result<Vec<u8>, SceneError> {
    format.encode(command)
}

/// True when `bytes` look like a JSON document rather than msgpack.
pub fn looks_like_json(bytes: &[u8]) -> bool {
    matches!(
        bytes.iter().find(|b| !b.is_ascii_whitespace()),
        Some(b'{' | b'[' | b'"')
    )
}

/// Decodes an inbound payload, sniffing JSON vs msgpack.
pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SceneError> {
    if bytes.is_empty() {
        return Err(SceneError::Decode("empty payload".into()));
    }
    if looks_like_json(bytes) {
        serde_json::from_slice(bytes).map_err(|e| SceneError::Decode(format!("json: {e}")))
    } else {
        rmp_serde::from_slice(bytes).map_err(|e| SceneError::Decode(format!("msgpack: {e}")))
    }
}
