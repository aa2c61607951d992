// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Subject dispatch.
//!
//! | subject                  | result                            |
//! |--------------------------|-----------------------------------|
//! | `<ns>.url`               | payload forwarded verbatim        |
//! | `<ns>.objects`           | `set_object`                      |
//! | `<ns>.resources`         | `set_object_from_server`          |
//! | `<ns>.transformations.>` | `set_transform`                   |
//! | `<ns>.properties.>`      | `set_property`                    |
//! | `<ns>.animations.>`      | `set_animation`                   |
//! | `<ns>.capture`           | `capture_image`                   |
//! | `<ns>.mission.>`         | mission for the pool              |
//! | `<ns>.delete[.>]`        | `delete`                          |

use bytes::Bytes;
use meshlink_bus::subject::suffix_path;
use meshlink_missions::{MissionError, MissionRequest, MissionWork};
use meshlink_scene::wire::{decode_payload, encode_command, looks_like_json};
use meshlink_scene::{
    AnimationOptions, Command, Geometry, GeometryAttributes, SceneBuilder, SceneError,
    ServerResource, TransformationCommand, WireFormat,
};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "meshcat";

/// Why a message was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Payload was malformed or could not be encoded.
    #[error(transparent)]
    Scene(#[from] SceneError),
    /// Mission parameters were rejected.
    #[error(transparent)]
    Mission(#[from] MissionError),
    /// No route for this subject.
    #[error("no route for subject `{0}`")]
    UnknownSubject(String),
}

/// What to do with a routed message.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// Bytes to broadcast to every session.
    Broadcast(Bytes),
    /// Mission to queue.
    Mission(MissionWork),
}

#[derive(Deserialize)]
struct PropertyPayload {
    property: String,
    value: Value,
}

#[derive(Deserialize)]
struct AnimationPayload {
    animations: Value,
    #[serde(default)]
    options: AnimationOptions,
}

#[derive(Deserialize)]
struct CapturePayload {
    #[serde(default = "default_xres")]
    xres: u32,
    #[serde(default = "default_yres")]
    yres: u32,
}

fn default_xres() -> u32 {
    1920
}

fn default_yres() -> u32 {
    1080
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DeletePayload {
    Path(String),
    Object { path: String },
}

/// Maps bus messages to renderer output.
#[derive(Debug, Clone)]
pub struct Router {
    namespace: String,
    builder: SceneBuilder,
    format: WireFormat,
}

impl Router {
    /// Router for subjects under `namespace`.
    pub fn new(namespace: impl Into<String>, builder: SceneBuilder, format: WireFormat) -> Self {
        Self {
            namespace: namespace.into(),
            builder,
            format,
        }
    }

    /// Namespace prefix.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Pattern covering every routed subject.
    pub fn subscription(&self) -> String {
        format!("{}.>", self.namespace)
    }

    /// Routes one message.
    pub fn route(&self, subject: &str, payload: &[u8]) -> Result<Routed, RouteError> {
        let unknown = || RouteError::UnknownSubject(subject.to_owned());
        let rest = subject
            .strip_prefix(self.namespace.as_str())
            .and_then(|r| r.strip_prefix('.'))
            .ok_or_else(unknown)?;
        let (head, tail) = match rest.split_once('.') {
            Some((head, tail)) => (head, Some(tail)),
            None => (rest, None),
        };
        // Scene paths are the subject tokens after `<ns>.<head>`.
        let skip = self.namespace.split('.').count() + 1;
        let path = || suffix_path(subject, skip);

        let command = match (head, tail) {
            ("url", None) => return Ok(Routed::Broadcast(Bytes::copy_from_slice(payload))),
            ("mission", Some(target)) => {
                let request: MissionRequest = if payload.iter().all(u8::is_ascii_whitespace) {
                    MissionRequest::default()
                } else {
                    decode_payload(payload)?
                };
                let publish_to = format!("{}.transformations.{target}", self.namespace);
                return Ok(Routed::Mission(request.into_work(publish_to)?));
            }
            ("objects", None) => self.set_object(payload)?,
            ("resources", None) => {
                let object = decode_resource(payload)?;
                Command::SetObjectFromServer {
                    path: object.path.clone(),
                    object,
                }
            }
            ("transformations", Some(_)) => {
                let transform: TransformationCommand = decode_payload(payload)?;
                Command::SetTransform {
                    path: path(),
                    matrix: transform.resolve()?.to_array(),
                }
            }
            ("properties", Some(_)) => {
                let p: PropertyPayload = decode_payload(payload)?;
                Command::SetProperty {
                    path: path(),
                    property: p.property,
                    value: p.value,
                }
            }
            ("animations", Some(_)) => {
                let a: AnimationPayload = decode_payload(payload)?;
                Command::SetAnimation {
                    path: path(),
                    animations: a.animations,
                    options: a.options,
                }
            }
            ("capture", None) => {
                let c: CapturePayload = if payload.is_empty() {
                    CapturePayload {
                        xres: default_xres(),
                        yres: default_yres(),
                    }
                } else {
                    decode_payload(payload)?
                };
                Command::CaptureImage {
                    path: String::new(),
                    xres: c.xres,
                    yres: c.yres,
                }
            }
            ("delete", None) => Command::Delete {
                path: decode_delete_path(payload)?,
            },
            ("delete", Some(_)) => Command::Delete { path: path() },
            _ => return Err(unknown()),
        };
        Ok(Routed::Broadcast(Bytes::from(encode_command(&command, self.format)?)))
    }

    fn set_object(&self, payload: &[u8]) -> Result<Command, RouteError> {
        let mut attrs: GeometryAttributes = decode_payload(payload)?;
        let path = match attrs.attributes.remove("path") {
            Some(Value::String(path)) if !path.is_empty() => Some(path),
            _ => None,
        };
        let geometry = Geometry::decode(attrs)?;
        let path = path.unwrap_or_else(|| format!("environment/{}_geometries", geometry.label()));
        let object = self.builder.objectify(geometry)?;
        Ok(Command::SetObject { path, object })
    }
}

fn decode_resource(payload: &[u8]) -> Result<ServerResource, SceneError> {
    let text = match std::str::from_utf8(payload) {
        Ok(text) if !looks_like_json(payload) => text,
        _ => return decode_payload(payload),
    };
    ServerResource::parse_text(text).ok_or_else(|| {
        SceneError::Validation(format!("expected `name path x y z`, got `{}`", text.trim()))
    })
}

// Plain text, or a JSON/msgpack string or `{path}` map.
fn decode_delete_path(payload: &[u8]) -> Result<String, SceneError> {
    let path = match std::str::from_utf8(payload) {
        Ok(text) if !looks_like_json(payload) => text.trim().to_owned(),
        _ => match decode_payload::<DeletePayload>(payload)? {
            DeletePayload::Path(path) | DeletePayload::Object { path } => path,
        },
    };
    if path.is_empty() {
        return Err(SceneError::Validation("delete needs a non-empty path".into()));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlink_missions::MissionKind;
    use serde_json::json;

    fn router() -> Router {
        Router::new(DEFAULT_NAMESPACE, SceneBuilder::default(), WireFormat::Json)
    }

    fn broadcast_json(routed: Routed) -> Value {
        match routed {
            Routed::Broadcast(bytes) => serde_json::from_slice(&bytes).unwrap(),
            other => panic!("expected broadcast, got {other:?}"),
        }
    }

    #[test]
    fn url_is_forwarded_verbatim() {
        let routed = router().route("meshcat.url", b"\x01\x02raw").unwrap();
        assert_eq!(routed, Routed::Broadcast(Bytes::from_static(b"\x01\x02raw")));
    }

    #[test]
    fn transformation_suffix_becomes_path() {
        let routed = router()
            .route("meshcat.transformations.drone.arm", br#"{"translation":[1,2,3]}"#)
            .unwrap();
        let v = broadcast_json(routed);
        assert_eq!(v["type"], "set_transform");
        assert_eq!(v["path"], "drone/arm");
        assert_eq!(v["matrix"][3], 1.0);
        assert_eq!(v["matrix"][7], 2.0);
        assert_eq!(v["matrix"][11], 3.0);
    }

    #[test]
    fn bad_quaternion_is_dropped() {
        let err = router()
            .route("meshcat.transformations.x", br#"{"rotation":[0,0,0,3]}"#)
            .unwrap_err();
        assert!(matches!(err, RouteError::Scene(SceneError::Validation(_))));
    }

    #[test]
    fn objects_use_default_or_explicit_path() {
        let v = broadcast_json(router().route("meshcat.objects", br#"{"radius":1}"#).unwrap());
        assert_eq!(v["type"], "set_object");
        assert_eq!(v["path"], "environment/sphere_geometries");

        let v = broadcast_json(
            router()
                .route("meshcat.objects", br#"{"width":1,"height":1,"depth":1,"path":"props/crate"}"#)
                .unwrap(),
        );
        assert_eq!(v["path"], "props/crate");
        assert!(v["object"]["geometries"][0].get("path").is_none());
    }

    #[test]
    fn msgpack_mesh_keeps_binary_data() {
        #[derive(serde::Serialize)]
        struct Mesh {
            #[serde(rename = "type")]
            kind: &'static str,
            format: &'static str,
            data: meshlink_scene::MeshData,
        }
        let packed = rmp_serde::to_vec_named(&Mesh {
            kind: meshlink_scene::MESH_FILE_GEOMETRY,
            format: "stl",
            data: meshlink_scene::MeshData(vec![1, 2, 3]),
        })
        .unwrap();
        let v = broadcast_json(router().route("meshcat.objects", &packed).unwrap());
        assert_eq!(v["type"], "set_object");
        assert_eq!(v["path"], "environment/mesh_geometries");
        let geometry = &v["object"]["geometries"][0];
        assert_eq!(geometry["format"], "stl");
        assert_eq!(geometry["data"], json!([1, 2, 3]));
    }

    #[test]
    fn objects_without_type_are_rejected() {
        let err = router().route("meshcat.objects", br#"{"color":1}"#).unwrap_err();
        assert_eq!(
            err,
            RouteError::Scene(SceneError::Validation("geometry type not found".into()))
        );
    }

    #[test]
    fn resources_accept_text_and_json() {
        let v = broadcast_json(
            router()
                .route("meshcat.resources", b"crate.dae props/crate 1 2 3")
                .unwrap(),
        );
        assert_eq!(v["type"], "set_object_from_server");
        assert_eq!(v["path"], "props/crate");
        assert_eq!(v["object"]["resource_name"], "crate.dae");
        assert_eq!(v["object"]["z"], 3.0);

        let v = broadcast_json(
            router()
                .route(
                    "meshcat.resources",
                    br#"{"resource_name":"a.stl","path":"p","x":0,"y":0,"z":0}"#,
                )
                .unwrap(),
        );
        assert_eq!(v["object"]["resource_name"], "a.stl");
        assert!(router().route("meshcat.resources", b"only two").is_err());
    }

    #[test]
    fn properties_animations_and_capture() {
        let v = broadcast_json(
            router()
                .route("meshcat.properties.drone", br#"{"property":"visible","value":false}"#)
                .unwrap(),
        );
        assert_eq!(v, json!({"type":"set_property","path":"drone","property":"visible","value":false}));

        let v = broadcast_json(
            router()
                .route("meshcat.animations.drone", br#"{"animations":[]}"#)
                .unwrap(),
        );
        assert_eq!(v["options"], json!({"play": true, "repetitions": 1}));

        let v = broadcast_json(router().route("meshcat.capture", br#"{"xres":640}"#).unwrap());
        assert_eq!((v["xres"].as_u64(), v["yres"].as_u64()), (Some(640), Some(1080)));
    }

    #[test]
    fn delete_by_payload_or_suffix() {
        for (subject, payload) in [
            ("meshcat.delete", &b"robots/r1"[..]),
            ("meshcat.delete", &br#""robots/r1""#[..]),
            ("meshcat.delete", &br#"{"path":"robots/r1"}"#[..]),
            ("meshcat.delete.robots.r1", &b""[..]),
        ] {
            let v = broadcast_json(router().route(subject, payload).unwrap());
            assert_eq!(v, json!({"type": "delete", "path": "robots/r1"}), "{subject}");
        }
        assert!(router().route("meshcat.delete", b"   ").is_err());
    }

    #[test]
    fn mission_targets_transformations_subject() {
        let routed = router().route("meshcat.mission.drone", b"").unwrap();
        let Routed::Mission(work) = routed else {
            panic!("expected mission");
        };
        assert_eq!(work.path, "meshcat.transformations.drone");
        assert_eq!(work.kind, MissionKind::Orbit);

        let routed = router()
            .route("meshcat.mission.drone", br#"{"waypoints":[[0,0,1]]}"#)
            .unwrap();
        assert!(matches!(routed, Routed::Mission(MissionWork { kind: MissionKind::Waypoints(_), .. })));
        for bad in [
            &br#"{"angular_rate":0}"#[..],
            br#"{"radius":-2}"#,
            br#"{"angular_rate":1e17}"#,
        ] {
            assert!(matches!(
                router().route("meshcat.mission.drone", bad),
                Err(RouteError::Mission(MissionError::Validation(_)))
            ));
        }
    }

    #[test]
    fn foreign_and_unknown_subjects() {
        assert!(matches!(
            router().route("other.objects", b"{}"),
            Err(RouteError::UnknownSubject(_))
        ));
        assert!(matches!(
            router().route("meshcatx.objects", b"{}"),
            Err(RouteError::UnknownSubject(_))
        ));
        assert!(matches!(
            router().route("meshcat.transformations", b"{}"),
            Err(RouteError::UnknownSubject(_))
        ));
        assert!(matches!(
            router().route("meshcat.bogus", b"{}"),
            Err(RouteError::UnknownSubject(_))
        ));
    }
}
