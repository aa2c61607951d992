// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Command line, environment and persisted preferences.
//!
//! Precedence: CLI flag or environment variable, then the `relay` entry in
//! the preferences store, then built-in defaults.

use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use meshlink_bus::subject;
use meshlink_config::{ConfigService, FsConfigStore};
use meshlink_missions::PoolConfig;
use meshlink_scene::{LambertMaterial, SceneConfig, WireFormat, DEFAULT_MATERIAL_UUID};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::router::DEFAULT_NAMESPACE;
use crate::session::SessionConfig;

/// Preferences key.
pub const PREFS_KEY: &str = "relay";
/// Bus used when nothing is configured.
pub const DEFAULT_BUS_URL: &str = "nats://127.0.0.1:4222";

/// Settings that survive restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayPrefs {
    /// WebSocket listener.
    pub listen: SocketAddr,
    /// Subject namespace.
    pub namespace: String,
    /// Mission workers.
    pub workers: usize,
    /// Pending mission slots.
    pub queue_capacity: usize,
    /// Per-session outbox size.
    pub session_buffer: usize,
    /// Outbound command encoding.
    pub wire_format: WireFormat,
    /// Uuid of the material attached to created objects.
    pub default_material_uuid: String,
}

impl Default for RelayPrefs {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 7000)),
            namespace: DEFAULT_NAMESPACE.to_owned(),
            workers: 4,
            queue_capacity: 16,
            session_buffer: 256,
            wire_format: WireFormat::MsgPack,
            default_material_uuid: DEFAULT_MATERIAL_UUID.to_owned(),
        }
    }
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Relays bus scene commands to WebSocket renderers")]
/// Command-line options; each also reads a `MESHLINK_*` variable.
pub struct Args {
    /// Bus connection string: nats://host:port, or `local` for an in-process bus
    #[arg(long, env = "MESHLINK_BUS_URL", default_value = DEFAULT_BUS_URL)]
    pub bus_url: String,
    /// WebSocket listener (e.g. 0.0.0.0:7000)
    #[arg(long, env = "MESHLINK_LISTEN")]
    pub listen: Option<SocketAddr>,
    /// Subject namespace
    #[arg(long, env = "MESHLINK_NAMESPACE")]
    pub namespace: Option<String>,
    /// Mission workers
    #[arg(long, env = "MESHLINK_WORKERS")]
    pub workers: Option<usize>,
    /// Pending mission slots
    #[arg(long, env = "MESHLINK_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,
    /// Per-session outbox size; a full outbox disconnects the session
    #[arg(long, env = "MESHLINK_SESSION_BUFFER")]
    pub session_buffer: Option<usize>,
    /// Outbound encoding: msgpack or json
    #[arg(long, env = "MESHLINK_WIRE_FORMAT")]
    pub wire_format: Option<WireFormat>,
    /// Allowed Origin values (repeatable). If none provided, all origins are accepted.
    #[arg(long, env = "MESHLINK_ALLOW_ORIGIN", value_delimiter = ',')]
    pub allow_origin: Vec<String>,
    /// TLS certificate (PEM). If provided, key must also be provided.
    #[arg(long, env = "MESHLINK_TLS_CERT")]
    pub tls_cert: Option<PathBuf>,
    /// TLS private key (PEM). If provided, cert must also be provided.
    #[arg(long, env = "MESHLINK_TLS_KEY")]
    pub tls_key: Option<PathBuf>,
    /// Neither read nor write the preferences file
    #[arg(long)]
    pub no_prefs: bool,
}

/// Rejected settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// Only one of cert/key was given.
    #[error("must provide both --tls-cert and --tls-key or neither")]
    TlsPair,
    /// Namespace is empty or contains wildcards.
    #[error("invalid namespace `{0}`")]
    Namespace(String),
}

/// PEM pair for the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    /// Certificate chain.
    pub cert: PathBuf,
    /// Private key.
    pub key: PathBuf,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Bus connection string.
    pub bus_url: String,
    /// WebSocket listener.
    pub listen: SocketAddr,
    /// Subject namespace.
    pub namespace: String,
    /// Outbound encoding.
    pub format: WireFormat,
    /// Mission pool.
    pub pool: PoolConfig,
    /// Scene defaults.
    pub scene: SceneConfig,
    /// WebSocket sessions.
    pub session: SessionConfig,
    /// TLS, when enabled.
    pub tls: Option<TlsPaths>,
}

impl RelaySettings {
    /// Merges CLI/env values over `prefs`.
    pub fn resolve(args: Args, prefs: RelayPrefs) -> Result<Self, SettingsError> {
        let namespace = args.namespace.unwrap_or(prefs.namespace);
        if subject::validate(&namespace, false).is_err() {
            return Err(SettingsError::Namespace(namespace));
        }
        let tls = match (args.tls_cert, args.tls_key) {
            (Some(cert), Some(key)) => Some(TlsPaths { cert, key }),
            (None, None) => None,
            _ => return Err(SettingsError::TlsPair),
        };
        let format = args.wire_format.unwrap_or(prefs.wire_format);
        let pool = PoolConfig {
            workers: args.workers.unwrap_or(prefs.workers),
            capacity: args.queue_capacity.unwrap_or(prefs.queue_capacity),
            format,
            ..PoolConfig::default()
        };
        let scene = SceneConfig {
            default_material: LambertMaterial {
                uuid: prefs.default_material_uuid,
                ..LambertMaterial::default()
            },
        };
        let allow_origins: HashSet<String> = args.allow_origin.into_iter().collect();
        let session = SessionConfig {
            buffer: args.session_buffer.unwrap_or(prefs.session_buffer),
            allow_origins: (!allow_origins.is_empty()).then_some(allow_origins),
            ping_interval: Duration::from_secs(30),
        };
        Ok(Self {
            bus_url: args.bus_url,
            listen: args.listen.unwrap_or(prefs.listen),
            namespace,
            format,
            pool,
            scene,
            session,
            tls,
        })
    }
}

/// Loads preferences best-effort, writing defaults the first time.
pub fn load_prefs(enabled: bool) -> RelayPrefs {
    if !enabled {
        return RelayPrefs::default();
    }
    match FsConfigStore::new().map(ConfigService::new) {
        Ok(service) => service.load_or_init(PREFS_KEY),
        Err(err) => {
            warn!(%err, "preferences unavailable; using defaults");
            RelayPrefs::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["meshlink-relay"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn cli_overrides_prefs() {
        let prefs = RelayPrefs {
            workers: 2,
            namespace: "sim".into(),
            ..RelayPrefs::default()
        };
        let settings = RelaySettings::resolve(
            args(&["--workers", "9", "--wire-format", "json", "--listen", "127.0.0.1:9000"]),
            prefs,
        )
        .unwrap();
        assert_eq!(settings.pool.workers, 9);
        assert_eq!(settings.namespace, "sim");
        assert_eq!(settings.format, WireFormat::Json);
        assert_eq!(settings.pool.format, WireFormat::Json);
        assert_eq!(settings.listen, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert!(settings.session.allow_origins.is_none());
    }

    #[test]
    fn tls_requires_both_files() {
        let err = RelaySettings::resolve(args(&["--tls-cert", "c.pem"]), RelayPrefs::default())
            .unwrap_err();
        assert_eq!(err, SettingsError::TlsPair);
    }

    #[test]
    fn wildcard_namespace_is_rejected() {
        let err = RelaySettings::resolve(args(&["--namespace", "a.>"]), RelayPrefs::default())
            .unwrap_err();
        assert!(matches!(err, SettingsError::Namespace(_)));
    }

    #[test]
    fn origins_and_material_flow_through() {
        let prefs = RelayPrefs {
            default_material_uuid: "mat-1".into(),
            ..RelayPrefs::default()
        };
        let settings = RelaySettings::resolve(
            args(&["--allow-origin", "http://a", "--allow-origin", "http://b"]),
            prefs,
        )
        .unwrap();
        assert_eq!(settings.scene.default_material.uuid, "mat-1");
        assert_eq!(settings.session.allow_origins.map(|o| o.len()), Some(2));
    }

    #[test]
    fn partial_prefs_fill_from_defaults() {
        let prefs: RelayPrefs = serde_json::from_str(r#"{"workers": 1}"#).unwrap();
        assert_eq!(prefs.workers, 1);
        assert_eq!(prefs.namespace, DEFAULT_NAMESPACE);
    }
}
