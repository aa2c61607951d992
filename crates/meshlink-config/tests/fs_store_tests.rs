// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]

use meshlink_config::{ConfigError, ConfigService, ConfigStore, FsConfigStore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Prefs {
    listen: String,
    queue_capacity: usize,
}

#[test]
fn save_and_load_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsConfigStore::at(dir.path().join("nested")).unwrap();
    let svc = ConfigService::new(store);

    let prefs = Prefs {
        listen: "0.0.0.0:7000".into(),
        queue_capacity: 32,
    };
    svc.save("relay", &prefs).unwrap();
    assert!(dir.path().join("nested/relay.json").exists());
    assert!(!dir.path().join("nested/relay.json.tmp").exists());
    assert_eq!(svc.load::<Prefs>("relay").unwrap(), Some(prefs));
}

#[test]
fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsConfigStore::at(dir.path()).unwrap();
    assert!(matches!(store.load_raw("absent"), Err(ConfigError::NotFound)));
}

#[test]
fn keys_cannot_escape_the_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsConfigStore::at(dir.path()).unwrap();
    assert!(matches!(
        store.save_raw("../evil", b"{}"),
        Err(ConfigError::Other(_))
    ));
    assert!(matches!(store.load_raw(""), Err(ConfigError::Other(_))));
}

#[test]
fn defaults_written_on_first_load() {
    let dir = tempfile::tempdir().unwrap();
    let svc = ConfigService::new(FsConfigStore::at(dir.path()).unwrap());
    let prefs: Prefs = svc.load_or_init("relay");
    assert_eq!(prefs, Prefs::default());
    assert!(dir.path().join("relay.json").exists());
}
