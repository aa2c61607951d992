// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Preferences storage for meshlink.
//!
//! [`ConfigStore`] moves raw blobs by key; [`ConfigService`] layers JSON on
//! top. [`FsConfigStore`] keeps one `<key>.json` per key in the platform
//! config directory, and [`MemoryConfigStore`] backs tests.

mod fs;
mod service;

pub use fs::FsConfigStore;
pub use service::{ConfigError, ConfigService, ConfigStore, MemoryConfigStore};
