// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Layered configuration: defaults, then the TOML file, then `XCODE_ARCH_*`
//! environment variables. Nested keys use `__` in variable names, e.g.
//! `XCODE_ARCH_RESOLVE__VOLUMES_ROOT=/mnt`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use xa_logging::LoggingConfig;

pub const ENV_PREFIX: &str = "XCODE_ARCH";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub decode: DecodeConfig,
    pub resolve: ResolveConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Accept records whose checksum does not match
    pub lenient_checksum: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Consult the filesystem when resolving
    pub verify: bool,
    pub volumes_root: PathBuf,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            verify: true,
            volumes_root: PathBuf::from("/Volumes"),
        }
    }
}

/// `<config dir>/xcode-arch/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("xcode-arch").join("config.toml"))
}

impl CliConfig {
    /// Load configuration; an explicit file must exist, the default one may not
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = match explicit {
            Some(path) => Some((path.to_path_buf(), true)),
            None => default_config_path().map(|path| (path, false)),
        };
        Self::load_from(file.as_ref().map(|(path, required)| (path.as_path(), *required)), true)
    }

    /// Load from an optional `(path, required)` file, optionally overlaying the environment
    pub fn load_from(file: Option<(&Path, bool)>, with_env: bool) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some((path, required)) = file {
            tracing::debug!(path = %path.display(), required, "loading config file");
            builder = builder.add_source(
                config::File::new(&path.to_string_lossy(), config::FileFormat::Toml)
                    .required(required),
            );
        }
        if with_env {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let built = builder.build().context("reading configuration")?;
        built.try_deserialize().context("invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert!(!config.decode.lenient_checksum);
        assert!(config.resolve.verify);
        assert_eq!(config.resolve.volumes_root, PathBuf::from("/Volumes"));
    }

    #[test]
    fn test_default_path_is_namespaced() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("xcode-arch/config.toml"));
        }
    }
}
