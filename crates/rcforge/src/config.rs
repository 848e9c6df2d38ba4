// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Configuration: built-in defaults, `rcforge.yaml`, environment, CLI flags.
//!
//! Later sources win. The user directory itself cannot be set from the file
//! since that is where the file is looked up.
//!
//! ```yaml
//! # ~/.config/rcforge/rcforge.yaml
//! api: rcforge/v0
//! system_dir: ~/.local/share/rcforge
//! scripts_dir: rc-scripts
//! continue_on_error: true
//! timing: false
//! tracked_files:
//!   - ~/.bashrc
//!   - ~/.zshrc
//! extra_hosts:
//!   - build-box
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    ChecksumStore, IncludeResolver, Loader, CHECKSUM_STORE_FILENAME, CONFIG_FILENAME,
    SCRIPTS_DIRNAME,
};

#[cfg(test)]
#[path = "./config_test.rs"]
mod config_test;

/// API version for configuration files.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum ApiVersion {
    #[default]
    #[serde(rename = "rcforge/v0")]
    V0,
}

/// Helper for two-stage deserialization to determine API version first.
#[derive(Deserialize)]
struct ApiVersionMapping {
    #[serde(default)]
    api: ApiVersion,
}

/// Contents of `rcforge.yaml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    pub api: ApiVersion,

    /// Root of system (installed) artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_dir: Option<String>,

    /// Directory holding rc-scripts. Relative paths are resolved against
    /// the directory of this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts_dir: Option<String>,

    /// Location of the checksum store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_store: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_on_error: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<bool>,

    /// Files outside the system root to track for drift (e.g. ~/.bashrc).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tracked_files: Vec<String>,

    /// Hosts to check in addition to those named by rc-scripts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_hosts: Vec<String>,
}

impl ConfigFile {
    /// Parse config from YAML string.
    pub fn from_yaml<S: Into<String>>(yaml: S, path: &Path) -> crate::Result<Self> {
        let yaml = yaml.into();
        let invalid = |e| crate::Error::InvalidYaml {
            path: path.to_path_buf(),
            error: e,
        };

        // Stage 1: Parse to get API version
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).map_err(invalid)?;
        let with_version: ApiVersionMapping =
            serde_yaml::from_value(value.clone()).map_err(invalid)?;

        // Stage 2: Deserialize based on version
        match with_version.api {
            ApiVersion::V0 => serde_yaml::from_value(value).map_err(invalid),
        }
    }

    /// Load config from file path.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;
        Self::from_yaml(yaml, path)
    }
}

/// Values given on the command line; they win over everything else.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub user_dir: Option<PathBuf>,
    pub system_dir: Option<PathBuf>,
    pub scripts_dir: Option<PathBuf>,
    pub timing: Option<bool>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// User root: configuration, checksum store and user include artifacts.
    pub user_dir: PathBuf,
    /// System root: installed include artifacts.
    pub system_dir: PathBuf,
    pub scripts_dir: PathBuf,
    pub checksum_store: PathBuf,
    pub continue_on_error: bool,
    pub timing: bool,
    pub tracked_files: Vec<PathBuf>,
    pub extra_hosts: Vec<String>,
    /// The config file that was read, if any.
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Resolve configuration from the process environment and `overrides`.
    pub fn load(overrides: &ConfigOverrides) -> crate::Result<Self> {
        Self::load_with(|key| std::env::var(key).ok(), overrides)
    }

    /// Resolve configuration against an arbitrary variable lookup.
    pub fn load_with<F>(lookup: F, overrides: &ConfigOverrides) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let user_dir = match (&overrides.user_dir, env("RCFORGE_USER_DIR")) {
            (Some(dir), _) => dir.clone(),
            (None, Some(dir)) => expand_home(&dir)?,
            (None, None) => default_dir(dirs::config_dir(), ".config")?,
        };
        let user_dir = std::path::absolute(user_dir)?;

        let config_path = user_dir.join(CONFIG_FILENAME);
        let (file, source_path) = if config_path.is_file() {
            tracing::debug!(path = ?config_path, "loading configuration");
            (ConfigFile::load(&config_path)?, Some(config_path))
        } else {
            (ConfigFile::default(), None)
        };
        let resolve = |value: &str| -> crate::Result<PathBuf> {
            let path = expand_home(value)?;
            Ok(if path.is_absolute() {
                path
            } else {
                user_dir.join(path)
            })
        };

        let system_dir = match (&overrides.system_dir, env("RCFORGE_SYSTEM_DIR"), &file.system_dir) {
            (Some(dir), _, _) => dir.clone(),
            (None, Some(dir), _) => expand_home(&dir)?,
            (None, None, Some(dir)) => resolve(dir.as_str())?,
            (None, None, None) => default_dir(dirs::data_dir(), ".local/share")?,
        };
        let system_dir = std::path::absolute(system_dir)?;

        let scripts_dir = match (&overrides.scripts_dir, env("RCFORGE_SCRIPTS_DIR"), &file.scripts_dir) {
            (Some(dir), _, _) => dir.clone(),
            (None, Some(dir), _) => expand_home(&dir)?,
            (None, None, Some(dir)) => resolve(dir.as_str())?,
            (None, None, None) => user_dir.join(SCRIPTS_DIRNAME),
        };
        let scripts_dir = std::path::absolute(scripts_dir)?;

        let checksum_store = match &file.checksum_store {
            Some(path) => resolve(path.as_str())?,
            None => user_dir.join(CHECKSUM_STORE_FILENAME),
        };

        let debug = ["RCFORGE_DEBUG", "SHELL_DEBUG"]
            .iter()
            .any(|&key| env(key).is_some_and(|v| is_truthy(&v)));
        let timing = overrides
            .timing
            .unwrap_or(debug || file.timing.unwrap_or(false));

        let tracked_files = file
            .tracked_files
            .iter()
            .map(|p| resolve(p.as_str()))
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(Self {
            user_dir,
            system_dir,
            scripts_dir,
            checksum_store,
            continue_on_error: file.continue_on_error.unwrap_or(true),
            timing,
            tracked_files,
            extra_hosts: file.extra_hosts,
            source_path,
        })
    }

    /// Resolver searching the user root before the system root.
    pub fn include_resolver(&self) -> IncludeResolver {
        IncludeResolver::new(&self.user_dir, &self.system_dir)
    }

    /// Loader over the configured rc-script directory.
    pub fn loader(&self) -> Loader {
        Loader::new(&self.scripts_dir).continue_on_error(self.continue_on_error)
    }

    /// Open the checksum store, refusing to track user rc-scripts.
    pub fn open_checksum_store(&self) -> crate::Result<ChecksumStore> {
        Ok(ChecksumStore::open(&self.checksum_store)?.exclude(&self.scripts_dir))
    }

    /// Files whose drift is checked: the system root plus `tracked_files`.
    ///
    /// Nothing under the rc-script directory is ever included.
    pub fn managed_files(&self) -> crate::Result<Vec<PathBuf>> {
        let excluded = [self.scripts_dir.clone()];
        let mut files = crate::managed_files(&self.system_dir, &excluded)?;
        for extra in &self.tracked_files {
            if excluded.iter().any(|dir| extra.starts_with(dir)) {
                tracing::warn!(path = ?extra, "user rc-scripts are never tracked, ignoring");
                continue;
            }
            if extra.is_file() && !files.contains(extra) {
                files.push(extra.clone());
            }
        }
        Ok(files)
    }
}

/// Interpret common truthy spellings of a flag variable.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(value: &str) -> crate::Result<PathBuf> {
    if value == "~" || value.starts_with("~/") {
        let home = dirs::home_dir().ok_or_else(no_home)?;
        let rel = value.strip_prefix("~/").unwrap_or("");
        Ok(home.join(rel))
    } else {
        Ok(PathBuf::from(value))
    }
}

fn default_dir(platform: Option<PathBuf>, home_relative: &str) -> crate::Result<PathBuf> {
    match platform {
        Some(base) => Ok(base.join("rcforge")),
        None => Ok(dirs::home_dir()
            .ok_or_else(no_home)?
            .join(home_relative)
            .join("rcforge")),
    }
}

fn no_home() -> crate::Error {
    crate::Error::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "cannot determine the home directory",
    ))
}
