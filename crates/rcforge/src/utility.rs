// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! User-facing utilities dispatched through the include resolver.
//!
//! Utilities are include artifacts in the [`UTILS_CATEGORY`] category. A
//! user utility shadows a system one of the same name. Each utility may
//! describe itself with a header line near the top of the file:
//!
//! ```text
//! #!/usr/bin/env bash
//! # httpheaders.sh - Fetch HTTP headers for a URL
//! # RC Summary: Shows the response headers of a URL
//! ```

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use crate::{Artifact, IncludeResolver, Layer, Shell};

#[cfg(test)]
#[path = "./utility_test.rs"]
mod utility_test;

/// Include category holding utilities.
pub const UTILS_CATEGORY: &str = "utils";

const SUMMARY_PREFIX: &str = "# RC Summary:";

/// Header lines searched for a summary.
const SUMMARY_SEARCH_LINES: usize = 10;

/// A resolved utility and its self description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UtilityInfo {
    pub name: String,
    pub path: PathBuf,
    pub layer: Layer,
    /// A system utility of the same name is shadowed by this one.
    pub overrides: bool,
    pub summary: Option<String>,
}

impl From<Artifact> for UtilityInfo {
    fn from(artifact: Artifact) -> Self {
        let summary = read_summary(&artifact.path);
        Self {
            name: artifact.name,
            path: artifact.path,
            layer: artifact.layer,
            overrides: artifact.overrides,
            summary,
        }
    }
}

impl UtilityInfo {
    /// Every utility across all roots, sorted by name.
    pub fn list(resolver: &IncludeResolver) -> crate::Result<Vec<Self>> {
        Ok(resolver
            .list_category(UTILS_CATEGORY)?
            .into_iter()
            .map(Self::from)
            .collect())
    }

    /// The winning utility called `name`.
    pub fn find(resolver: &IncludeResolver, name: &str) -> crate::Result<Self> {
        resolver.locate(UTILS_CATEGORY, name).map(Self::from)
    }

    /// Absolute path with symlinks resolved, falling back to the located path.
    pub fn canonical_path(&self) -> PathBuf {
        dunce::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone())
    }

    /// Command that runs this utility with `args`.
    ///
    /// Shell utilities run under `shell`; anything else is executed directly
    /// and relies on its own interpreter line.
    pub fn command<I, S>(&self, shell: Shell, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let is_shell_script = self
            .path
            .extension()
            .is_some_and(|e| e == crate::SCRIPT_EXTENSION);
        let mut cmd = if is_shell_script {
            let mut cmd = Command::new(shell.program());
            cmd.arg(&self.path);
            cmd
        } else {
            Command::new(&self.path)
        };
        cmd.args(args);
        cmd
    }
}

/// The `# RC Summary:` text from the header of `path`, if present.
///
/// Unreadable files have no summary.
pub fn read_summary<P: AsRef<Path>>(path: P) -> Option<String> {
    let path = path.as_ref();
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(err) => {
            tracing::debug!(path = ?path, "cannot read utility header: {err}");
            return None;
        }
    };
    BufReader::new(file)
        .lines()
        .take(SUMMARY_SEARCH_LINES)
        .map_while(Result::ok)
        .find_map(|line| {
            line.trim_start()
                .strip_prefix(SUMMARY_PREFIX)
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
}
