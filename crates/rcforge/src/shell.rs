// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Supported shells and detection of the active one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "./shell_test.rs"]
mod shell_test;

/// A shell rcforge can load rc-scripts into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shell {
    Bash,
    Zsh,
}

impl Shell {
    /// Every supported shell, in a stable order.
    pub const ALL: [Shell; 2] = [Shell::Bash, Shell::Zsh];

    /// Token used in rc-script names and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Shell::Bash => "bash",
            Shell::Zsh => "zsh",
        }
    }

    /// Program used to run scripts for this shell.
    pub fn program(&self) -> &'static str {
        self.as_str()
    }

    /// Detect the active shell from the process environment.
    ///
    /// Checks `RCFORGE_SHELL` first, then the version variables each shell
    /// sets for itself, and finally the basename of `$SHELL`.
    pub fn detect() -> crate::Result<Self> {
        Self::detect_from(|key| std::env::var(key).ok())
    }

    /// Detection against an arbitrary variable lookup.
    pub fn detect_from<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(explicit) = lookup("RCFORGE_SHELL").filter(|s| !s.is_empty()) {
            return explicit.parse();
        }
        if lookup("ZSH_VERSION").is_some_and(|v| !v.is_empty()) {
            return Ok(Shell::Zsh);
        }
        if lookup("BASH_VERSION").is_some_and(|v| !v.is_empty()) {
            return Ok(Shell::Bash);
        }
        match lookup("SHELL") {
            Some(path) => {
                let name = path.rsplit('/').next().unwrap_or(&path);
                name.parse()
            }
            None => Err(crate::Error::UnknownShell("<unset>".to_string())),
        }
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Shell {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // login shells show up as "-bash" in some environments
        match s.trim_start_matches('-') {
            "bash" => Ok(Shell::Bash),
            "zsh" => Ok(Shell::Zsh),
            other => Err(crate::Error::UnknownShell(other.to_string())),
        }
    }
}
