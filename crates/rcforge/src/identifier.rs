// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Parsing of rc-script file names into structured identifiers.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Shell;

#[cfg(test)]
#[path = "./identifier_test.rs"]
mod identifier_test;

/// Literal scope token matching every host.
const GLOBAL_TOKEN: &str = "global";

/// Literal environment token matching every shell.
const COMMON_TOKEN: &str = "common";

static SCRIPT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<seq>[0-9]{3})_(?P<scope>[A-Za-z0-9.-]+)_(?P<env>[A-Za-z0-9]+)_(?P<desc>[A-Za-z0-9-]+)\.sh$",
    )
    .expect("rc-script name pattern is valid")
});

/// Which hosts an rc-script applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    Hostname(String),
}

impl Scope {
    pub fn as_str(&self) -> &str {
        match self {
            Scope::Global => GLOBAL_TOKEN,
            Scope::Hostname(host) => host,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which shells an rc-script applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Common,
    Bash,
    Zsh,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Common => COMMON_TOKEN,
            Environment::Bash => Shell::Bash.as_str(),
            Environment::Zsh => Shell::Zsh.as_str(),
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            COMMON_TOKEN => Some(Environment::Common),
            other => other.parse::<Shell>().ok().map(Environment::from),
        }
    }
}

impl From<Shell> for Environment {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => Environment::Bash,
            Shell::Zsh => Environment::Zsh,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured descriptor of one rc-script, produced once from its file name.
///
/// Identifiers order by sequence number first and file name second, which is
/// exactly the load order (including the lexical tie-break used when two
/// scripts collide on a sequence number).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ScriptIdentifier {
    /// Load order, lower loads earlier (0-999).
    pub sequence: u16,
    pub scope: Scope,
    pub environment: Environment,
    pub description: String,
    /// Full path of the file this was parsed from.
    pub path: PathBuf,
}

impl ScriptIdentifier {
    /// Parse a bare file name, attaching `path` as the script location.
    pub fn parse_name<P: Into<PathBuf>>(name: &str, path: P) -> crate::Result<Self> {
        let captures = SCRIPT_NAME.captures(name).ok_or_else(|| invalid(name, explain(name)))?;

        let sequence = captures["seq"]
            .parse::<u16>()
            .map_err(|e| invalid(name, format!("bad sequence number ({e})")))?;

        let scope = match &captures["scope"] {
            GLOBAL_TOKEN => Scope::Global,
            host => Scope::Hostname(host.to_string()),
        };

        let env_token = &captures["env"];
        let environment = Environment::from_token(env_token).ok_or_else(|| {
            invalid(
                name,
                format!("unknown environment '{env_token}', expected common, bash or zsh"),
            )
        })?;

        Ok(Self {
            sequence,
            scope,
            environment,
            description: captures["desc"].to_string(),
            path: path.into(),
        })
    }

    /// Parse the file name component of `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| invalid(&path.display().to_string(), "not a UTF-8 file name".into()))?;
        Self::parse_name(name, path)
    }

    /// Reconstruct the canonical file name for this identifier.
    pub fn file_name(&self) -> String {
        format!(
            "{:03}_{}_{}_{}.{}",
            self.sequence,
            self.scope,
            self.environment,
            self.description,
            crate::SCRIPT_EXTENSION
        )
    }

    /// The (scope, environment) pair that decides where this script applies.
    pub fn target(&self) -> (&Scope, Environment) {
        (&self.scope, self.environment)
    }
}

impl Ord for ScriptIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence
            .cmp(&other.sequence)
            .then_with(|| self.path.file_name().cmp(&other.path.file_name()))
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for ScriptIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ScriptIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

fn invalid(name: &str, reason: String) -> crate::Error {
    crate::Error::InvalidScriptName {
        name: name.to_string(),
        reason,
    }
}

/// Best-effort description of why `name` does not match the grammar.
fn explain(name: &str) -> String {
    let Some(stem) = name.strip_suffix(".sh") else {
        return "missing .sh extension".to_string();
    };
    let parts: Vec<&str> = stem.splitn(4, '_').collect();
    if parts.len() < 4 {
        return format!("expected 4 '_'-separated fields, found {}", parts.len());
    }
    if parts[0].len() != 3 || !parts[0].bytes().all(|b| b.is_ascii_digit()) {
        return format!("sequence '{}' must be exactly three digits", parts[0]);
    }
    if parts[1].is_empty() {
        return "empty scope, expected 'global' or a hostname".to_string();
    }
    if !parts[1]
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return format!("scope '{}' is not a valid hostname", parts[1]);
    }
    if Environment::from_token(parts[2]).is_none() {
        return format!(
            "unknown environment '{}', expected common, bash or zsh",
            parts[2]
        );
    }
    format!(
        "description '{}' may only contain letters, digits and '-'",
        parts[3]
    )
}
