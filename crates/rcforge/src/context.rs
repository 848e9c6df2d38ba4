// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! The runtime context (shell and host) rc-scripts are selected for.

use std::fmt;

use serde::Serialize;

use crate::identifier::{Environment, Scope, ScriptIdentifier};
use crate::Shell;

#[cfg(test)]
#[path = "./context_test.rs"]
mod context_test;

/// The shell/host pair an rc-script selection is made for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LoadContext {
    pub shell: Shell,
    pub hostname: String,
}

impl LoadContext {
    pub fn new<S: Into<String>>(shell: Shell, hostname: S) -> Self {
        Self {
            shell,
            hostname: hostname.into(),
        }
    }

    /// Detect the active shell and host from the process environment.
    pub fn detect() -> crate::Result<Self> {
        Ok(Self::new(Shell::detect()?, current_hostname()))
    }

    /// Whether `id` should be loaded in this context.
    ///
    /// A script applies when its scope is global or names this host, and its
    /// environment is common or names this shell. Hostnames compare exactly.
    pub fn applies(&self, id: &ScriptIdentifier) -> bool {
        let scope_ok = match &id.scope {
            Scope::Global => true,
            Scope::Hostname(host) => *host == self.hostname,
        };
        let env_ok = match id.environment {
            Environment::Common => true,
            env => env == Environment::from(self.shell),
        };
        scope_ok && env_ok
    }

    /// Keep only the identifiers that apply in this context.
    pub fn filter<'a, I>(&self, ids: I) -> Vec<ScriptIdentifier>
    where
        I: IntoIterator<Item = &'a ScriptIdentifier>,
    {
        ids.into_iter()
            .filter(|id| self.applies(id))
            .cloned()
            .collect()
    }
}

impl fmt::Display for LoadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.shell, self.hostname)
    }
}

/// Short name of this host, `RCFORGE_HOSTNAME` taking precedence.
pub fn current_hostname() -> String {
    if let Some(explicit) = std::env::var("RCFORGE_HOSTNAME").ok().filter(|h| !h.is_empty()) {
        return explicit;
    }
    let full = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());
    short_hostname(&full).to_string()
}

/// First label of a dotted hostname, as `hostname -s` prints it.
pub fn short_hostname(full: &str) -> &str {
    full.split('.').next().unwrap_or(full)
}
