// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! The execution context rc-scripts and include artifacts are sourced into.
//!
//! A [`Session`] stands in for the shell process being configured. Every
//! sourced file observes the effects of every file sourced before it, which
//! is why sourcing is strictly sequential and goes through `&mut Session`.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::include::FunctionRegistry;
use crate::LoadContext;

#[cfg(test)]
#[path = "./session_test.rs"]
mod session_test;

/// Variable carrying the `category/name` keys already loaded in the shell.
pub const INCLUDED_VAR: &str = "RCFORGE_INCLUDED";

/// Variables the shell manages itself and that are not carried between files.
const VOLATILE_VARS: &[&str] = &["_", "SHLVL", "OLDPWD"];

/// How sourcing a file is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    /// Append a `source` line to a startup script the calling shell evaluates.
    #[default]
    Emit,
    /// Source the file in a child shell seeded with the session variables and
    /// read the resulting environment back.
    Subprocess,
}

/// Explicit execution context for one shell start.
#[derive(Debug, Clone)]
pub struct Session {
    context: LoadContext,
    mode: SourceMode,
    timing: bool,
    variables: BTreeMap<String, String>,
    registry: FunctionRegistry,
    lines: Vec<String>,
}

impl Session {
    pub fn new(context: LoadContext, mode: SourceMode) -> Self {
        Self {
            context,
            mode,
            timing: false,
            variables: BTreeMap::new(),
            registry: FunctionRegistry::new(),
            lines: Vec::new(),
        }
    }

    /// Seed the session with the current process environment.
    ///
    /// The registry is not touched: an inherited `RCFORGE_INCLUDED` belongs
    /// to a parent shell whose functions this process does not have.
    pub fn with_process_env(self) -> Self {
        self.with_variables(std::env::vars())
    }

    /// Seed the session with the given variables.
    pub fn with_variables<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.variables
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Mark the `category/name` keys in `included` (colon separated) as
    /// loaded by the calling shell.
    pub fn with_loaded(mut self, included: &str) -> Self {
        for key in included.split(':').filter(|k| !k.is_empty()) {
            match key.split_once('/') {
                // the shell sourced it; the path is not known here
                Some((category, name)) => self.registry.mark_loaded(category, name, Path::new("")),
                None => tracing::debug!(%key, "ignoring malformed include key"),
            }
        }
        self
    }

    /// Emit and record per-file timing.
    pub fn with_timing(mut self, timing: bool) -> Self {
        self.timing = timing;
        self
    }

    pub fn context(&self) -> &LoadContext {
        &self.context
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    pub fn timing(&self) -> bool {
        self.timing
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn set_var<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Source one file into this session.
    pub fn source(&mut self, path: &Path) -> crate::Result<()> {
        ensure_readable(path)?;
        match self.mode {
            SourceMode::Emit => {
                self.emit_source(path);
                Ok(())
            }
            SourceMode::Subprocess => self.source_in_child(path),
        }
    }

    /// Source an include artifact unless (category, name) is already loaded.
    ///
    /// Returns whether the artifact was loaded by this call.
    pub fn load_artifact(&mut self, category: &str, name: &str, path: &Path) -> crate::Result<bool> {
        if self.registry.is_loaded(category, name) {
            return Ok(false);
        }
        tracing::debug!(%category, %name, path = ?path, "loading artifact");
        self.source(path)?;
        self.registry.mark_loaded(category, name, path);
        Ok(true)
    }

    /// Add a raw line to the emitted startup script.
    pub fn emit_line<S: Into<String>>(&mut self, line: S) {
        self.lines.push(line.into());
    }

    /// The startup script accumulated in [`SourceMode::Emit`].
    pub fn render_script(&self) -> String {
        let mut out = String::new();
        if self.timing {
            out.push_str(TIMING_PRELUDE);
        }
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        let loaded = self.registry.loaded_keys();
        if !loaded.is_empty() {
            // shell-local; child processes start with an empty registry
            out.push_str(&format!("{INCLUDED_VAR}={}\n", quote(&loaded.join(":"))));
        }
        if self.timing {
            out.push_str(TIMING_EPILOGUE);
        }
        out
    }

    fn emit_source(&mut self, path: &Path) {
        let quoted = quote(&path.display().to_string());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.timing {
            self.lines.push("_rcforge_t0=$(_rcforge_now_ms)".to_string());
        }
        self.lines.push(format!(
            "source {quoted} || printf 'rcforge: failed to source %s\\n' {quoted} >&2"
        ));
        if self.timing {
            self.lines.push(format!(
                "printf 'rcforge: %s took %sms\\n' {} \"$(( $(_rcforge_now_ms) - _rcforge_t0 ))\" >&2",
                quote(&name)
            ));
        }
    }

    fn source_in_child(&mut self, path: &Path) -> crate::Result<()> {
        let output = Command::new(self.context.shell.program())
            .arg("-c")
            .arg(r#". "$0" >&2 && env -0"#)
            .arg(path)
            .env_clear()
            .envs(&self.variables)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| crate::Error::SourceFailed {
                path: path.to_path_buf(),
                reason: format!("cannot start {}: {e}", self.context.shell),
            })?;

        if !output.status.success() {
            return Err(crate::Error::SourceFailed {
                path: path.to_path_buf(),
                reason: format!("{} exited with {}", self.context.shell, output.status),
            });
        }

        self.variables = parse_env_block(&output.stdout);
        Ok(())
    }
}

const TIMING_PRELUDE: &str = r#"[ -n "$ZSH_VERSION" ] && zmodload zsh/datetime 2>/dev/null
_rcforge_now_ms() {
  if [ -n "${EPOCHREALTIME:-}" ]; then local t=${EPOCHREALTIME/[.,]/}; echo $(( t / 1000 ))
  else echo $(( $(date +%s) * 1000 )); fi
}
"#;

const TIMING_EPILOGUE: &str = "unset -f _rcforge_now_ms\nunset _rcforge_t0\n";

/// Single-quote `value` for POSIX-style shells.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn ensure_readable(path: &Path) -> crate::Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| crate::Error::SourceFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !metadata.is_file() {
        return Err(crate::Error::SourceFailed {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }
    std::fs::File::open(path).map_err(|e| crate::Error::SourceFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(())
}

/// Parse NUL separated `KEY=value` records as printed by `env -0`.
fn parse_env_block(block: &[u8]) -> BTreeMap<String, String> {
    String::from_utf8_lossy(block)
        .split('\0')
        .filter_map(|record| record.split_once('='))
        .filter(|(key, _)| !key.is_empty() && !VOLATILE_VARS.contains(key))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
