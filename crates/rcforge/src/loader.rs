// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Scanning, planning and sequential sourcing of rc-scripts.
//!
//! The loader walks `Idle -> Scanning -> Planning -> Executing -> Done`.
//! Only an rc-script directory that cannot be read at all moves it to
//! `Failed`; bad names, sequence conflicts and scripts that fail to source
//! are reported and the rest of the plan still loads.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::conflict::{detect_conflicts, SequenceConflict};
use crate::{LoadContext, ScriptIdentifier, Session};

#[cfg(test)]
#[path = "./loader_test.rs"]
mod loader_test;

/// Lifecycle of one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderState {
    Idle,
    Scanning,
    Planning,
    Executing,
    Done,
    Failed,
}

impl fmt::Display for LoaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoaderState::Idle => "idle",
            LoaderState::Scanning => "scanning",
            LoaderState::Planning => "planning",
            LoaderState::Executing => "executing",
            LoaderState::Done => "done",
            LoaderState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A file that looked like an rc-script but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedScript {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything found in the rc-script directory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    /// Parsed scripts in load order.
    pub scripts: Vec<ScriptIdentifier>,
    pub skipped: Vec<SkippedScript>,
}

/// Ordered scripts to source for one context.
#[derive(Debug, Clone, Serialize)]
pub struct LoadPlan {
    pub context: LoadContext,
    /// Ascending sequence; file name breaks ties.
    pub scripts: Vec<ScriptIdentifier>,
    pub conflicts: Vec<SequenceConflict>,
}

impl LoadPlan {
    /// False when the order relies on the file name tie-break.
    pub fn is_deterministic(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

/// What happened to one planned script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptStatus {
    Sourced,
    Failed(String),
    /// Not attempted because an earlier failure stopped the load.
    NotRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptResult {
    pub path: PathBuf,
    pub status: ScriptStatus,
    /// Present when timing is enabled on the session.
    pub elapsed: Option<Duration>,
}

/// Result of a complete load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadOutcome {
    pub state: LoaderState,
    pub plan: LoadPlan,
    pub skipped: Vec<SkippedScript>,
    pub results: Vec<ScriptResult>,
}

impl LoadOutcome {
    /// True when every planned script was sourced.
    pub fn success(&self) -> bool {
        self.results
            .iter()
            .all(|r| r.status == ScriptStatus::Sourced)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScriptResult> {
        self.results
            .iter()
            .filter(|r| r.status != ScriptStatus::Sourced)
    }
}

/// Enumerate and parse the rc-scripts directly inside `dir`.
///
/// Only `*.sh` regular files are considered; hidden files are ignored.
/// Names that do not parse are logged and returned as skipped, as are
/// `NNN_` files with another extension.
pub fn scan_scripts<P: AsRef<Path>>(dir: P) -> crate::Result<ScanResult> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|e| crate::Error::ScriptDirUnreadable {
        path: dir.to_path_buf(),
        error: e,
    })?;

    let mut result = ScanResult::default();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(dir = ?dir, "skipping unreadable directory entry: {err}");
                continue;
            }
        };
        let path = entry.path();
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        let hidden = file_name.starts_with('.');
        let is_script = path
            .extension()
            .is_some_and(|e| e == crate::SCRIPT_EXTENSION)
            || has_sequence_prefix(&file_name);
        if hidden || !is_script || !path.is_file() {
            tracing::trace!(path = ?path, "ignoring non rc-script entry");
            continue;
        }

        match ScriptIdentifier::from_path(&path) {
            Ok(id) => result.scripts.push(id),
            Err(crate::Error::InvalidScriptName { reason, .. }) => {
                tracing::warn!(path = ?path, "skipping rc-script: {reason}");
                result.skipped.push(SkippedScript { path, reason });
            }
            Err(err) => return Err(err),
        }
    }

    result.scripts.sort();
    result.skipped.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!(
        dir = ?dir,
        scripts = result.scripts.len(),
        skipped = result.skipped.len(),
        "scanned rc-scripts"
    );
    Ok(result)
}

/// Whether `name` starts like an rc-script (`NNN_`) whatever its extension.
fn has_sequence_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() > 4 && bytes[..3].iter().all(u8::is_ascii_digit) && bytes[3] == b'_'
}

/// Build the load plan for `context` from a scan.
///
/// Conflicts are logged; the plan still orders colliding scripts by file
/// name so loading can go ahead.
pub fn plan_scripts(scan: &ScanResult, context: &LoadContext) -> LoadPlan {
    let mut scripts = context.filter(&scan.scripts);
    scripts.sort();
    let conflicts = detect_conflicts(&scripts);

    for conflict in &conflicts {
        tracing::warn!(
            sequence = conflict.sequence,
            kind = %conflict.kind,
            paths = ?conflict.paths,
            "sequence conflict in {context}"
        );
    }
    if !conflicts.is_empty() {
        tracing::warn!(
            "falling back to file name order for conflicting sequences; load order is not deterministic"
        );
    }

    LoadPlan {
        context: context.clone(),
        scripts,
        conflicts,
    }
}

/// Drives one load of an rc-script directory.
#[derive(Debug, Clone)]
pub struct Loader {
    scripts_dir: PathBuf,
    continue_on_error: bool,
    state: LoaderState,
}

impl Loader {
    pub fn new<P: Into<PathBuf>>(scripts_dir: P) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            continue_on_error: true,
            state: LoaderState::Idle,
        }
    }

    /// Keep sourcing after a script fails (the default).
    pub fn continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    pub fn scan(&mut self) -> crate::Result<ScanResult> {
        self.state = LoaderState::Scanning;
        scan_scripts(&self.scripts_dir).inspect_err(|_| self.state = LoaderState::Failed)
    }

    pub fn plan(&mut self, scan: &ScanResult, context: &LoadContext) -> LoadPlan {
        self.state = LoaderState::Planning;
        plan_scripts(scan, context)
    }

    /// Source every planned script into `session`, one after another.
    pub fn execute(&mut self, plan: &LoadPlan, session: &mut Session) -> Vec<ScriptResult> {
        self.state = LoaderState::Executing;
        let mut results = Vec::with_capacity(plan.len());
        let mut stopped = false;

        for script in &plan.scripts {
            if stopped {
                results.push(ScriptResult {
                    path: script.path.clone(),
                    status: ScriptStatus::NotRun,
                    elapsed: None,
                });
                continue;
            }

            let start = Instant::now();
            let status = match session.source(&script.path) {
                Ok(()) => ScriptStatus::Sourced,
                Err(err) => {
                    tracing::warn!(path = ?script.path, "{err}");
                    stopped = !self.continue_on_error;
                    ScriptStatus::Failed(err.to_string())
                }
            };
            let elapsed = session.timing().then(|| start.elapsed());
            if let Some(elapsed) = elapsed {
                tracing::info!(script = %script, ?elapsed, "sourced");
            }

            results.push(ScriptResult {
                path: script.path.clone(),
                status,
                elapsed,
            });
        }

        self.state = LoaderState::Done;
        results
    }

    /// Scan, plan and execute for the session's context.
    ///
    /// Fails only when the rc-script directory cannot be read.
    pub fn run(&mut self, session: &mut Session) -> crate::Result<LoadOutcome> {
        let scan = self.scan()?;
        let plan = self.plan(&scan, &session.context().clone());
        let results = self.execute(&plan, session);

        let outcome = LoadOutcome {
            state: self.state,
            plan,
            skipped: scan.skipped,
            results,
        };
        if !outcome.success() {
            tracing::warn!(
                failed = outcome.failures().count(),
                "some rc-scripts did not load"
            );
        }
        Ok(outcome)
    }
}
