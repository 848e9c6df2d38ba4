// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Detection of rc-scripts that collide on a sequence number.
//!
//! Two scripts sharing a sequence number would otherwise be ordered only by
//! the lexical order of their file names. The detector turns that implicit
//! tie-break into an explicit, reportable condition. It always scans the
//! whole input and reports every colliding sequence.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::identifier::{Environment, Scope, ScriptIdentifier};
use crate::{LoadContext, Shell};

#[cfg(test)]
#[path = "./conflict_test.rs"]
mod conflict_test;

/// Placeholder host used by [`scan_all_contexts`] when no host is known.
/// It matches no hostname-scoped script, only global ones.
pub const ANY_OTHER_HOST: &str = "*";

/// Highest sequence number the naming grammar allows.
pub const MAX_SEQUENCE: u16 = 999;

/// How a collision arises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    /// At least two colliding scripts target the same scope and environment,
    /// so they collide wherever they apply.
    Static,
    /// Every colliding script targets a different scope/environment pair; the
    /// collision only exists because this shell and host make them all live.
    Contextual,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::Static => f.write_str("static"),
            ConflictKind::Contextual => f.write_str("contextual"),
        }
    }
}

/// Several applicable scripts sharing one sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceConflict {
    pub sequence: u16,
    pub kind: ConflictKind,
    /// Involved scripts, sorted by full path.
    pub paths: Vec<PathBuf>,
}

/// Conflicts found for a single load context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub context: LoadContext,
    pub conflicts: Vec<SequenceConflict>,
}

impl ConflictReport {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Sequence numbers in conflict, ascending.
    pub fn sequences(&self) -> Vec<u16> {
        self.conflicts.iter().map(|c| c.sequence).collect()
    }
}

/// Find every sequence number shared by more than one script.
///
/// The input is expected to be already filtered for one context. The result
/// does not depend on input order: conflicts are sorted by sequence and the
/// paths inside each conflict by full path.
pub fn detect_conflicts(applicable: &[ScriptIdentifier]) -> Vec<SequenceConflict> {
    let mut groups: BTreeMap<u16, BTreeMap<&PathBuf, &ScriptIdentifier>> = BTreeMap::new();
    for id in applicable {
        groups.entry(id.sequence).or_default().insert(&id.path, id);
    }

    groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(sequence, members)| {
            let mut targets: HashSet<(&Scope, Environment)> = HashSet::new();
            let shares_target = members.values().any(|id| !targets.insert(id.target()));
            SequenceConflict {
                sequence,
                kind: if shares_target {
                    ConflictKind::Static
                } else {
                    ConflictKind::Contextual
                },
                paths: members.into_keys().cloned().collect(),
            }
        })
        .collect()
}

/// Filter `ids` for `context`, then detect conflicts among what remains.
///
/// The result is a function of the context; it has to be recomputed whenever
/// the active shell or host changes.
pub fn detect_context_conflicts(ids: &[ScriptIdentifier], context: &LoadContext) -> ConflictReport {
    let applicable = context.filter(ids);
    ConflictReport {
        context: context.clone(),
        conflicts: detect_conflicts(&applicable),
    }
}

/// Check every shell against every host named by a script plus `extra_hosts`.
///
/// Only reports that contain conflicts are returned, ordered by context.
pub fn scan_all_contexts(ids: &[ScriptIdentifier], extra_hosts: &[String]) -> Vec<ConflictReport> {
    let mut hosts: BTreeSet<String> = ids
        .iter()
        .filter_map(|id| match &id.scope {
            Scope::Hostname(host) => Some(host.clone()),
            Scope::Global => None,
        })
        .collect();
    hosts.extend(extra_hosts.iter().filter(|h| !h.is_empty()).cloned());
    if hosts.is_empty() {
        hosts.insert(ANY_OTHER_HOST.to_string());
    }

    let mut reports = Vec::new();
    for host in &hosts {
        for shell in Shell::ALL {
            let report = detect_context_conflicts(ids, &LoadContext::new(shell, host.as_str()));
            if !report.is_clean() {
                tracing::debug!(context = %report.context, count = report.conflicts.len(), "conflicts found");
                reports.push(report);
            }
        }
    }
    reports
}

/// Nearest sequence numbers to `near` that no applicable script uses.
pub fn suggest_free_sequences(
    ids: &[ScriptIdentifier],
    context: &LoadContext,
    near: u16,
    count: usize,
) -> Vec<u16> {
    let used: HashSet<u16> = ids
        .iter()
        .filter(|id| context.applies(id))
        .map(|id| id.sequence)
        .collect();

    let mut free: Vec<u16> = (0..=MAX_SEQUENCE).filter(|s| !used.contains(s)).collect();
    free.sort_by_key(|s| (s.abs_diff(near), *s));
    free.truncate(count);
    free
}
