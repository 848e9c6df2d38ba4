// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Layered, cached resolution of named include artifacts.
//!
//! Artifacts live at `<root>/<category>/<name>[.<ext>]`. Roots are searched
//! user first, then system, so a user artifact overrides a system artifact
//! of the same category and name. Loaded artifacts are remembered in the
//! session's [`FunctionRegistry`] and never loaded twice.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::Session;

#[cfg(test)]
#[path = "./include_test.rs"]
mod include_test;

/// Which root an artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    User,
    System,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::User => f.write_str("user"),
            Layer::System => f.write_str("system"),
        }
    }
}

/// A located artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub category: String,
    pub name: String,
    pub path: PathBuf,
    pub layer: Layer,
    /// A system artifact of the same name exists but is shadowed by this one.
    pub overrides: bool,
}

/// Cache entry for one (category, name) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    pub category: String,
    pub name: String,
    pub source_path: PathBuf,
    pub loaded: bool,
}

/// Process-scoped record of loaded artifacts. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    entries: BTreeMap<(String, String), RegistryEntry>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: &str, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(&(category.to_string(), name.to_string()))
    }

    pub fn is_loaded(&self, category: &str, name: &str) -> bool {
        self.get(category, name).is_some_and(|e| e.loaded)
    }

    /// Record that `path` was loaded for (category, name).
    pub fn mark_loaded(&mut self, category: &str, name: &str, path: &Path) {
        self.entries.insert(
            (category.to_string(), name.to_string()),
            RegistryEntry {
                category: category.to_string(),
                name: name.to_string(),
                source_path: path.to_path_buf(),
                loaded: true,
            },
        );
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    /// `category/name` keys of every loaded entry, in order.
    pub fn loaded_keys(&self) -> Vec<String> {
        self.entries
            .values()
            .filter(|e| e.loaded)
            .map(|e| format!("{}/{}", e.category, e.name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of a resolve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub category: String,
    pub name: String,
    pub path: PathBuf,
    /// False when the artifact was already loaded and nothing was done.
    pub newly_loaded: bool,
}

/// Ordered search path of artifact roots.
#[derive(Debug, Clone, Default)]
pub struct IncludeResolver {
    roots: Vec<(Layer, PathBuf)>,
}

impl IncludeResolver {
    /// Resolver searching `user_root` before `system_root`.
    pub fn new<U: Into<PathBuf>, S: Into<PathBuf>>(user_root: U, system_root: S) -> Self {
        Self {
            roots: vec![
                (Layer::User, user_root.into()),
                (Layer::System, system_root.into()),
            ],
        }
    }

    pub fn roots(&self) -> &[(Layer, PathBuf)] {
        &self.roots
    }

    /// Find the winning artifact for (category, name) without loading it.
    pub fn locate(&self, category: &str, name: &str) -> crate::Result<Artifact> {
        let searched: Vec<PathBuf> = self.roots.iter().map(|(_, r)| r.join(category)).collect();
        if !is_plain_component(category) || !is_plain_component(name) {
            return Err(self.not_found(category, name, searched));
        }

        let mut found: Option<Artifact> = None;
        for (layer, root) in &self.roots {
            let Some(path) = find_in_dir(&root.join(category), name)? else {
                continue;
            };
            if let Some(winner) = found.as_mut() {
                if winner.layer == Layer::User && *layer == Layer::System {
                    winner.overrides = true;
                }
                break;
            }
            tracing::trace!(%category, %name, %layer, path = ?path, "located artifact");
            found = Some(Artifact {
                category: category.to_string(),
                name: name.to_string(),
                path,
                layer: *layer,
                overrides: false,
            });
        }

        found.ok_or_else(|| self.not_found(category, name, searched))
    }

    /// Locate (category, name) and load it into `session` unless it already is.
    pub fn resolve(&self, session: &mut Session, category: &str, name: &str) -> crate::Result<Resolved> {
        if let Some(entry) = session.registry().get(category, name).filter(|e| e.loaded) {
            tracing::trace!(%category, %name, "already loaded");
            return Ok(Resolved {
                category: category.to_string(),
                name: name.to_string(),
                path: entry.source_path.clone(),
                newly_loaded: false,
            });
        }

        let artifact = self.locate(category, name)?;
        let newly_loaded = session.load_artifact(category, name, &artifact.path)?;
        Ok(Resolved {
            category: artifact.category,
            name: artifact.name,
            path: artifact.path,
            newly_loaded,
        })
    }

    /// Every artifact in `category` across all roots, keyed by name.
    ///
    /// A user artifact replaces a system artifact of the same name. Sorted by
    /// name; nothing is loaded.
    pub fn list_category(&self, category: &str) -> crate::Result<Vec<Artifact>> {
        let mut merged: BTreeMap<String, Artifact> = BTreeMap::new();
        if !is_plain_component(category) {
            return Ok(Vec::new());
        }

        for (layer, root) in &self.roots {
            for (name, path) in scan_dir(&root.join(category))? {
                match merged.get_mut(&name) {
                    Some(existing) => {
                        if existing.layer == Layer::User && *layer == Layer::System {
                            existing.overrides = true;
                        }
                    }
                    None => {
                        merged.insert(
                            name.clone(),
                            Artifact {
                                category: category.to_string(),
                                name,
                                path,
                                layer: *layer,
                                overrides: false,
                            },
                        );
                    }
                }
            }
        }

        Ok(merged.into_values().collect())
    }

    /// Load every artifact of `category` (user wins on name collision).
    ///
    /// Each artifact is loaded at most once. An artifact that fails to load
    /// is logged and left out of the result; the others still load.
    pub fn resolve_category(&self, session: &mut Session, category: &str) -> crate::Result<Vec<Resolved>> {
        let mut resolved = Vec::new();
        for artifact in self.list_category(category)? {
            match session.load_artifact(category, &artifact.name, &artifact.path) {
                Ok(newly_loaded) => resolved.push(Resolved {
                    category: artifact.category,
                    name: artifact.name,
                    path: artifact.path,
                    newly_loaded,
                }),
                Err(err) => {
                    tracing::warn!(%category, name = %artifact.name, "{err}");
                }
            }
        }
        Ok(resolved)
    }

    fn not_found(&self, category: &str, name: &str, searched: Vec<PathBuf>) -> crate::Error {
        crate::Error::ResolutionFailed {
            category: category.to_string(),
            name: name.to_string(),
            searched,
        }
    }
}

/// Reject anything that could escape the category directory.
fn is_plain_component(part: &str) -> bool {
    !part.is_empty() && !part.starts_with('.') && !part.contains(['/', '\\'])
}

/// Artifact name of a file: the file stem, or the whole name when it has no extension.
fn artifact_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') {
        return None;
    }
    Some(path.file_stem()?.to_str()?.to_string())
}

/// Prefer `.sh`, then the lexically smallest file name.
fn preferred(current: &Path, candidate: &Path) -> bool {
    let is_sh = |p: &Path| p.extension().is_some_and(|e| e == crate::SCRIPT_EXTENSION);
    match (is_sh(current), is_sh(candidate)) {
        (false, true) => true,
        (true, false) => false,
        _ => candidate.file_name() < current.file_name(),
    }
}

/// Name to path map of the regular files in `dir`. A missing dir is empty.
fn scan_dir(dir: &Path) -> crate::Result<BTreeMap<String, PathBuf>> {
    let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
        Err(e) => {
            return Err(crate::Error::ReadFailed {
                path: dir.to_path_buf(),
                error: e,
            });
        }
    };

    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = artifact_name(&path) else {
            continue;
        };
        match found.get(&name) {
            Some(current) if !preferred(current, &path) => {}
            _ => {
                found.insert(name, path);
            }
        }
    }
    Ok(found)
}

fn find_in_dir(dir: &Path, name: &str) -> crate::Result<Option<PathBuf>> {
    let direct = dir.join(format!("{name}.{}", crate::SCRIPT_EXTENSION));
    if direct.is_file() {
        return Ok(Some(direct));
    }
    Ok(scan_dir(dir)?.remove(name))
}
