// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Checksum records for drift detection of managed files.
//!
//! Managed files (installed system scripts and explicitly tracked shell rc
//! files) are expected to stay stable. The first verification records their
//! digest; later verifications compare against it. A mismatch is reported
//! and left alone until the user acknowledges it. User rc-scripts change
//! freely and are never tracked.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest as ShaDigest, Sha256};

#[cfg(test)]
#[path = "./checksum_test.rs"]
mod checksum_test;

/// Checksum store API version.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum StoreApiVersion {
    #[default]
    #[serde(rename = "rcforge/v0/checksums")]
    V0,
}

/// Stored digest of one tracked file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChecksumRecord {
    /// Hex encoded SHA-256 of the file contents.
    pub digest: String,
    pub last_verified: DateTime<Utc>,
}

/// Outcome of verifying one tracked file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// No record existed; one was created from the current contents.
    Initialized,
    /// The file matches its record.
    Unchanged,
    /// The file differs from its record. Needs acknowledgement.
    Mismatch { old: String, new: String },
    /// A record exists but the file is gone. Needs acknowledgement.
    Missing { old: String },
}

impl Verification {
    /// Whether this outcome needs the user to acknowledge it.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, Verification::Mismatch { .. } | Verification::Missing { .. })
    }
}

/// Persistent map of tracked file to checksum record.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChecksumStore {
    pub api: StoreApiVersion,

    #[serde(default)]
    pub records: BTreeMap<PathBuf, ChecksumRecord>,

    /// Where this store is persisted (not serialized).
    #[serde(skip)]
    location: PathBuf,

    /// Directories whose files may never be tracked (not serialized).
    #[serde(skip)]
    excluded: Vec<PathBuf>,
}

impl ChecksumStore {
    /// Load the store at `location`, starting empty if it does not exist yet.
    pub fn open<P: Into<PathBuf>>(location: P) -> crate::Result<Self> {
        let location = location.into();
        if !location.exists() {
            tracing::debug!(path = ?location, "no checksum store yet, starting empty");
            return Ok(Self {
                api: StoreApiVersion::V0,
                records: BTreeMap::new(),
                location,
                excluded: Vec::new(),
            });
        }

        let yaml = std::fs::read_to_string(&location).map_err(|e| crate::Error::ReadFailed {
            path: location.clone(),
            error: e,
        })?;
        let mut store: Self = serde_yaml::from_str(&yaml).map_err(|e| crate::Error::InvalidYaml {
            path: location.clone(),
            error: e,
        })?;
        store.location = location;
        Ok(store)
    }

    /// Refuse to track anything below `dir` (the user rc-script directory).
    pub fn exclude<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.excluded.push(dir.into());
        self
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn get<P: AsRef<Path>>(&self, file: P) -> Option<&ChecksumRecord> {
        self.records.get(file.as_ref())
    }

    /// Compare `file` with its record, creating the record on first sight.
    ///
    /// Mismatches never update the stored digest.
    pub fn verify_or_initialize<P: AsRef<Path>>(&mut self, file: P) -> crate::Result<Verification> {
        let file = file.as_ref();
        self.ensure_trackable(file)?;

        let current = match compute_digest(file) {
            Ok(digest) => digest,
            Err(crate::Error::ReadFailed { error, .. })
                if error.kind() == std::io::ErrorKind::NotFound && self.records.contains_key(file) =>
            {
                let old = self.records[file].digest.clone();
                tracing::warn!(path = ?file, "tracked file is missing");
                return Ok(Verification::Missing { old });
            }
            Err(err) => return Err(err),
        };

        match self.records.get_mut(file) {
            None => {
                tracing::debug!(path = ?file, digest = %current, "recording initial checksum");
                self.records.insert(
                    file.to_path_buf(),
                    ChecksumRecord {
                        digest: current,
                        last_verified: Utc::now(),
                    },
                );
                Ok(Verification::Initialized)
            }
            Some(record) if record.digest == current => {
                record.last_verified = Utc::now();
                Ok(Verification::Unchanged)
            }
            Some(record) => {
                tracing::warn!(path = ?file, "checksum mismatch, acknowledge to accept the change");
                Ok(Verification::Mismatch {
                    old: record.digest.clone(),
                    new: current,
                })
            }
        }
    }

    /// Verify every file in `files`, plus any recorded file that has vanished.
    ///
    /// A file that cannot be verified is logged and left out of the results.
    pub fn verify_all(&mut self, files: &[PathBuf]) -> crate::Result<Vec<(PathBuf, Verification)>> {
        let mut results = Vec::new();
        for file in files {
            match self.verify_or_initialize(file) {
                Ok(outcome) => results.push((file.clone(), outcome)),
                Err(err) => tracing::warn!(path = ?file, "cannot verify checksum: {err}"),
            }
        }

        let vanished: Vec<(PathBuf, String)> = self
            .records
            .iter()
            .filter(|(path, _)| !files.contains(path) && !path.exists())
            .map(|(path, record)| (path.clone(), record.digest.clone()))
            .collect();
        for (path, old) in vanished {
            tracing::warn!(path = ?path, "tracked file is missing");
            results.push((path, Verification::Missing { old }));
        }

        Ok(results)
    }

    /// Accept the current state of `file` as the new baseline.
    ///
    /// Returns the new digest, or `None` when the file is gone and its record
    /// was dropped instead.
    pub fn acknowledge<P: AsRef<Path>>(&mut self, file: P) -> crate::Result<Option<String>> {
        let file = file.as_ref();
        if !self.records.contains_key(file) {
            return Err(crate::Error::NotTracked(file.to_path_buf()));
        }

        if !file.exists() {
            tracing::info!(path = ?file, "dropping record of removed file");
            self.records.remove(file);
            return Ok(None);
        }

        let digest = compute_digest(file)?;
        tracing::info!(path = ?file, digest = %digest, "checksum acknowledged");
        self.records.insert(
            file.to_path_buf(),
            ChecksumRecord {
                digest: digest.clone(),
                last_verified: Utc::now(),
            },
        );
        Ok(Some(digest))
    }

    /// Stop tracking `file`, returning the record that was removed.
    pub fn forget<P: AsRef<Path>>(&mut self, file: P) -> crate::Result<ChecksumRecord> {
        let file = file.as_ref();
        let record = self
            .records
            .remove(file)
            .ok_or_else(|| crate::Error::NotTracked(file.to_path_buf()))?;
        tracing::info!(path = ?file, "checksum record removed");
        Ok(record)
    }

    /// Recorded files that currently differ from their record or are gone.
    ///
    /// Read only: no record is created or touched.
    pub fn outstanding(&self) -> Vec<(PathBuf, Verification)> {
        let mut pending = Vec::new();
        for (path, record) in &self.records {
            let old = record.digest.clone();
            match compute_digest(path) {
                Ok(new) if new == old => {}
                Ok(new) => pending.push((path.clone(), Verification::Mismatch { old, new })),
                Err(crate::Error::ReadFailed { error, .. })
                    if error.kind() == std::io::ErrorKind::NotFound =>
                {
                    pending.push((path.clone(), Verification::Missing { old }));
                }
                Err(err) => tracing::warn!(path = ?path, "cannot verify checksum: {err}"),
            }
        }
        pending
    }

    /// Persist the store, keeping the previous version as `<name>.bak`.
    pub fn save(&self) -> crate::Result<()> {
        if let Some(parent) = self.location.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(self).map_err(|e| crate::Error::InvalidYaml {
            path: self.location.clone(),
            error: e,
        })?;

        if self.location.exists() {
            std::fs::copy(&self.location, with_suffix(&self.location, "bak"))?;
        }
        let tmp = with_suffix(&self.location, "tmp");
        std::fs::write(&tmp, yaml)?;
        std::fs::rename(&tmp, &self.location)?;
        Ok(())
    }

    fn ensure_trackable(&self, file: &Path) -> crate::Result<()> {
        if self.excluded.iter().any(|dir| file.starts_with(dir)) {
            return Err(crate::Error::UntrackedUserScript(file.to_path_buf()));
        }
        Ok(())
    }
}

/// Hex encoded SHA-256 of the contents of `path`.
pub fn compute_digest<P: AsRef<Path>>(path: P) -> crate::Result<String> {
    let path = path.as_ref();
    let content = std::fs::read(path).map_err(|e| crate::Error::ReadFailed {
        path: path.to_path_buf(),
        error: e,
    })?;
    Ok(format!("{:x}", Sha256::digest(&content)))
}

/// Every regular file below `system_root`, skipping anything under `excluded`.
///
/// A missing system root yields no files.
pub fn managed_files<P: AsRef<Path>>(
    system_root: P,
    excluded: &[PathBuf],
) -> crate::Result<Vec<PathBuf>> {
    let system_root = system_root.as_ref();
    if !system_root.is_dir() {
        tracing::debug!(path = ?system_root, "system root does not exist");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let walker = walkdir::WalkDir::new(system_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !excluded.iter().any(|dir| entry.path().starts_with(dir)));
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
