// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! rcforge - Sequenced rc-script Loader
//!
//! This crate provides the core library for loading many small shell
//! snippets ("rc-scripts") at shell start in a deterministic order.
//!
//! # Overview
//!
//! Every rc-script is named after the load order, the host and the shell it
//! targets:
//!
//! ```text
//! <sequence>_<scope>_<environment>_<description>.sh
//!
//! 050_global_common_path.sh      every host, every shell
//! 210_laptop_zsh_prompt.sh       host "laptop", zsh only
//! ```
//!
//! Names are parsed once into a [`ScriptIdentifier`], filtered against the
//! active [`LoadContext`], checked for sequence collisions and then sourced
//! one after another into a [`Session`]. Alongside the loader, the crate
//! tracks checksums of managed (system) files to detect drift and resolves
//! named include artifacts through a user-over-system search path.

pub mod checksum;
pub mod config;
pub mod conflict;
pub mod context;
pub mod error;
pub mod identifier;
pub mod include;
pub mod loader;
pub mod session;
pub mod shell;
pub mod utility;

pub use checksum::{compute_digest, managed_files, ChecksumRecord, ChecksumStore, Verification};
pub use config::{Config, ConfigOverrides};
pub use conflict::{
    detect_conflicts, detect_context_conflicts, scan_all_contexts, suggest_free_sequences,
    ConflictKind, ConflictReport, SequenceConflict,
};
pub use context::LoadContext;
pub use error::{Error, Result};
pub use identifier::{Environment, Scope, ScriptIdentifier};
pub use include::{Artifact, FunctionRegistry, IncludeResolver, Layer, RegistryEntry, Resolved};
pub use loader::{
    plan_scripts, scan_scripts, LoadOutcome, LoadPlan, Loader, LoaderState, ScanResult,
    ScriptResult, ScriptStatus,
};
pub use session::{Session, SourceMode};
pub use shell::Shell;
pub use utility::{read_summary, UtilityInfo, UTILS_CATEGORY};

/// Well-known filename for the user configuration.
pub const CONFIG_FILENAME: &str = "rcforge.yaml";

/// Well-known filename for the checksum store.
pub const CHECKSUM_STORE_FILENAME: &str = "checksums.yaml";

/// Directory name (under the user root) holding rc-scripts.
pub const SCRIPTS_DIRNAME: &str = "rc-scripts";

/// File extension required for rc-scripts.
pub const SCRIPT_EXTENSION: &str = "sh";
