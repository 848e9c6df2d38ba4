// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for rcforge operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type with rcforge Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during rcforge operations.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// File name does not follow the rc-script naming grammar
    #[error("Invalid rc-script name {name:?}: {reason}")]
    #[diagnostic(
        code(rcforge::invalid_script_name),
        help("Expected <NNN>_<global|hostname>_<common|bash|zsh>_<description>.sh, e.g. 050_global_common_path.sh")
    )]
    InvalidScriptName { name: String, reason: String },

    /// The rc-script directory cannot be enumerated at all
    #[error("Cannot read rc-script directory {path:?}")]
    #[diagnostic(
        code(rcforge::script_dir_unreadable),
        help("Create the directory with 'rcforge init' or point RCFORGE_SCRIPTS_DIR at an existing one")
    )]
    ScriptDirUnreadable {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// A single rc-script failed while being sourced
    #[error("Failed to source {path:?}: {reason}")]
    #[diagnostic(code(rcforge::source_failed))]
    SourceFailed { path: PathBuf, reason: String },

    /// No root provides the requested include artifact
    #[error("Cannot resolve {category}/{name}")]
    #[diagnostic(
        code(rcforge::resolution_failed),
        help("Searched: {}", display_paths(searched))
    )]
    ResolutionFailed {
        category: String,
        name: String,
        searched: Vec<PathBuf>,
    },

    /// Shell name outside the supported set
    #[error("Unsupported shell: {0}")]
    #[diagnostic(
        code(rcforge::unknown_shell),
        help("Supported shells are 'bash' and 'zsh'; set RCFORGE_SHELL to choose one")
    )]
    UnknownShell(String),

    /// Attempt to track a user rc-script in the checksum store
    #[error("Refusing to track user rc-script {0:?}")]
    #[diagnostic(
        code(rcforge::untracked_user_script),
        help("User rc-scripts change freely and are excluded from checksum tracking")
    )]
    UntrackedUserScript(PathBuf),

    /// Acknowledge requested for a file without a checksum record
    #[error("No checksum record for {0:?}")]
    #[diagnostic(
        code(rcforge::not_tracked),
        help("Run 'rcforge checksum verify' to initialize records")
    )]
    NotTracked(PathBuf),

    /// Invalid YAML in a configuration or store file
    #[error("Invalid YAML in {path:?}: {error}")]
    #[diagnostic(
        code(rcforge::invalid_yaml),
        help("Check YAML syntax and ensure the 'api:' field is present")
    )]
    InvalidYaml {
        path: PathBuf,
        #[source]
        error: serde_yaml::Error,
    },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(rcforge::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(rcforge::io_error))]
    Io(#[from] std::io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        "no roots configured".to_string()
    } else {
        paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
