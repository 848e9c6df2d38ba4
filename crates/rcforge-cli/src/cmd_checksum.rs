// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `rcforge checksum` command.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use colored::Colorize;
use miette::Result;
use rcforge::Verification;

/// Verify, acknowledge or forget checksums of managed files
#[derive(Debug, Args)]
pub struct CmdChecksum {
    #[clap(flatten)]
    config: crate::ConfigFlags,

    #[clap(subcommand)]
    action: ChecksumAction,
}

#[derive(Debug, Subcommand)]
enum ChecksumAction {
    /// Compare managed files with their records, recording new files
    Verify,

    /// Accept the current contents of a file as its new baseline
    Ack {
        /// Tracked file to acknowledge
        file: PathBuf,
    },

    /// Stop tracking a file
    Forget {
        /// Tracked file to drop the record of
        file: PathBuf,
    },
}

impl CmdChecksum {
    pub fn run(&mut self) -> Result<i32> {
        let config = self.config.load()?;
        let mut store = config.open_checksum_store()?;

        let code = match &self.action {
            ChecksumAction::Verify => {
                let files = config.managed_files()?;
                let results = store.verify_all(&files)?;
                print_verification(&results)
            }
            ChecksumAction::Ack { file } => {
                let file = absolute(file)?;
                match store.acknowledge(&file)? {
                    Some(digest) => {
                        println!("{} {} {}", "✓".green(), file.display(), digest.dimmed());
                    }
                    None => println!("{} {} (record removed)", "✓".green(), file.display()),
                }
                print_outstanding(&store.outstanding())
            }
            ChecksumAction::Forget { file } => {
                let file = absolute(file)?;
                store.forget(&file)?;
                println!("{} {} (no longer tracked)", "✓".green(), file.display());
                print_outstanding(&store.outstanding())
            }
        };

        store.save()?;
        Ok(code)
    }
}

fn absolute(file: &Path) -> Result<PathBuf> {
    std::path::absolute(file).map_err(|e| miette::miette!("Invalid path {:?}: {e}", file))
}

/// Exits 1 while other records still need acknowledging.
fn print_outstanding(pending: &[(PathBuf, Verification)]) -> i32 {
    if pending.is_empty() {
        return 0;
    }
    println!();
    println!("{} file(s) still need acknowledging:", pending.len());
    for (path, _) in pending {
        println!("  {}", path.display());
    }
    1
}

fn print_verification(results: &[(PathBuf, Verification)]) -> i32 {
    let mut outstanding = 0;
    for (path, outcome) in results {
        match outcome {
            Verification::Initialized => {
                println!("  {} {}", "new".blue(), path.display());
            }
            Verification::Unchanged => {
                tracing::debug!(path = ?path, "unchanged");
            }
            Verification::Mismatch { old, new } => {
                outstanding += 1;
                println!("  {} {}", "changed".red(), path.display());
                println!("    Expected: {}", old);
                println!("    Actual:   {}", new);
            }
            Verification::Missing { old } => {
                outstanding += 1;
                println!("  {} {}", "missing".red(), path.display());
                println!("    Expected: {}", old);
            }
        }
    }

    if outstanding == 0 {
        println!("{} {} managed file(s) verified", "✓".green(), results.len());
        return 0;
    }

    println!();
    println!(
        "{} file(s) changed; review and run 'rcforge checksum ack <file>'",
        outstanding
    );
    1
}
