// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `rcforge util` command.

use clap::{Args, Subcommand};
use colored::Colorize;
use miette::Result;
use rcforge::{Layer, UtilityInfo};

/// List, locate and run utilities
#[derive(Debug, Args)]
pub struct CmdUtil {
    #[clap(flatten)]
    config: crate::ConfigFlags,

    #[clap(subcommand)]
    action: UtilAction,
}

#[derive(Debug, Subcommand)]
enum UtilAction {
    /// List available utilities with their summaries
    List,

    /// Show which file a utility resolves to
    Which {
        name: String,
    },

    /// Run a utility, passing the remaining arguments through
    Run {
        #[clap(flatten)]
        context: crate::ContextFlags,

        name: String,

        #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

impl CmdUtil {
    pub fn run(&mut self) -> Result<i32> {
        let config = self.config.load()?;
        let resolver = config.include_resolver();

        match &self.action {
            UtilAction::List => {
                let utils = UtilityInfo::list(&resolver)?;
                if utils.is_empty() {
                    println!("  {}", "(no utilities)".dimmed());
                    return Ok(0);
                }
                let width = utils.iter().map(|u| u.name.len()).max().unwrap_or(0);
                for util in &utils {
                    let marker = match (util.layer, util.overrides) {
                        (Layer::User, true) => " [override]".yellow().to_string(),
                        (Layer::User, false) => " [user]".blue().to_string(),
                        (Layer::System, _) => String::new(),
                    };
                    println!(
                        "  {}  {}{}",
                        format!("{:width$}", util.name).green(),
                        util.summary.as_deref().unwrap_or("").dimmed(),
                        marker,
                    );
                }
                Ok(0)
            }
            UtilAction::Which { name } => {
                let util = UtilityInfo::find(&resolver, name)?;
                println!("{}", util.canonical_path().display());
                Ok(0)
            }
            UtilAction::Run {
                context,
                name,
                args,
            } => {
                let util = UtilityInfo::find(&resolver, name)?;
                let shell = context.resolve()?.shell;
                tracing::debug!(utility = %util.name, path = ?util.path, "running utility");
                let status = util
                    .command(shell, args)
                    .status()
                    .map_err(|e| miette::miette!("Failed to run {:?}: {e}", util.path))?;
                // killed by a signal
                Ok(status.code().unwrap_or(1))
            }
        }
    }
}
