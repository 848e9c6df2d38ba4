// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! rcforge - Sequenced rc-script Loader CLI

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

mod cmd_check_seq;
mod cmd_checksum;
mod cmd_include;
mod cmd_init;
mod cmd_load;
mod cmd_show;
mod cmd_util;

use cmd_check_seq::CmdCheckSeq;
use cmd_checksum::CmdChecksum;
use cmd_include::CmdInclude;
use cmd_init::CmdInit;
use cmd_load::CmdLoad;
use cmd_show::CmdShow;
use cmd_util::CmdUtil;


#[derive(Parser)]
#[clap(
    name = "rcforge",
    about = "Sequenced rc-script Loader",
    version,
    long_about = "Load numbered rc-scripts for the current shell and host in a deterministic order"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

impl Logging {
    /// Level for the given flags; a truthy `RCFORGE_DEBUG` starts at DEBUG.
    fn level(&self, debug: bool) -> tracing::Level {
        let base = if debug { 2 } else { 0 };
        match (self.quiet, self.verbose.max(base)) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        }
    }
}

/// Directory overrides, winning over `rcforge.yaml` and the environment.
#[derive(Parser, Clone, Debug, Default)]
pub struct ConfigFlags {
    /// User root holding rcforge.yaml, checksums and user artifacts
    #[clap(long, value_name = "DIR")]
    pub user_dir: Option<PathBuf>,

    /// System root holding installed artifacts
    #[clap(long, value_name = "DIR")]
    pub system_dir: Option<PathBuf>,

    /// Directory holding rc-scripts
    #[clap(long, value_name = "DIR")]
    pub scripts_dir: Option<PathBuf>,
}

impl ConfigFlags {
    pub fn overrides(&self) -> rcforge::ConfigOverrides {
        rcforge::ConfigOverrides {
            user_dir: self.user_dir.clone(),
            system_dir: self.system_dir.clone(),
            scripts_dir: self.scripts_dir.clone(),
            timing: None,
        }
    }

    pub fn load(&self) -> Result<rcforge::Config> {
        Ok(rcforge::Config::load(&self.overrides())?)
    }
}

/// Shell and host to select rc-scripts for; detected when not given.
#[derive(Parser, Clone, Debug, Default)]
pub struct ContextFlags {
    /// Shell to load for (bash, zsh)
    #[clap(long, env = "RCFORGE_SHELL")]
    pub shell: Option<rcforge::Shell>,

    /// Host name to load for
    #[clap(long, env = "RCFORGE_HOSTNAME")]
    pub host: Option<String>,
}

impl ContextFlags {
    pub fn resolve(&self) -> Result<rcforge::LoadContext> {
        let shell = match self.shell {
            Some(shell) => shell,
            None => rcforge::Shell::detect()?,
        };
        let host = match &self.host {
            Some(host) if !host.is_empty() => host.clone(),
            _ => rcforge::context::current_hostname(),
        };
        Ok(rcforge::LoadContext::new(shell, host))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the startup script for the current shell
    Load(CmdLoad),

    /// Print the load plan without sourcing anything
    Show(CmdShow),

    /// Report rc-scripts that share a sequence number
    CheckSeq(CmdCheckSeq),

    /// Verify, acknowledge or forget checksums of managed files
    Checksum(CmdChecksum),

    /// Print source lines for include artifacts
    Include(CmdInclude),

    /// List, locate and run utilities
    Util(CmdUtil),

    /// Create the directory layout and print the shell hook
    Init(CmdInit),
}

impl Opt {
    fn run(self) -> Result<i32> {
        let debug = ["RCFORGE_DEBUG", "SHELL_DEBUG"].iter().any(|key| {
            std::env::var(key).is_ok_and(|v| rcforge::config::is_truthy(&v))
        });

        // stdout is reserved for output the shell evaluates
        tracing_subscriber::fmt()
            .with_max_level(self.logging.level(debug))
            .with_writer(std::io::stderr)
            .init();

        match self.cmd {
            Command::Load(mut cmd) => cmd.run(),
            Command::Show(mut cmd) => cmd.run(),
            Command::CheckSeq(mut cmd) => cmd.run(),
            Command::Checksum(mut cmd) => cmd.run(),
            Command::Include(mut cmd) => cmd.run(),
            Command::Util(mut cmd) => cmd.run(),
            Command::Init(mut cmd) => cmd.run(),
        }
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run()?;
    std::process::exit(code);
}
