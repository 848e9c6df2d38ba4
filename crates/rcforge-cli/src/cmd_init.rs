// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `rcforge init` command.

use std::path::Path;

use clap::Args;
use colored::Colorize;
use miette::Result;
use rcforge::{Shell, UTILS_CATEGORY};

const SAMPLE_SCRIPT: &str = "050_global_common_example.sh";

/// Create the directory layout and print the shell hook
#[derive(Debug, Args)]
pub struct CmdInit {
    #[clap(flatten)]
    config: crate::ConfigFlags,

    /// Shell to print the hook for (bash, zsh)
    shell: Shell,

    /// Do not create a sample rc-script
    #[clap(long)]
    no_sample: bool,
}

impl CmdInit {
    pub fn run(&mut self) -> Result<i32> {
        let config = self.config.load()?;

        for dir in [
            &config.user_dir,
            &config.scripts_dir,
            &config.user_dir.join(UTILS_CATEGORY),
        ] {
            create_dir(dir)?;
        }

        let config_path = config.user_dir.join(rcforge::CONFIG_FILENAME);
        if !config_path.exists() {
            write_file(&config_path, &generate_config_template())?;
        }

        let is_empty = std::fs::read_dir(&config.scripts_dir)
            .map_err(|e| miette::miette!("Failed to read {:?}: {e}", config.scripts_dir))?
            .next()
            .is_none();
        if is_empty && !self.no_sample {
            write_file(&config.scripts_dir.join(SAMPLE_SCRIPT), SAMPLE_CONTENT)?;
        }

        println!(
            "Initialized rcforge in {}",
            config.user_dir.display().to_string().cyan()
        );
        println!();
        println!("Add this line to {}:", rc_file(self.shell).bold());
        println!();
        println!("  {}", hook_line(self.shell).green());
        println!();
        println!("Next steps:");
        println!(
            "  1. Add rc-scripts to {} named <NNN>_<global|host>_<common|bash|zsh>_<name>.sh",
            config.scripts_dir.display()
        );
        println!("  2. Run 'rcforge show' to preview the load order");
        println!("  3. Run 'rcforge check-seq --all' to catch sequence conflicts");

        Ok(0)
    }
}

/// Line a shell rc file evaluates to load rc-scripts at startup.
pub fn hook_line(shell: Shell) -> String {
    format!(r#"eval "$(rcforge load --shell {shell})""#)
}

fn rc_file(shell: Shell) -> &'static str {
    match shell {
        Shell::Bash => "~/.bashrc",
        Shell::Zsh => "~/.zshrc",
    }
}

fn generate_config_template() -> String {
    "# rcforge configuration\n\
    \n\
    api: rcforge/v0\n\
    \n\
    # Root of installed (system) include artifacts\n\
    # system_dir: ~/.local/share/rcforge\n\
    \n\
    # rc-script directory, relative to this file\n\
    # scripts_dir: rc-scripts\n\
    \n\
    # Keep sourcing when an rc-script fails\n\
    continue_on_error: true\n\
    \n\
    # Report per-script load times\n\
    timing: false\n\
    \n\
    # Shell rc files watched for unexpected changes\n\
    # tracked_files:\n\
    #   - ~/.bashrc\n\
    #   - ~/.zshrc\n\
    \n\
    # Hosts to check with 'rcforge check-seq --all'\n\
    # extra_hosts:\n\
    #   - workstation\n"
        .to_string()
}

const SAMPLE_CONTENT: &str = "# Loaded by every shell on every host.\n\
# Rename to <host> instead of 'global' or <bash|zsh> instead of 'common'\n\
# to narrow it down.\n\
\n\
export RCFORGE_EXAMPLE=1\n";

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| miette::miette!("Failed to create {:?}: {e}", dir))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| miette::miette!("Failed to write {:?}: {e}", path))?;
    println!("Created {}", path.display());
    Ok(())
}
