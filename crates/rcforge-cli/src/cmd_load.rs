// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `rcforge load` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use rcforge::session::INCLUDED_VAR;
use rcforge::{LoadOutcome, ScriptStatus, Session, Shell, SourceMode};

/// Shell function letting rc-scripts pull in include artifacts on demand.
///
/// The shell-local `RCFORGE_INCLUDED` is handed over explicitly since it is
/// never exported.
pub fn rc_include_function(shell: Shell) -> String {
    format!(
        r#"rc_include() {{ eval "$(command rcforge include --shell {shell} --loaded "${{{INCLUDED_VAR}:-}}" "$@")"; }}"#
    )
}

/// Print the startup script for the current shell
#[derive(Debug, Args)]
pub struct CmdLoad {
    #[clap(flatten)]
    config: crate::ConfigFlags,

    #[clap(flatten)]
    context: crate::ContextFlags,

    /// Source each rc-script in a child shell and report the results
    /// instead of printing a script to evaluate
    #[clap(long)]
    exec: bool,

    /// Report how long each rc-script takes
    #[clap(long)]
    timing: bool,

    /// Stop at the first rc-script that fails to source
    #[clap(long)]
    stop_on_error: bool,
}

impl CmdLoad {
    pub fn run(&mut self) -> Result<i32> {
        let mut overrides = self.config.overrides();
        overrides.timing = self.timing.then_some(true);
        let config = rcforge::Config::load(&overrides)?;
        let context = self.context.resolve()?;

        let mode = if self.exec {
            SourceMode::Subprocess
        } else {
            SourceMode::Emit
        };
        let shell = context.shell;
        let mut session = Session::new(context, mode)
            .with_process_env()
            .with_timing(config.timing);
        if !self.exec {
            // every shell start loads its artifacts afresh
            session.emit_line(format!("unset {INCLUDED_VAR}"));
            session.emit_line(rc_include_function(shell));
        }

        let mut loader = config.loader();
        if self.stop_on_error {
            loader = loader.continue_on_error(false);
        }
        let outcome = loader.run(&mut session)?;

        if self.exec {
            print_summary(&outcome);
            return Ok(if outcome.success() { 0 } else { 1 });
        }

        print!("{}", session.render_script());
        Ok(0)
    }
}

fn print_summary(outcome: &LoadOutcome) {
    println!(
        "{} {}",
        "Loaded for".bold(),
        outcome.plan.context.to_string().cyan()
    );
    println!();

    for result in &outcome.results {
        let path = result.path.display().to_string();
        let timing = result
            .elapsed
            .map(|e| format!(" ({}ms)", e.as_millis()))
            .unwrap_or_default();
        match &result.status {
            ScriptStatus::Sourced => println!("  {} {}{}", "✓".green(), path, timing.dimmed()),
            ScriptStatus::Failed(reason) => {
                println!("  {} {}{}", "✗".red(), path, timing.dimmed());
                println!("    {}", reason.red());
            }
            ScriptStatus::NotRun => println!("  {} {}", "-".yellow(), path.dimmed()),
        }
    }

    for skipped in &outcome.skipped {
        println!(
            "  {} {} {}",
            "?".yellow(),
            skipped.path.display(),
            format!("({})", skipped.reason).dimmed()
        );
    }

    if !outcome.plan.is_deterministic() {
        println!();
        println!(
            "{} sequence conflicts at {}; order falls back to file names",
            "Warning:".yellow(),
            outcome
                .plan
                .conflicts
                .iter()
                .map(|c| format!("{:03}", c.sequence))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let failed = outcome.failures().count();
    println!();
    println!(
        "Total: {} script(s), {} failed, {} skipped",
        outcome.results.len(),
        failed,
        outcome.skipped.len()
    );
}
