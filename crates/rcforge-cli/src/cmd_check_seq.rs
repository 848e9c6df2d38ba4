// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `rcforge check-seq` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use rcforge::{ConflictKind, ConflictReport, LoadContext, ScriptIdentifier};

/// Report rc-scripts that share a sequence number
#[derive(Debug, Args)]
pub struct CmdCheckSeq {
    #[clap(flatten)]
    config: crate::ConfigFlags,

    #[clap(flatten)]
    context: crate::ContextFlags,

    /// Check every shell against every known host (ignores --shell/--host)
    #[clap(long)]
    all: bool,

    /// Suggest free sequence numbers near each conflict
    #[clap(long)]
    suggest: bool,
}

/// Exit code when the check itself could not run.
pub const CHECK_FAILED: i32 = 2;

impl CmdCheckSeq {
    /// Exits 0 when clean, 1 on conflicts and [`CHECK_FAILED`] on errors.
    pub fn run(&mut self) -> Result<i32> {
        match self.check() {
            Ok(code) => Ok(code),
            Err(err) => {
                eprintln!("{err:?}");
                Ok(CHECK_FAILED)
            }
        }
    }

    fn check(&self) -> Result<i32> {
        let config = self.config.load()?;
        let scan = rcforge::scan_scripts(&config.scripts_dir)?;

        let reports = if self.all {
            rcforge::scan_all_contexts(&scan.scripts, &config.extra_hosts)
        } else {
            let context = self.context.resolve()?;
            vec![rcforge::detect_context_conflicts(&scan.scripts, &context)]
        };

        for skipped in &scan.skipped {
            println!(
                "{} {} {}",
                "Skipped:".yellow(),
                skipped.path.display(),
                format!("({})", skipped.reason).dimmed()
            );
        }

        let dirty: Vec<&ConflictReport> = reports.iter().filter(|r| !r.is_clean()).collect();
        if dirty.is_empty() {
            let scope = if self.all {
                "any context".to_string()
            } else {
                reports
                    .first()
                    .map(|r| r.context.to_string())
                    .unwrap_or_default()
            };
            println!("{} No sequence conflicts for {}", "✓".green(), scope);
            return Ok(0);
        }

        for report in dirty {
            self.print_report(report, &scan.scripts);
        }
        Ok(1)
    }

    fn print_report(&self, report: &ConflictReport, scripts: &[ScriptIdentifier]) {
        println!(
            "{} {}",
            "Sequence conflicts for".bold(),
            report.context.to_string().cyan()
        );
        for conflict in &report.conflicts {
            let kind = match conflict.kind {
                ConflictKind::Static => conflict.kind.to_string().red(),
                ConflictKind::Contextual => conflict.kind.to_string().yellow(),
            };
            println!("  {:03} [{}]", conflict.sequence, kind);
            for path in &conflict.paths {
                println!("    {}", path.display());
            }
            if self.suggest {
                let free = suggest(scripts, &report.context, conflict.sequence);
                println!("    {} {}", "free nearby:".dimmed(), free.green());
            }
        }
        println!();
    }
}

fn suggest(scripts: &[ScriptIdentifier], context: &LoadContext, near: u16) -> String {
    rcforge::suggest_free_sequences(scripts, context, near, 3)
        .iter()
        .map(|s| format!("{s:03}"))
        .collect::<Vec<_>>()
        .join(", ")
}
