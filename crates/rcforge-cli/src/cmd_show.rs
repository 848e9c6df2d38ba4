// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `rcforge show` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use rcforge::{Config, LoadPlan, ScanResult};

/// Print the load plan without sourcing anything
#[derive(Debug, Args)]
pub struct CmdShow {
    #[clap(flatten)]
    config: crate::ConfigFlags,

    #[clap(flatten)]
    context: crate::ContextFlags,

    /// Also list rc-scripts that do not apply to this context
    #[clap(long)]
    all: bool,

    /// Output format: table, yaml
    #[clap(long, default_value = "table")]
    format: String,
}

impl CmdShow {
    pub fn run(&mut self) -> Result<i32> {
        let config = self.config.load()?;
        let context = self.context.resolve()?;
        let scan = rcforge::scan_scripts(&config.scripts_dir)?;
        let plan = rcforge::plan_scripts(&scan, &context);

        if self.format == "yaml" {
            self.show_yaml(&config, &scan, &plan)?;
        } else {
            self.show_table(&config, &scan, &plan);
        }
        Ok(0)
    }

    fn show_table(&self, config: &Config, scan: &ScanResult, plan: &LoadPlan) {
        println!(
            "{} {}",
            "Load Plan for".bold(),
            plan.context.to_string().cyan()
        );
        println!("  {}", config.scripts_dir.display().to_string().dimmed());
        println!();

        if plan.is_empty() {
            println!("  {}", "(no rc-scripts)".dimmed());
        }
        let conflicting = plan
            .conflicts
            .iter()
            .map(|c| c.sequence)
            .collect::<Vec<_>>();
        for (i, script) in plan.scripts.iter().enumerate() {
            let marker = if conflicting.contains(&script.sequence) {
                " [conflict]".red().to_string()
            } else {
                String::new()
            };
            println!(
                "  {}. {}{}",
                i + 1,
                script.file_name().green(),
                marker
            );
        }

        if self.all {
            let inactive: Vec<_> = scan
                .scripts
                .iter()
                .filter(|s| !plan.context.applies(s))
                .collect();
            if !inactive.is_empty() {
                println!();
                println!("{}", "Not Applicable:".bold());
                println!();
                for script in inactive {
                    println!("  - {}", script.file_name().dimmed());
                }
            }
        }

        if !scan.skipped.is_empty() {
            println!();
            println!("{}", "Skipped Files:".bold());
            println!();
            for skipped in &scan.skipped {
                println!("  - {}", skipped.path.display().to_string().yellow());
                println!("    {}", skipped.reason.dimmed());
            }
        }

        println!();
        println!(
            "Total: {} rc-script(s), {} conflict(s), {} skipped",
            plan.len(),
            plan.conflicts.len(),
            scan.skipped.len()
        );
    }

    fn show_yaml(&self, config: &Config, scan: &ScanResult, plan: &LoadPlan) -> Result<()> {
        println!("# Configuration: {}", match &config.source_path {
            Some(path) => path.display().to_string(),
            None => "<defaults>".to_string(),
        });
        let yaml = serde_yaml::to_string(&PlanView {
            plan,
            skipped: &scan.skipped,
        })
        .map_err(|e| miette::miette!("Failed to render plan: {e}"))?;
        print!("{yaml}");
        Ok(())
    }
}

#[derive(serde::Serialize)]
struct PlanView<'a> {
    #[serde(flatten)]
    plan: &'a LoadPlan,
    skipped: &'a [rcforge::loader::SkippedScript],
}
