// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `rcforge include` command.
//!
//! Prints source lines for artifacts not listed in `--loaded`, plus the
//! updated shell-local `RCFORGE_INCLUDED`, so `eval "$(rcforge include ...)"`
//! loads each artifact at most once per shell.

use clap::Args;
use miette::Result;
use rcforge::{LoadContext, Session, Shell, SourceMode};

/// Print source lines for include artifacts
#[derive(Debug, Args)]
pub struct CmdInclude {
    #[clap(flatten)]
    config: crate::ConfigFlags,

    /// Shell the lines are evaluated by
    #[clap(long)]
    shell: Option<Shell>,

    /// Colon separated category/name keys the calling shell already loaded
    #[clap(long, default_value = "")]
    loaded: String,

    /// Artifact category (e.g. lib, utils)
    category: String,

    /// Artifact names; every artifact in the category when omitted
    names: Vec<String>,
}

impl CmdInclude {
    pub fn run(&mut self) -> Result<i32> {
        let config = self.config.load()?;
        let resolver = config.include_resolver();

        // emitted source lines do not depend on the shell, so detection is
        // never allowed to fail here
        let shell = self
            .shell
            .or_else(|| Shell::detect().ok())
            .unwrap_or(Shell::Bash);
        let context = LoadContext::new(shell, rcforge::context::current_hostname());
        let mut session = Session::new(context, SourceMode::Emit).with_loaded(&self.loaded);

        let mut code = 0;
        if self.names.is_empty() {
            let resolved = resolver.resolve_category(&mut session, &self.category)?;
            if resolved.is_empty() {
                tracing::warn!(category = %self.category, "no artifacts found");
                code = 1;
            }
        } else {
            for name in &self.names {
                if let Err(err) = resolver.resolve(&mut session, &self.category, name) {
                    // the rest still load
                    eprintln!("{:?}", miette::Report::new(err));
                    code = 1;
                }
            }
        }

        print!("{}", session.render_script());
        Ok(code)
    }
}
