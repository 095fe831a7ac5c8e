//! `iamusersync run`: one reconciliation against this host.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use usersync_core::Username;
use usersync_directory::source_for;
use usersync_host::SystemStore;
use usersync_reconcile::{Reconciler, RunSummary, TracingReporter};

use super::{log_file_of, resolve, ConfigArgs};
use crate::logging::{self, RunBanner};

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let raw = self.config.load_raw()?;
        logging::init_with_file(&log_file_of(&raw));
        if let Some(path) = &self.config.config {
            tracing::info!("loaded config from: {}", path.display());
        }

        let banner = RunBanner::start();
        let result = reconcile(raw);
        let elapsed = banner.finish();

        let summary = result?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("failed to serialize run summary")?
            );
        } else {
            print_summary(&summary, elapsed);
        }
        Ok(())
    }
}

fn reconcile(raw: usersync_core::RawConfig) -> Result<RunSummary> {
    let config = resolve(raw)?;
    let source = source_for(&config);
    let mut store = SystemStore::new();
    let reporter = TracingReporter;

    Reconciler::new(&config, &*source, &mut store, &reporter)
        .run()
        .context("reconciliation failed")
}

fn print_summary(summary: &RunSummary, elapsed_ms: u128) {
    if summary.group_created {
        println!("{} created group", "+".green());
    }
    print_names("+", "added", &summary.added);
    print_names("~", "repaired", &summary.repaired);
    print_names("-", "removed", &summary.removed);
    println!(
        "{} done in {elapsed_ms}ms ({} added, {} repaired, {} unchanged, {} removed)",
        "✓".green(),
        summary.added.len(),
        summary.repaired.len(),
        summary.unchanged,
        summary.removed.len(),
    );
}

fn print_names(marker: &str, label: &str, names: &[Username]) {
    for name in names {
        let marker = match marker {
            "+" => marker.green(),
            "-" => marker.red(),
            _ => marker.yellow(),
        };
        println!("{marker} {label} {name}");
    }
}
