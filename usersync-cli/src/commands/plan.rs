//! `iamusersync plan`: what a run would do, without doing it.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use usersync_directory::source_for;
use usersync_host::SystemStore;
use usersync_reconcile::{Plan, Reconciler, TracingReporter};

use super::ConfigArgs;
use crate::logging;

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "user")]
    user: String,
    #[tabled(rename = "action")]
    action: &'static str,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        logging::init_stderr();
        let config = self.config.resolve()?;
        let source = source_for(&config);
        let mut store = SystemStore::new();
        let reporter = TracingReporter;

        let plan = Reconciler::new(&config, &*source, &mut store, &reporter)
            .preview()
            .context("failed to build plan")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("failed to serialize plan")?
            );
            return Ok(());
        }
        print_table(&plan, config.managed_group.as_str());
        Ok(())
    }
}

fn rows(plan: &Plan) -> Vec<PlanRow> {
    let tagged = [
        (&plan.to_add, "add"),
        (&plan.to_repair, "check"),
        (&plan.to_remove, "remove"),
    ];
    tagged
        .into_iter()
        .flat_map(|(names, action)| {
            names.iter().map(move |name| PlanRow {
                user: name.to_string(),
                action,
            })
        })
        .collect()
}

fn print_table(plan: &Plan, group: &str) {
    println!(
        "iamusersync v{} | group {} | {} to add | {} to check | {} to remove",
        env!("CARGO_PKG_VERSION"),
        group.bold(),
        plan.to_add.len(),
        plan.to_repair.len(),
        plan.to_remove.len(),
    );
    let rows = rows(plan);
    if !rows.is_empty() {
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
    if plan.is_noop() {
        println!("{}", "membership already matches the directory".green());
    }
}
