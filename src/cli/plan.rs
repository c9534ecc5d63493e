//! `ointment plan` command.

use anyhow::{Context, Result};

use ointment::config::Config;
use ointment::usage::Plan;

/// Print the plan in force (with configured limit overrides) as JSON.
pub(crate) fn cmd_plan(config: &Config) -> Result<()> {
    let plan = Plan::marketplace(config.plan.limits());
    let json = serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?;
    println!("{json}");
    Ok(())
}
