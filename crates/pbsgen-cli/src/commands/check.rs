//! Check command implementation.
//!
//! Resolves a parameter file and prints the complete parameter set.

use anyhow::{Context, Result};
use console::style;

use pbsgen_sched::resolve;

use super::common::load_params;

/// Execute the check command.
pub fn execute(params_file: &str) -> Result<()> {
    let params = load_params(params_file)?;
    let resolved = resolve(&params)?;

    let yaml =
        serde_yaml_ng::to_string(&resolved).context("Failed to serialize resolved parameters")?;

    println!(
        "{} {} is valid",
        style("✓").green().bold(),
        style(params_file).green()
    );
    println!();
    print!("{yaml}");

    Ok(())
}
