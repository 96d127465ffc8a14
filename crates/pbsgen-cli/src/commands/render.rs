//! Render command implementation.
//!
//! Prints the PBS script for a job without writing or submitting it.

use anyhow::Result;

use pbsgen_sched::PbsJob;

use super::common::{load_params, program_args, program_path};

/// Execute the render command.
pub fn execute(params_file: &str, program: &str, args: Vec<(String, String)>) -> Result<()> {
    let params = load_params(params_file)?;
    let job = PbsJob::from_value(&params)?;

    let script = job.script(&program_path(program)?, &program_args(args));
    println!("{script}");

    Ok(())
}
