//! Submit command implementation.
//!
//! Writes the PBS script for a job and hands it to `qsub`.

use anyhow::Result;
use console::style;

use pbsgen_sched::{PbsJob, Submitter};

use super::common::{apply_overrides, load_params, program_args, program_path};

/// Execute the submit command.
pub async fn execute(
    params_file: &str,
    program: &str,
    args: Vec<(String, String)>,
    output_dir: Option<&str>,
    no_submit: bool,
    qsub: &str,
) -> Result<()> {
    let mut params = load_params(params_file)?;
    apply_overrides(&mut params, output_dir, no_submit);
    let job = PbsJob::from_value(&params)?;

    println!(
        "{} Preparing {} for queue {}",
        style("→").cyan().bold(),
        style(&job.params().job_name).green(),
        style(&job.params().queue).magenta()
    );

    let program = program_path(program)?;
    let dispatch = job
        .dispatch(&program, &program_args(args), &Submitter::new(qsub))
        .await?;

    println!(
        "  Script: {}",
        style(dispatch.script_path.display()).yellow()
    );

    match dispatch.submission {
        Some(status) if status.success() => {
            println!("{} Submitted via {}", style("✓").green().bold(), qsub);
        }
        Some(status) => {
            println!(
                "{} {} exited with {}",
                style("!").yellow().bold(),
                qsub,
                status
            );
        }
        None => {
            println!("  Submission disabled; script left on disk");
        }
    }

    Ok(())
}
