//! pbsgen Command-Line Interface
//!
//! Generates PBS batch scripts from a parameter file and submits them with
//! `qsub`.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::common::parse_program_arg;
use commands::{check, render, submit};

/// pbsgen - PBS job script generation and submission
#[derive(Parser)]
#[command(name = "pbsgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a parameter file and print the resolved parameters
    Check {
        /// Scheduler parameter file (YAML or JSON)
        #[arg(short, long)]
        params: String,
    },

    /// Print the PBS script for a program without writing it
    Render {
        /// Scheduler parameter file (YAML or JSON)
        #[arg(short, long)]
        params: String,

        /// Program the job runs
        #[arg(long)]
        program: String,

        /// Program argument as key=value (repeatable, order is kept)
        #[arg(short, long = "arg", value_parser = parse_program_arg)]
        args: Vec<(String, String)>,
    },

    /// Write the PBS script and submit it with qsub
    Submit {
        /// Scheduler parameter file (YAML or JSON)
        #[arg(short, long)]
        params: String,

        /// Program the job runs
        #[arg(long)]
        program: String,

        /// Program argument as key=value (repeatable, order is kept)
        #[arg(short, long = "arg", value_parser = parse_program_arg)]
        args: Vec<(String, String)>,

        /// Directory for the generated script (overrides pbs_script_path)
        #[arg(short, long)]
        output_dir: Option<String>,

        /// Write the script but do not submit it
        #[arg(long)]
        no_submit: bool,

        /// Queue submission command
        #[arg(long, env = "PBSGEN_QSUB", default_value = "qsub")]
        qsub: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Check { params } => check::execute(&params),

        Commands::Render {
            params,
            program,
            args,
        } => render::execute(&params, &program, args),

        Commands::Submit {
            params,
            program,
            args,
            output_dir,
            no_submit,
            qsub,
        } => {
            submit::execute(
                &params,
                &program,
                args,
                output_dir.as_deref(),
                no_submit,
                &qsub,
            )
            .await
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
