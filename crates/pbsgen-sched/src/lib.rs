//! PBS Job Script Generation
//!
//! This crate turns a flat description of a PBS job (job name, queue, GPU and
//! CPU counts, environment setup) plus the command-line arguments of the
//! program to run into a PBS batch script, writes it to disk and hands it to
//! `qsub`.
//!
//! # Overview
//!
//! A job goes through three steps:
//! 1. **Resolution**: [`resolve`] validates the parameter mapping and fills in defaults
//! 2. **Rendering**: [`render`] / [`PbsScript::build`] assemble the script text
//! 3. **Dispatch**: [`persist`] writes the script and [`Submitter`] runs `qsub` on it
//!
//! Steps 1 and 2 are pure. [`PbsJob`] bundles all three behind a
//! describe-then-dispatch API.
//!
//! # Generated Script
//!
//! ```text
//! #!/bin/bash
//! #PBS -N test_job
//! #PBS -j eo
//! #PBS -q gpu -l select=1:ngpus=4:ncpus=24,walltime=72:00:00
//! module load proxy
//! module load anaconda3
//! CONDA_BASE_DIR=$(dirname $(dirname "$CONDA_EXE"))
//! source "$CONDA_BASE_DIR/etc/profile.d/conda.sh"
//! source activate test-env
//! python /home/user/main.py --arg 42
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use pbsgen_sched::{CliArgs, PbsJob, Submitter};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let job = PbsJob::from_value(&json!({
//!         "job_name": "train",
//!         "queue": "gpu",
//!         "ngpus": 4,
//!         "ncpus": 24,
//!         "modules_to_load": ["cuda"],
//!     }))?;
//!
//!     let args = CliArgs::new().with("epochs", 10);
//!     let dispatch = job
//!         .dispatch(Path::new("/home/user/train.py"), &args, &Submitter::default())
//!         .await?;
//!     println!("Wrote {}", dispatch.script_path.display());
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod job;
pub mod params;
pub mod script;
pub mod submit;

pub use error::{PbsGenError, PbsGenResult};
pub use job::{Dispatch, PbsJob};
pub use params::{DEFAULT_WALLTIME_H, OPTIONAL_KEYS, REQUIRED_KEYS, ResolvedParams, resolve};
pub use script::{CliArgs, INTERPRETER, PbsScript, render};
pub use submit::{
    DEFAULT_SUBMIT_COMMAND, Submitter, persist, persist_at, script_dir, script_file_name, submit,
};
