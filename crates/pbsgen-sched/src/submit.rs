//! Script persistence and `qsub` submission.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use chrono::{Local, NaiveDateTime};
use tokio::fs;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{PbsGenError, PbsGenResult};
use crate::params::ResolvedParams;

/// Command used to hand scripts to PBS.
pub const DEFAULT_SUBMIT_COMMAND: &str = "qsub";

/// Timestamp layout used in script file names (second resolution).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// File name for a script generated for `job_name` at `timestamp`.
pub fn script_file_name(job_name: &str, timestamp: &NaiveDateTime) -> String {
    format!(
        "pbs_script_{}_{}.sh",
        job_name,
        timestamp.format(TIMESTAMP_FORMAT)
    )
}

/// Directory the script for `params` is written to.
///
/// Falls back to the system temp directory when no directory was configured.
pub fn script_dir(params: &ResolvedParams) -> PathBuf {
    params
        .pbs_script_path
        .clone()
        .unwrap_or_else(std::env::temp_dir)
}

/// Write `script` to disk, named after the job and the current local time.
pub async fn persist(script: &str, params: &ResolvedParams) -> PbsGenResult<PathBuf> {
    persist_at(script, params, Local::now().naive_local()).await
}

/// Write `script` to disk using an explicit timestamp.
///
/// The configured directory is created, with parents, if missing. The text is
/// written unchanged.
pub async fn persist_at(
    script: &str,
    params: &ResolvedParams,
    timestamp: NaiveDateTime,
) -> PbsGenResult<PathBuf> {
    let dir = script_dir(params);
    if params.pbs_script_path.is_some() {
        fs::create_dir_all(&dir).await?;
    }

    let path = dir.join(script_file_name(&params.job_name, &timestamp));
    fs::write(&path, script).await?;

    info!(path = %path.display(), job_name = %params.job_name, "Wrote PBS script");
    Ok(path)
}

/// Runs the queue submission command on generated scripts.
#[derive(Debug, Clone)]
pub struct Submitter {
    command: String,
}

impl Default for Submitter {
    fn default() -> Self {
        Self::new(DEFAULT_SUBMIT_COMMAND)
    }
}

impl Submitter {
    /// Create a submitter that runs `command <script>`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The submission command.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Submit `script_path` and wait for the command to finish.
    ///
    /// Output is inherited from the current process and not inspected. The
    /// exit status is returned as-is; only a failure to launch the command
    /// is an error.
    pub async fn submit(&self, script_path: &Path) -> PbsGenResult<ExitStatus> {
        info!(
            command = %self.command,
            script = %script_path.display(),
            "Submitting PBS script"
        );

        let status = Command::new(&self.command)
            .arg(script_path)
            .status()
            .await
            .map_err(|e| PbsGenError::ExternalProcessFailure {
                command: self.command.clone(),
                message: e.to_string(),
            })?;

        if !status.success() {
            warn!(command = %self.command, %status, "Submission command exited unsuccessfully");
        }

        Ok(status)
    }
}

/// Submit `script_path` with `qsub`.
pub async fn submit(script_path: &Path) -> PbsGenResult<ExitStatus> {
    Submitter::default().submit(script_path).await
}
