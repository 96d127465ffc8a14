//! Two-step job API: describe the job, then dispatch it.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use serde_json::Value;
use tracing::info;

use crate::error::PbsGenResult;
use crate::params::{ResolvedParams, resolve};
use crate::script::{CliArgs, PbsScript};
use crate::submit::{Submitter, persist};

/// A PBS job description with validated parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbsJob {
    params: ResolvedParams,
}

/// Outcome of [`PbsJob::dispatch`].
#[derive(Debug, Clone)]
pub struct Dispatch {
    /// Where the script was written.
    pub script_path: PathBuf,
    /// Exit status of the submission command, when submission is enabled.
    pub submission: Option<ExitStatus>,
}

impl Dispatch {
    /// Whether the script was handed to the submission command.
    pub fn submitted(&self) -> bool {
        self.submission.is_some()
    }
}

impl PbsJob {
    /// Create a job from already resolved parameters.
    pub fn new(params: ResolvedParams) -> Self {
        Self { params }
    }

    /// Resolve a parameter mapping into a job.
    pub fn from_value(params: &Value) -> PbsGenResult<Self> {
        Ok(Self::new(resolve(params)?))
    }

    /// Resolve a YAML (or JSON) parameter document into a job.
    pub fn from_yaml(source: &str) -> PbsGenResult<Self> {
        let value: Value = serde_yaml_ng::from_str(source)?;
        Self::from_value(&value)
    }

    /// The resolved parameters.
    pub fn params(&self) -> &ResolvedParams {
        &self.params
    }

    /// Build the script for running `function_path` with `cli_args`.
    pub fn script(&self, function_path: &Path, cli_args: &CliArgs) -> PbsScript {
        PbsScript::build(function_path, &self.params, cli_args)
    }

    /// Write the script to disk and submit it when the `submit` flag is set.
    pub async fn dispatch(
        &self,
        function_path: &Path,
        cli_args: &CliArgs,
        submitter: &Submitter,
    ) -> PbsGenResult<Dispatch> {
        let script = self.script(function_path, cli_args).to_string();
        let script_path = persist(&script, &self.params).await?;

        let submission = if self.params.submit {
            Some(submitter.submit(&script_path).await?)
        } else {
            info!(script = %script_path.display(), "Submission disabled, script left on disk");
            None
        };

        Ok(Dispatch {
            script_path,
            submission,
        })
    }
}
