//! PBS batch script rendering.

use std::fmt;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::{PbsGenError, PbsGenResult};
use crate::params::{ResolvedParams, kind_of};

/// Interpreter used for the final invocation line.
pub const INTERPRETER: &str = "python";

/// Lines emitted to activate a named conda environment, before `source activate`.
const CONDA_BASE_LINES: [&str; 2] = [
    "CONDA_BASE_DIR=$(dirname $(dirname \"$CONDA_EXE\"))",
    "source \"$CONDA_BASE_DIR/etc/profile.d/conda.sh\"",
];

/// Ordered command-line arguments forwarded to the program.
///
/// Each entry becomes a `--<key> <value>` pair on the invocation line, in
/// insertion order. Values are plain text; no quoting is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    entries: Vec<(String, String)>,
}

impl CliArgs {
    /// Create an empty argument mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.insert(key, value);
        self
    }

    /// Set an argument. An existing key keeps its position and takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        let key = key.into();
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Build from a JSON object, keeping its field order.
    ///
    /// Strings are used verbatim; every other value is rendered as JSON text.
    pub fn from_json(value: &Value) -> PbsGenResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| PbsGenError::InvalidInputKind(kind_of(value).to_string()))?;
        Ok(object
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => (key.clone(), s.clone()),
                other => (key.clone(), other.to_string()),
            })
            .collect())
    }

    /// Iterate over `(key, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for CliArgs
where
    K: Into<String>,
    V: fmt::Display,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = CliArgs::new();
        for (key, value) in iter {
            args.insert(key, value);
        }
        args
    }
}

/// A rendered PBS batch script.
///
/// Lines are fixed once built; the script is only ever serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbsScript {
    lines: Vec<String>,
}

impl PbsScript {
    /// Assemble the script for running `function_path` with `cli_args`.
    ///
    /// Directives come first, then module loads, then environment
    /// activation, then the single invocation line.
    pub fn build(function_path: &Path, params: &ResolvedParams, cli_args: &CliArgs) -> Self {
        let mut lines = Vec::new();

        // Shebang
        lines.push("#!/bin/bash".to_string());

        // PBS directives
        lines.push(format!("#PBS -N {}", params.job_name));
        if params.merge_stdout_stderr {
            lines.push("#PBS -j eo".to_string());
        }
        lines.push(select_directive(params));

        for module in &params.modules_to_load {
            lines.push(format!("module load {module}"));
        }

        // Environment activation. Both blocks are allowed together.
        if let Some(ref venv) = params.virtual_env_path {
            lines.push(format!("source {}/bin/activate", venv.display()));
        }
        if let Some(ref env) = params.anaconda_env_name {
            lines.extend(CONDA_BASE_LINES.iter().map(|line| (*line).to_string()));
            lines.push(format!("source activate {env}"));
        }

        lines.push(invocation_line(function_path, cli_args));

        debug!(
            job_name = %params.job_name,
            lines = lines.len(),
            "Rendered PBS script"
        );

        Self { lines }
    }

    /// Script lines in order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for PbsScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

/// Render the script text for `function_path`.
///
/// Deterministic: identical inputs always produce identical text.
pub fn render(function_path: &Path, params: &ResolvedParams, cli_args: &CliArgs) -> String {
    PbsScript::build(function_path, params, cli_args).to_string()
}

/// Queue and resource selection directive.
fn select_directive(params: &ResolvedParams) -> String {
    format!(
        "#PBS -q {} -l select=1:ngpus={}:ncpus={},walltime={:02}:00:00",
        params.queue, params.ngpus, params.ncpus, params.walltime_h
    )
}

fn invocation_line(function_path: &Path, cli_args: &CliArgs) -> String {
    let mut line = format!("{INTERPRETER} {}", function_path.display());
    for (key, value) in cli_args.iter() {
        line.push_str(&format!(" --{key} {value}"));
    }
    line.trim_end().to_string()
}
