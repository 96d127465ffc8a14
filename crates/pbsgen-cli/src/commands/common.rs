//! Shared helpers for CLI commands.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use pbsgen_sched::CliArgs;

/// Load a scheduler parameter file (YAML or JSON).
pub fn load_params(path: &str) -> Result<Value> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        anyhow::bail!("File not found: {path}");
    }

    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))?;

    let ext = path_obj.extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext.to_lowercase().as_str() {
        "json" => serde_json::from_str(&source)
            .with_context(|| format!("Failed to parse JSON parameters: {path}")),
        _ => serde_yaml_ng::from_str(&source)
            .with_context(|| format!("Failed to parse YAML parameters: {path}")),
    }
}

/// Apply command-line overrides to a parameter mapping.
///
/// Non-mapping inputs are left untouched so resolution can report them.
pub fn apply_overrides(params: &mut Value, output_dir: Option<&str>, no_submit: bool) {
    let Some(map) = params.as_object_mut() else {
        return;
    };
    if let Some(dir) = output_dir {
        map.insert("pbs_script_path".to_string(), Value::from(dir));
    }
    if no_submit {
        map.insert("submit".to_string(), Value::Bool(false));
    }
}

/// Parse a `key=value` program argument. A leading `--` on the key is dropped.
pub fn parse_program_arg(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let key = key.trim().trim_start_matches("--");
    if key.is_empty() {
        return Err(format!("empty argument name in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Collect parsed program arguments, keeping their order.
pub fn program_args(pairs: Vec<(String, String)>) -> CliArgs {
    pairs.into_iter().collect()
}

/// Absolute path of the program the job runs.
pub fn program_path(path: &str) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Failed to resolve program path: {path}"))
}
