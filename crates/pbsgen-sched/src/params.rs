//! Scheduler parameter resolution.
//!
//! Callers describe a job as a flat mapping of parameter names to values
//! (usually read from a YAML or JSON file). [`resolve`] checks that the
//! required parameters are present, fills in defaults for the optional ones
//! and produces a [`ResolvedParams`] that the script renderer consumes.
//!
//! | Parameter             | Required | Default |
//! |-----------------------|----------|---------|
//! | `job_name`            | yes      |         |
//! | `queue`               | yes      |         |
//! | `ngpus`               | yes      |         |
//! | `ncpus`               | yes      |         |
//! | `merge_stdout_stderr` | no       | `true`  |
//! | `walltime_h`          | no       | `72`    |
//! | `modules_to_load`     | no       | `[]`    |
//! | `virtual_env_path`    | no       | unset   |
//! | `anaconda_env_name`   | no       | unset   |
//! | `pbs_script_path`     | no       | unset (system temp directory) |
//! | `submit`              | no       | `true`  |

use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{PbsGenError, PbsGenResult};

/// Parameters every job description must carry.
pub const REQUIRED_KEYS: [&str; 4] = ["job_name", "queue", "ngpus", "ncpus"];

/// Parameters that fall back to a default when absent.
pub const OPTIONAL_KEYS: [&str; 7] = [
    "merge_stdout_stderr",
    "walltime_h",
    "modules_to_load",
    "virtual_env_path",
    "anaconda_env_name",
    "pbs_script_path",
    "submit",
];

/// Wall-clock limit applied when `walltime_h` is not given.
pub const DEFAULT_WALLTIME_H: u32 = 72;

/// Fully resolved scheduler parameters.
///
/// Every field is populated: either with the caller's value or with the
/// documented default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedParams {
    /// PBS job name (`#PBS -N`).
    pub job_name: String,
    /// Destination queue (`#PBS -q`).
    pub queue: String,
    /// GPUs requested in the select statement.
    pub ngpus: u32,
    /// CPUs requested in the select statement.
    pub ncpus: u32,
    /// Whether to emit the `#PBS -j eo` directive.
    pub merge_stdout_stderr: bool,
    /// Wall-clock limit in whole hours.
    pub walltime_h: u32,
    /// Environment modules loaded before the program runs, in order.
    pub modules_to_load: Vec<String>,
    /// Root of a Python virtual environment to activate.
    pub virtual_env_path: Option<PathBuf>,
    /// Name of a conda environment to activate.
    pub anaconda_env_name: Option<String>,
    /// Directory the generated script is written to.
    pub pbs_script_path: Option<PathBuf>,
    /// Whether the script is handed to `qsub` after being written.
    pub submit: bool,
}

impl ResolvedParams {
    /// Create parameters from the required values, with every optional
    /// parameter at its default.
    pub fn new(
        job_name: impl Into<String>,
        queue: impl Into<String>,
        ngpus: u32,
        ncpus: u32,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            queue: queue.into(),
            ngpus,
            ncpus,
            merge_stdout_stderr: true,
            walltime_h: DEFAULT_WALLTIME_H,
            modules_to_load: Vec::new(),
            virtual_env_path: None,
            anaconda_env_name: None,
            pbs_script_path: None,
            submit: true,
        }
    }

    /// Set whether stdout and stderr are merged.
    pub fn with_merge_stdout_stderr(mut self, merge: bool) -> Self {
        self.merge_stdout_stderr = merge;
        self
    }

    /// Set the wall-clock limit in hours.
    pub fn with_walltime_h(mut self, hours: u32) -> Self {
        self.walltime_h = hours;
        self
    }

    /// Set the modules to load.
    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules_to_load = modules.into_iter().map(Into::into).collect();
        self
    }

    /// Set the virtual environment to activate.
    pub fn with_virtual_env(mut self, path: impl Into<PathBuf>) -> Self {
        self.virtual_env_path = Some(path.into());
        self
    }

    /// Set the conda environment to activate.
    pub fn with_anaconda_env(mut self, name: impl Into<String>) -> Self {
        self.anaconda_env_name = Some(name.into());
        self
    }

    /// Set the directory the script is written to.
    pub fn with_script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pbs_script_path = Some(dir.into());
        self
    }

    /// Set whether the script is submitted after being written.
    pub fn with_submit(mut self, submit: bool) -> Self {
        self.submit = submit;
        self
    }

    /// Serialize back into a parameter mapping.
    ///
    /// The result always holds exactly [`REQUIRED_KEYS`] and [`OPTIONAL_KEYS`].
    pub fn to_value(&self) -> PbsGenResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Resolve a parameter mapping into [`ResolvedParams`].
///
/// Fails with [`PbsGenError::InvalidInputKind`] when `params` is not a
/// mapping and with [`PbsGenError::MissingRequiredField`] naming every absent
/// required key. Values given by the caller are kept as-is, including falsy
/// ones such as `walltime_h: 0` or `submit: false`. Falsy
/// `virtual_env_path`/`anaconda_env_name` values mean no activation.
///
/// Beyond key presence, values must also fit their typed field: counts must
/// be non-negative integers, text fields scalars and `modules_to_load` a list.
/// Anything else fails with [`PbsGenError::InvalidFieldValue`].
pub fn resolve(params: &Value) -> PbsGenResult<ResolvedParams> {
    let map = params
        .as_object()
        .ok_or_else(|| PbsGenError::InvalidInputKind(kind_of(params).to_string()))?;

    let missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| !map.contains_key(**key))
        .map(|key| (*key).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PbsGenError::MissingRequiredField(missing));
    }

    for key in map.keys() {
        if !REQUIRED_KEYS.contains(&key.as_str()) && !OPTIONAL_KEYS.contains(&key.as_str()) {
            warn!(key = %key, "Ignoring unrecognized scheduler parameter");
        }
    }

    let defaults: Vec<&str> = OPTIONAL_KEYS
        .iter()
        .copied()
        .filter(|key| !map.contains_key(*key))
        .collect();
    debug!(?defaults, "Applying default scheduler parameters");

    let mut resolved = ResolvedParams::new(
        text(map, "job_name")?,
        text(map, "queue")?,
        count(map, "ngpus")?,
        count(map, "ncpus")?,
    );

    if let Some(value) = map.get("merge_stdout_stderr") {
        resolved.merge_stdout_stderr = truthy(value);
    }
    if map.contains_key("walltime_h") {
        resolved.walltime_h = count(map, "walltime_h")?;
    }
    if let Some(value) = map.get("modules_to_load") {
        resolved.modules_to_load = modules(value)?;
    }
    resolved.virtual_env_path = activation_text(map, "virtual_env_path")?.map(PathBuf::from);
    resolved.anaconda_env_name = activation_text(map, "anaconda_env_name")?;
    resolved.pbs_script_path = optional_text(map, "pbs_script_path")?.map(PathBuf::from);
    if let Some(value) = map.get("submit") {
        resolved.submit = truthy(value);
    }

    Ok(resolved)
}

/// Human readable name of a JSON value's kind.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Render a scalar as the text that ends up in the script.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Truthiness of a flag value. Strings such as `"oe"` count as set.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn text(map: &Map<String, Value>, key: &str) -> PbsGenResult<String> {
    let value = &map[key];
    scalar_text(value).ok_or_else(|| {
        PbsGenError::invalid_field(key, format!("expected text, found {}", kind_of(value)))
    })
}

fn optional_text(map: &Map<String, Value>, key: &str) -> PbsGenResult<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => text(map, key).map(Some),
    }
}

/// Like [`optional_text`], but falsy values (`""`, `false`, `0`) mean unset.
fn activation_text(map: &Map<String, Value>, key: &str) -> PbsGenResult<Option<String>> {
    match map.get(key) {
        Some(value) if !truthy(value) => Ok(None),
        _ => optional_text(map, key),
    }
}

fn count(map: &Map<String, Value>, key: &str) -> PbsGenResult<u32> {
    let value = &map[key];
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        PbsGenError::invalid_field(
            key,
            format!("expected a non-negative integer, found {}", kind_of(value)),
        )
    })
}

fn modules(value: &Value) -> PbsGenResult<Vec<String>> {
    let items = value.as_array().ok_or_else(|| {
        PbsGenError::invalid_field(
            "modules_to_load",
            format!("expected a list of module names, found {}", kind_of(value)),
        )
    })?;
    items
        .iter()
        .map(|item| {
            scalar_text(item).ok_or_else(|| {
                PbsGenError::invalid_field(
                    "modules_to_load",
                    format!("expected module names, found {}", kind_of(item)),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn required() -> Value {
        json!({
            "job_name": "test_job",
            "queue": "gpu",
            "ngpus": 4,
            "ncpus": 24
        })
    }

    #[test]
    fn test_missing_queue() {
        let params = json!({
            "job_name": "test_job",
            "ngpus": 4,
            "ncpus": 24
        });
        match resolve(&params) {
            Err(PbsGenError::MissingRequiredField(missing)) => {
                assert_eq!(missing, vec!["queue".to_string()]);
            }
            other => panic!("expected MissingRequiredField, got {other:?}"),
        }
    }

    #[test]
    fn test_reports_every_missing_field() {
        let params = json!({ "ngpus": 1 });
        match resolve(&params) {
            Err(PbsGenError::MissingRequiredField(missing)) => {
                assert_eq!(missing, vec!["job_name", "queue", "ncpus"]);
            }
            other => panic!("expected MissingRequiredField, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_mapping() {
        let err = resolve(&json!(["job_name", "queue"])).unwrap_err();
        assert!(matches!(err, PbsGenError::InvalidInputKind(ref kind) if kind == "a list"));

        let err = resolve(&Value::Null).unwrap_err();
        assert!(matches!(err, PbsGenError::InvalidInputKind(_)));
    }

    #[test]
    fn test_defaults() {
        let resolved = resolve(&required()).unwrap();
        assert_eq!(resolved, ResolvedParams::new("test_job", "gpu", 4, 24));
        assert!(resolved.merge_stdout_stderr);
        assert_eq!(resolved.walltime_h, 72);
        assert!(resolved.modules_to_load.is_empty());
        assert!(resolved.virtual_env_path.is_none());
        assert!(resolved.anaconda_env_name.is_none());
        assert!(resolved.pbs_script_path.is_none());
        assert!(resolved.submit);
    }

    #[test]
    fn test_key_set_after_resolution() {
        let resolved = resolve(&required()).unwrap();
        let value = resolved.to_value().unwrap();
        let mut keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();

        let mut expected: Vec<&str> = REQUIRED_KEYS
            .iter()
            .chain(OPTIONAL_KEYS.iter())
            .copied()
            .collect();
        expected.sort_unstable();
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_falsy_values_are_preserved() {
        let mut params = required();
        let map = params.as_object_mut().unwrap();
        map.insert("walltime_h".into(), json!(0));
        map.insert("submit".into(), json!(false));
        map.insert("merge_stdout_stderr".into(), json!(false));
        map.insert("modules_to_load".into(), json!([]));

        let resolved = resolve(&params).unwrap();
        assert_eq!(resolved.walltime_h, 0);
        assert!(!resolved.submit);
        assert!(!resolved.merge_stdout_stderr);
    }

    #[test]
    fn test_caller_values_are_kept() {
        let params = json!({
            "job_name": "train",
            "queue": "short",
            "ngpus": 1,
            "ncpus": 8,
            "walltime_h": 5,
            "modules_to_load": ["proxy", "cuda/12.1"],
            "virtual_env_path": "/home/user/venv",
            "anaconda_env_name": null,
            "pbs_script_path": "./scripts",
            "submit": false
        });
        let resolved = resolve(&params).unwrap();
        assert_eq!(resolved.walltime_h, 5);
        assert_eq!(resolved.modules_to_load, vec!["proxy", "cuda/12.1"]);
        assert_eq!(resolved.virtual_env_path, Some(PathBuf::from("/home/user/venv")));
        assert_eq!(resolved.anaconda_env_name, None);
        assert_eq!(resolved.pbs_script_path, Some(PathBuf::from("./scripts")));
        assert!(!resolved.submit);
    }

    #[test]
    fn test_merge_flag_accepts_join_mode_string() {
        let mut params = required();
        params["merge_stdout_stderr"] = json!("oe");
        assert!(resolve(&params).unwrap().merge_stdout_stderr);

        params["merge_stdout_stderr"] = json!("");
        assert!(!resolve(&params).unwrap().merge_stdout_stderr);
    }

    #[test]
    fn test_scalar_text_fields() {
        let params = json!({
            "job_name": 7,
            "queue": "gpu",
            "ngpus": "2",
            "ncpus": 4
        });
        let resolved = resolve(&params).unwrap();
        assert_eq!(resolved.job_name, "7");
        assert_eq!(resolved.ngpus, 2);
    }

    #[test]
    fn test_invalid_count() {
        let mut params = required();
        params["ngpus"] = json!("four");
        let err = resolve(&params).unwrap_err();
        assert!(matches!(
            err,
            PbsGenError::InvalidFieldValue { ref field, .. } if field == "ngpus"
        ));

        params["ngpus"] = json!(-1);
        assert!(resolve(&params).is_err());
    }

    #[test]
    fn test_invalid_modules() {
        let mut params = required();
        params["modules_to_load"] = json!("proxy");
        let err = resolve(&params).unwrap_err();
        assert!(matches!(
            err,
            PbsGenError::InvalidFieldValue { ref field, .. } if field == "modules_to_load"
        ));
    }

    #[test]
    fn test_falsy_activation_values_are_unset() {
        let mut params = required();
        params["virtual_env_path"] = json!("");
        params["anaconda_env_name"] = json!(false);
        let resolved = resolve(&params).unwrap();
        assert!(resolved.virtual_env_path.is_none());
        assert!(resolved.anaconda_env_name.is_none());

        params["anaconda_env_name"] = json!(0);
        assert!(resolve(&params).unwrap().anaconda_env_name.is_none());
    }

    #[test]
    fn test_null_walltime_is_rejected() {
        let mut params = required();
        params["walltime_h"] = Value::Null;
        let err = resolve(&params).unwrap_err();
        assert!(matches!(
            err,
            PbsGenError::InvalidFieldValue { ref field, .. } if field == "walltime_h"
        ));
    }

    #[test]
    fn test_unrecognized_keys_are_dropped() {
        let mut params = required();
        params["memory"] = json!("16gb");
        let value = resolve(&params).unwrap().to_value().unwrap();
        assert!(value.get("memory").is_none());
    }

    #[test]
    fn test_builder() {
        let params = ResolvedParams::new("job", "gpu", 1, 2)
            .with_walltime_h(4)
            .with_modules(["a", "b"])
            .with_virtual_env("/venv")
            .with_anaconda_env("env")
            .with_script_dir("/out")
            .with_merge_stdout_stderr(false)
            .with_submit(false);

        assert_eq!(params.walltime_h, 4);
        assert_eq!(params.modules_to_load, vec!["a", "b"]);
        assert_eq!(params.virtual_env_path, Some(PathBuf::from("/venv")));
        assert_eq!(params.anaconda_env_name.as_deref(), Some("env"));
        assert_eq!(params.pbs_script_path, Some(PathBuf::from("/out")));
        assert!(!params.merge_stdout_stderr);
        assert!(!params.submit);
    }
}
