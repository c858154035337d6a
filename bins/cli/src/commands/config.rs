//! Config command handlers.

use crate::error::CliError;
use crate::format::{CliOutput, OutputMode, json_line};
use rally_metrics_infra::{load_effective_config_json, load_effective_config_toml};
use std::collections::BTreeMap;
use std::path::Path;

/// Print the effective config (defaults, file, overrides and env merged).
///
/// Text output is TOML; the password is never rendered.
pub fn run_config_show(
    mode: OutputMode,
    env: &BTreeMap<String, String>,
    path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<CliOutput, CliError> {
    let stdout = if mode.is_json() {
        let config_json = load_effective_config_json(env, path, overrides_json)?;
        let config_value: serde_json::Value = serde_json::from_str(config_json.trim())?;
        json_line(&serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
            "effectiveConfig": config_value,
        }))?
    } else {
        load_effective_config_toml(env, path, overrides_json)?
    };
    Ok(CliOutput::ok(stdout))
}
