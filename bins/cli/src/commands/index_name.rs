//! Index-name command handler.

use crate::error::CliError;
use crate::format::{CliOutput, OutputMode, json_line};
use rally_metrics_domain::{TrialTimestamp, index_name_for};

/// Print the yearly index a trial's metrics are written to.
pub fn run_index_name(mode: OutputMode, trial_timestamp: &str) -> Result<CliOutput, CliError> {
    let timestamp = TrialTimestamp::parse(trial_timestamp)?;
    let index = index_name_for(&timestamp);

    let stdout = if mode.is_json() {
        json_line(&serde_json::json!({
            "status": "ok",
            "trialTimestamp": timestamp.to_compact_stamp(),
            "index": index.as_str(),
        }))?
    } else {
        format!("{index}\n")
    };
    Ok(CliOutput::ok(stdout))
}
