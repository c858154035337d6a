//! Get command handler.

use super::{StoreContext, TrialArgs};
use crate::error::{CliError, ExitCode};
use crate::format::{CliOutput, OutputMode, json_line};
use rally_metrics_domain::MetricName;

/// Inputs for `get`.
#[derive(Debug, Clone)]
pub struct GetCommandInput {
    pub trial: TrialArgs,
    pub name: String,
    pub all: bool,
}

/// Read back one metric (or every stored value with `all`) of a trial.
///
/// No match exits with [`ExitCode::NotFound`].
pub fn run_get(
    mode: OutputMode,
    context: &StoreContext<'_>,
    input: &GetCommandInput,
) -> Result<CliOutput, CliError> {
    let trial = input.trial.parse()?;
    let name = MetricName::parse(&input.name)?;
    let store = context.open(trial, false)?;

    let values = if input.all {
        store.get(&name)?
    } else {
        store.get_one(&name)?.into_iter().collect()
    };
    let index = store
        .index_name()
        .map(|index| index.as_str().to_owned())
        .unwrap_or_default();

    if values.is_empty() {
        return not_found(mode, &index, &name);
    }

    let stdout = if mode.is_json() {
        let payload = if input.all {
            serde_json::json!({
                "status": "ok",
                "index": index,
                "name": name.as_str(),
                "values": values,
            })
        } else {
            serde_json::json!({
                "status": "ok",
                "index": index,
                "name": name.as_str(),
                "value": values.first(),
            })
        };
        json_line(&payload)?
    } else {
        let mut out = format!("status: ok\nindex: {index}\nname: {name}\n");
        for value in &values {
            out.push_str(&format!("value: {value}\n"));
        }
        out
    };
    Ok(CliOutput::ok(stdout))
}

fn not_found(mode: OutputMode, index: &str, name: &MetricName) -> Result<CliOutput, CliError> {
    let stdout = if mode.is_json() {
        json_line(&serde_json::json!({
            "status": "not_found",
            "index": index,
            "name": name.as_str(),
        }))?
    } else {
        format!("status: not_found\nindex: {index}\nname: {name}\n")
    };
    Ok(CliOutput {
        stdout,
        stderr: format!("no value recorded for `{name}` in this trial\n"),
        exit_code: ExitCode::NotFound,
    })
}
