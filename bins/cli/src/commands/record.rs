//! Record command handler.

use super::metric_spec::{MetricAmount, MetricSpec};
use super::{StoreContext, TrialArgs};
use crate::error::CliError;
use crate::format::{CliOutput, OutputMode, json_line};
use rally_metrics_domain::MetricValue;

/// Inputs for `record`.
#[derive(Debug, Clone)]
pub struct RecordCommandInput {
    pub trial: TrialArgs,
    pub create: bool,
    pub metrics: Vec<String>,
}

/// Open the trial, buffer every metric and flush on close.
///
/// All arguments are validated before the store is touched.
pub fn run_record(
    mode: OutputMode,
    context: &StoreContext<'_>,
    input: &RecordCommandInput,
) -> Result<CliOutput, CliError> {
    let trial = input.trial.parse()?;
    let specs = input
        .metrics
        .iter()
        .map(|raw| MetricSpec::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;
    if specs.is_empty() {
        return Err(CliError::InvalidInput(
            "at least one --metric is required".to_owned(),
        ));
    }

    let mut store = context.open(trial, input.create)?;
    for spec in &specs {
        match spec.amount {
            MetricAmount::Count(count) => {
                store.put_count(spec.name.clone(), count, &spec.unit)?;
            },
            MetricAmount::Value(value) => {
                store.put_value(spec.name.clone(), value, &spec.unit)?;
            },
        }
    }
    let recorded = store
        .buffered()
        .iter()
        .map(|doc| (doc.name().to_string(), doc.value(), doc.unit().to_owned()))
        .collect::<Vec<_>>();
    store.close()?;

    let index = store
        .index_name()
        .map(|index| index.as_str().to_owned())
        .unwrap_or_default();

    let stdout = if mode.is_json() {
        let metrics = recorded
            .iter()
            .map(|(name, value, unit)| {
                serde_json::json!({ "name": name, "value": value, "unit": unit })
            })
            .collect::<Vec<_>>();
        json_line(&serde_json::json!({
            "status": "ok",
            "index": index,
            "recorded": recorded.len(),
            "metrics": metrics,
        }))?
    } else {
        let mut out = format!("status: ok\nindex: {index}\nrecorded: {}\n", recorded.len());
        for (name, value, unit) in &recorded {
            out.push_str(&format_metric_line(name, *value, unit));
        }
        out
    };
    Ok(CliOutput::ok(stdout))
}

fn format_metric_line(name: &str, value: MetricValue, unit: &str) -> String {
    if unit.is_empty() {
        format!("  {name}: {value}\n")
    } else {
        format!("  {name}: {value} {unit}\n")
    }
}
