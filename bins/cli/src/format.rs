//! Output format helpers for CLI commands.

use crate::error::{CliError, ExitCode};
use clap::{Args, ValueEnum};
use rally_metrics_shared::{ErrorEnvelope, is_secret_key};
use serde_json::{Map, Value};

const REDACTED_META: &str = "<redacted>";

/// Output format choices for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-friendly text output.
    Text,
    /// Machine-friendly JSON output.
    Json,
}

/// Output-related CLI flags.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output format for command responses.
    #[arg(long, global = true, value_enum)]
    pub output: Option<OutputFormat>,
    /// Emit store lifecycle events (JSON lines) on stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

/// Output mode derived from CLI flags.
#[derive(Debug, Clone, Copy)]
pub struct OutputMode {
    pub format: OutputFormat,
    pub verbose: bool,
}

impl OutputMode {
    /// Build output mode from CLI flags.
    #[must_use]
    pub const fn from_args(args: &OutputArgs) -> Self {
        let format = match args.output {
            Some(value) => value,
            None => OutputFormat::Text,
        };
        Self {
            format,
            verbose: args.verbose,
        }
    }

    /// Returns true when JSON output is requested.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }
}

/// Rendered command result.
#[derive(Debug)]
pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: ExitCode,
}

impl CliOutput {
    /// Successful output with nothing on stderr.
    #[must_use]
    pub const fn ok(stdout: String) -> Self {
        Self {
            stdout,
            stderr: String::new(),
            exit_code: ExitCode::Ok,
        }
    }
}

/// Pretty JSON with a trailing newline.
pub fn json_line(payload: &Value) -> Result<String, CliError> {
    let mut output = serde_json::to_string_pretty(payload)?;
    output.push('\n');
    Ok(output)
}

/// Render an error envelope in the requested format.
///
/// Secret-looking metadata keys are masked.
pub fn format_error_output(mode: OutputMode, error: &ErrorEnvelope) -> CliOutput {
    let exit_code = ExitCode::for_envelope(error);
    let meta = error
        .metadata
        .iter()
        .map(|(key, value)| {
            let value = if is_secret_key(key) {
                REDACTED_META
            } else {
                value.as_str()
            };
            (key.clone(), Value::from(value))
        })
        .collect::<Map<String, Value>>();

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "error",
            "error": {
                "code": error.code.to_string(),
                "message": error.message,
                "kind": error.kind.to_string(),
                "retriable": error.class.is_retriable(),
                "meta": meta,
            }
        });
        serde_json::to_string_pretty(&payload).map_or_else(
            |_| "{\"status\":\"error\"}\n".to_owned(),
            |mut out| {
                out.push('\n');
                out
            },
        )
    } else {
        let mut out = String::new();
        out.push_str("status: error\n");
        out.push_str("code: ");
        out.push_str(&error.code.to_string());
        out.push('\n');
        out.push_str("message: ");
        out.push_str(&error.message);
        out.push('\n');
        out.push_str("kind: ");
        out.push_str(&error.kind.to_string());
        out.push('\n');
        if !meta.is_empty() {
            out.push_str("meta:\n");
            for (key, value) in &meta {
                out.push_str("  ");
                out.push_str(key);
                out.push_str(": ");
                out.push_str(value.as_str().unwrap_or_default());
                out.push('\n');
            }
        }
        out
    };

    CliOutput {
        stdout,
        stderr: String::new(),
        exit_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rally_metrics_shared::{ErrorClass, ErrorCode};

    const TEXT: OutputMode = OutputMode {
        format: OutputFormat::Text,
        verbose: false,
    };

    #[test]
    fn error_formatting_redacts_sensitive_meta_keys() {
        let error = ErrorEnvelope::expected(ErrorCode::invalid_input(), "bad env")
            .with_metadata("datastorePassword", "hunter2") // pragma: allowlist secret
            .with_metadata("field", "timeoutMs");

        let output = format_error_output(TEXT, &error);
        assert!(output.stdout.contains("datastorePassword: <redacted>"));
        assert!(output.stdout.contains("field: timeoutMs"));
        assert!(!output.stdout.contains("hunter2"));
        assert_eq!(output.exit_code, ExitCode::InvalidInput);
    }

    #[test]
    fn store_failures_map_to_io_exit_code() -> Result<(), Box<dyn std::error::Error>> {
        let error = ErrorEnvelope::unexpected(
            ErrorCode::new("store", "connection"),
            "connection refused",
            ErrorClass::Retriable,
        );
        let output = format_error_output(
            OutputMode {
                format: OutputFormat::Json,
                verbose: false,
            },
            &error,
        );
        assert_eq!(output.exit_code, ExitCode::Io);

        let value: Value = serde_json::from_str(&output.stdout)?;
        assert_eq!(value["error"]["code"], "store:connection");
        assert_eq!(value["error"]["retriable"], true);
        Ok(())
    }
}
