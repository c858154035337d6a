//! Config loading helpers (env + file + overrides).
//!
//! The loader is responsible for deterministic merge order and surfacing
//! user-facing errors as typed `ErrorEnvelope`s.

use crate::env::{RallyEnv, apply_env_overrides};
use crate::schema::{RallyConfig, ValidatedRallyConfig, deserialize_secret};
use rally_metrics_shared::{ErrorClass, ErrorCode, ErrorEnvelope, SecretString};
use serde::Deserialize;
use std::path::Path;

/// On-disk config format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON document.
    Json,
    /// TOML document.
    Toml,
}

/// Load the config from sources using a deterministic precedence order.
///
/// Precedence (highest wins):
/// - env overrides (`RallyEnv`)
/// - overrides JSON (partial config)
/// - config document
/// - defaults (`RallyConfig::default()`)
pub fn load_config_from_sources(
    config: Option<(&str, ConfigFormat)>,
    overrides_json: Option<&str>,
    env: &RallyEnv,
) -> Result<ValidatedRallyConfig, ErrorEnvelope> {
    let mut base = match config {
        None => RallyConfig::default(),
        Some((input, format)) => parse_config_unvalidated(input, format)?,
    };

    if let Some(input) = overrides_json {
        parse_overrides_json(input)?.apply(&mut base);
    }

    // env is applied last and also validates/normalizes the resulting config.
    apply_env_overrides(base, env)
}

/// Load the config from an optional file path.
pub fn load_config_from_path(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    env: &RallyEnv,
) -> Result<ValidatedRallyConfig, ErrorEnvelope> {
    match config_path {
        None => load_config_from_sources(None, overrides_json, env),
        Some(path) => {
            let format = detect_config_format(path)?;
            let text = read_config_file(path)?;
            load_config_from_sources(Some((&text, format)), overrides_json, env)
        },
    }
}

/// Load the config from std env and an optional file path.
pub fn load_config_std_env(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<ValidatedRallyConfig, ErrorEnvelope> {
    let env = RallyEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_config_from_path(config_path, overrides_json, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
pub fn to_pretty_json(config: &RallyConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as deterministic pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &RallyConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    if !output.ends_with('\n') {
        output.push('\n');
    }
    Ok(output)
}

fn parse_config_unvalidated(
    input: &str,
    format: ConfigFormat,
) -> Result<RallyConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn parse_overrides_json(input: &str) -> Result<RallyConfigOverrides, ErrorEnvelope> {
    serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid overrides JSON: {error}"),
        )
        .with_metadata("source", "overrides")
    })
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => Ok(ConfigFormat::Json),
        None | Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .toml or .json",
        )
        .with_metadata("extension", other.to_string())),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct RallyConfigOverrides {
    version: Option<u32>,
    system: SystemConfigOverrides,
    reporting: ReportingConfigOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct SystemConfigOverrides {
    env_name: Option<Box<str>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct ReportingConfigOverrides {
    datastore_host: Option<Box<str>>,
    datastore_port: Option<u32>,
    datastore_secure: Option<bool>,
    datastore_user: Option<Box<str>>,
    #[serde(deserialize_with = "deserialize_secret")]
    datastore_password: Option<SecretString>,
    timeout_ms: Option<u64>,
    template: TemplateConfigOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct TemplateConfigOverrides {
    path: Option<Box<str>>,
}

impl RallyConfigOverrides {
    fn apply(self, config: &mut RallyConfig) {
        if let Some(version) = self.version {
            config.version = version;
        }
        if let Some(env_name) = self.system.env_name {
            config.system.env_name = env_name;
        }

        let overrides = self.reporting;
        let reporting = &mut config.reporting;
        if let Some(host) = overrides.datastore_host {
            reporting.datastore_host = host;
        }
        if let Some(port) = overrides.datastore_port {
            reporting.datastore_port = port;
        }
        if let Some(secure) = overrides.datastore_secure {
            reporting.datastore_secure = secure;
        }
        if overrides.datastore_user.is_some() {
            reporting.datastore_user = overrides.datastore_user;
        }
        if overrides.datastore_password.is_some() {
            reporting.datastore_password = overrides.datastore_password;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            reporting.timeout_ms = timeout_ms;
        }
        if overrides.template.path.is_some() {
            reporting.template.path = overrides.template.path;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG_TOML: &str = r#"
        version = 1

        [system]
        envName = "file"

        [reporting]
        datastoreHost = "es-file"
        timeoutMs = 45000
    "#;

    #[test]
    fn override_precedence_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
        let overrides_json =
            r#"{ "reporting": { "timeoutMs": 50000, "datastoreHost": "es-overrides" } }"#;
        let env = RallyEnv {
            timeout_ms: Some(60_000),
            ..RallyEnv::default()
        };

        let config = load_config_from_sources(
            Some((CONFIG_TOML, ConfigFormat::Toml)),
            Some(overrides_json),
            &env,
        )?;
        assert_eq!(config.reporting.timeout_ms, 60_000);
        assert_eq!(&*config.reporting.datastore_host, "es-overrides");
        assert_eq!(&*config.system.env_name, "file");
        Ok(())
    }

    #[test]
    fn serialization_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
        let config = load_config_from_sources(None, None, &RallyEnv::default())?;
        assert_eq!(to_pretty_json(&config)?, to_pretty_json(&config)?);
        assert_eq!(to_pretty_toml(&config)?, to_pretty_toml(&config)?);
        Ok(())
    }

    #[test]
    fn invalid_config_value_overridden_by_valid_env_succeeds()
    -> Result<(), Box<dyn std::error::Error>> {
        let config_json = r#"{ "version": 1, "reporting": { "timeoutMs": 500 } }"#;
        let env = RallyEnv {
            timeout_ms: Some(30_000),
            ..RallyEnv::default()
        };

        let config =
            load_config_from_sources(Some((config_json, ConfigFormat::Json)), None, &env)?;
        assert_eq!(config.reporting.timeout_ms, 30_000);
        Ok(())
    }

    #[test]
    fn malformed_overrides_fail_with_source() -> Result<(), Box<dyn std::error::Error>> {
        let error = load_config_from_sources(
            Some((CONFIG_TOML, ConfigFormat::Toml)),
            Some(r#"{ "reporting": { "timeoutMs": }"#),
            &RallyEnv::default(),
        )
        .err()
        .ok_or_else(|| std::io::Error::other("expected overrides error"))?;

        assert_eq!(error.code, ErrorCode::new("config", "invalid_json"));
        assert_eq!(
            error.metadata.get("source").map(String::as_str),
            Some("overrides")
        );
        Ok(())
    }

    #[test]
    fn env_validation_fails_with_invalid_env_value() -> Result<(), Box<dyn std::error::Error>> {
        let env = RallyEnv {
            timeout_ms: Some(100),
            ..RallyEnv::default()
        };

        let error = load_config_from_sources(None, None, &env)
            .err()
            .ok_or_else(|| std::io::Error::other("expected env validation error"))?;
        assert_eq!(error.code, ErrorCode::new("config", "invalid_timeout"));
        Ok(())
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let error = load_config_from_path(
            Some(Path::new("rally.yaml")),
            None,
            &RallyEnv::default(),
        )
        .err();
        assert!(error.is_some_and(|error| error.has_code("config", "unsupported_format")));
    }
}
