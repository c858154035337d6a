//! Environment variable parsing and env-to-config merging.
//!
//! Env parsing is strict (invalid values fail fast) and secret values are
//! redacted in error metadata.

use crate::schema::{RallyConfig, ValidatedRallyConfig};
use rally_metrics_shared::{ErrorCode, ErrorEnvelope, SecretString, redact_if_secret};
use std::collections::BTreeMap;
use std::fmt;

/// Env var: environment name stamped on metric documents.
pub const ENV_ENV_NAME: &str = "RALLY_ENV_NAME";
/// Env var: datastore host.
pub const ENV_DATASTORE_HOST: &str = "RALLY_REPORTING_DATASTORE_HOST";
/// Env var: datastore port.
pub const ENV_DATASTORE_PORT: &str = "RALLY_REPORTING_DATASTORE_PORT";
/// Env var: datastore TLS enablement (true/false).
pub const ENV_DATASTORE_SECURE: &str = "RALLY_REPORTING_DATASTORE_SECURE";
/// Env var: datastore basic-auth user.
pub const ENV_DATASTORE_USER: &str = "RALLY_REPORTING_DATASTORE_USER";
/// Env var: datastore basic-auth password (secret).
// gitleaks:allow
pub const ENV_DATASTORE_PASSWORD: &str = "RALLY_REPORTING_DATASTORE_PASSWORD";
/// Env var: datastore request timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "RALLY_REPORTING_TIMEOUT_MS";
/// Env var: index template file override.
pub const ENV_TEMPLATE_PATH: &str = "RALLY_REPORTING_TEMPLATE_PATH";

const ALL_ENV_VARS: [&str; 8] = [
    ENV_ENV_NAME,
    ENV_DATASTORE_HOST,
    ENV_DATASTORE_PORT,
    ENV_DATASTORE_SECURE,
    ENV_DATASTORE_USER,
    ENV_DATASTORE_PASSWORD,
    ENV_TIMEOUT_MS,
    ENV_TEMPLATE_PATH,
];

/// Typed env-derived overrides for `RallyConfig`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RallyEnv {
    /// Override for `system.envName`.
    pub env_name: Option<Box<str>>,
    /// Override for `reporting.datastoreHost`.
    pub datastore_host: Option<Box<str>>,
    /// Override for `reporting.datastorePort`.
    pub datastore_port: Option<u32>,
    /// Override for `reporting.datastoreSecure`.
    pub datastore_secure: Option<bool>,
    /// Override for `reporting.datastoreUser`.
    pub datastore_user: Option<Box<str>>,
    /// Secret: override for `reporting.datastorePassword`.
    pub datastore_password: Option<SecretString>,
    /// Override for `reporting.timeoutMs`.
    pub timeout_ms: Option<u64>,
    /// Override for `reporting.template.path`.
    pub template_path: Option<Box<str>>,
}

impl RallyEnv {
    /// Parse env overrides from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            env_name: parse_optional_trimmed_string(map, ENV_ENV_NAME)?,
            datastore_host: parse_optional_trimmed_string(map, ENV_DATASTORE_HOST)?,
            datastore_port: parse_optional_u32(map, ENV_DATASTORE_PORT)?,
            datastore_secure: parse_optional_bool(map, ENV_DATASTORE_SECURE)?,
            datastore_user: parse_optional_trimmed_string(map, ENV_DATASTORE_USER)?,
            datastore_password: parse_optional_secret(map, ENV_DATASTORE_PASSWORD)?,
            timeout_ms: parse_optional_u64(map, ENV_TIMEOUT_MS)?,
            template_path: parse_optional_trimmed_string(map, ENV_TEMPLATE_PATH)?,
        })
    }

    /// Parse env overrides from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let map = ALL_ENV_VARS
            .into_iter()
            .filter_map(|name| {
                std::env::var(name)
                    .ok()
                    .map(|value| (name.to_owned(), value))
            })
            .collect();
        Self::from_map(&map)
    }
}

/// Apply env overrides to a base config (env wins over file/default values).
pub fn apply_env_overrides(
    base: RallyConfig,
    env: &RallyEnv,
) -> Result<ValidatedRallyConfig, ErrorEnvelope> {
    let mut config = base;

    set_clone(&mut config.system.env_name, env.env_name.as_ref());

    let reporting = &mut config.reporting;
    set_clone(&mut reporting.datastore_host, env.datastore_host.as_ref());
    set_copy(&mut reporting.datastore_port, env.datastore_port);
    set_copy(&mut reporting.datastore_secure, env.datastore_secure);
    set_option(&mut reporting.datastore_user, env.datastore_user.as_ref());
    set_option(
        &mut reporting.datastore_password,
        env.datastore_password.as_ref(),
    );
    set_copy(&mut reporting.timeout_ms, env.timeout_ms);
    set_option(&mut reporting.template.path, env.template_path.as_ref());

    config.validate_and_normalize().map_err(Into::into)
}

fn set_copy<T: Copy>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn set_clone<T: Clone>(field: &mut T, value: Option<&T>) {
    if let Some(value) = value {
        field.clone_from(value);
    }
}

fn set_option<T: Clone>(field: &mut Option<T>, value: Option<&T>) {
    if let Some(value) = value {
        *field = Some(value.clone());
    }
}

/// Validation failures when parsing env variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// A secret env var was present but empty after trimming.
    EmptySecret {
        /// Env var name.
        var: &'static str,
    },
    /// Boolean env var had an invalid value.
    InvalidBool {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Integer env var had an invalid value.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } | Self::EmptySecret { .. } => {
                ErrorCode::new("config", "empty_env_var")
            },
            Self::InvalidBool { .. } => ErrorCode::new("config", "invalid_env_bool"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } | Self::EmptySecret { var } => {
                write!(formatter, "{var} must be non-empty")
            },
            Self::InvalidBool { var, .. } => write!(formatter, "{var} must be a boolean"),
            Self::InvalidInt { var, .. } => write!(formatter, "{var} must be an integer"),
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());

        match error {
            EnvParseError::EmptyValue { var } | EnvParseError::EmptySecret { var } => {
                envelope.with_metadata("env_var", var)
            },
            EnvParseError::InvalidBool { var, value } | EnvParseError::InvalidInt { var, value } => {
                envelope
                    .with_metadata("env_var", var)
                    .with_metadata("value", redact_if_secret(var, &value))
            },
        }
    }
}

fn present<'a>(
    map: &'a BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<&'a str>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }
    Ok(Some(trimmed))
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    Ok(present(map, var)?.map(Into::into))
}

fn parse_optional_secret(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<SecretString>, EnvParseError> {
    match present(map, var) {
        Ok(value) => Ok(value.map(SecretString::from)),
        Err(EnvParseError::EmptyValue { var }) => Err(EnvParseError::EmptySecret { var }),
        Err(error) => Err(error),
    }
}

fn parse_optional_u64(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u64>, EnvParseError> {
    present(map, var)?
        .map(|value| {
            value.parse::<u64>().map_err(|_| EnvParseError::InvalidInt {
                var,
                value: value.to_owned(),
            })
        })
        .transpose()
}

fn parse_optional_u32(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u32>, EnvParseError> {
    present(map, var)?
        .map(|value| {
            value.parse::<u32>().map_err(|_| EnvParseError::InvalidInt {
                var,
                value: value.to_owned(),
            })
        })
        .transpose()
}

fn parse_optional_bool(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<bool>, EnvParseError> {
    let Some(value) = present(map, var)? else {
        return Ok(None);
    };

    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(EnvParseError::InvalidBool {
            var,
            value: value.to_owned(),
        }),
    }
}
