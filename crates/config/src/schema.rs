//! Configuration schema, defaults, validation, and normalization.
//!
//! - Deserialization uses `serde` (TOML or JSON).
//! - Validation is manual and returns typed errors mapped to `ErrorEnvelope`.
//! - The datastore password is accepted on input but never serialized.

use rally_metrics_shared::{ErrorCode, ErrorEnvelope, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Current supported configuration schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

const DEFAULT_ENV_NAME: &str = "local";
const DEFAULT_DATASTORE_HOST: &str = "localhost";
const DEFAULT_DATASTORE_PORT: u32 = 9_200;
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

const DATASTORE_PORT_MIN: u32 = 1;
const DATASTORE_PORT_MAX: u32 = 65_535;
const TIMEOUT_MIN_MS: u64 = 1_000;
const TIMEOUT_MAX_MS: u64 = 600_000;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RallyConfig {
    /// Schema version for forward-compatible migrations.
    pub version: u32,
    /// Host system settings.
    pub system: SystemConfig,
    /// Metrics reporting settings.
    pub reporting: ReportingConfig,
}

impl Default for RallyConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            system: SystemConfig::default(),
            reporting: ReportingConfig::default(),
        }
    }
}

impl RallyConfig {
    /// Validate and normalize the config.
    pub fn validate_and_normalize(mut self) -> Result<ValidatedRallyConfig, ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }

        self.system.normalize_and_validate()?;
        self.reporting.normalize_and_validate()?;

        Ok(ValidatedRallyConfig { raw: self })
    }
}

/// Config wrapper that has passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRallyConfig {
    raw: RallyConfig,
}

impl ValidatedRallyConfig {
    /// Borrow the raw config.
    #[must_use]
    pub const fn as_ref(&self) -> &RallyConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> RallyConfig {
        self.raw
    }

    /// Base URL of the datastore (`http` or `https` depending on `datastoreSecure`).
    pub fn datastore_url(&self) -> Result<Url, ErrorEnvelope> {
        let reporting = &self.raw.reporting;
        datastore_url(
            &reporting.datastore_host,
            reporting.datastore_port,
            reporting.datastore_secure,
        )
        .map_err(Into::into)
    }

    /// Request timeout for datastore calls.
    #[must_use]
    pub const fn datastore_timeout(&self) -> Duration {
        Duration::from_millis(self.raw.reporting.timeout_ms)
    }
}

impl AsRef<RallyConfig> for ValidatedRallyConfig {
    fn as_ref(&self) -> &RallyConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedRallyConfig {
    type Target = RallyConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Parse a config from a JSON string, applying validation and normalization.
pub fn parse_config_json(input: &str) -> Result<ValidatedRallyConfig, ErrorEnvelope> {
    let config: RallyConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid config JSON: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Parse a config from a TOML string, applying validation and normalization.
pub fn parse_config_toml(input: &str) -> Result<ValidatedRallyConfig, ErrorEnvelope> {
    let config: RallyConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid config TOML: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Host system settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SystemConfig {
    /// Environment name stamped on every metric document.
    pub env_name: Box<str>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            env_name: DEFAULT_ENV_NAME.into(),
        }
    }
}

impl SystemConfig {
    fn normalize_and_validate(&mut self) -> Result<(), ConfigSchemaError> {
        self.env_name = trim_required(&self.env_name, "system", "envName")?;
        Ok(())
    }
}

/// Metrics datastore connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ReportingConfig {
    /// Datastore host name or address (no scheme, no port).
    pub datastore_host: Box<str>,
    /// Datastore HTTP port.
    pub datastore_port: u32,
    /// Use TLS when talking to the datastore.
    pub datastore_secure: bool,
    /// Basic-auth user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datastore_user: Option<Box<str>>,
    /// Basic-auth password (never serialized).
    #[serde(skip_serializing, deserialize_with = "deserialize_secret")]
    pub datastore_password: Option<SecretString>,
    /// Request timeout (ms).
    pub timeout_ms: u64,
    /// Index template source.
    pub template: TemplateConfig,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            datastore_host: DEFAULT_DATASTORE_HOST.into(),
            datastore_port: DEFAULT_DATASTORE_PORT,
            datastore_secure: false,
            datastore_user: None,
            datastore_password: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            template: TemplateConfig::default(),
        }
    }
}

impl ReportingConfig {
    fn normalize_and_validate(&mut self) -> Result<(), ConfigSchemaError> {
        self.datastore_host = trim_required(&self.datastore_host, "reporting", "datastoreHost")?;

        if !(DATASTORE_PORT_MIN..=DATASTORE_PORT_MAX).contains(&self.datastore_port) {
            return Err(ConfigSchemaError::PortOutOfRange {
                value: self.datastore_port,
                min: DATASTORE_PORT_MIN,
                max: DATASTORE_PORT_MAX,
            });
        }
        datastore_url(
            &self.datastore_host,
            self.datastore_port,
            self.datastore_secure,
        )?;

        if !(TIMEOUT_MIN_MS..=TIMEOUT_MAX_MS).contains(&self.timeout_ms) {
            return Err(ConfigSchemaError::TimeoutOutOfRange {
                section: "reporting",
                field: "timeoutMs",
                value_ms: self.timeout_ms,
                min_ms: TIMEOUT_MIN_MS,
                max_ms: TIMEOUT_MAX_MS,
            });
        }

        if let Some(user) = self.datastore_user.take() {
            self.datastore_user = Some(trim_required(&user, "reporting", "datastoreUser")?);
        }
        match (&self.datastore_user, &self.datastore_password) {
            (Some(_), None) => {
                return Err(ConfigSchemaError::IncompleteCredentials {
                    missing: "datastorePassword",
                });
            },
            (None, Some(_)) => {
                return Err(ConfigSchemaError::IncompleteCredentials {
                    missing: "datastoreUser",
                });
            },
            _ => {},
        }
        if self
            .datastore_password
            .as_ref()
            .is_some_and(|password| password.expose().is_empty())
        {
            return Err(ConfigSchemaError::EmptyValue {
                section: "reporting",
                field: "datastorePassword",
            });
        }

        self.template.normalize_and_validate()
    }
}

/// Index template source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct TemplateConfig {
    /// Template file to use instead of the bundled one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Box<str>>,
}

impl TemplateConfig {
    fn normalize_and_validate(&mut self) -> Result<(), ConfigSchemaError> {
        if let Some(path) = self.path.take() {
            self.path = Some(trim_required(&path, "reporting.template", "path")?);
        }
        Ok(())
    }
}

pub(crate) fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

fn trim_required(
    value: &str,
    section: &'static str,
    field: &'static str,
) -> Result<Box<str>, ConfigSchemaError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigSchemaError::EmptyValue { section, field });
    }
    Ok(trimmed.into())
}

fn datastore_url(host: &str, port: u32, secure: bool) -> Result<Url, ConfigSchemaError> {
    let scheme = if secure { "https" } else { "http" };
    let invalid = |reason: &'static str| ConfigSchemaError::InvalidHost {
        host: host.to_owned(),
        reason,
    };

    let url = Url::parse(&format!("{scheme}://{host}:{port}/"))
        .map_err(|_| invalid("not a valid host name or address"))?;
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid("must not embed credentials"));
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must be a bare host without scheme, port or path"));
    }
    if url.port_or_known_default().map(u32::from) != Some(port) {
        return Err(invalid("must be a bare host without scheme, port or path"));
    }
    Ok(url)
}

/// Validation failures for config values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// The config version is not supported by this binary.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// A required string is empty after trimming.
    EmptyValue {
        /// Schema section (e.g. `system`).
        section: &'static str,
        /// Field name.
        field: &'static str,
    },
    /// The datastore host cannot form a URL.
    InvalidHost {
        /// Offending host.
        host: String,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// The datastore port is out of bounds.
    PortOutOfRange {
        /// Configured value.
        value: u32,
        /// Minimum allowed.
        min: u32,
        /// Maximum allowed.
        max: u32,
    },
    /// A timeout value is out of bounds.
    TimeoutOutOfRange {
        /// Schema section (e.g. `reporting`).
        section: &'static str,
        /// Field name.
        field: &'static str,
        /// Configured value (ms).
        value_ms: u64,
        /// Minimum allowed (ms).
        min_ms: u64,
        /// Maximum allowed (ms).
        max_ms: u64,
    },
    /// Only one of user/password is configured.
    IncompleteCredentials {
        /// Field that is missing.
        missing: &'static str,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::EmptyValue { .. } => ErrorCode::new("config", "empty_value"),
            Self::InvalidHost { .. } => ErrorCode::new("config", "invalid_host"),
            Self::PortOutOfRange { .. } => ErrorCode::new("config", "invalid_port"),
            Self::TimeoutOutOfRange { .. } => ErrorCode::new("config", "invalid_timeout"),
            Self::IncompleteCredentials { .. } => {
                ErrorCode::new("config", "incomplete_credentials")
            },
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => write!(
                formatter,
                "unsupported config version {found} (supported: {supported})"
            ),
            Self::EmptyValue { section, field } => {
                write!(formatter, "{section}.{field} must be non-empty")
            },
            Self::InvalidHost { host, reason } => {
                write!(formatter, "reporting.datastoreHost `{host}` {reason}")
            },
            Self::PortOutOfRange { value, min, max } => write!(
                formatter,
                "reporting.datastorePort {value} is out of range ({min}..={max})"
            ),
            Self::TimeoutOutOfRange {
                section,
                field,
                value_ms,
                min_ms,
                max_ms,
            } => write!(
                formatter,
                "{section}.{field} {value_ms}ms is out of range ({min_ms}..={max_ms})"
            ),
            Self::IncompleteCredentials { missing } => write!(
                formatter,
                "datastoreUser and datastorePassword must be set together (missing {missing})"
            ),
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);

        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => envelope
                .with_metadata("found", found.to_string())
                .with_metadata("supported", supported.to_string()),
            ConfigSchemaError::EmptyValue { section, field } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field),
            ConfigSchemaError::InvalidHost { host, reason } => envelope
                .with_metadata("host", host)
                .with_metadata("reason", reason),
            ConfigSchemaError::PortOutOfRange { value, min, max } => envelope
                .with_metadata("value", value.to_string())
                .with_metadata("min", min.to_string())
                .with_metadata("max", max.to_string()),
            ConfigSchemaError::TimeoutOutOfRange {
                section,
                field,
                value_ms,
                min_ms,
                max_ms,
            } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field)
                .with_metadata("value_ms", value_ms.to_string())
                .with_metadata("min_ms", min_ms.to_string())
                .with_metadata("max_ms", max_ms.to_string()),
            ConfigSchemaError::IncompleteCredentials { missing } => {
                envelope.with_metadata("missing", missing)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() -> Result<(), ConfigSchemaError> {
        let config = RallyConfig::default().validate_and_normalize()?;
        assert_eq!(&*config.system.env_name, "local");
        assert_eq!(config.reporting.datastore_port, 9_200);
        assert_eq!(config.datastore_timeout(), Duration::from_secs(10));
        Ok(())
    }

    #[test]
    fn strings_are_trimmed() -> Result<(), ConfigSchemaError> {
        let mut config = RallyConfig::default();
        config.system.env_name = "  nightly ".into();
        config.reporting.datastore_host = " es.internal ".into();
        let config = config.validate_and_normalize()?;
        assert_eq!(&*config.system.env_name, "nightly");
        assert_eq!(&*config.reporting.datastore_host, "es.internal");
        Ok(())
    }

    #[test]
    fn datastore_url_follows_secure_flag() -> Result<(), ErrorEnvelope> {
        let mut config = RallyConfig::default();
        config.reporting.datastore_secure = true;
        config.reporting.datastore_port = 443;
        let config = config.validate_and_normalize()?;
        assert_eq!(config.datastore_url()?.as_str(), "https://localhost/");
        Ok(())
    }

    #[test]
    fn hosts_with_scheme_or_path_are_rejected() {
        for host in ["http://localhost", "localhost/es", "user:pw@localhost", "local host"] {
            let mut config = RallyConfig::default();
            config.reporting.datastore_host = host.into();
            assert!(
                matches!(
                    config.validate_and_normalize(),
                    Err(ConfigSchemaError::InvalidHost { .. })
                ),
                "expected `{host}` to be rejected"
            );
        }
    }

    #[test]
    fn port_and_timeout_bounds_are_enforced() {
        let mut config = RallyConfig::default();
        config.reporting.datastore_port = 70_000;
        assert!(matches!(
            config.validate_and_normalize(),
            Err(ConfigSchemaError::PortOutOfRange { value: 70_000, .. })
        ));

        let mut config = RallyConfig::default();
        config.reporting.timeout_ms = 999;
        assert!(matches!(
            config.validate_and_normalize(),
            Err(ConfigSchemaError::TimeoutOutOfRange { value_ms: 999, .. })
        ));
    }

    #[test]
    fn credentials_must_come_in_pairs() {
        let mut config = RallyConfig::default();
        config.reporting.datastore_user = Some("rally".into());
        assert!(matches!(
            config.validate_and_normalize(),
            Err(ConfigSchemaError::IncompleteCredentials {
                missing: "datastorePassword"
            })
        ));

        let mut config = RallyConfig::default();
        config.reporting.datastore_password = Some(SecretString::new("pw"));
        assert!(matches!(
            config.validate_and_normalize(),
            Err(ConfigSchemaError::IncompleteCredentials {
                missing: "datastoreUser"
            })
        ));
    }

    #[test]
    fn password_is_never_serialized() -> Result<(), Box<dyn std::error::Error>> {
        let config = parse_config_toml(
            r#"
            version = 1
            [reporting]
            datastoreUser = "rally"
            datastorePassword = "hunter2"
            "#,
        )?;
        assert_eq!(
            config
                .reporting
                .datastore_password
                .as_ref()
                .map(SecretString::expose),
            Some("hunter2")
        );

        let json = serde_json::to_string(config.as_ref())?;
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("datastorePassword"));
        Ok(())
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = parse_config_json(r#"{ "reporting": { "datastoreHots": "x" } }"#);
        assert!(result.is_err_and(|error| error.has_code("config", "invalid_json")));
    }
}
