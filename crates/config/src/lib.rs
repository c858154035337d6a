//! # rally-metrics-config
//!
//! Configuration schema, validation, and loading for the metrics store and
//! its CLI. This crate depends on `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file + overrides).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use env::{
    ENV_DATASTORE_HOST, ENV_DATASTORE_PASSWORD, ENV_DATASTORE_PORT, ENV_DATASTORE_SECURE,
    ENV_DATASTORE_USER, ENV_ENV_NAME, ENV_TEMPLATE_PATH, ENV_TIMEOUT_MS, EnvParseError, RallyEnv,
    apply_env_overrides,
};
pub use load::{
    ConfigFormat, load_config_from_path, load_config_from_sources, load_config_std_env,
    to_pretty_json, to_pretty_toml,
};
pub use schema::{
    CURRENT_CONFIG_VERSION, ConfigSchemaError, RallyConfig, ReportingConfig, SystemConfig,
    TemplateConfig, ValidatedRallyConfig, parse_config_json, parse_config_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
