//! Index template providers.
//!
//! The bundled template ships inside the binary; a file override lets
//! operators tune shard counts or mappings without a rebuild.

use rally_metrics_ports::{IndexTemplate, IndexTemplateProvider};
use rally_metrics_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Name the template is registered under in the store.
pub const TEMPLATE_NAME: &str = "rally";

const BUNDLED_TEMPLATE: &str = include_str!("../resources/metrics-template.json");

/// Template compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledTemplateProvider;

impl IndexTemplateProvider for BundledTemplateProvider {
    fn template(&self) -> Result<IndexTemplate> {
        let body = serde_json::from_str(BUNDLED_TEMPLATE).map_err(|error| {
            ErrorEnvelope::invariant(
                ErrorCode::new("template", "invalid_bundled"),
                format!("bundled index template is not valid JSON: {error}"),
            )
        })?;
        Ok(IndexTemplate {
            name: TEMPLATE_NAME.into(),
            body,
        })
    }
}

/// Template read from a JSON file on every call.
#[derive(Debug, Clone)]
pub struct FileTemplateProvider {
    path: PathBuf,
}

impl FileTemplateProvider {
    /// Create a provider reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path the template is read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IndexTemplateProvider for FileTemplateProvider {
    fn template(&self) -> Result<IndexTemplate> {
        let text = std::fs::read_to_string(&self.path).map_err(|error| {
            let code = match error.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::new("template", "file_not_found"),
                _ => ErrorCode::io(),
            };
            ErrorEnvelope::unexpected(
                code,
                format!("failed to read index template: {error}"),
                ErrorClass::NonRetriable,
            )
            .with_metadata("path", self.path.to_string_lossy().to_string())
        })?;

        let body: Value = serde_json::from_str(&text).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("template", "invalid_json"),
                format!("index template is not valid JSON: {error}"),
            )
            .with_metadata("path", self.path.to_string_lossy().to_string())
        })?;
        if !body.is_object() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::new("template", "invalid_json"),
                "index template must be a JSON object",
            )
            .with_metadata("path", self.path.to_string_lossy().to_string()));
        }

        Ok(IndexTemplate {
            name: TEMPLATE_NAME.into(),
            body,
        })
    }
}
