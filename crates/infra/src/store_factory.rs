//! Document store, template and logger selection from validated config.

use crate::InfraResult;
use rally_metrics_adapters::clock::SystemClock;
use rally_metrics_adapters::elasticsearch::{ElasticsearchConfig, ElasticsearchDocumentStore};
use rally_metrics_adapters::log_sink::StderrLogSink;
use rally_metrics_adapters::logger::JsonLogger;
use rally_metrics_adapters::template::{BundledTemplateProvider, FileTemplateProvider};
use rally_metrics_app::MetricsStore;
use rally_metrics_config::ValidatedRallyConfig;
use rally_metrics_domain::EnvironmentName;
use rally_metrics_ports::{
    ClientFactory, DocumentStorePort, IndexTemplateProvider, LogFields, LogLevel, LoggerPort,
};
use rally_metrics_shared::ErrorEnvelope;
use serde_json::Value;
use std::sync::Arc;

/// Client factory producing Elasticsearch-backed document stores.
#[derive(Debug, Clone)]
pub struct ElasticsearchClientFactory {
    config: ElasticsearchConfig,
}

impl ElasticsearchClientFactory {
    /// Create a factory from explicit adapter settings.
    pub fn new(config: ElasticsearchConfig) -> InfraResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create a factory from the `reporting` section of the config.
    pub fn from_config(config: &ValidatedRallyConfig) -> InfraResult<Self> {
        let reporting = &config.reporting;
        Self::new(ElasticsearchConfig {
            base_url: config.datastore_url()?.as_str().into(),
            username: reporting.datastore_user.clone(),
            password: reporting.datastore_password.clone(),
            timeout_ms: reporting.timeout_ms,
        })
    }

    /// Adapter settings used for every created client.
    #[must_use]
    pub const fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }
}

impl ClientFactory for ElasticsearchClientFactory {
    fn create(&self) -> rally_metrics_shared::Result<Arc<dyn DocumentStorePort>> {
        let store = ElasticsearchDocumentStore::new(self.config.clone())?;
        tracing::debug!(base_url = %store.base_url(), "document store client created");
        Ok(Arc::new(store))
    }
}

/// Pick the index template provider: the configured file, or the bundled one.
#[must_use]
pub fn build_template_provider(config: &ValidatedRallyConfig) -> Arc<dyn IndexTemplateProvider> {
    match config.reporting.template.path.as_deref() {
        Some(path) => Arc::new(FileTemplateProvider::new(path)),
        None => Arc::new(BundledTemplateProvider),
    }
}

/// JSON logger writing to stderr, tagged with the configured environment.
#[must_use]
pub fn build_logger(config: &ValidatedRallyConfig, min_level: LogLevel) -> Arc<dyn LoggerPort> {
    let mut base_fields = LogFields::new();
    base_fields.insert(
        "environment".into(),
        Value::from(&*config.system.env_name),
    );
    Arc::new(
        JsonLogger::new(Arc::new(StderrLogSink))
            .with_base_fields(base_fields)
            .with_min_level(min_level),
    )
}

/// Build a metrics store from config, taking its client from `factory`.
pub fn build_metrics_store_with(
    config: &ValidatedRallyConfig,
    factory: &dyn ClientFactory,
    logger: Option<Arc<dyn LoggerPort>>,
) -> InfraResult<MetricsStore> {
    let environment =
        EnvironmentName::parse(&*config.system.env_name).map_err(ErrorEnvelope::from)?;
    MetricsStore::from_factory(
        factory,
        build_template_provider(config),
        Arc::new(SystemClock),
        environment,
        logger,
    )
}
