//! Record and read back the metrics of one benchmark trial.
//!
//! A store instance holds at most one active trial. `open` selects the trial
//! (and optionally provisions its yearly index), `put_*` buffers documents in
//! memory, `close` writes the buffer in a single bulk request, and `get_*`
//! query what was stored for the trial.

use rally_metrics_domain::{
    DocType, EnvironmentName, IndexName, MetricDocument, MetricName, MetricQuery, MetricValue,
    TrackName, TrackSetupName, TrialContext, TrialTimestamp, index_name_for,
};
use rally_metrics_ports::{
    ClientFactory, ClockPort, DocumentStorePort, IndexTemplateProvider, LogEvent, LogFields,
    LogLevel, LoggerPort,
};
use rally_metrics_shared::{ErrorCode, ErrorEnvelope, Result};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Upper bound on hits requested by [`MetricsStore::get`]; matches the
/// store's default result window.
pub const MAX_RESULT_WINDOW: usize = 10_000;

/// Dependencies required by the metrics store.
#[derive(Clone)]
pub struct MetricsStoreDeps {
    /// Document store client, acquired once and owned for the store's lifetime.
    pub client: Arc<dyn DocumentStorePort>,
    /// Template applied when a yearly index is created.
    pub template_provider: Arc<dyn IndexTemplateProvider>,
    /// Source of document `@timestamp`s.
    pub clock: Arc<dyn ClockPort>,
    /// Environment every document is recorded under.
    pub environment: EnvironmentName,
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

/// Lifecycle state of a [`MetricsStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// No trial has been opened yet.
    Uninitialized,
    /// A trial is open and accepts metrics.
    Open,
    /// The trial was flushed; it can still be queried.
    Closed,
}

impl StoreState {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for StoreState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct Session {
    context: TrialContext,
    index: IndexName,
}

/// Metrics store for one trial at a time.
///
/// Mutating operations take `&mut self`; share an instance across threads
/// behind a single `Mutex`.
pub struct MetricsStore {
    deps: MetricsStoreDeps,
    state: StoreState,
    session: Option<Session>,
    buffer: Vec<MetricDocument>,
}

impl MetricsStore {
    /// Create a store from explicit dependencies.
    #[must_use]
    pub const fn new(deps: MetricsStoreDeps) -> Self {
        Self {
            deps,
            state: StoreState::Uninitialized,
            session: None,
            buffer: Vec::new(),
        }
    }

    /// Create a store whose client is obtained once from `factory`.
    pub fn from_factory(
        factory: &dyn ClientFactory,
        template_provider: Arc<dyn IndexTemplateProvider>,
        clock: Arc<dyn ClockPort>,
        environment: EnvironmentName,
        logger: Option<Arc<dyn LoggerPort>>,
    ) -> Result<Self> {
        let client = factory.create()?;
        Ok(Self::new(MetricsStoreDeps {
            client,
            template_provider,
            clock,
            environment,
            logger,
        }))
    }

    /// Open a trial, replacing any previous one.
    ///
    /// With `create`, the trial's yearly index is created (with the provider's
    /// template) when it does not exist yet. Provisioning happens before the
    /// new trial becomes active: if it fails, the store keeps its previous
    /// trial, state and buffer.
    ///
    /// Documents still buffered from an unclosed trial are discarded.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(track = %track, track_setup = %track_setup, create = create)
    )]
    pub fn open(
        &mut self,
        trial_timestamp: TrialTimestamp,
        track: TrackName,
        track_setup: TrackSetupName,
        create: bool,
    ) -> Result<()> {
        let index = index_name_for(&trial_timestamp);
        let context = TrialContext::new(
            trial_timestamp,
            track,
            track_setup,
            self.deps.environment.clone(),
        );

        if create {
            self.ensure_index(&index)?;
        }

        if !self.buffer.is_empty() {
            if let Some(logger) = self.deps.logger.as_ref() {
                let mut fields = self.session_fields();
                fields.insert("discarded".into(), Value::from(self.buffer.len()));
                logger.warn(
                    "metrics.store.bufferDiscarded",
                    "Unflushed metrics discarded by re-open",
                    Some(fields),
                );
            }
            self.buffer.clear();
        }

        self.session = Some(Session { context, index });
        self.state = StoreState::Open;

        if let Some(logger) = self.deps.logger.as_ref() {
            let mut fields = self.session_fields();
            fields.insert("create".into(), Value::Bool(create));
            logger.info("metrics.store.open", "Trial opened", Some(fields));
        }
        Ok(())
    }

    /// Buffer an integer count for the open trial.
    pub fn put_count(&mut self, name: MetricName, count: u64, unit: &str) -> Result<()> {
        self.ensure_open("put_count")?;
        let value = MetricValue::count(count)?;
        self.append(name, value, unit)
    }

    /// Buffer a floating-point measurement for the open trial.
    pub fn put_value(&mut self, name: MetricName, value: f64, unit: &str) -> Result<()> {
        self.ensure_open("put_value")?;
        let value = MetricValue::float(value)?;
        self.append(name, value, unit)
    }

    /// Flush buffered documents in one bulk write and mark the trial closed.
    ///
    /// An empty buffer issues no write. When the write fails the buffer is
    /// kept and the store stays open, so `close` can be retried.
    ///
    /// A rejected bulk write may still have stored some of its documents.
    /// Retrying resends the whole buffer, so those documents are written
    /// twice.
    #[tracing::instrument(level = "debug", skip_all, fields(buffered = self.buffer.len()))]
    pub fn close(&mut self) -> Result<()> {
        let Some(session) = self.session.as_ref() else {
            return Err(no_active_trial("close", self.state));
        };

        if !self.buffer.is_empty() {
            let written = self.deps.client.bulk_index(
                &session.index,
                &DocType::METRICS,
                &self.buffer,
            );
            if let Err(error) = written {
                if let Some(logger) = self.deps.logger.as_ref() {
                    let mut fields = self.session_fields();
                    fields.insert("buffered".into(), Value::from(self.buffer.len()));
                    logger.log(
                        LogEvent::new(
                            LogLevel::Error,
                            "metrics.store.flushFailed",
                            "Bulk write of trial metrics failed",
                            Some(fields),
                        )
                        .with_error(&error),
                    );
                }
                return Err(error);
            }

            if let Some(logger) = self.deps.logger.as_ref() {
                let mut fields = self.session_fields();
                fields.insert("documents".into(), Value::from(self.buffer.len()));
                logger.info("metrics.store.flushed", "Trial metrics flushed", Some(fields));
            }
            self.buffer.clear();
        }

        self.state = StoreState::Closed;
        Ok(())
    }

    /// Value of the first stored document for `name` in the current trial,
    /// or `None` when nothing matches.
    #[tracing::instrument(level = "debug", skip_all, fields(metric = %name))]
    pub fn get_one(&self, name: &MetricName) -> Result<Option<MetricValue>> {
        let session = self.session_for("get_one")?;
        let query = MetricQuery::for_metric(&session.context, name);
        let response =
            self.deps
                .client
                .search(&session.index, &DocType::METRICS, &query.to_value())?;
        response.first().map(|hit| hit.value()).transpose()
    }

    /// Values of all stored documents for `name` in the current trial, in
    /// store order.
    #[tracing::instrument(level = "debug", skip_all, fields(metric = %name))]
    pub fn get(&self, name: &MetricName) -> Result<Vec<MetricValue>> {
        let session = self.session_for("get")?;
        let query = MetricQuery::for_metric(&session.context, name).with_size(MAX_RESULT_WINDOW);
        let response =
            self.deps
                .client
                .search(&session.index, &DocType::METRICS, &query.to_value())?;
        response.hits.hits.iter().map(|hit| hit.value()).collect()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> StoreState {
        self.state
    }

    /// Active trial, if one was opened.
    #[must_use]
    pub fn context(&self) -> Option<&TrialContext> {
        self.session.as_ref().map(|session| &session.context)
    }

    /// Index of the active trial, if one was opened.
    #[must_use]
    pub fn index_name(&self) -> Option<&IndexName> {
        self.session.as_ref().map(|session| &session.index)
    }

    /// Documents buffered since the last successful flush.
    #[must_use]
    pub fn buffered(&self) -> &[MetricDocument] {
        &self.buffer
    }

    /// Environment documents are recorded under.
    #[must_use]
    pub const fn environment(&self) -> &EnvironmentName {
        &self.deps.environment
    }

    fn ensure_index(&self, index: &IndexName) -> Result<()> {
        if self.deps.client.exists(index)? {
            return Ok(());
        }

        let template = self.deps.template_provider.template()?;
        self.deps.client.create_index(index, &template)?;
        if let Some(logger) = self.deps.logger.as_ref() {
            let mut fields = LogFields::new();
            fields.insert("index".into(), Value::from(index.as_str()));
            fields.insert("template".into(), Value::from(&*template.name));
            logger.info("metrics.store.indexCreated", "Metrics index created", Some(fields));
        }
        Ok(())
    }

    fn ensure_open(&self, operation: &'static str) -> Result<()> {
        if self.state == StoreState::Open {
            Ok(())
        } else {
            Err(no_active_trial(operation, self.state))
        }
    }

    fn session_for(&self, operation: &'static str) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| no_active_trial(operation, self.state))
    }

    fn append(&mut self, name: MetricName, value: MetricValue, unit: &str) -> Result<()> {
        let session = self.session_for("put")?;
        let document = MetricDocument::new(
            &session.context,
            self.deps.clock.now_epoch_seconds(),
            name,
            value,
            unit,
        );
        self.buffer.push(document);
        Ok(())
    }

    fn session_fields(&self) -> LogFields {
        let mut fields = LogFields::new();
        if let Some(session) = self.session.as_ref() {
            let context = &session.context;
            fields.insert("index".into(), Value::from(session.index.as_str()));
            fields.insert(
                "trialTimestamp".into(),
                Value::from(context.trial_timestamp().to_compact_stamp()),
            );
            fields.insert("track".into(), Value::from(context.track().as_str()));
            fields.insert(
                "trackSetup".into(),
                Value::from(context.track_setup().as_str()),
            );
            fields.insert(
                "environment".into(),
                Value::from(context.environment().as_str()),
            );
        }
        fields
    }
}

fn no_active_trial(operation: &'static str, state: StoreState) -> ErrorEnvelope {
    ErrorEnvelope::expected(
        ErrorCode::new("metrics", "no_active_trial"),
        format!("cannot {operation}: no open trial (store is {state})"),
    )
    .with_metadata("operation", operation)
    .with_metadata("state", state.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rally_metrics_shared::{ErrorClass, ErrorKind};
    use rally_metrics_testkit::errors::connection_error;
    use rally_metrics_testkit::in_memory::{
        InMemoryClientFactory, InMemoryDocumentStore, RecordingLogger, StaticClock,
        StaticTemplateProvider, StoreCall, StoreOperation,
    };

    struct Harness {
        client: Arc<InMemoryDocumentStore>,
        logger: RecordingLogger,
        store: MetricsStore,
    }

    fn harness() -> Result<Harness> {
        let client = Arc::new(InMemoryDocumentStore::new());
        let logger = RecordingLogger::new();
        let store = MetricsStore::new(MetricsStoreDeps {
            client: client.clone(),
            template_provider: Arc::new(StaticTemplateProvider::metrics()),
            clock: Arc::new(StaticClock::new(1_453_362_707)),
            environment: EnvironmentName::parse("unittest")?,
            logger: Some(Arc::new(logger.clone())),
        });
        Ok(Harness {
            client,
            logger,
            store,
        })
    }

    fn open(store: &mut MetricsStore, create: bool) -> Result<()> {
        store.open(
            TrialTimestamp::from_ymd_hms(2016, 1, 31, 0, 0, 0)?,
            TrackName::parse("test")?,
            TrackSetupName::parse("defaults")?,
            create,
        )
    }

    fn metric(name: &str) -> Result<MetricName> {
        Ok(MetricName::parse(name)?)
    }

    #[test]
    fn operations_before_open_are_precondition_errors() -> Result<()> {
        let Harness {
            client, mut store, ..
        } = harness()?;

        let errors = [
            store.put_count(metric("indexing_throughput")?, 1, "docs/s").err(),
            store.put_value(metric("latency")?, 1.5, "ms").err(),
            store.close().err(),
            store.get_one(&metric("indexing_throughput")?).err(),
            store.get(&metric("indexing_throughput")?).err(),
        ];
        for error in errors {
            let error = error.ok_or_else(|| {
                ErrorEnvelope::expected(ErrorCode::internal(), "expected precondition error")
            })?;
            assert!(error.has_code("metrics", "no_active_trial"));
            assert_eq!(error.kind, ErrorKind::Expected);
            assert_eq!(error.class, ErrorClass::NonRetriable);
        }
        assert_eq!(store.state(), StoreState::Uninitialized);
        assert!(client.calls().is_empty());
        Ok(())
    }

    #[test]
    fn open_without_create_issues_no_calls() -> Result<()> {
        let Harness {
            client, mut store, ..
        } = harness()?;
        open(&mut store, false)?;

        assert!(client.calls().is_empty());
        assert_eq!(store.state(), StoreState::Open);
        assert_eq!(
            store.index_name().map(IndexName::as_str),
            Some("rally-2016")
        );
        Ok(())
    }

    #[test]
    fn open_with_create_provisions_missing_index_once() -> Result<()> {
        let Harness {
            client,
            logger,
            mut store,
        } = harness()?;
        open(&mut store, true)?;
        open(&mut store, true)?;

        let operations = client
            .calls()
            .iter()
            .map(StoreCall::operation)
            .collect::<Vec<_>>();
        assert_eq!(
            operations,
            vec![
                StoreOperation::Exists,
                StoreOperation::CreateIndex,
                StoreOperation::Exists,
            ]
        );
        assert_eq!(logger.find("metrics.store.indexCreated").len(), 1);
        Ok(())
    }

    #[test]
    fn failed_provisioning_keeps_previous_trial() -> Result<()> {
        let Harness {
            client, mut store, ..
        } = harness()?;
        client.fail_next(StoreOperation::Exists, connection_error());

        let error = open(&mut store, true).err();
        assert!(error.is_some_and(|error| error.has_code("store", "connection")));
        assert_eq!(store.state(), StoreState::Uninitialized);
        assert!(store.context().is_none());
        Ok(())
    }

    #[test]
    fn puts_are_buffered_without_io() -> Result<()> {
        let Harness {
            client, mut store, ..
        } = harness()?;
        open(&mut store, false)?;
        store.put_count(metric("indexing_throughput")?, 5000, "docs/s")?;
        store.put_value(metric("query_latency")?, 12.5, "ms")?;

        assert!(client.calls().is_empty());
        let buffered = store.buffered();
        assert_eq!(buffered.len(), 2);
        let values = buffered.iter().map(MetricDocument::value).collect::<Vec<_>>();
        assert_eq!(values, vec![MetricValue::Integer(5000), MetricValue::Float(12.5)]);
        assert!(buffered.iter().all(|doc| doc.timestamp() == 1_453_362_707));
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected_without_buffering() -> Result<()> {
        let Harness { mut store, .. } = harness()?;
        open(&mut store, false)?;

        let error = store.put_value(metric("latency")?, f64::NAN, "ms").err();
        assert!(error.is_some_and(|error| error.kind == ErrorKind::Expected));
        let error = store.put_count(metric("docs")?, u64::MAX, "").err();
        assert!(error.is_some());
        assert!(store.buffered().is_empty());
        Ok(())
    }

    #[test]
    fn close_flushes_once_and_keeps_context() -> Result<()> {
        let Harness {
            client,
            logger,
            mut store,
        } = harness()?;
        open(&mut store, false)?;
        store.put_count(metric("indexing_throughput")?, 5000, "docs/s")?;
        store.close()?;

        assert_eq!(client.calls_of(StoreOperation::BulkIndex).len(), 1);
        assert!(store.buffered().is_empty());
        assert_eq!(store.state(), StoreState::Closed);
        assert!(store.context().is_some());
        assert_eq!(logger.find("metrics.store.flushed").len(), 1);

        store.close()?;
        assert_eq!(client.calls_of(StoreOperation::BulkIndex).len(), 1);
        Ok(())
    }

    #[test]
    fn failed_flush_keeps_buffer_for_retry() -> Result<()> {
        let Harness {
            client,
            logger,
            mut store,
        } = harness()?;
        open(&mut store, false)?;
        store.put_count(metric("indexing_throughput")?, 5000, "docs/s")?;
        client.fail_next(StoreOperation::BulkIndex, connection_error());

        assert!(store.close().is_err());
        assert_eq!(store.state(), StoreState::Open);
        assert_eq!(store.buffered().len(), 1);
        assert_eq!(logger.find("metrics.store.flushFailed").len(), 1);

        store.close()?;
        assert_eq!(store.state(), StoreState::Closed);
        assert_eq!(client.calls_of(StoreOperation::BulkIndex).len(), 2);
        let index = IndexName::parse("rally-2016")?;
        assert_eq!(client.documents(&index).len(), 1);
        Ok(())
    }

    #[test]
    fn reopen_discards_unflushed_buffer_with_warning() -> Result<()> {
        let Harness {
            logger, mut store, ..
        } = harness()?;
        open(&mut store, false)?;
        store.put_count(metric("indexing_throughput")?, 5000, "docs/s")?;
        open(&mut store, false)?;

        assert!(store.buffered().is_empty());
        let warnings = logger.find("metrics.store.bufferDiscarded");
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings
                .first()
                .and_then(|event| event.fields.as_ref())
                .and_then(|fields| fields.get("discarded")),
            Some(&Value::from(1))
        );
        Ok(())
    }

    #[test]
    fn put_after_close_is_rejected_but_get_is_allowed() -> Result<()> {
        let Harness { mut store, .. } = harness()?;
        open(&mut store, false)?;
        store.put_count(metric("indexing_throughput")?, 5000, "docs/s")?;
        store.close()?;

        let error = store.put_count(metric("indexing_throughput")?, 1, "docs/s").err();
        assert!(error.is_some_and(|error| error.has_code("metrics", "no_active_trial")));
        assert_eq!(
            store.get_one(&metric("indexing_throughput")?)?,
            Some(MetricValue::Integer(5000))
        );
        Ok(())
    }

    #[test]
    fn from_factory_acquires_client_once() -> Result<()> {
        let client: Arc<dyn DocumentStorePort> = Arc::new(InMemoryDocumentStore::new());
        let factory = InMemoryClientFactory::new(client);
        let mut store = MetricsStore::from_factory(
            &factory,
            Arc::new(StaticTemplateProvider::metrics()),
            Arc::new(StaticClock::new(0)),
            EnvironmentName::parse("unittest")?,
            None,
        )?;
        open(&mut store, true)?;
        store.close()?;

        assert_eq!(factory.created(), 1);
        Ok(())
    }
}
