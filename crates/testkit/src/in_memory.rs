//! In-memory adapter implementations for port contracts.
//!
//! These implementations are intended for:
//! - Unit/integration tests of the metrics store
//! - Deterministic contract tests for the ports layer
//! - Local experimentation without a running cluster

use crate::errors::index_not_found_error;
use rally_metrics_domain::{DocType, IndexName, MetricDocument};
use rally_metrics_ports::{
    ClientFactory, ClockPort, DocumentStorePort, DocumentStoreProviderInfo, IndexTemplate,
    IndexTemplateProvider, LogEvent, LogFields, LogLevel, LoggerPort, SearchResponse,
};
use rally_metrics_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result};
use serde_json::{Value, json};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Page size the store applies when a search body has no `size`.
pub const DEFAULT_SEARCH_SIZE: usize = 10;

/// A no-op logger implementation.
#[derive(Debug, Default)]
pub struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: LogEvent) {}

    fn child(&self, _fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(Self)
    }
}

/// Logger that keeps every event for later assertions.
///
/// Children share the parent's event list; their base fields are merged into
/// each recorded event.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<LogEvent>>>,
    base_fields: LogFields,
}

impl RecordingLogger {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far, in order.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Event names recorded so far, in order.
    pub fn event_names(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.event.into_string())
            .collect()
    }

    /// Events with the given name.
    pub fn find(&self, name: &str) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|event| &*event.event == name)
            .collect()
    }

    /// Events at `level` or above.
    pub fn at_least(&self, level: LogLevel) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.level >= level)
            .collect()
    }
}

impl LoggerPort for RecordingLogger {
    fn log(&self, mut event: LogEvent) {
        if !self.base_fields.is_empty() {
            let mut fields = self.base_fields.clone();
            fields.extend(event.fields.take().unwrap_or_default());
            event.fields = Some(fields);
        }
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut base_fields = self.base_fields.clone();
        base_fields.extend(fields);
        Box::new(Self {
            events: Arc::clone(&self.events),
            base_fields,
        })
    }
}

/// Clock returning a fixed (but adjustable) epoch second.
#[derive(Debug, Default)]
pub struct StaticClock {
    now: AtomicI64,
}

impl StaticClock {
    /// Clock frozen at `epoch_seconds`.
    pub const fn new(epoch_seconds: i64) -> Self {
        Self {
            now: AtomicI64::new(epoch_seconds),
        }
    }

    /// Move the clock to `epoch_seconds`.
    pub fn set(&self, epoch_seconds: i64) {
        self.now.store(epoch_seconds, Ordering::SeqCst);
    }

    /// Move the clock forward.
    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl ClockPort for StaticClock {
    fn now_epoch_seconds(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Template provider returning a fixed template.
#[derive(Debug, Clone)]
pub struct StaticTemplateProvider {
    template: IndexTemplate,
}

impl StaticTemplateProvider {
    /// Provider returning `body` under `name`.
    pub fn new(name: &str, body: Value) -> Self {
        Self {
            template: IndexTemplate {
                name: name.into(),
                body,
            },
        }
    }

    /// Minimal `rally-*` template.
    pub fn metrics() -> Self {
        Self::new(
            "rally",
            json!({
                "template": "rally-*",
                "mappings": {"metrics": {"properties": {"value": {"type": "double"}}}}
            }),
        )
    }
}

impl IndexTemplateProvider for StaticTemplateProvider {
    fn template(&self) -> Result<IndexTemplate> {
        Ok(self.template.clone())
    }
}

/// Port operation selector for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreOperation {
    /// `exists`.
    Exists,
    /// `create_index`.
    CreateIndex,
    /// `bulk_index`.
    BulkIndex,
    /// `search`.
    Search,
}

/// One recorded call against the in-memory store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    /// `exists(index)`.
    Exists {
        /// Index checked.
        index: IndexName,
    },
    /// `create_index(index, template)`.
    CreateIndex {
        /// Index created.
        index: IndexName,
        /// Template applied.
        template: IndexTemplate,
    },
    /// `bulk_index(index, doc_type, documents)`.
    BulkIndex {
        /// Target index.
        index: IndexName,
        /// Document type.
        doc_type: DocType,
        /// Documents in request order.
        documents: Vec<MetricDocument>,
    },
    /// `search(index, doc_type, body)`.
    Search {
        /// Target index.
        index: IndexName,
        /// Document type.
        doc_type: DocType,
        /// Request body.
        body: Value,
    },
}

impl StoreCall {
    /// Operation this call belongs to.
    pub const fn operation(&self) -> StoreOperation {
        match self {
            Self::Exists { .. } => StoreOperation::Exists,
            Self::CreateIndex { .. } => StoreOperation::CreateIndex,
            Self::BulkIndex { .. } => StoreOperation::BulkIndex,
            Self::Search { .. } => StoreOperation::Search,
        }
    }
}

#[derive(Debug, Default)]
struct IndexState {
    template: Option<IndexTemplate>,
    documents: Vec<(DocType, Value)>,
}

#[derive(Debug, Default)]
struct StoreState {
    indices: BTreeMap<IndexName, IndexState>,
    calls: Vec<StoreCall>,
    failures: BTreeMap<StoreOperation, VecDeque<ErrorEnvelope>>,
    canned_search: Option<SearchResponse>,
}

/// In-memory document store.
///
/// Records every call, keeps indexed documents per index and answers searches
/// by evaluating the `term` clauses of a `bool` filter against stored
/// sources. Bulk writes into a missing index create it implicitly, as the
/// real store does.
#[derive(Debug)]
pub struct InMemoryDocumentStore {
    provider: DocumentStoreProviderInfo,
    state: Mutex<StoreState>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            provider: DocumentStoreProviderInfo {
                id: "in_memory".into(),
                name: "In-memory document store".into(),
            },
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Create a store where `index` already exists.
    pub fn with_index(index: &IndexName) -> Self {
        let store = Self::new();
        store.lock().indices.insert(index.clone(), IndexState::default());
        store
    }

    /// Make the next call of `operation` fail with `error`.
    ///
    /// Failures queue up per operation and are consumed in order; the failing
    /// call is still recorded but has no effect on stored data.
    pub fn fail_next(&self, operation: StoreOperation, error: ErrorEnvelope) {
        self.lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Answer every search with `response` instead of evaluating the query.
    pub fn respond_to_search_with(&self, response: SearchResponse) {
        self.lock().canned_search = Some(response);
    }

    /// All calls in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Calls of one operation, in order.
    pub fn calls_of(&self, operation: StoreOperation) -> Vec<StoreCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .cloned()
            .collect()
    }

    /// Template the index was created with, if it was created explicitly.
    pub fn template_of(&self, index: &IndexName) -> Option<IndexTemplate> {
        self.lock()
            .indices
            .get(index)
            .and_then(|state| state.template.clone())
    }

    /// Stored document sources of `index`, in write order.
    pub fn documents(&self, index: &IndexName) -> Vec<Value> {
        self.lock()
            .indices
            .get(index)
            .map(|state| {
                state
                    .documents
                    .iter()
                    .map(|(_, source)| source.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl StoreState {
    fn record(&mut self, call: StoreCall) -> Result<()> {
        let operation = call.operation();
        self.calls.push(call);
        match self
            .failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl DocumentStorePort for InMemoryDocumentStore {
    fn provider(&self) -> &DocumentStoreProviderInfo {
        &self.provider
    }

    fn exists(&self, index: &IndexName) -> Result<bool> {
        let mut state = self.lock();
        state.record(StoreCall::Exists {
            index: index.clone(),
        })?;
        Ok(state.indices.contains_key(index))
    }

    fn create_index(&self, index: &IndexName, template: &IndexTemplate) -> Result<()> {
        let mut state = self.lock();
        state.record(StoreCall::CreateIndex {
            index: index.clone(),
            template: template.clone(),
        })?;
        state.indices.entry(index.clone()).or_default().template = Some(template.clone());
        Ok(())
    }

    fn bulk_index(
        &self,
        index: &IndexName,
        doc_type: &DocType,
        documents: &[MetricDocument],
    ) -> Result<()> {
        let mut state = self.lock();
        state.record(StoreCall::BulkIndex {
            index: index.clone(),
            doc_type: *doc_type,
            documents: documents.to_vec(),
        })?;

        let sources = documents
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|error| {
                ErrorEnvelope::unexpected(
                    ErrorCode::internal(),
                    format!("failed to encode document: {error}"),
                    ErrorClass::NonRetriable,
                )
            })?;
        state
            .indices
            .entry(index.clone())
            .or_default()
            .documents
            .extend(sources.into_iter().map(|source| (*doc_type, source)));
        Ok(())
    }

    fn search(
        &self,
        index: &IndexName,
        doc_type: &DocType,
        body: &Value,
    ) -> Result<SearchResponse> {
        let mut state = self.lock();
        state.record(StoreCall::Search {
            index: index.clone(),
            doc_type: *doc_type,
            body: body.clone(),
        })?;
        if let Some(response) = state.canned_search.clone() {
            return Ok(response);
        }

        let stored = state
            .indices
            .get(index)
            .ok_or_else(|| index_not_found_error(index.as_str()))?;
        let terms = term_filters(body);
        let size = body
            .get("size")
            .and_then(Value::as_u64)
            .and_then(|size| usize::try_from(size).ok())
            .unwrap_or(DEFAULT_SEARCH_SIZE);

        let hits = stored
            .documents
            .iter()
            .filter(|(stored_type, _)| stored_type == doc_type)
            .map(|(_, source)| source)
            .filter(|source| {
                terms
                    .iter()
                    .all(|(field, expected)| source.get(field.as_str()) == Some(expected))
            })
            .take(size)
            .cloned();
        Ok(SearchResponse::from_sources(hits))
    }
}

/// Collect `field == value` pairs from `query.bool.filter[].term`.
fn term_filters(body: &Value) -> Vec<(String, Value)> {
    body.pointer("/query/bool/filter")
        .and_then(Value::as_array)
        .map(|clauses| {
            clauses
                .iter()
                .filter_map(|clause| clause.get("term").and_then(Value::as_object))
                .flat_map(|term| {
                    term.iter()
                        .map(|(field, value)| (field.clone(), value.clone()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Client factory handing out one shared client and counting requests.
#[derive(Clone)]
pub struct InMemoryClientFactory {
    client: Arc<dyn DocumentStorePort>,
    created: Arc<AtomicUsize>,
}

impl InMemoryClientFactory {
    /// Factory returning `client` on every call.
    pub fn new(client: Arc<dyn DocumentStorePort>) -> Self {
        Self {
            client,
            created: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `create` calls so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ClientFactory for InMemoryClientFactory {
    fn create(&self) -> Result<Arc<dyn DocumentStorePort>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.client))
    }
}
