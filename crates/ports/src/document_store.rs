//! Document store boundary contract.

use rally_metrics_domain::{DocType, IndexName, MetricDocument, MetricValue};
use rally_metrics_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provider descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStoreProviderInfo {
    /// Stable provider identifier (e.g. `elasticsearch`).
    pub id: Box<str>,
    /// Human-readable provider name.
    pub name: Box<str>,
}

/// Index template applied before an index is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTemplate {
    /// Template name registered in the store.
    pub name: Box<str>,
    /// Template body (index patterns, settings, mappings).
    pub body: Value,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Stored document source.
    #[serde(rename = "_source", default)]
    pub source: Value,
}

impl SearchHit {
    /// Read the metric `value` of this hit.
    ///
    /// A missing or non-numeric `value` means the store returned something the
    /// metrics schema cannot describe.
    pub fn value(&self) -> Result<MetricValue> {
        self.source
            .get("value")
            .cloned()
            .and_then(|value| serde_json::from_value::<MetricValue>(value).ok())
            .ok_or_else(|| {
                ErrorEnvelope::unexpected(
                    ErrorCode::new("store", "invalid_response"),
                    "search hit has no numeric `value` field",
                    ErrorClass::NonRetriable,
                )
            })
    }
}

/// Hits section of a search response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    /// Hits in store order.
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

/// Search response as returned by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Matching documents.
    #[serde(default)]
    pub hits: SearchHits,
}

impl SearchResponse {
    /// Build a response from document sources.
    #[must_use]
    pub fn from_sources(sources: impl IntoIterator<Item = Value>) -> Self {
        Self {
            hits: SearchHits {
                hits: sources
                    .into_iter()
                    .map(|source| SearchHit { source })
                    .collect(),
            },
        }
    }

    /// First hit, if any.
    #[must_use]
    pub fn first(&self) -> Option<&SearchHit> {
        self.hits.hits.first()
    }

    /// Number of hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.hits.len()
    }

    /// True when no document matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.hits.is_empty()
    }
}

/// Boundary contract for the metrics document store.
///
/// Calls block until the store answers or the client gives up; retries and
/// timeouts are the implementation's concern.
pub trait DocumentStorePort: Send + Sync {
    /// Provider info for this implementation.
    fn provider(&self) -> &DocumentStoreProviderInfo;

    /// Return true when the index exists.
    fn exists(&self, index: &IndexName) -> Result<bool>;

    /// Register `template`, then create the index.
    fn create_index(&self, index: &IndexName, template: &IndexTemplate) -> Result<()>;

    /// Write all documents in one request.
    fn bulk_index(
        &self,
        index: &IndexName,
        doc_type: &DocType,
        documents: &[MetricDocument],
    ) -> Result<()>;

    /// Run a query body against one index.
    fn search(&self, index: &IndexName, doc_type: &DocType, body: &Value)
    -> Result<SearchResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_parses_wire_shape() -> Result<()> {
        let response: SearchResponse = serde_json::from_value(json!({
            "took": 3,
            "hits": {
                "total": 1,
                "hits": [{"_index": "rally-2016", "_source": {"value": 5000}}]
            }
        }))
        .map_err(|error| {
            ErrorEnvelope::unexpected(
                ErrorCode::internal(),
                error.to_string(),
                ErrorClass::NonRetriable,
            )
        })?;

        assert_eq!(response.len(), 1);
        let value = response.first().map(SearchHit::value).transpose()?;
        assert_eq!(value, Some(MetricValue::Integer(5000)));
        Ok(())
    }

    #[test]
    fn hit_without_value_is_invalid_response() {
        let hit = SearchHit {
            source: json!({"name": "indexing_throughput"}),
        };
        let error = hit.value().err();
        assert!(error.is_some_and(|error| error.has_code("store", "invalid_response")));
    }

    #[test]
    fn empty_response_has_no_first_hit() {
        let response = SearchResponse::from_sources([]);
        assert!(response.is_empty());
        assert!(response.first().is_none());
    }
}
