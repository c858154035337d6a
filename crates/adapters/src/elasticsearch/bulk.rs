//! Bulk API request encoding and response decoding.

use rally_metrics_domain::{DocType, IndexName, MetricDocument};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize)]
struct BulkAction<'a> {
    index: BulkActionTarget<'a>,
}

#[derive(Serialize)]
struct BulkActionTarget<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type")]
    doc_type: &'a str,
}

/// Encode documents as an NDJSON bulk body: one action line and one source
/// line per document, newline-terminated.
pub fn encode_bulk_body(
    index: &IndexName,
    doc_type: &DocType,
    documents: &[MetricDocument],
) -> serde_json::Result<String> {
    let action = serde_json::to_string(&BulkAction {
        index: BulkActionTarget {
            index: index.as_str(),
            doc_type: doc_type.as_str(),
        },
    })?;

    let mut body = String::new();
    for document in documents {
        body.push_str(&action);
        body.push('\n');
        body.push_str(&serde_json::to_string(document)?);
        body.push('\n');
    }
    Ok(body)
}

#[derive(Debug, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BTreeMap<String, BulkItemResult>>,
}

#[derive(Debug, Deserialize)]
pub struct BulkItemResult {
    #[serde(default)]
    pub error: Option<BulkItemError>,
}

#[derive(Debug, Deserialize)]
pub struct BulkItemError {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl BulkResponse {
    /// Number of items that carry an error.
    pub fn failed_items(&self) -> usize {
        self.item_errors().count()
    }

    /// `type: reason` of the first failed item.
    pub fn first_failure(&self) -> Option<String> {
        self.item_errors().next().map(|error| {
            match (error.kind.as_deref(), error.reason.as_deref()) {
                (Some(kind), Some(reason)) => format!("{kind}: {reason}"),
                (Some(text), None) | (None, Some(text)) => text.to_owned(),
                (None, None) => "unknown item failure".to_owned(),
            }
        })
    }

    fn item_errors(&self) -> impl Iterator<Item = &BulkItemError> {
        self.items
            .iter()
            .flat_map(BTreeMap::values)
            .filter_map(|result| result.error.as_ref())
    }
}
