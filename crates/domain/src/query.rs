//! Filtered metric lookups.

use crate::primitives::MetricName;
use crate::trial::TrialContext;
use serde::Serialize;
use std::collections::BTreeMap;

/// Query for documents of one metric within one trial.
///
/// Serializes to a `bool` query whose `filter` holds exact `term` clauses in
/// a fixed order: trial timestamp, environment, track, track setup, name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricQuery {
    query: QueryClause,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct QueryClause {
    bool: BoolClause,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct BoolClause {
    filter: Vec<TermClause>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct TermClause {
    term: BTreeMap<&'static str, String>,
}

impl TermClause {
    fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            term: BTreeMap::from([(field, value.into())]),
        }
    }
}

impl MetricQuery {
    /// Build the lookup for `name` within the given trial.
    #[must_use]
    pub fn for_metric(context: &TrialContext, name: &MetricName) -> Self {
        let filter = vec![
            TermClause::new(
                "trial-timestamp",
                context.trial_timestamp().to_compact_stamp(),
            ),
            TermClause::new("environment", context.environment().as_str()),
            TermClause::new("track", context.track().as_str()),
            TermClause::new("track-setup", context.track_setup().as_str()),
            TermClause::new("name", name.as_str()),
        ];

        Self {
            query: QueryClause {
                bool: BoolClause { filter },
            },
            size: None,
        }
    }

    /// Request up to `size` hits instead of the store's default page.
    #[must_use]
    pub const fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// Requested page size, if any.
    #[must_use]
    pub const fn size(&self) -> Option<usize> {
        self.size
    }

    /// Render the request body.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        // Only string-keyed maps and plain values; serialization cannot fail.
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{EnvironmentName, PrimitiveError, TrackName, TrackSetupName};
    use crate::trial::TrialTimestamp;
    use serde_json::json;

    fn context() -> Result<TrialContext, PrimitiveError> {
        Ok(TrialContext::new(
            TrialTimestamp::from_ymd_hms(2016, 1, 31, 0, 0, 0)?,
            TrackName::parse("test")?,
            TrackSetupName::parse("defaults")?,
            EnvironmentName::parse("unittest")?,
        ))
    }

    #[test]
    fn filter_clauses_keep_fixed_order() -> Result<(), Box<dyn std::error::Error>> {
        let query =
            MetricQuery::for_metric(&context()?, &MetricName::parse("indexing_throughput")?);

        assert_eq!(
            query.to_value(),
            json!({
                "query": {
                    "bool": {
                        "filter": [
                            {"term": {"trial-timestamp": "20160131T000000Z"}},
                            {"term": {"environment": "unittest"}},
                            {"term": {"track": "test"}},
                            {"term": {"track-setup": "defaults"}},
                            {"term": {"name": "indexing_throughput"}}
                        ]
                    }
                }
            })
        );
        Ok(())
    }

    #[test]
    fn size_is_a_top_level_field() -> Result<(), Box<dyn std::error::Error>> {
        let query =
            MetricQuery::for_metric(&context()?, &MetricName::parse("latency")?).with_size(10_000);
        let body = query.to_value();
        assert_eq!(body["size"], json!(10_000));
        assert_eq!(body["query"]["bool"]["filter"][4], json!({"term": {"name": "latency"}}));
        Ok(())
    }

    #[test]
    fn size_is_omitted_by_default() -> Result<(), Box<dyn std::error::Error>> {
        let query = MetricQuery::for_metric(&context()?, &MetricName::parse("latency")?);
        assert_eq!(query.size(), None);
        assert!(query.to_value().get("size").is_none());
        Ok(())
    }
}
