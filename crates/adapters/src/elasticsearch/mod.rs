//! Elasticsearch document store adapter (REST over blocking HTTP).

mod bulk;
mod client;
mod error;

pub use client::{ElasticsearchConfig, ElasticsearchDocumentStore};
pub use error::{ElasticsearchErrorContext, map_http_status_error};
