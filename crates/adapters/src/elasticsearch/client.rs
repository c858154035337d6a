//! Elasticsearch REST adapter.

use crate::elasticsearch::bulk::{BulkResponse, encode_bulk_body};
use crate::elasticsearch::error::{
    ElasticsearchErrorContext, bulk_rejected, error_type, invalid_response,
    map_http_status_error, map_transport_error,
};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, StatusCode};
use rally_metrics_ports::{
    DocType, DocumentStorePort, DocumentStoreProviderInfo, IndexName, IndexTemplate,
    MetricDocument, SearchResponse,
};
use rally_metrics_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result, SecretString};
use serde_json::Value;
use std::time::Duration;

const NDJSON: &str = "application/x-ndjson";
const INDEX_ALREADY_EXISTS: &str = "resource_already_exists_exception";

/// Elasticsearch adapter configuration.
#[derive(Debug, Clone)]
pub struct ElasticsearchConfig {
    /// Base URL (scheme, host and port) of the cluster.
    pub base_url: Box<str>,
    /// Optional basic-auth user.
    pub username: Option<Box<str>>,
    /// Optional basic-auth password.
    pub password: Option<SecretString>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl ElasticsearchConfig {
    /// Validates configuration invariants for the adapter.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "Elasticsearch base URL is required",
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "Elasticsearch timeout must be greater than zero",
            ));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "Elasticsearch user and password must be set together",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Credentials {
    username: Box<str>,
    password: SecretString,
}

enum RequestBody<'a> {
    Empty,
    Json(&'a Value),
    Ndjson(String),
}

/// Document store speaking the Elasticsearch REST API.
///
/// Uses a blocking HTTP client; every call waits for the response or the
/// configured timeout.
#[derive(Debug, Clone)]
pub struct ElasticsearchDocumentStore {
    provider: DocumentStoreProviderInfo,
    client: Client,
    base_url: Box<str>,
    credentials: Option<Credentials>,
}

impl ElasticsearchDocumentStore {
    /// Creates an adapter instance from configuration.
    pub fn new(config: ElasticsearchConfig) -> Result<Self> {
        config.validate()?;
        let base_url = normalize_base_url(&config.base_url);

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|error| {
                ErrorEnvelope::unexpected(
                    ErrorCode::new("store", "client_init_failed"),
                    format!("failed to build Elasticsearch client: {error}"),
                    ErrorClass::NonRetriable,
                )
            })?;

        let credentials = match (config.username, config.password) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            _ => None,
        };

        Ok(Self {
            provider: DocumentStoreProviderInfo {
                id: "elasticsearch".into(),
                name: "Elasticsearch".into(),
            },
            client,
            base_url,
            credentials,
        })
    }

    /// Normalized base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn execute(
        &self,
        method: Method,
        endpoint: &str,
        body: RequestBody<'_>,
        ctx: &ElasticsearchErrorContext,
    ) -> Result<(StatusCode, String)> {
        let url = format!("{}{endpoint}", self.base_url);
        tracing::debug!(operation = ctx.operation, %method, %url, "elasticsearch request");

        let mut request: RequestBuilder = self.client.request(method, &url);
        if let Some(credentials) = self.credentials.as_ref() {
            request =
                request.basic_auth(&credentials.username, Some(credentials.password.expose()));
        }
        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(value),
            RequestBody::Ndjson(text) => request
                .header(CONTENT_TYPE, HeaderValue::from_static(NDJSON))
                .body(text),
        };

        let response = request
            .send()
            .map_err(|error| map_transport_error(&error, ctx))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|error| map_transport_error(&error, ctx))?;
        tracing::debug!(
            operation = ctx.operation,
            status = status.as_u16(),
            "elasticsearch response"
        );
        Ok((status, text))
    }

    fn execute_ok(
        &self,
        method: Method,
        endpoint: &str,
        body: RequestBody<'_>,
        ctx: &ElasticsearchErrorContext,
    ) -> Result<String> {
        let (status, text) = self.execute(method, endpoint, body, ctx)?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(map_http_status_error(status.as_u16(), &text, ctx))
        }
    }
}

impl DocumentStorePort for ElasticsearchDocumentStore {
    fn provider(&self) -> &DocumentStoreProviderInfo {
        &self.provider
    }

    fn exists(&self, index: &IndexName) -> Result<bool> {
        let endpoint = format!("/{index}");
        let ctx =
            ElasticsearchErrorContext::new("elasticsearch.exists", Some(index.as_str()), &endpoint);
        let (status, text) = self.execute(Method::HEAD, &endpoint, RequestBody::Empty, &ctx)?;
        match status {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(map_http_status_error(other.as_u16(), &text, &ctx)),
        }
    }

    fn create_index(&self, index: &IndexName, template: &IndexTemplate) -> Result<()> {
        let endpoint = format!("/_template/{}", template.name);
        let ctx = ElasticsearchErrorContext::new(
            "elasticsearch.put_template",
            Some(index.as_str()),
            &endpoint,
        );
        self.execute_ok(
            Method::PUT,
            &endpoint,
            RequestBody::Json(&template.body),
            &ctx,
        )?;

        let endpoint = format!("/{index}");
        let ctx = ElasticsearchErrorContext::new(
            "elasticsearch.create_index",
            Some(index.as_str()),
            &endpoint,
        );
        let (status, text) = self.execute(Method::PUT, &endpoint, RequestBody::Empty, &ctx)?;
        if status.is_success() {
            return Ok(());
        }
        // Another writer created the index between the existence check and now.
        if status == StatusCode::BAD_REQUEST
            && error_type(&text).as_deref() == Some(INDEX_ALREADY_EXISTS)
        {
            tracing::debug!(index = index.as_str(), "index already exists");
            return Ok(());
        }
        Err(map_http_status_error(status.as_u16(), &text, &ctx))
    }

    fn bulk_index(
        &self,
        index: &IndexName,
        doc_type: &DocType,
        documents: &[MetricDocument],
    ) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let endpoint = "/_bulk";
        let ctx = ElasticsearchErrorContext::new(
            "elasticsearch.bulk_index",
            Some(index.as_str()),
            endpoint,
        );
        let body = encode_bulk_body(index, doc_type, documents).map_err(|error| {
            ErrorEnvelope::unexpected(
                ErrorCode::internal(),
                format!("failed to encode bulk body: {error}"),
                ErrorClass::NonRetriable,
            )
        })?;

        let text = self.execute_ok(Method::POST, endpoint, RequestBody::Ndjson(body), &ctx)?;
        let response: BulkResponse = serde_json::from_str(&text).map_err(|error| {
            invalid_response(format!("invalid bulk response: {error}"), &ctx)
        })?;
        if response.errors {
            let reason = response.first_failure();
            return Err(bulk_rejected(
                response.failed_items(),
                documents.len(),
                reason.as_deref(),
                &ctx,
            ));
        }
        Ok(())
    }

    fn search(
        &self,
        index: &IndexName,
        doc_type: &DocType,
        body: &Value,
    ) -> Result<SearchResponse> {
        let endpoint = format!("/{index}/{doc_type}/_search");
        let ctx =
            ElasticsearchErrorContext::new("elasticsearch.search", Some(index.as_str()), &endpoint);
        let text = self.execute_ok(Method::POST, &endpoint, RequestBody::Json(body), &ctx)?;
        serde_json::from_str(&text)
            .map_err(|error| invalid_response(format!("invalid search response: {error}"), &ctx))
    }
}

fn normalize_base_url(address: &str) -> Box<str> {
    let trimmed = address.trim();
    let mut processed = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_owned()
    } else {
        format!("http://{trimmed}")
    };
    let trimmed_len = processed.trim_end_matches('/').len();
    processed.truncate(trimmed_len);
    processed.into_boxed_str()
}
