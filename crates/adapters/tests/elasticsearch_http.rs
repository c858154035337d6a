// Elasticsearch adapter integration tests against a mock HTTP server.
#![allow(missing_docs)]

use rally_metrics_adapters::elasticsearch::{ElasticsearchConfig, ElasticsearchDocumentStore};
use rally_metrics_adapters::template::BundledTemplateProvider;
use rally_metrics_domain::{
    DocType, EnvironmentName, IndexName, MetricDocument, MetricName, MetricQuery, MetricValue,
    TrackName, TrackSetupName, TrialContext, TrialTimestamp,
};
use rally_metrics_ports::{DocumentStorePort, IndexTemplateProvider};
use rally_metrics_shared::{ErrorClass, Result};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{basic_auth, body_json, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

fn store(base_url: &str) -> Result<ElasticsearchDocumentStore> {
    ElasticsearchDocumentStore::new(ElasticsearchConfig {
        base_url: base_url.into(),
        username: None,
        password: None,
        timeout_ms: 2_000,
    })
}

fn context() -> Result<TrialContext> {
    Ok(TrialContext::new(
        TrialTimestamp::from_ymd_hms(2016, 1, 31, 0, 0, 0)?,
        TrackName::parse("test")?,
        TrackSetupName::parse("defaults")?,
        EnvironmentName::parse("unittest")?,
    ))
}

fn rally_2016() -> Result<IndexName> {
    Ok(IndexName::parse("rally-2016")?)
}

#[tokio::test]
async fn exists_maps_head_status() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/rally-2016"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/rally-2017"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/rally-2018"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let uri = server.uri();
    let (present, absent, forbidden) = tokio::task::spawn_blocking(move || -> Result<_> {
        let store = store(&uri)?;
        Ok((
            store.exists(&rally_2016()?)?,
            store.exists(&IndexName::parse("rally-2017")?)?,
            store.exists(&IndexName::parse("rally-2018")?).err(),
        ))
    })
    .await??;

    assert!(present);
    assert!(!absent);
    let forbidden = forbidden.ok_or("expected 403 to fail")?;
    assert!(forbidden.has_code("store", "http_status"));
    assert_eq!(
        forbidden.metadata.get("http_status").map(String::as_str),
        Some("403")
    );
    Ok(())
}

#[tokio::test]
async fn create_index_puts_template_then_index() -> TestResult {
    let template = BundledTemplateProvider.template()?;
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/_template/rally"))
        .and(body_json(template.body.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/rally-2016"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    tokio::task::spawn_blocking(move || -> Result<()> {
        store(&uri)?.create_index(&rally_2016()?, &template)
    })
    .await??;
    Ok(())
}

#[tokio::test]
async fn create_index_tolerates_concurrent_creation() -> TestResult {
    let template = BundledTemplateProvider.template()?;
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/_template/rally"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/rally-2016"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "type": "resource_already_exists_exception",
                "reason": "index [rally-2016/abc] already exists"
            },
            "status": 400
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    tokio::task::spawn_blocking(move || -> Result<()> {
        store(&uri)?.create_index(&rally_2016()?, &template)
    })
    .await??;
    Ok(())
}

#[tokio::test]
async fn bulk_index_sends_ndjson_with_basic_auth() -> TestResult {
    let context = context()?;
    let document = MetricDocument::new(
        &context,
        1_453_362_707,
        MetricName::parse("indexing_throughput")?,
        MetricValue::Integer(5000),
        "docs/s",
    );
    let expected_body = format!(
        "{}\n{}\n",
        json!({"index": {"_index": "rally-2016", "_type": "metrics"}}),
        serde_json::to_string(&document)?
    );

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .and(basic_auth("rally", "changeme"))
        .and(header("content-type", "application/x-ndjson"))
        .and(body_string(expected_body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "took": 3,
            "errors": false,
            "items": [{"index": {"_index": "rally-2016", "status": 201}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let store = ElasticsearchDocumentStore::new(ElasticsearchConfig {
            base_url: uri.into(),
            username: Some("rally".into()),
            password: Some("changeme".into()), // pragma: allowlist secret
            timeout_ms: 2_000,
        })?;
        store.bulk_index(&rally_2016()?, &DocType::METRICS, &[document])
    })
    .await??;
    Ok(())
}

#[tokio::test]
async fn bulk_item_failures_are_rejected() -> TestResult {
    let context = context()?;
    let document = MetricDocument::new(
        &context,
        1_453_362_707,
        MetricName::parse("indexing_throughput")?,
        MetricValue::Integer(5000),
        "docs/s",
    );

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "took": 3,
            "errors": true,
            "items": [{"index": {"_index": "rally-2016", "status": 400, "error": {
                "type": "mapper_parsing_exception",
                "reason": "failed to parse [value]"
            }}}]
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let error = tokio::task::spawn_blocking(move || -> Result<_> {
        Ok(store(&uri)?
            .bulk_index(&rally_2016()?, &DocType::METRICS, &[document])
            .err())
    })
    .await??
    .ok_or("expected bulk failure")?;

    assert!(error.has_code("store", "bulk_rejected"));
    assert!(error.message.contains("failed to parse [value]"));
    Ok(())
}

#[tokio::test]
async fn search_posts_query_to_typed_endpoint() -> TestResult {
    let query = MetricQuery::for_metric(&context()?, &MetricName::parse("indexing_throughput")?)
        .to_value();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rally-2016/metrics/_search"))
        .and(body_json(query.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "took": 1,
            "hits": {"total": 1, "hits": [{"_index": "rally-2016", "_source": {"value": 5000}}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let response = tokio::task::spawn_blocking(move || -> Result<_> {
        store(&uri)?.search(&rally_2016()?, &DocType::METRICS, &query)
    })
    .await??;

    assert_eq!(response.len(), 1);
    let value = response.first().ok_or("expected a hit")?.value()?;
    assert_eq!(value, MetricValue::Integer(5000));
    Ok(())
}

#[tokio::test]
async fn malformed_search_response_is_invalid() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rally-2016/metrics/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let uri = server.uri();
    let error = tokio::task::spawn_blocking(move || -> Result<_> {
        Ok(store(&uri)?
            .search(&rally_2016()?, &DocType::METRICS, &json!({}))
            .err())
    })
    .await??
    .ok_or("expected decode failure")?;

    assert!(error.has_code("store", "invalid_response"));
    Ok(())
}

#[tokio::test]
async fn slow_responses_time_out_as_retriable() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/rally-2016"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1_500)))
        .mount(&server)
        .await;

    let uri = server.uri();
    let error = tokio::task::spawn_blocking(move || -> Result<_> {
        let store = ElasticsearchDocumentStore::new(ElasticsearchConfig {
            base_url: uri.into(),
            username: None,
            password: None,
            timeout_ms: 200,
        })?;
        Ok(store.exists(&rally_2016()?).err())
    })
    .await??
    .ok_or("expected timeout")?;

    assert!(error.has_code("store", "timeout"));
    assert_eq!(error.class, ErrorClass::Retriable);
    Ok(())
}
