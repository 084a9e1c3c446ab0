mod common;

use axum::http::StatusCode;
use common::{
    build_test_context, build_test_context_with_config, customer, customer_alert, header,
    request_no_body, StubUpstream,
};
use csmon_alert::fixture::sample_alerts;
use csmon_server::api::alerts::FALLBACK_WARNING;
use csmon_server::config::ServerConfig;
use csmon_upstream::{AlertStatus, CustomerAlertStatus};
use serde_json::Value;
use std::collections::BTreeSet;

fn fixture_json() -> Value {
    serde_json::to_value(sample_alerts()).expect("fixture should serialize")
}

fn ids(body: &Value) -> BTreeSet<String> {
    body["data"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn two_customer_upstream() -> StubUpstream {
    StubUpstream::configured()
        .with_customer(
            customer("c1", "Acme"),
            vec![customer_alert(
                "a1",
                "Spend Cap",
                Some(CustomerAlertStatus::InAlarm),
                100.0,
                "2025-01-01T00:00:00Z",
            )],
        )
        .with_customer(
            customer("c2", "Globex"),
            vec![
                customer_alert(
                    "a2",
                    "Commit Burn",
                    Some(CustomerAlertStatus::Evaluating),
                    50.0,
                    "2025-01-03T00:00:00Z",
                ),
                customer_alert("a3", "Invoice", None, 0.0, "2025-01-02T00:00:00Z"),
            ],
        )
}

#[tokio::test]
async fn unconfigured_upstream_serves_sample_alerts_without_error() {
    let ctx = build_test_context(StubUpstream::unconfigured());

    let (status, body, headers) = request_no_body(&ctx.app, "GET", "/api/alerts", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "mock");
    assert!(body.get("error").is_none());
    assert_eq!(body["data"], fixture_json());
    assert!(header(&headers, "warning").is_none());
    assert_eq!(ctx.upstream.call_count(), 0);

    let trace_id = header(&headers, "x-trace-id").expect("trace id header");
    assert_eq!(trace_id.len(), 16);
}

#[tokio::test]
async fn failing_upstream_falls_back_to_sample_alerts_with_error() {
    let ctx = build_test_context(StubUpstream::failing());

    let (status, body, headers) = request_no_body(&ctx.app, "GET", "/api/alerts", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "mock");
    let error = body["error"].as_str().expect("error should be a string");
    assert!(error.contains("service unavailable"), "unexpected error: {error}");
    assert_eq!(body["data"], fixture_json());
    assert_eq!(header(&headers, "warning"), Some(FALLBACK_WARNING));
}

#[tokio::test]
async fn configured_upstream_returns_normalized_alerts_from_every_customer() {
    let ctx = build_test_context(two_customer_upstream());

    let (status, body, headers) = request_no_body(&ctx.app, "GET", "/api/alerts", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "metronome");
    assert!(body.get("error").is_none());
    assert!(header(&headers, "warning").is_none());
    assert_eq!(
        ids(&body),
        BTreeSet::from(["a1".to_string(), "a2".to_string(), "a3".to_string()])
    );

    let data = body["data"].as_array().expect("data should be an array");
    let a1 = data
        .iter()
        .find(|item| item["id"] == "a1")
        .expect("a1 should be present");
    assert_eq!(a1["customerId"], "c1");
    assert_eq!(a1["customerName"], "Acme");
    assert_eq!(a1["severity"], "critical");
    assert_eq!(a1["currentValue"], 80.0);
    assert_eq!(a1["percentageOfThreshold"], 80);
    assert_eq!(a1["message"], "Alert triggered: Spend Cap");
    assert_eq!(a1["metricName"], "API Calls");
    assert_eq!(a1["triggeredAt"], "2025-01-01T00:00:00Z");

    let a3 = data
        .iter()
        .find(|item| item["id"] == "a3")
        .expect("a3 should be present");
    assert_eq!(a3["severity"], "info");
    assert_eq!(a3["currentValue"], 0.0);
    assert_eq!(a3["percentageOfThreshold"], 0);
}

#[tokio::test]
async fn live_feed_is_ordered_by_severity() {
    let ctx = build_test_context(two_customer_upstream());

    let (_, body, _) = request_no_body(&ctx.app, "GET", "/api/alerts", None).await;

    let severities: Vec<&str> = body["data"]
        .as_array()
        .expect("data should be an array")
        .iter()
        .filter_map(|item| item["severity"].as_str())
        .collect();
    assert_eq!(severities, vec!["critical", "warning", "info"]);
}

#[tokio::test]
async fn status_filter_is_forwarded_upstream() {
    let ctx = build_test_context(two_customer_upstream());

    let (status, body, _) =
        request_no_body(&ctx.app, "GET", "/api/alerts?status=enabled,ARCHIVED", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "metronome");
    let statuses = ctx
        .upstream
        .last_statuses
        .lock()
        .expect("lock should not be poisoned")
        .clone();
    assert_eq!(statuses, vec![AlertStatus::Enabled, AlertStatus::Archived]);
}

#[tokio::test]
async fn repeated_status_params_are_merged_on_both_routes() {
    for uri in [
        "/api/alerts?status=enabled&status=archived",
        "/api/alerts/summary?status=enabled&status=archived",
    ] {
        let ctx = build_test_context(two_customer_upstream());

        let (status, body, headers) = request_no_body(&ctx.app, "GET", uri, None).await;

        assert_eq!(status, StatusCode::OK, "GET {uri}");
        assert_eq!(body["source"], "metronome", "GET {uri}");
        assert!(body.get("error").is_none(), "GET {uri}");
        assert!(header(&headers, "warning").is_none(), "GET {uri}");
        let statuses = ctx
            .upstream
            .last_statuses
            .lock()
            .expect("lock should not be poisoned")
            .clone();
        assert_eq!(statuses, vec![AlertStatus::Enabled, AlertStatus::Archived], "GET {uri}");
    }
}

#[tokio::test]
async fn unknown_repeated_status_falls_back_with_ok_status_on_both_routes() {
    for uri in [
        "/api/alerts?status=enabled&status=firing",
        "/api/alerts/summary?status=enabled&status=firing",
    ] {
        let ctx = build_test_context(two_customer_upstream());

        let (status, body, headers) = request_no_body(&ctx.app, "GET", uri, None).await;

        assert_eq!(status, StatusCode::OK, "GET {uri}");
        assert_eq!(body["source"], "mock", "GET {uri}");
        assert!(body["error"].is_string(), "GET {uri}");
        assert_eq!(header(&headers, "warning"), Some(FALLBACK_WARNING), "GET {uri}");
        assert_eq!(ctx.upstream.call_count(), 0, "GET {uri}");
    }
}

#[tokio::test]
async fn unknown_status_filter_falls_back_without_calling_upstream() {
    let ctx = build_test_context(two_customer_upstream());

    let (status, body, headers) =
        request_no_body(&ctx.app, "GET", "/api/alerts?status=firing", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "mock");
    let error = body["error"].as_str().expect("error should be a string");
    assert!(error.contains("unknown alert status"), "unexpected error: {error}");
    assert_eq!(header(&headers, "warning"), Some(FALLBACK_WARNING));
    assert_eq!(ctx.upstream.call_count(), 0);
}

#[tokio::test]
async fn single_customer_mode_queries_only_the_configured_customer() {
    let mut config = ServerConfig::default();
    config.upstream.customer_id = Some("c2".to_string());
    config.upstream.customer_name = Some("Globex Corp".to_string());
    let ctx = build_test_context_with_config(two_customer_upstream(), config);

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/api/alerts", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "metronome");
    assert_eq!(ids(&body), BTreeSet::from(["a2".to_string(), "a3".to_string()]));
    assert!(body["data"]
        .as_array()
        .expect("data should be an array")
        .iter()
        .all(|item| item["customerName"] == "Globex Corp"));

    let calls = ctx
        .upstream
        .alert_calls
        .lock()
        .expect("lock should not be poisoned")
        .clone();
    assert_eq!(calls, vec!["c2".to_string()]);
    assert_eq!(ctx.upstream.call_count(), 1);
}

#[tokio::test]
async fn summary_counts_live_alerts_by_severity() {
    let ctx = build_test_context(two_customer_upstream());

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/api/alerts/summary", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "metronome");
    assert_eq!(body["total"], 3);
    assert_eq!(body["critical"], 1);
    assert_eq!(body["warning"], 1);
    assert_eq!(body["info"], 1);
}

#[tokio::test]
async fn summary_counts_sample_alerts_on_fallback() {
    let ctx = build_test_context(StubUpstream::failing());

    let (status, body, headers) =
        request_no_body(&ctx.app, "GET", "/api/alerts/summary", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "mock");
    assert!(body["error"].is_string());
    assert_eq!(body["total"], 5);
    assert_eq!(body["critical"], 2);
    assert_eq!(body["warning"], 2);
    assert_eq!(body["info"], 1);
    assert_eq!(header(&headers, "warning"), Some(FALLBACK_WARNING));
}

#[tokio::test]
async fn health_reports_upstream_wiring() {
    let ctx = build_test_context(StubUpstream::configured());

    let (status, body, headers) = request_no_body(&ctx.app, "GET", "/v1/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["err_code"], 0);
    assert_eq!(body["data"]["upstream_configured"], true);
    assert_eq!(body["data"]["collection_mode"], "fan_out");
    assert_eq!(
        body["trace_id"].as_str(),
        header(&headers, "x-trace-id"),
        "body and header trace ids should match"
    );
}

#[tokio::test]
async fn inbound_trace_id_is_echoed() {
    let ctx = build_test_context(StubUpstream::unconfigured());

    let (_, _, headers) =
        request_no_body(&ctx.app, "GET", "/api/alerts", Some("00ff00ff00ff00ff")).await;

    assert_eq!(header(&headers, "x-trace-id"), Some("00ff00ff00ff00ff"));
}
