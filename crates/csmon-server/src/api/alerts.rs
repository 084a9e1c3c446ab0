use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Extension, Query, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use csmon_alert::feed::sort_for_feed;
use csmon_alert::fixture::sample_alerts;
use csmon_alert::normalizer::normalize_all;
use csmon_common::types::{
    AlertSummary, AlertsResponse, DataSource, NormalizedAlert, SeverityCounts,
};
use csmon_upstream::collector::AlertCollector;
use csmon_upstream::error::UpstreamError;
use csmon_upstream::AlertStatus;
use serde::Deserialize;
use tracing::Instrument;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

/// `Warning` header value set on fallback responses.
pub const FALLBACK_WARNING: &str = "199 csmon \"upstream unavailable, serving sample data\"";

/// Query parameters of the alert routes, as published in the OpenAPI
/// document. Handlers read the raw pairs so `status` may also be repeated.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AlertFeedParams {
    /// Comma separated alert statuses to include (enabled, disabled, archived)
    #[param(required = false)]
    pub status: Option<String>,
}

type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

/// Join every `status` value in query order. `None` when the key is absent.
pub fn collect_status_param(pairs: &[(String, String)]) -> Option<String> {
    let values: Vec<&str> = pairs
        .iter()
        .filter(|(key, _)| key == "status")
        .map(|(_, value)| value.as_str())
        .collect();
    (!values.is_empty()).then(|| values.join(","))
}

/// Parse the `status` query value. Blank entries are ignored; an empty or
/// missing value means no filter.
pub fn parse_status_filter(raw: Option<&str>) -> Result<Vec<AlertStatus>, UpstreamError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<AlertStatus>().map_err(UpstreamError::InvalidArgument))
        .collect()
}

async fn fetch_live(
    collector: &AlertCollector,
    status: Option<&str>,
) -> Result<Vec<NormalizedAlert>, UpstreamError> {
    let statuses = parse_status_filter(status)?;
    let pairs = collector.get_all_alerts(&statuses).await?;
    let mut alerts = normalize_all(&pairs);
    sort_for_feed(&mut alerts);
    Ok(alerts)
}

/// Produce the alert feed. Never fails: without a token the sample alerts are
/// served, and any upstream failure degrades to the sample alerts with the
/// failure reason in `error`.
pub async fn load_alert_feed(collector: &AlertCollector, status: Option<&str>) -> AlertsResponse {
    if !collector.is_configured() {
        tracing::info!("Metronome API token not configured, serving sample alerts");
        return AlertsResponse {
            data: sample_alerts(),
            source: DataSource::Mock,
            error: None,
        };
    }

    match fetch_live(collector, status).await {
        Ok(data) => {
            tracing::info!(
                count = data.len(),
                mode = collector.mode().name(),
                "Loaded alerts from Metronome"
            );
            AlertsResponse {
                data,
                source: DataSource::Metronome,
                error: None,
            }
        }
        Err(e) => {
            match &e {
                UpstreamError::NotConfigured => {
                    tracing::info!(error = %e, "Serving sample alerts")
                }
                _ => tracing::warn!(error = %e, "Failed to load alerts, serving sample alerts"),
            }
            fallback_feed(e.to_string())
        }
    }
}

/// Sample alerts tagged with the reason live data is not shown.
pub fn fallback_feed(error: String) -> AlertsResponse {
    AlertsResponse {
        data: sample_alerts(),
        source: DataSource::Mock,
        error: Some(error),
    }
}

/// Resolve the feed for a request. A query string that cannot be read is
/// answered from the sample alerts like any other failure.
async fn feed_for_query(collector: &AlertCollector, query: QueryPairs) -> AlertsResponse {
    match query {
        Ok(Query(pairs)) => {
            let status = collect_status_param(&pairs);
            load_alert_feed(collector, status.as_deref()).await
        }
        Err(rejection) => {
            let reason = rejection.body_text();
            tracing::warn!(error = %reason, "Invalid alert query, serving sample alerts");
            fallback_feed(format!("Invalid argument: {reason}"))
        }
    }
}

fn with_fallback_warning(mut response: Response, fallback: bool) -> Response {
    if fallback {
        response
            .headers_mut()
            .insert(header::WARNING, HeaderValue::from_static(FALLBACK_WARNING));
    }
    response
}

/// Customer alert feed, ordered by severity then newest first.
#[utoipa::path(
    get,
    path = "/api/alerts",
    tag = "Alerts",
    params(AlertFeedParams),
    responses(
        (status = 200, description = "Alert feed; `source` is mock when serving sample data", body = AlertsResponse)
    )
)]
async fn list_alerts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    query: QueryPairs,
) -> impl IntoResponse {
    let feed = feed_for_query(&state.collector, query)
        .instrument(tracing::info_span!("alert_feed", trace_id = %trace_id.0))
        .await;
    let fallback = feed.error.is_some();
    with_fallback_warning(Json(feed).into_response(), fallback)
}

/// Severity counts of the alert feed.
#[utoipa::path(
    get,
    path = "/api/alerts/summary",
    tag = "Alerts",
    params(AlertFeedParams),
    responses(
        (status = 200, description = "Alert counts by severity", body = AlertSummary)
    )
)]
async fn alert_summary(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    query: QueryPairs,
) -> impl IntoResponse {
    let feed = feed_for_query(&state.collector, query)
        .instrument(tracing::info_span!("alert_summary", trace_id = %trace_id.0))
        .await;
    let fallback = feed.error.is_some();
    let summary = AlertSummary {
        counts: SeverityCounts::from_alerts(&feed.data),
        source: feed.source,
        error: feed.error,
    };
    with_fallback_warning(Json(summary).into_response(), fallback)
}

pub fn alert_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_alerts))
        .routes(routes!(alert_summary))
}
