use crate::error::{Result, UpstreamError};
use crate::{
    AlertStatus, CustomerAlert, Page, RequestStrategy, UpstreamApi, UpstreamConfig,
    UpstreamCustomer,
};
use anyhow::Context;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

const CUSTOMER_ALERTS_ENDPOINT: &str = "/customer-alerts/list";

const BASE_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Delay before retry number `attempt + 1`: 100ms doubling per attempt, capped.
fn retry_backoff(attempt: u32) -> Duration {
    let ms = BASE_BACKOFF_MS.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(ms).min(MAX_BACKOFF)
}

#[derive(Serialize)]
struct CustomerAlertsRequest<'a> {
    customer_id: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    alert_statuses: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_page: Option<&'a str>,
}

#[derive(Serialize)]
struct CustomersRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    next_page: Option<&'a str>,
}

pub struct MetronomeClient {
    base_url: String,
    token: Option<String>,
    client: Client,
    max_retries: u32,
    customer_list_strategies: Vec<RequestStrategy>,
}

impl MetronomeClient {
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let token = config.token().map(str::to_string);
        if token.is_none() {
            tracing::info!("No Metronome API token configured, upstream calls are disabled");
        }

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
            client,
            max_retries: config.max_retries,
            customer_list_strategies: config.customer_list_strategies.clone(),
        })
    }

    /// Send one request and decode the JSON response.
    async fn request_once<T: DeserializeOwned>(
        &self,
        method: &Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<T> {
        let token = self.token.as_deref().ok_or(UpstreamError::NotConfigured)?;
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(method = %method, url = %url, "Sending Metronome API request");

        let mut request = self.client.request(method.clone(), &url).bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::unavailable(endpoint, format!("request failed: {e}")))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            UpstreamError::unavailable(endpoint, format!("failed to read response body: {e}"))
        })?;

        if !status.is_success() {
            let body = serde_json::from_str::<Value>(&text).ok();
            tracing::warn!(
                endpoint,
                status = status.as_u16(),
                body = ?body,
                "Metronome API returned non-success status"
            );
            return Err(UpstreamError::UpstreamUnavailable {
                endpoint: endpoint.to_string(),
                status: Some(status.as_u16()),
                body,
                message: format!(
                    "status={} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                ),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            UpstreamError::unavailable(endpoint, format!("malformed response body: {e}"))
        })
    }

    /// [`Self::request_once`] with bounded retries for transient failures.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<T> {
        let mut attempt = 0u32;
        loop {
            match self.request_once(&method, endpoint, query, body).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        endpoint,
                        error = %e,
                        "Metronome API request failed, retrying"
                    );
                    tokio::time::sleep(retry_backoff(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn list_customers_with(
        &self,
        strategy: RequestStrategy,
        cursor: Option<&str>,
    ) -> Result<Page<UpstreamCustomer>> {
        let endpoint = strategy.endpoint();
        match strategy {
            RequestStrategy::Get => {
                let query: Vec<(&str, &str)> =
                    cursor.map(|c| vec![("next_page", c)]).unwrap_or_default();
                self.request(Method::GET, endpoint, &query, None).await
            }
            RequestStrategy::Post | RequestStrategy::PostList => {
                let body = serde_json::to_value(CustomersRequest { next_page: cursor })
                    .map_err(|e| UpstreamError::unavailable(endpoint, e.to_string()))?;
                self.request(Method::POST, endpoint, &[], Some(&body)).await
            }
        }
    }
}

#[async_trait::async_trait]
impl UpstreamApi for MetronomeClient {
    fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    async fn list_customers(&self, cursor: Option<&str>) -> Result<Page<UpstreamCustomer>> {
        if !self.is_configured() {
            return Err(UpstreamError::NotConfigured);
        }

        let mut last_err = None;
        for strategy in &self.customer_list_strategies {
            match self.list_customers_with(*strategy, cursor).await {
                Ok(page) => {
                    tracing::debug!(
                        strategy = %strategy,
                        count = page.data.len(),
                        "Listed Metronome customers"
                    );
                    return Ok(page);
                }
                Err(e) => {
                    tracing::info!(
                        strategy = %strategy,
                        error = %e,
                        "Customer listing strategy failed, trying next"
                    );
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            UpstreamError::unavailable("/customers", "no customer listing strategy configured")
        }))
    }

    async fn list_customer_alerts(
        &self,
        customer_id: &str,
        statuses: &[AlertStatus],
        cursor: Option<&str>,
    ) -> Result<Page<CustomerAlert>> {
        if customer_id.trim().is_empty() {
            return Err(UpstreamError::InvalidArgument(
                "customer_id must not be empty".to_string(),
            ));
        }
        if !self.is_configured() {
            return Err(UpstreamError::NotConfigured);
        }

        let body = serde_json::to_value(CustomerAlertsRequest {
            customer_id,
            alert_statuses: statuses.iter().filter_map(|s| s.as_filter_value()).collect(),
            next_page: cursor,
        })
        .map_err(|e| UpstreamError::unavailable(CUSTOMER_ALERTS_ENDPOINT, e.to_string()))?;

        self.request(Method::POST, CUSTOMER_ALERTS_ENDPOINT, &[], Some(&body))
            .await
    }
}
