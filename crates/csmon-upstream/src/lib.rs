//! Client for the Metronome billing API.
//!
//! [`metronome::MetronomeClient`] performs the authenticated HTTP calls and
//! [`collector::AlertCollector`] hides the customers → per-customer alerts
//! fan-out behind a single call.

pub mod collector;
pub mod error;
pub mod metronome;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.metronome.com/v1";

/// A customer as returned by the customer listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamCustomer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UpstreamCustomer {
    /// A customer known only by id (single-customer deployments).
    pub fn from_id(id: &str, name: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.unwrap_or_default().to_string(),
            external_id: None,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Lifecycle status of an alert definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    #[serde(alias = "ENABLED")]
    Enabled,
    #[serde(alias = "DISABLED")]
    Disabled,
    #[serde(alias = "ARCHIVED")]
    Archived,
    /// Any status this client does not know about. Never sent as a filter.
    #[serde(other)]
    Unknown,
}

impl AlertStatus {
    /// Value expected by the `alert_statuses` request filter.
    pub fn as_filter_value(self) -> Option<&'static str> {
        match self {
            AlertStatus::Enabled => Some("ENABLED"),
            AlertStatus::Disabled => Some("DISABLED"),
            AlertStatus::Archived => Some("ARCHIVED"),
            AlertStatus::Unknown => None,
        }
    }
}

impl std::str::FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enabled" => Ok(AlertStatus::Enabled),
            "disabled" => Ok(AlertStatus::Disabled),
            "archived" => Ok(AlertStatus::Archived),
            _ => Err(format!("unknown alert status: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditType {
    pub id: String,
    pub name: String,
}

/// An alert rule as configured in Metronome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamAlert {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub uniqueness_key: Option<String>,
    /// usage_threshold / commitment_threshold / credit_balance / invoice_threshold
    #[serde(rename = "type")]
    pub alert_type: String,
    pub status: AlertStatus,
    #[serde(default)]
    pub credit_type: Option<CreditType>,
    /// Missing or null reads as 0.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub threshold: f64,
    /// Kept verbatim, it is echoed back to the dashboard as-is.
    pub updated_at: String,
}

fn null_as_zero<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// Evaluation state of one customer against an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerAlertStatus {
    Ok,
    InAlarm,
    Evaluating,
    #[serde(other)]
    Unknown,
}

/// One entry of the per-customer alert listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerAlert {
    #[serde(default)]
    pub customer_status: Option<CustomerAlertStatus>,
    pub alert: UpstreamAlert,
    /// Only present when the upstream echoes the owning customer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

/// A page of results with the opaque cursor for the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub next_page: Option<String>,
}

impl<T> Page<T> {
    /// Cursor of the next page, treating an empty string as the end.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_page.as_deref().filter(|c| !c.is_empty())
    }
}

/// One way of calling the customer listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStrategy {
    /// `GET /customers`, cursor as `?next_page=`
    Get,
    /// `POST /customers`, cursor in the JSON body
    Post,
    /// `POST /customers/list`, cursor in the JSON body
    PostList,
}

impl RequestStrategy {
    pub fn endpoint(self) -> &'static str {
        match self {
            RequestStrategy::Get | RequestStrategy::Post => "/customers",
            RequestStrategy::PostList => "/customers/list",
        }
    }
}

impl std::fmt::Display for RequestStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStrategy::Get => write!(f, "GET /customers"),
            RequestStrategy::Post => write!(f, "POST /customers"),
            RequestStrategy::PostList => write!(f, "POST /customers/list"),
        }
    }
}

/// Upstream connection settings (the `[upstream]` section of the server config).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token. Absent or blank means the upstream is not configured.
    #[serde(default)]
    pub api_token: Option<String>,
    /// When set, only this customer is queried (single-customer mode).
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Display name for `customer_id`, since the alert payload has none.
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Upper bound for one customer's complete alert listing during fan-out.
    #[serde(default = "default_customer_timeout_secs")]
    pub customer_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_fanout_concurrency")]
    pub fanout_concurrency: usize,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_customer_list_strategies")]
    pub customer_list_strategies: Vec<RequestStrategy>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            customer_id: None,
            customer_name: None,
            request_timeout_secs: default_request_timeout_secs(),
            customer_timeout_secs: default_customer_timeout_secs(),
            max_retries: default_max_retries(),
            fanout_concurrency: default_fanout_concurrency(),
            max_pages: default_max_pages(),
            customer_list_strategies: default_customer_list_strategies(),
        }
    }
}

impl UpstreamConfig {
    /// The configured token, ignoring blank values.
    pub fn token(&self) -> Option<&str> {
        self.api_token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// The single-customer target, ignoring blank values.
    pub fn target_customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_customer_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_fanout_concurrency() -> usize {
    5
}

fn default_max_pages() -> usize {
    50
}

fn default_customer_list_strategies() -> Vec<RequestStrategy> {
    vec![
        RequestStrategy::Get,
        RequestStrategy::Post,
        RequestStrategy::PostList,
    ]
}

/// The upstream operations the alert pipeline needs.
///
/// Implemented by [`metronome::MetronomeClient`]; tests substitute doubles.
#[async_trait::async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Whether a credential is present. When `false` every call fails with
    /// [`error::UpstreamError::NotConfigured`] without touching the network.
    fn is_configured(&self) -> bool;

    /// List one page of customers.
    async fn list_customers(&self, cursor: Option<&str>) -> error::Result<Page<UpstreamCustomer>>;

    /// List one page of a customer's alerts. An empty `statuses` slice means
    /// no status filter.
    async fn list_customer_alerts(
        &self,
        customer_id: &str,
        statuses: &[AlertStatus],
        cursor: Option<&str>,
    ) -> error::Result<Page<CustomerAlert>>;
}
