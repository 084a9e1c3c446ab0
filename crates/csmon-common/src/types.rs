use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use csmon_common::types::Severity;
///
/// let sev: Severity = "warning".parse().unwrap();
/// assert_eq!(sev, Severity::Warning);
/// assert_eq!(sev.to_string(), "warning");
/// assert!(Severity::Critical > Severity::Info);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Where an alert feed came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// The built-in sample dataset.
    Mock,
    /// Live data from the Metronome billing API.
    Metronome,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Mock => write!(f, "mock"),
            DataSource::Metronome => write!(f, "metronome"),
        }
    }
}

/// A threshold notification in the shape the dashboard renders.
///
/// `current_value` and `percentage_of_threshold` are derived from the
/// threshold alone for upstream alerts; they are not measured usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAlert {
    /// Alert definition id
    pub id: String,
    pub customer_id: String,
    pub customer_name: String,
    /// usage_threshold / commitment_threshold / credit_balance / invoice_threshold
    pub alert_type: String,
    pub threshold: f64,
    pub current_value: f64,
    pub percentage_of_threshold: i64,
    pub severity: Severity,
    pub message: String,
    /// RFC 3339 timestamp
    pub triggered_at: String,
    pub metric_name: String,
}

/// Body of `GET /api/alerts`.
///
/// Upstream failures are reported in-band through `error`; the status code
/// stays 200 so the dashboard always has something to render.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AlertsResponse {
    pub data: Vec<NormalizedAlert>,
    pub source: DataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Severity counters for the alert feed header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SeverityCounts {
    pub total: usize,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn from_alerts(alerts: &[NormalizedAlert]) -> Self {
        alerts.iter().fold(Self::default(), |mut counts, alert| {
            counts.total += 1;
            match alert.severity {
                Severity::Critical => counts.critical += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Info => counts.info += 1,
            }
            counts
        })
    }
}

/// Body of `GET /api/alerts/summary`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AlertSummary {
    #[serde(flatten)]
    pub counts: SeverityCounts,
    pub source: DataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
