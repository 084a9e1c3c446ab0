use csmon_common::types::{NormalizedAlert, Severity};
use csmon_upstream::{CustomerAlert, CustomerAlertStatus, UpstreamCustomer};

/// Share of the threshold reported as the current value. There is no usage
/// lookup behind upstream alerts, so this is a fixed approximation.
pub const PLACEHOLDER_USAGE_RATIO: f64 = 0.8;

pub const UNKNOWN_METRIC: &str = "Unknown Metric";
pub const UNKNOWN_CUSTOMER: &str = "Unknown Customer";

/// Severity depends on the customer's evaluation status and nothing else.
pub fn severity_for(status: Option<CustomerAlertStatus>) -> Severity {
    match status {
        Some(CustomerAlertStatus::InAlarm) => Severity::Critical,
        Some(CustomerAlertStatus::Evaluating) => Severity::Warning,
        _ => Severity::Info,
    }
}

pub fn message_for(status: Option<CustomerAlertStatus>, alert_name: &str) -> String {
    match status {
        Some(CustomerAlertStatus::InAlarm) => format!("Alert triggered: {alert_name}"),
        Some(CustomerAlertStatus::Evaluating) => format!("Alert evaluating: {alert_name}"),
        _ => format!("Alert active: {alert_name}"),
    }
}

/// Placeholder `(current_value, percentage_of_threshold)` for a threshold.
///
/// A zero or non-finite threshold yields `(0.0, 0)`.
pub fn placeholder_usage(threshold: f64) -> (f64, i64) {
    if !threshold.is_finite() || threshold == 0.0 {
        return (0.0, 0);
    }
    // Equals current / threshold * 100 by construction.
    let percentage = (PLACEHOLDER_USAGE_RATIO * 100.0).round() as i64;
    (threshold * PLACEHOLDER_USAGE_RATIO, percentage)
}

/// Display name for a customer, falling back to a short form of its id.
pub fn customer_display_name(customer: &UpstreamCustomer) -> String {
    let name = customer.name.trim();
    if !name.is_empty() {
        return name.to_string();
    }
    let short_id: String = customer.id.chars().take(8).collect();
    if short_id.is_empty() {
        UNKNOWN_CUSTOMER.to_string()
    } else {
        format!("Customer {short_id}")
    }
}

/// Convert an upstream customer alert into the dashboard's alert shape.
pub fn normalize(customer_alert: &CustomerAlert, customer: &UpstreamCustomer) -> NormalizedAlert {
    let status = customer_alert.customer_status;
    let alert = &customer_alert.alert;
    let (current_value, percentage_of_threshold) = placeholder_usage(alert.threshold);

    NormalizedAlert {
        id: alert.id.clone(),
        customer_id: customer.id.clone(),
        customer_name: customer_display_name(customer),
        alert_type: alert.alert_type.clone(),
        threshold: alert.threshold,
        current_value,
        percentage_of_threshold,
        severity: severity_for(status),
        message: message_for(status, &alert.name),
        triggered_at: alert.updated_at.clone(),
        metric_name: alert
            .credit_type
            .as_ref()
            .map(|ct| ct.name.clone())
            .unwrap_or_else(|| UNKNOWN_METRIC.to_string()),
    }
}

/// Normalize a batch of `(alert, customer)` pairs.
pub fn normalize_all(pairs: &[(CustomerAlert, UpstreamCustomer)]) -> Vec<NormalizedAlert> {
    pairs
        .iter()
        .map(|(alert, customer)| normalize(alert, customer))
        .collect()
}
