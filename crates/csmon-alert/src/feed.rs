use chrono::{DateTime, Utc};
use csmon_common::types::NormalizedAlert;
use std::cmp::Reverse;

fn triggered_at(alert: &NormalizedAlert) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&alert.triggered_at)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Order alerts for display: most severe first, then newest first. Alerts
/// with an unparseable timestamp sort after the dated ones of their severity.
pub fn sort_for_feed(alerts: &mut [NormalizedAlert]) {
    alerts.sort_by_key(|alert| (Reverse(alert.severity), Reverse(triggered_at(alert))));
}
