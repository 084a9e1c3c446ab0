use csmon_common::types::{NormalizedAlert, Severity};

/// Sample threshold notifications served when live data is unavailable.
struct SampleAlert {
    id: &'static str,
    customer_id: &'static str,
    customer_name: &'static str,
    alert_type: &'static str,
    threshold: f64,
    current_value: f64,
    percentage_of_threshold: i64,
    severity: Severity,
    message: &'static str,
    triggered_at: &'static str,
    metric_name: &'static str,
}

const SAMPLE_ALERTS: &[SampleAlert] = &[
    SampleAlert {
        id: "alert-001",
        customer_id: "2",
        customer_name: "TechStart Inc",
        alert_type: "commitment_threshold",
        threshold: 90.0,
        current_value: 92.0,
        percentage_of_threshold: 102,
        severity: Severity::Critical,
        message: "Customer has exceeded 90% commitment threshold",
        triggered_at: "2025-03-07T14:30:00Z",
        metric_name: "API Calls",
    },
    SampleAlert {
        id: "alert-002",
        customer_id: "5",
        customer_name: "CloudNine Enterprises",
        alert_type: "usage_threshold",
        threshold: 100_000.0,
        current_value: 125_000.0,
        percentage_of_threshold: 125,
        severity: Severity::Critical,
        message: "Usage has exceeded threshold by 25%",
        triggered_at: "2025-03-07T10:15:00Z",
        metric_name: "Compute Hours",
    },
    SampleAlert {
        id: "alert-003",
        customer_id: "1",
        customer_name: "Acme Corporation",
        alert_type: "credit_balance",
        threshold: 300_000.0,
        current_value: 275_000.0,
        percentage_of_threshold: 92,
        severity: Severity::Warning,
        message: "Credit balance falling below threshold",
        triggered_at: "2025-03-06T16:45:00Z",
        metric_name: "Credit Balance",
    },
    SampleAlert {
        id: "alert-004",
        customer_id: "4",
        customer_name: "DataFlow Solutions",
        alert_type: "commitment_threshold",
        threshold: 70.0,
        current_value: 58.0,
        percentage_of_threshold: 83,
        severity: Severity::Warning,
        message: "Commitment burndown below expected rate",
        triggered_at: "2025-03-06T09:20:00Z",
        metric_name: "Storage GB",
    },
    SampleAlert {
        id: "alert-005",
        customer_id: "3",
        customer_name: "Global Systems",
        alert_type: "invoice_threshold",
        threshold: 150_000.0,
        current_value: 156_000.0,
        percentage_of_threshold: 104,
        severity: Severity::Info,
        message: "Upcoming invoice exceeds typical amount",
        triggered_at: "2025-03-05T11:00:00Z",
        metric_name: "Monthly Invoice",
    },
];

/// The sample alert dataset, in feed order.
pub fn sample_alerts() -> Vec<NormalizedAlert> {
    SAMPLE_ALERTS
        .iter()
        .map(|a| NormalizedAlert {
            id: a.id.to_string(),
            customer_id: a.customer_id.to_string(),
            customer_name: a.customer_name.to_string(),
            alert_type: a.alert_type.to_string(),
            threshold: a.threshold,
            current_value: a.current_value,
            percentage_of_threshold: a.percentage_of_threshold,
            severity: a.severity,
            message: a.message.to_string(),
            triggered_at: a.triggered_at.to_string(),
            metric_name: a.metric_name.to_string(),
        })
        .collect()
}
