#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use csmon_server::app;
use csmon_server::config::ServerConfig;
use csmon_server::state::AppState;
use csmon_upstream::collector::AlertCollector;
use csmon_upstream::error::{Result as UpstreamResult, UpstreamError};
use csmon_upstream::{
    AlertStatus, CreditType, CustomerAlert, CustomerAlertStatus, Page, UpstreamAlert, UpstreamApi,
    UpstreamCustomer,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

/// In-memory upstream. Every customer's alerts fit in one page.
#[derive(Default)]
pub struct StubUpstream {
    pub configured: bool,
    pub customers: Vec<UpstreamCustomer>,
    pub alerts: HashMap<String, Vec<CustomerAlert>>,
    pub fail_customer_listing: bool,
    pub calls: AtomicUsize,
    pub alert_calls: Mutex<Vec<String>>,
    pub last_statuses: Mutex<Vec<AlertStatus>>,
}

impl StubUpstream {
    pub fn unconfigured() -> Self {
        Self::default()
    }

    pub fn configured() -> Self {
        Self {
            configured: true,
            ..Self::default()
        }
    }

    pub fn with_customer(mut self, customer: UpstreamCustomer, alerts: Vec<CustomerAlert>) -> Self {
        self.alerts.insert(customer.id.clone(), alerts);
        self.customers.push(customer);
        self
    }

    pub fn failing() -> Self {
        Self {
            configured: true,
            fail_customer_listing: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamApi for StubUpstream {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn list_customers(&self, _cursor: Option<&str>) -> UpstreamResult<Page<UpstreamCustomer>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_customer_listing {
            return Err(UpstreamError::UpstreamUnavailable {
                endpoint: "/customers".to_string(),
                status: Some(503),
                body: None,
                message: "service unavailable".to_string(),
            });
        }
        Ok(Page {
            data: self.customers.clone(),
            next_page: None,
        })
    }

    async fn list_customer_alerts(
        &self,
        customer_id: &str,
        statuses: &[AlertStatus],
        _cursor: Option<&str>,
    ) -> UpstreamResult<Page<CustomerAlert>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.alert_calls
            .lock()
            .expect("lock should not be poisoned")
            .push(customer_id.to_string());
        *self.last_statuses.lock().expect("lock should not be poisoned") = statuses.to_vec();
        Ok(Page {
            data: self.alerts.get(customer_id).cloned().unwrap_or_default(),
            next_page: None,
        })
    }
}

pub fn customer(id: &str, name: &str) -> UpstreamCustomer {
    UpstreamCustomer::from_id(id, Some(name))
}

pub fn customer_alert(
    id: &str,
    name: &str,
    status: Option<CustomerAlertStatus>,
    threshold: f64,
    updated_at: &str,
) -> CustomerAlert {
    CustomerAlert {
        customer_status: status,
        alert: UpstreamAlert {
            id: id.to_string(),
            name: name.to_string(),
            uniqueness_key: None,
            alert_type: "usage_threshold".to_string(),
            status: AlertStatus::Enabled,
            credit_type: Some(CreditType {
                id: "ct-1".to_string(),
                name: "API Calls".to_string(),
            }),
            threshold,
            updated_at: updated_at.to_string(),
        },
        customer_id: None,
    }
}

pub struct TestContext {
    pub upstream: Arc<StubUpstream>,
    pub state: AppState,
    pub app: axum::Router,
}

pub fn build_test_context(upstream: StubUpstream) -> TestContext {
    build_test_context_with_config(upstream, ServerConfig::default())
}

pub fn build_test_context_with_config(upstream: StubUpstream, config: ServerConfig) -> TestContext {
    let upstream = Arc::new(upstream);
    let api: Arc<dyn UpstreamApi> = upstream.clone();
    let collector = AlertCollector::from_config(api, &config.upstream);
    let state = AppState::new(Arc::new(collector), config);
    let app = app::build_http_app(state.clone());
    TestContext {
        upstream,
        state,
        app,
    }
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
    trace_id: Option<&str>,
) -> (StatusCode, Value, HeaderMap) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(trace_id) = trace_id {
        builder = builder.header("x-trace-id", trace_id);
    }

    let req = builder.body(Body::empty()).expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, headers)
}

pub fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
