use crate::error::{Result, UpstreamError};
use crate::{AlertStatus, CustomerAlert, UpstreamApi, UpstreamConfig, UpstreamCustomer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;

/// How [`AlertCollector::get_all_alerts`] discovers which customers to query.
/// Fixed per deployment.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionMode {
    /// List every customer, then query each one. Failing customers are skipped.
    FanOut,
    /// Query one configured customer. Its failure fails the whole call.
    SingleCustomer(UpstreamCustomer),
}

impl CollectionMode {
    pub fn from_config(config: &UpstreamConfig) -> Self {
        match config.target_customer_id() {
            Some(id) => CollectionMode::SingleCustomer(UpstreamCustomer::from_id(
                id,
                config.customer_name.as_deref(),
            )),
            None => CollectionMode::FanOut,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CollectionMode::FanOut => "fan_out",
            CollectionMode::SingleCustomer(_) => "single_customer",
        }
    }
}

/// Collects every customer's alerts from the upstream, paired with the
/// customer they belong to.
pub struct AlertCollector {
    api: Arc<dyn UpstreamApi>,
    mode: CollectionMode,
    concurrency: usize,
    customer_timeout: Duration,
    max_pages: usize,
}

impl AlertCollector {
    pub fn new(api: Arc<dyn UpstreamApi>, mode: CollectionMode) -> Self {
        let defaults = UpstreamConfig::default();
        Self {
            api,
            mode,
            concurrency: defaults.fanout_concurrency,
            customer_timeout: Duration::from_secs(defaults.customer_timeout_secs),
            max_pages: defaults.max_pages,
        }
    }

    pub fn from_config(api: Arc<dyn UpstreamApi>, config: &UpstreamConfig) -> Self {
        Self {
            api,
            mode: CollectionMode::from_config(config),
            concurrency: config.fanout_concurrency.max(1),
            customer_timeout: Duration::from_secs(config.customer_timeout_secs),
            max_pages: config.max_pages.max(1),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_customer_timeout(mut self, customer_timeout: Duration) -> Self {
        self.customer_timeout = customer_timeout;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn mode(&self) -> &CollectionMode {
        &self.mode
    }

    pub fn is_configured(&self) -> bool {
        self.api.is_configured()
    }

    /// Fetch all alerts for the configured deployment mode.
    ///
    /// # Errors
    ///
    /// [`UpstreamError::NotConfigured`] without any network call when no
    /// token is present. [`UpstreamError::UpstreamUnavailable`] when the
    /// customer listing fails (fan-out) or the single customer's listing
    /// fails (single-customer).
    pub async fn get_all_alerts(
        &self,
        statuses: &[AlertStatus],
    ) -> Result<Vec<(CustomerAlert, UpstreamCustomer)>> {
        if !self.api.is_configured() {
            return Err(UpstreamError::NotConfigured);
        }

        match &self.mode {
            CollectionMode::SingleCustomer(customer) => {
                tracing::info!(customer_id = %customer.id, "Fetching alerts for configured customer");
                let alerts = timeout(
                    self.customer_timeout,
                    fetch_customer_alerts(self.api.as_ref(), &customer.id, statuses, self.max_pages),
                )
                .await
                .map_err(|_| {
                    UpstreamError::unavailable(
                        "/customer-alerts/list",
                        format!("timed out after {:?}", self.customer_timeout),
                    )
                })??;
                Ok(alerts
                    .into_iter()
                    .map(|alert| (alert, customer.clone()))
                    .collect())
            }
            CollectionMode::FanOut => self.fan_out(statuses).await,
        }
    }

    async fn fan_out(
        &self,
        statuses: &[AlertStatus],
    ) -> Result<Vec<(CustomerAlert, UpstreamCustomer)>> {
        let customers = self.list_all_customers().await?;
        if customers.is_empty() {
            tracing::info!("No customers found, returning empty alert list");
            return Ok(Vec::new());
        }
        tracing::info!(count = customers.len(), "Fetching alerts for each customer");

        // Dropping the JoinSet aborts every in-flight fetch.
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for customer in customers {
            let sem = Arc::clone(&semaphore);
            let api = Arc::clone(&self.api);
            let statuses = statuses.to_vec();
            let timeout_duration = self.customer_timeout;
            let max_pages = self.max_pages;

            tasks.spawn(async move {
                let Ok(_permit) = sem.acquire_owned().await else {
                    return None;
                };

                let outcome = match timeout(
                    timeout_duration,
                    fetch_customer_alerts(api.as_ref(), &customer.id, &statuses, max_pages),
                )
                .await
                {
                    Ok(Ok(alerts)) => Ok(alerts),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err(format!("timed out after {timeout_duration:?}")),
                };

                match outcome {
                    Ok(alerts) => Some((customer, alerts)),
                    Err(reason) => {
                        let failure = UpstreamError::PartialFanoutFailure {
                            customer_id: customer.id.clone(),
                            reason,
                        };
                        tracing::warn!(
                            customer_id = %customer.id,
                            customer_name = %customer.name,
                            error = %failure,
                            "Skipping customer during alert fan-out"
                        );
                        None
                    }
                }
            });
        }

        let mut all_alerts = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some((customer, alerts))) => {
                    all_alerts.extend(alerts.into_iter().map(|alert| (alert, customer.clone())));
                }
                Ok(None) => {
                    // Already logged in the task
                }
                Err(e) => {
                    tracing::error!(error = %e, "Alert fetch task failed");
                }
            }
        }

        tracing::info!(count = all_alerts.len(), "Collected alerts from Metronome");
        Ok(all_alerts)
    }

    async fn list_all_customers(&self) -> Result<Vec<UpstreamCustomer>> {
        let mut customers = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..self.max_pages {
            let page = self.api.list_customers(cursor.as_deref()).await?;
            cursor = page.next_cursor().map(str::to_string);
            customers.extend(page.data);
            if cursor.is_none() {
                return Ok(customers);
            }
        }

        tracing::warn!(
            max_pages = self.max_pages,
            "Stopped following customer pages at the page limit"
        );
        Ok(customers)
    }
}

/// Follow a customer's alert pages, dropping records that name another owner.
async fn fetch_customer_alerts(
    api: &dyn UpstreamApi,
    customer_id: &str,
    statuses: &[AlertStatus],
    max_pages: usize,
) -> Result<Vec<CustomerAlert>> {
    let mut alerts = Vec::new();
    let mut cursor: Option<String> = None;

    for _ in 0..max_pages {
        let page = api
            .list_customer_alerts(customer_id, statuses, cursor.as_deref())
            .await?;
        cursor = page.next_cursor().map(str::to_string);
        alerts.extend(
            page.data
                .into_iter()
                .filter(|alert| belongs_to(alert, customer_id)),
        );
        if cursor.is_none() {
            return Ok(alerts);
        }
    }

    tracing::warn!(
        customer_id,
        max_pages,
        "Stopped following alert pages at the page limit"
    );
    Ok(alerts)
}

fn belongs_to(alert: &CustomerAlert, customer_id: &str) -> bool {
    match alert.customer_id.as_deref() {
        Some(owner) if owner != customer_id => {
            tracing::warn!(
                queried = customer_id,
                owner,
                alert_id = %alert.alert.id,
                "Dropping alert that belongs to a different customer"
            );
            false
        }
        _ => true,
    }
}
