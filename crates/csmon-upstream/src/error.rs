/// Errors that can occur when talking to the upstream billing API.
///
/// # Examples
///
/// ```rust
/// use csmon_upstream::error::UpstreamError;
///
/// let err = UpstreamError::NotConfigured;
/// assert!(err.to_string().contains("not configured"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// No API token is configured. Nothing was sent over the network.
    #[error("Metronome API token not configured")]
    NotConfigured,

    /// Network, HTTP or payload failure. `status` and `body` are set when the
    /// server answered with a non-2xx response.
    #[error("Metronome API error on {endpoint}: {message}")]
    UpstreamUnavailable {
        endpoint: String,
        status: Option<u16>,
        body: Option<serde_json::Value>,
        message: String,
    },

    /// A caller-supplied argument was rejected before any request was made.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// One customer's alert listing failed during fan-out. Only ever logged by
    /// the collector; it never reaches the caller.
    #[error("Failed to fetch alerts for customer {customer_id}: {reason}")]
    PartialFanoutFailure { customer_id: String, reason: String },
}

impl UpstreamError {
    pub(crate) fn unavailable(endpoint: &str, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            endpoint: endpoint.to_string(),
            status: None,
            body: None,
            message: message.into(),
        }
    }

    /// HTTP status carried by an `UpstreamUnavailable` error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UpstreamUnavailable { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether repeating the same request could succeed: transport errors,
    /// throttling and server-side failures. Other 4xx responses are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UpstreamUnavailable { status: None, .. } => true,
            Self::UpstreamUnavailable {
                status: Some(code), ..
            } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

/// Convenience type alias so callers can write `error::Result<T>`.
pub type Result<T> = std::result::Result<T, UpstreamError>;
