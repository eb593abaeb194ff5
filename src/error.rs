//! Error types for the aggregation layer

use http::StatusCode;
use thiserror::Error;

use crate::utils::constants::truncate_diagnostic;

/// Failures of a single upstream HTTP call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("upstream rejected the credential (401)")]
    Unauthorized,

    #[error("upstream responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("upstream returned invalid JSON: {0}")]
    InvalidJson(String),

    #[error("upstream reported an error: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_connect() {
            UpstreamError::Network(format!("failed to connect: {err}"))
        } else {
            UpstreamError::Network(err.to_string())
        }
    }
}

impl UpstreamError {
    /// Short label for the `reason` metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            UpstreamError::Unauthorized => "unauthorized",
            UpstreamError::Status { .. } => "status",
            UpstreamError::Timeout => "timeout",
            UpstreamError::Network(_) => "network",
            UpstreamError::InvalidJson(_) => "invalid_json",
            UpstreamError::Rejected(_) => "rejected",
        }
    }
}

/// Request-level error taxonomy. Callers map each variant to its own HTTP status.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("long-lived credential is not configured")]
    CredentialMissing,

    #[error("credential exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("upstream rejected the access credential")]
    Unauthorized,

    #[error(transparent)]
    Upstream(UpstreamError),

    #[error("invalid parameters: {0}")]
    BadRequest(String),

    #[error("enrichment of item {id} failed: {source}")]
    PartialEnrichment { id: u64, source: UpstreamError },
}

impl From<UpstreamError> for AgentError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Unauthorized => AgentError::Unauthorized,
            other => AgentError::Upstream(other),
        }
    }
}

impl AgentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AgentError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AgentError::Unauthorized => StatusCode::UNAUTHORIZED,
            AgentError::CredentialMissing
            | AgentError::ExchangeFailed(_)
            | AgentError::Upstream(_)
            | AgentError::PartialEnrichment { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to API clients. Internals stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AgentError::CredentialMissing => {
                "PSN credential is not configured: set PSN_NPSSO/PSN_TOKEN or PSN_TOKEN_ENC with PSN_TOKEN_KEY and restart".to_owned()
            }
            AgentError::ExchangeFailed(_) => "PSN credential exchange failed".to_owned(),
            AgentError::Unauthorized => "PSN credential expired or lacks permission".to_owned(),
            AgentError::Upstream(_) | AgentError::PartialEnrichment { .. } => "upstream sync failed".to_owned(),
            AgentError::BadRequest(reason) => format!("invalid parameters: {reason}"),
        }
    }

    /// Truncated diagnostic for upstream failures, `None` for everything else.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            AgentError::Upstream(err) => Some(truncate_diagnostic(&err.to_string())),
            _ => None,
        }
    }
}
