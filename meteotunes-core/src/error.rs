//! Error types shared by the provider clients, the coordinator and the
//! response assembler.

use thiserror::Error;

use crate::provider::ProviderId;

/// The inbound coordinate could not be accepted. No external call is made.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("request body is not valid JSON: {0}")]
    MalformedBody(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("{field} {value} is outside [{min}, {max}]")]
    OutOfRange { field: &'static str, value: f64, min: f64, max: f64 },
}

/// Failure of a single outbound provider call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{provider}: failed to build request: {message}")]
    RequestBuildFailed { provider: ProviderId, message: String },

    #[error("{provider}: network failure: {message}")]
    NetworkFailure { provider: ProviderId, message: String },

    #[error("{provider}: returned status {status}: {message}")]
    NonSuccessStatus { provider: ProviderId, status: u16, message: String },

    #[error("{provider}: could not decode response: {message}")]
    DecodeFailure { provider: ProviderId, message: String },

    #[error("{provider}: call ended without a result: {message}")]
    Interrupted { provider: ProviderId, message: String },
}

impl ProviderError {
    pub fn provider(&self) -> ProviderId {
        match self {
            Self::RequestBuildFailed { provider, .. }
            | Self::NetworkFailure { provider, .. }
            | Self::NonSuccessStatus { provider, .. }
            | Self::DecodeFailure { provider, .. }
            | Self::Interrupted { provider, .. } => *provider,
        }
    }

    /// Stable machine-readable kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RequestBuildFailed { .. } => "request_build_failed",
            Self::NetworkFailure { .. } => "network_failure",
            Self::NonSuccessStatus { .. } => "non_success_status",
            Self::DecodeFailure { .. } => "decode_failure",
            Self::Interrupted { .. } => "interrupted",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NonSuccessStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Map a reqwest transport error, distinguishing builder errors from
    /// connection/timeout/body errors. The URL is stripped because query
    /// strings carry API keys.
    pub(crate) fn from_reqwest(provider: ProviderId, err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_builder() {
            Self::RequestBuildFailed { provider, message: err.to_string() }
        } else if err.is_decode() {
            Self::DecodeFailure { provider, message: err.to_string() }
        } else {
            Self::NetworkFailure { provider, message: err.to_string() }
        }
    }
}

/// Reasons a load request ends without branch results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The weather call failed; no branch was launched.
    #[error("weather unavailable: {0}")]
    UpstreamUnavailable(ProviderError),
}

impl LoadError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::UpstreamUnavailable(ProviderError::RequestBuildFailed { .. }) => {
                "request_build_failed"
            }
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
        }
    }
}
