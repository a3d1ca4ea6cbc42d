//! Admission failure taxonomy.

use axum::http::StatusCode;
use thiserror::Error;

use crate::admission::replay::ReplayViolation;
use crate::http::response::AdmissionOutcome;

/// Every way a request can fail to be admitted or completed.
///
/// None of these escape the filter; each becomes exactly one [`AdmissionOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("address {address} is not allow-listed")]
    AddressDenied { address: String },

    #[error("header '{header}' is missing or malformed")]
    MalformedCredentials { header: &'static str },

    #[error("unknown access key")]
    UnknownAccessKey,

    #[error("replay rejected: {0}")]
    ReplayRejected(ReplayViolation),

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("upstream returned {status}")]
    UpstreamFailure { status: StatusCode },

    #[error("upstream did not respond in time")]
    UpstreamTimeout,
}

impl AdmissionError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AdmissionError::AddressDenied { .. } => "address_denied",
            AdmissionError::MalformedCredentials { .. } => "malformed_credentials",
            AdmissionError::UnknownAccessKey => "unknown_access_key",
            AdmissionError::ReplayRejected(_) => "replay_rejected",
            AdmissionError::SignatureMismatch => "signature_mismatch",
            AdmissionError::UpstreamFailure { .. } => "upstream_failure",
            AdmissionError::UpstreamTimeout => "upstream_timeout",
        }
    }

    /// The terminal outcome this failure resolves to.
    pub fn outcome(&self) -> AdmissionOutcome {
        match self {
            AdmissionError::AddressDenied { .. } => AdmissionOutcome::Forbidden,
            AdmissionError::UpstreamFailure { .. } | AdmissionError::UpstreamTimeout => {
                AdmissionOutcome::UpstreamError
            }
            _ => AdmissionOutcome::Unauthorized,
        }
    }
}
