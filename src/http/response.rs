//! Response translation.
//!
//! # Responsibilities
//! - Map the terminal admission outcome to an HTTP status
//! - Complete rejected requests with an empty body
//! - Pass successful upstream responses through untouched
//!
//! Upstream failures surface as a bare 500; no upstream detail reaches the client.

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Terminal outcome of one request.
#[derive(Debug)]
pub enum AdmissionOutcome {
    /// Originating address not allow-listed.
    Forbidden,
    /// An authentication check failed.
    Unauthorized,
    /// The upstream answered with a non-success status, failed, or timed out.
    UpstreamError,
    /// Forwarded, and the upstream succeeded.
    Allowed(Response),
}

impl AdmissionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AdmissionOutcome::Forbidden => "forbidden",
            AdmissionOutcome::Unauthorized => "unauthorized",
            AdmissionOutcome::UpstreamError => "upstream_error",
            AdmissionOutcome::Allowed(_) => "allowed",
        }
    }
}

/// Final status for an outcome.
pub fn translate(outcome: &AdmissionOutcome) -> StatusCode {
    match outcome {
        AdmissionOutcome::Forbidden | AdmissionOutcome::Unauthorized => StatusCode::FORBIDDEN,
        AdmissionOutcome::UpstreamError => StatusCode::INTERNAL_SERVER_ERROR,
        AdmissionOutcome::Allowed(response) => response.status(),
    }
}

impl IntoResponse for AdmissionOutcome {
    fn into_response(self) -> Response {
        let status = translate(&self);
        match self {
            AdmissionOutcome::Allowed(response) => response,
            _ => {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = status;
                response
            }
        }
    }
}
