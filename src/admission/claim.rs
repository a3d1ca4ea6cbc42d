//! Credential extraction from request headers, and request metadata for logging.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, Method, Request};

use crate::admission::error::AdmissionError;
use crate::http::request::X_REQUEST_ID;

/// Header names are stored lowercase; lookups are case-insensitive.
pub const ACCESS_KEY_HEADER: &str = "accesskey";
pub const NONCE_HEADER: &str = "nonce";
pub const TIMESTAMP_HEADER: &str = "timestamp";
pub const SIGN_HEADER: &str = "sign";
pub const BODY_HEADER: &str = "body";

/// Credentials claimed by one request. Never outlives the admission decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthClaim {
    pub access_key: String,
    pub nonce: u64,
    pub timestamp: u64,
    pub sign: String,
    pub body: String,
}

impl AuthClaim {
    /// Parse the five authentication headers.
    ///
    /// Fails on the first header that is absent, not valid UTF-8, empty, or (for
    /// `nonce`/`timestamp`) not a non-negative integer.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AdmissionError> {
        let access_key = required(headers, ACCESS_KEY_HEADER)?;
        let nonce = parse_integer(headers, NONCE_HEADER)?;
        let timestamp = parse_integer(headers, TIMESTAMP_HEADER)?;
        let sign = required(headers, SIGN_HEADER)?;
        let body = header_str(headers, BODY_HEADER)?;

        Ok(Self {
            access_key: access_key.to_string(),
            nonce,
            timestamp,
            sign: sign.to_string(),
            body: body.to_string(),
        })
    }
}

/// Header value decoded as UTF-8. Non-ASCII text is accepted, unlike `HeaderValue::to_str`.
fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, AdmissionError> {
    let value = headers
        .get(name)
        .ok_or(AdmissionError::MalformedCredentials { header: name })?;
    std::str::from_utf8(value.as_bytes())
        .map_err(|_| AdmissionError::MalformedCredentials { header: name })
}

fn required<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, AdmissionError> {
    let value = header_str(headers, name)?;
    if value.is_empty() {
        return Err(AdmissionError::MalformedCredentials { header: name });
    }
    Ok(value)
}

fn parse_integer(headers: &HeaderMap, name: &'static str) -> Result<u64, AdmissionError> {
    required(headers, name)?
        .trim()
        .parse::<u64>()
        .map_err(|_| AdmissionError::MalformedCredentials { header: name })
}

/// What gets logged about every inbound request.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    pub id: String,
    pub path: String,
    pub method: Method,
    pub query: BTreeMap<String, Vec<String>>,
    pub origin: String,
}

impl RequestMetadata {
    pub fn from_request<B>(request: &Request<B>, origin: &str) -> Self {
        let id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let mut query: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if let Some(raw) = request.uri().query() {
            for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
                query.entry(key.into_owned()).or_default().push(value.into_owned());
            }
        }

        Self {
            id,
            path: request.uri().path().to_string(),
            method: request.method().clone(),
            query,
            origin: origin.to_string(),
        }
    }

    pub fn log(&self) {
        tracing::info!(
            request_id = %self.id,
            method = %self.method,
            path = %self.path,
            query = ?self.query,
            origin = %self.origin,
            "Inbound request"
        );
    }
}
