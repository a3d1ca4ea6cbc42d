//! Upstream forwarding.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the configured upstream
//! - Append the peer to `x-forwarded-for`
//! - Stream the request and response bodies
//! - Report connection failures as 502

use std::net::SocketAddr;
use std::str::FromStr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{
        header::{HeaderValue, HOST},
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};

use crate::http::request::X_REQUEST_ID;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// State shared by the forwarding handler.
#[derive(Clone)]
pub struct ProxyState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: Authority,
}

impl ProxyState {
    pub fn new(client: Client<HttpConnector, Body>, upstream: &str) -> Result<Self, axum::http::Error> {
        let upstream = Authority::from_str(upstream).map_err(axum::http::Error::from)?;
        Ok(Self { client, upstream })
    }
}

/// Build the URI the request is sent to upstream.
pub fn upstream_uri(upstream: &Authority, original: &Uri) -> Result<Uri, axum::http::Error> {
    let path_and_query = original
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));
    Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(upstream.clone())
        .path_and_query(path_and_query)
        .build()
}

/// Forward the request to the upstream service.
pub async fn proxy_handler(
    State(state): State<ProxyState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let request_id = parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    parts.uri = match upstream_uri(&state.upstream, &parts.uri) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream URI");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };
    parts.headers.remove(HOST);

    let peer_ip = peer.ip().to_canonical().to_string();
    let forwarded = match parts.headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{existing}, {peer_ip}"),
        None => peer_ip,
    };
    if let Ok(value) = HeaderValue::from_str(&forwarded) {
        parts.headers.insert(X_FORWARDED_FOR, value);
    }

    tracing::debug!(request_id = %request_id, uri = %parts.uri, "Forwarding to upstream");

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => from_upstream(response),
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream request failed");
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

/// Re-box an upstream response so it streams back through axum.
fn from_upstream(response: Response<Incoming>) -> Response {
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_uri_keeps_path_and_query() {
        let upstream = Authority::from_static("127.0.0.1:8123");
        let original: Uri = "/api/name/user?name=zlx".parse().unwrap();
        let uri = upstream_uri(&upstream, &original).unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:8123/api/name/user?name=zlx");
    }

    #[test]
    fn test_upstream_uri_replaces_absolute_authority() {
        let upstream = Authority::from_static("backend:9000");
        let original: Uri = "http://gateway.example/x".parse().unwrap();
        let uri = upstream_uri(&upstream, &original).unwrap();
        assert_eq!(uri.to_string(), "http://backend:9000/x");
    }

    #[test]
    fn test_proxy_state_rejects_bad_upstream() {
        let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(HttpConnector::new());
        assert!(ProxyState::new(client.clone(), "127.0.0.1:8123").is_ok());
        assert!(ProxyState::new(client, "not a host").is_err());
    }
}
