//! The admission filter.
//!
//! # State Machine
//! ```text
//! Start
//!   → AddressChecked        allow-list                      else Forbidden
//!   → CredentialsExtracted  accessKey/nonce/timestamp/sign  else Unauthorized
//!   → ReplayChecked         known key, nonce bound, unused  else Unauthorized
//!   → SignatureVerified     timestamp window, HMAC match    else Unauthorized
//!   → Forwarded             next stage, under a deadline
//!   → Completed             2xx passes through              else UpstreamError
//! ```
//!
//! Checks run strictly in this order and stop at the first failure; nothing past
//! a failed check is evaluated. The policy snapshot is loaded once per request, so a
//! concurrent reload never changes the rules halfway through a decision.

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::admission::allow_list::AllowList;
use crate::admission::claim::{AuthClaim, RequestMetadata};
use crate::admission::clock::{Clock, SystemClock};
use crate::admission::credentials::{CredentialStore, StaticCredentialStore};
use crate::admission::error::AdmissionError;
use crate::admission::replay::{NonceCache, ReplayGuard, ReplayViolation};
use crate::admission::signer::{signatures_match, HmacSigner, Signer};
use crate::config::GatewayConfig;
use crate::http::response::AdmissionOutcome;
use crate::observability::metrics;

/// Read-mostly rules applied to every request, credentials included.
///
/// Replaced wholesale on reload, so a request never pairs a new allow-list with
/// old secrets.
#[derive(Clone)]
pub struct AdmissionPolicy {
    pub allow_list: AllowList,
    pub credentials: Arc<dyn CredentialStore>,
    pub replay: ReplayGuard,
    pub track_nonces: bool,
    pub upstream_timeout: Duration,
}

impl AdmissionPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            allow_list: AllowList::new(&config.admission.allowed_addresses),
            credentials: Arc::new(StaticCredentialStore::from_config(&config.credentials)),
            replay: ReplayGuard::from_config(&config.admission),
            track_nonces: config.admission.track_nonces,
            upstream_timeout: Duration::from_secs(config.timeouts.upstream_secs),
        }
    }

    /// Use `credentials` instead of the configured keys.
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = credentials;
        self
    }
}

impl fmt::Debug for AdmissionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionPolicy")
            .field("allow_list", &self.allow_list)
            .field("replay", &self.replay)
            .field("track_nonces", &self.track_nonces)
            .field("upstream_timeout", &self.upstream_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

/// A request that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admitted {
    pub access_key: String,
    pub nonce: u64,
}

/// Decides admission for each request and normalizes the upstream outcome.
pub struct AdmissionFilter {
    policy: ArcSwap<AdmissionPolicy>,
    signer: Arc<dyn Signer>,
    clock: Arc<dyn Clock>,
    nonces: Arc<NonceCache>,
}

impl AdmissionFilter {
    /// Create a filter using the HMAC signer and the system clock.
    pub fn new(policy: AdmissionPolicy) -> Self {
        Self {
            policy: ArcSwap::from_pointee(policy),
            signer: Arc::new(HmacSigner),
            clock: Arc::new(SystemClock),
            nonces: Arc::new(NonceCache::new()),
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = signer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current policy snapshot.
    pub fn policy(&self) -> Arc<AdmissionPolicy> {
        self.policy.load_full()
    }

    /// Atomically install a new policy. In-flight requests keep their snapshot.
    pub fn reload(&self, policy: AdmissionPolicy) {
        tracing::info!(
            allowed_addresses = policy.allow_list.len(),
            replay_window_secs = policy.replay.window_secs,
            max_nonce = policy.replay.max_nonce,
            "Admission policy reloaded"
        );
        self.policy.store(Arc::new(policy));
    }

    pub fn nonce_cache(&self) -> &Arc<NonceCache> {
        &self.nonces
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Run the address, credential, replay and signature checks in order.
    pub fn admit(
        &self,
        policy: &AdmissionPolicy,
        origin: &str,
        headers: &HeaderMap,
    ) -> Result<Admitted, AdmissionError> {
        if !policy.allow_list.is_allowed(origin) {
            return Err(AdmissionError::AddressDenied {
                address: origin.to_string(),
            });
        }

        let claim = AuthClaim::from_headers(headers)?;

        let secret = policy
            .credentials
            .resolve_secret(&claim.access_key)
            .ok_or(AdmissionError::UnknownAccessKey)?;
        if !policy.replay.check_nonce(claim.nonce) {
            return Err(AdmissionError::ReplayRejected(ReplayViolation::NonceOutOfRange));
        }
        let now = self.clock.now_unix_secs();
        if policy.track_nonces && self.nonces.contains(&claim.access_key, claim.nonce, now) {
            return Err(AdmissionError::ReplayRejected(ReplayViolation::NonceReused));
        }

        if let Some(violation) = policy.replay.timestamp_violation(claim.timestamp, now) {
            return Err(AdmissionError::ReplayRejected(violation));
        }
        let expected = self.signer.sign(&claim.body, &secret);
        if !signatures_match(&claim.sign, &expected) {
            return Err(AdmissionError::SignatureMismatch);
        }

        // Only a verified request may consume its nonce.
        if policy.track_nonces
            && !self
                .nonces
                .consume(&claim.access_key, claim.nonce, now, policy.replay.nonce_ttl_secs())
        {
            return Err(AdmissionError::ReplayRejected(ReplayViolation::NonceReused));
        }

        Ok(Admitted {
            access_key: claim.access_key,
            nonce: claim.nonce,
        })
    }

    /// Admit `request` from `origin`, hand it to `next` if admitted, and translate
    /// the result into the final response.
    pub async fn handle<F, Fut>(&self, origin: &str, request: Request<Body>, next: F) -> Response
    where
        F: FnOnce(Request<Body>) -> Fut,
        Fut: Future<Output = Response>,
    {
        let started = Instant::now();
        let policy = self.policy.load_full();
        let meta = RequestMetadata::from_request(&request, origin);
        meta.log();

        let outcome = match self.admit(&policy, origin, request.headers()) {
            Ok(admitted) => {
                tracing::debug!(
                    request_id = %meta.id,
                    access_key = %admitted.access_key,
                    nonce = admitted.nonce,
                    "Request admitted, forwarding"
                );
                forward(&policy, &meta, &admitted, request, next).await
            }
            Err(err) => {
                tracing::warn!(
                    request_id = %meta.id,
                    origin = %meta.origin,
                    kind = err.kind(),
                    error = %err,
                    "Request rejected"
                );
                err.outcome()
            }
        };

        metrics::record_admission(outcome.label(), started);
        outcome.into_response()
    }
}

async fn forward<F, Fut>(
    policy: &AdmissionPolicy,
    meta: &RequestMetadata,
    admitted: &Admitted,
    request: Request<Body>,
    next: F,
) -> AdmissionOutcome
where
    F: FnOnce(Request<Body>) -> Fut,
    Fut: Future<Output = Response>,
{
    let err = match tokio::time::timeout(policy.upstream_timeout, next(request)).await {
        Ok(response) if response.status().is_success() => {
            metrics::record_invocation(&admitted.access_key);
            tracing::info!(
                request_id = %meta.id,
                status = %response.status(),
                "Upstream call succeeded"
            );
            return AdmissionOutcome::Allowed(response);
        }
        Ok(response) => AdmissionError::UpstreamFailure {
            status: response.status(),
        },
        Err(_) => AdmissionError::UpstreamTimeout,
    };

    tracing::error!(
        request_id = %meta.id,
        kind = err.kind(),
        error = %err,
        "Upstream call failed"
    );
    err.outcome()
}

/// Axum middleware running every request through the [`AdmissionFilter`].
///
/// The origin is the peer address of the TCP connection, never a client-supplied header.
pub async fn admission_middleware(
    State(filter): State<Arc<AdmissionFilter>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let origin = peer.ip().to_canonical().to_string();
    filter.handle(&origin, request, |req| next.run(req)).await
}
