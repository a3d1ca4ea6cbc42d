//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the forwarding handler
//! - Wire up middleware (tracing, request ID, admission)
//! - Apply configuration updates to the admission filter and credential store
//! - Evict expired nonces in the background
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::any, Router};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::admission::filter::{admission_middleware, AdmissionFilter, AdmissionPolicy};
use crate::config::GatewayConfig;
use crate::http::proxy::{proxy_handler, ProxyState};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};

const NONCE_EVICTION_INTERVAL: Duration = Duration::from_secs(30);

/// HTTP server for the admission gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    filter: Arc<AdmissionFilter>,
}

impl GatewayServer {
    /// Create a new server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, axum::http::Error> {
        let filter = Arc::new(AdmissionFilter::new(AdmissionPolicy::from_config(&config)));
        Self::with_filter(config, filter)
    }

    /// Create a server around an existing filter (custom clock or signer).
    pub fn with_filter(
        config: GatewayConfig,
        filter: Arc<AdmissionFilter>,
    ) -> Result<Self, axum::http::Error> {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let proxy = ProxyState::new(client, &config.upstream.address)?;
        let router = Self::build_router(proxy, filter.clone());

        Ok(Self {
            router,
            config,
            filter,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(proxy: ProxyState, filter: Arc<AdmissionFilter>) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(proxy)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(set_request_id_layer())
                    .layer(propagate_request_id_layer())
                    .layer(middleware::from_fn_with_state(filter, admission_middleware)),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            credentials = self.config.credentials.len(),
            "Gateway server starting"
        );

        let clock = self.filter.clock();
        let eviction = self
            .filter
            .nonce_cache()
            .start_eviction_task(NONCE_EVICTION_INTERVAL, move || clock.now_unix_secs());

        let filter = self.filter.clone();
        let reloader = tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                apply_config(&filter, &new_config);
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        eviction.abort();
        reloader.abort();
        tracing::info!("HTTP server stopped");
        result
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn filter(&self) -> &Arc<AdmissionFilter> {
        &self.filter
    }
}

/// Swap in the admission policy, credentials included, from a reloaded config.
///
/// The upstream and listener addresses are fixed for the life of the server.
pub fn apply_config(filter: &AdmissionFilter, config: &GatewayConfig) {
    filter.reload(AdmissionPolicy::from_config(config));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::credentials::CredentialStore;
    use crate::config::CredentialConfig;

    #[test]
    fn test_apply_config_swaps_policy_and_credentials() {
        let config = GatewayConfig::default();
        let filter = AdmissionFilter::new(AdmissionPolicy::from_config(&config));
        let before = filter.policy();

        let mut updated = config.clone();
        updated.admission.allowed_addresses = vec!["10.0.0.5".into()];
        updated.admission.max_nonce = 50;
        updated.credentials = vec![CredentialConfig {
            access_key: "zlx".into(),
            secret_key: "rotated".into(),
        }];
        apply_config(&filter, &updated);

        let policy = filter.policy();
        assert!(policy.allow_list.is_allowed("10.0.0.5"));
        assert!(!policy.allow_list.is_allowed("127.0.0.1"));
        assert_eq!(policy.replay.max_nonce, 50);
        assert_eq!(policy.credentials.resolve_secret("zlx").as_deref(), Some("rotated"));

        // The earlier snapshot is untouched: old allow-list with old (empty) credentials.
        assert!(before.allow_list.is_allowed("127.0.0.1"));
        assert_eq!(before.credentials.resolve_secret("zlx"), None);
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_upstream() {
        let mut config = GatewayConfig::default();
        config.upstream.address = "bad upstream".into();
        assert!(GatewayServer::new(config).is_err());
    }
}
