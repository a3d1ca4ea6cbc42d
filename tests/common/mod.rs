//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

use admission_gateway::admission::signer::signed_headers;
use admission_gateway::config::{CredentialConfig, GatewayConfig};
use admission_gateway::{GatewayServer, Shutdown};

pub const ACCESS_KEY: &str = "zlx";
pub const SECRET_KEY: &str = "abcdefgh";

/// Start a programmable mock upstream. Returns a counter of accepted connections.
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F) -> Arc<AtomicUsize>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let f = f.clone();
                    tokio::spawn(async move {
                        // Drain the request head before answering.
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    hits
}

/// A config pointing at `backend`, listening on `gateway`, with the test credential.
pub fn gateway_config(gateway: SocketAddr, backend: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = gateway.to_string();
    config.upstream.address = backend.to_string();
    config.observability.metrics_enabled = false;
    config.credentials.push(CredentialConfig {
        access_key: ACCESS_KEY.into(),
        secret_key: SECRET_KEY.into(),
    });
    config
}

/// Start the gateway. Returns the shutdown handle and the config update sender.
pub async fn start_gateway(config: GatewayConfig) -> (Shutdown, mpsc::UnboundedSender<GatewayConfig>) {
    let shutdown = Shutdown::new();
    let (tx, config_updates) = mpsc::unbounded_channel();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let server = GatewayServer::new(config).unwrap();
    let server_shutdown: broadcast::Receiver<()> = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    (shutdown, tx)
}

pub fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

/// The signed header set for `body`, timestamped now.
pub fn auth_headers(nonce: u64, body: &str) -> Vec<(&'static str, String)> {
    signed_headers(ACCESS_KEY, SECRET_KEY, body, nonce, now())
}

/// A GET carrying exactly `headers`.
pub fn get_with_headers(
    client: &reqwest::Client,
    url: &str,
    headers: Vec<(&'static str, String)>,
) -> reqwest::RequestBuilder {
    headers
        .into_iter()
        .fold(client.get(url), |request, (name, value)| request.header(name, value))
}

/// A GET with a correctly signed header set.
pub fn signed_get(
    client: &reqwest::Client,
    url: &str,
    nonce: u64,
    body: &str,
) -> reqwest::RequestBuilder {
    get_with_headers(client, url, auth_headers(nonce, body))
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
