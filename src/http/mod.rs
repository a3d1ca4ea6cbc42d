//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, connect info)
//!     → request.rs (request ID)
//!     → admission filter (crate::admission)
//!     → proxy.rs (forward to upstream)
//!     → response.rs (outcome → status)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::{translate, AdmissionOutcome};
pub use server::GatewayServer;
