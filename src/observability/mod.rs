//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! admission filter, proxy, config reload:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! The request ID flows through every log line of a request.

pub mod logging;
pub mod metrics;
