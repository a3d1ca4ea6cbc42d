//! Request admission subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (peer address + headers):
//!     → allow_list.rs (originating address)
//!     → claim.rs (accessKey, nonce, timestamp, sign, body)
//!     → credentials.rs (secret for the access key)
//!     → replay.rs (nonce bound, nonce reuse, timestamp window)
//!     → signer.rs (HMAC over the body, constant-time compare)
//!     → filter.rs forwards to the upstream and translates the outcome
//! ```
//!
//! Fail closed: the first failed check ends the request with 403.

pub mod allow_list;
pub mod claim;
pub mod clock;
pub mod credentials;
pub mod error;
pub mod filter;
pub mod replay;
pub mod signer;

pub use allow_list::AllowList;
pub use claim::AuthClaim;
pub use clock::{Clock, FixedClock, SystemClock};
pub use credentials::{CredentialStore, StaticCredentialStore};
pub use error::AdmissionError;
pub use filter::{admission_middleware, AdmissionFilter, AdmissionPolicy, Admitted};
pub use replay::{NonceCache, ReplayGuard, ReplayViolation};
pub use signer::{sign, signatures_match, HmacSigner, Signer};
