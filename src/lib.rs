//! Submission guard.
//!
//! Request-rate and data-integrity guards for a patient feedback and case
//! management portal:
//!
//! - [`security`]: fixed-window rate limiting keyed by client address
//! - [`integrity`]: SHA-256 sealing of submissions and near-duplicate detection
//! - [`http`]: an Axum boundary exposing both

pub mod clock;
pub mod config;
pub mod http;
pub mod integrity;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use clock::{Clock, MockClock, SystemClock};
pub use config::GuardConfig;
pub use http::GuardServer;
pub use integrity::Record;
pub use lifecycle::Shutdown;
pub use security::RateLimiter;
