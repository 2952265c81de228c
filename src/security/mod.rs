//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_key.rs (identify client from X-Forwarded-For)
//!     → rate_limit.rs (count request in the client's window)
//!     → middleware.rs (429 + Retry-After, or pass to handler)
//! ```
//!
//! # Design Decisions
//! - Fixed windows, not token buckets: a window resets entirely
//! - Table is process-local; multi-instance deployments limit per instance
//! - Header-less clients share one bucket

pub mod client_key;
pub mod middleware;
pub mod rate_limit;

pub use client_key::{rate_limit_key, UNKNOWN_CLIENT};
pub use middleware::{rate_limit_middleware, RateLimitGate};
pub use rate_limit::{RateLimitDecision, RateLimiter};
