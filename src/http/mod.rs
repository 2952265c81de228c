//! HTTP boundary subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (assign x-request-id)
//!     → server.rs (tracing, timeout, body limit)
//!     → security::middleware (api gate, then submission gate)
//!     → handlers.rs (seal, verify, duplicates)
//!     → response with x-request-id and x-ratelimit-* headers
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{AppState, GuardServer};
