//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-IP token bucket)
//!     → [backend selected]
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*)
//!     → Forward to backend
//! ```
//!
//! # Design Decisions
//! - Fail closed: a denied request never reaches the pool
//! - Client identity is the connection's IP, never a client-supplied header

pub mod headers;
pub mod rate_limit;

pub use rate_limit::{RateLimiterRegistry, TokenBucket};
