//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request admitted by the rate limiter
//!     → pool.rs (scan from cursor, skip dead backends)
//!     → backend.rs (pre-parsed base URL for forwarding)
//!     → Return backend, or None when nothing is alive
//!
//! Health monitor
//!     → pool.rs set_alive (only writer of liveness)
//! ```
//!
//! # Design Decisions
//! - Liveness flags and the rotation cursor share one mutex
//! - Backend set is fixed at startup; only liveness mutates
//! - Selection is strict round-robin by configured order

pub mod backend;
pub mod pool;

pub use backend::Backend;
pub use pool::BackendPool;
