//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Bind listener → Metrics → Spawn background tasks → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Health monitor and sweeper exit → Server drains → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Every background task takes a shutdown receiver; none is detached forever

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
