//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe each backend (GET address + path)
//!     → BackendPool::set_alive
//! ```
//!
//! # Design Decisions
//! - Active checks are the only source of liveness; a failed forward does
//!   not demote a backend
//! - No hysteresis: one probe result fully overwrites the previous state
//! - No lock is held while a probe is in flight

pub mod active;

pub use active::HealthMonitor;
