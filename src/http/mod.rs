//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, catch-all route)
//!     → request.rs (request ID assigned or kept)
//!     → dispatcher.rs (rate limit → backend selection → forward)
//!     → response.rs (dispatch failures mapped to status codes)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::Dispatcher;
pub use request::X_REQUEST_ID;
pub use response::DispatchError;
pub use server::{build_router, HttpServer};
