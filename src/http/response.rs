//! Dispatch failures and their HTTP responses.
//!
//! | Variant          | Status | Body                                           |
//! |------------------|--------|------------------------------------------------|
//! | `ClientAddress`  | 500    | `Internal error`                               |
//! | `RateLimited`    | 429    | `{"code":429,"message":"Rate limit exceeded"}` |
//! | `NoBackends`     | 503    | `No available backends`                        |
//! | `BadBackendUrl`  | 500    | `Bad backend URL`                              |
//! | `Upstream`       | 502    | `Backend unavailable`                          |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Why a request was not proxied.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("client address unavailable")]
    ClientAddress,

    #[error("rate limit exceeded for {0}")]
    RateLimited(String),

    #[error("no available backends")]
    NoBackends,

    #[error("malformed backend URL {0:?}")]
    BadBackendUrl(String),

    #[error("upstream request to {backend} failed: {source}")]
    Upstream {
        backend: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },
}

/// JSON body of a 429.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: &'static str,
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::ClientAddress | DispatchError::BadBackendUrl(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            DispatchError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            DispatchError::NoBackends => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            DispatchError::RateLimited(_) => (
                status,
                Json(ErrorBody {
                    code: status.as_u16(),
                    message: "Rate limit exceeded",
                }),
            )
                .into_response(),
            DispatchError::ClientAddress => (status, "Internal error").into_response(),
            DispatchError::NoBackends => (status, "No available backends").into_response(),
            DispatchError::BadBackendUrl(_) => (status, "Bad backend URL").into_response(),
            DispatchError::Upstream { .. } => (status, "Backend unavailable").into_response(),
        }
    }
}
