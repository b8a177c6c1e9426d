use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::dispatcher::DispatchError;
use crate::router::{RelayResponse, RouterError};
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Connection is gone")]
    Gone,

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => AppError::StoreUnavailable(msg),
            StoreError::Serialization(msg) => AppError::Internal(msg),
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::Gone => AppError::Gone,
            DispatchError::TransientFailure(msg) => AppError::DeliveryFailed(msg),
        }
    }
}

impl From<RouterError> for AppError {
    fn from(e: RouterError) -> Self {
        match e {
            RouterError::MalformedRequest(msg) => AppError::MalformedRequest(msg),
            RouterError::Store(e) => e.into(),
            RouterError::Dispatch(e) => e.into(),
        }
    }
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Gone => StatusCode::GONE,
            AppError::DeliveryFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let log_message = self.to_string();

        // Internal details stay in the logs in production
        let detail = match &self {
            AppError::Config(_) | AppError::Internal(_) if is_production() => {
                "Internal server error".to_string()
            }
            AppError::StoreUnavailable(_) if is_production() => {
                "Store temporarily unavailable".to_string()
            }
            _ => log_message.clone(),
        };

        if status.is_server_error() {
            tracing::error!(status = %status.as_u16(), message = %log_message, "API error");
        } else {
            tracing::warn!(status = %status.as_u16(), message = %log_message, "API error");
        }

        (status, Json(RelayResponse::error(detail))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_error_mapping() {
        let e: AppError = RouterError::MalformedRequest("x".into()).into();
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);

        let e: AppError = RouterError::Store(StoreError::Unavailable("down".into())).into();
        assert_eq!(e.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let e: AppError = RouterError::Dispatch(DispatchError::Gone).into();
        assert_eq!(e.status_code(), StatusCode::GONE);

        let e: AppError = RouterError::Dispatch(DispatchError::TransientFailure("t".into())).into();
        assert_eq!(e.status_code(), StatusCode::BAD_GATEWAY);
    }
}
