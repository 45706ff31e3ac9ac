use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

/// Feed-level faults. The state machine absorbs all of them into `IFFY`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    #[error("oracle stale: last update {updated_at}, now {now}, timeout {timeout_secs}s")]
    Stale {
        updated_at: DateTime<Utc>,
        now: DateTime<Utc>,
        timeout_secs: u64,
    },

    #[error("invalid price: {0}")]
    InvalidPrice(String),
}

/// Errors surfaced by a monitored collateral.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollateralError {
    #[error("invalid collateral config: {0}")]
    ConfigInvalid(String),

    #[error("price is stale or collateral is disabled")]
    StaleOrDisabled,

    #[error("ref-per-token accounting unavailable: {0}")]
    AccountingUnavailable(String),
}

/// Common error types used across the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Collateral error: {0}")]
    Collateral(#[from] CollateralError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Collateral(CollateralError::StaleOrDisabled) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::Collateral(CollateralError::AccountingUnavailable(_)) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::Collateral(CollateralError::ConfigInvalid(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_or_disabled_maps_to_503() {
        let response = AppError::from(CollateralError::StaleOrDisabled).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError::NotFound("0xabc".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_maps_to_400() {
        let response = AppError::Validation("bad address".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_accounting_failure_maps_to_502() {
        let err = CollateralError::AccountingUnavailable("reverted".to_string());
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_oracle_error_messages() {
        let err = OracleError::Unavailable("timed out".to_string());
        assert_eq!(err.to_string(), "oracle unavailable: timed out");
    }
}
