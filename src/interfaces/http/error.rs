use crate::error::LedgerError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// HTTP projection of a [`LedgerError`].
///
/// Store and transaction failures are reported with a generic message; their
/// detail has already been logged where they happened.
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            LedgerError::InvalidInput(_) | LedgerError::NoPendingRepayment(_) => {
                StatusCode::BAD_REQUEST
            }
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::TransactionFailed(_) | LedgerError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            LedgerError::InvalidInput(_) => "Invalid input".to_string(),
            LedgerError::NotFound(_) => "Loan not found".to_string(),
            LedgerError::NoPendingRepayment(_) => "No pending repayments".to_string(),
            LedgerError::TransactionFailed(_) => "Transaction failed".to_string(),
            LedgerError::InternalError(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self.0 {
            LedgerError::InvalidInput(detail) => {
                json!({ "error": self.message(), "detail": detail })
            }
            _ => json!({ "error": self.message() }),
        };
        (self.status(), Json(body)).into_response()
    }
}
