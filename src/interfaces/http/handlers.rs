use super::error::ApiError;
use super::AppState;
use crate::error::LedgerError;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateLoanRequest {
    pub borrower_id: u64,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub message: &'static str,
    pub remaining_balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OutstandingResponse {
    pub remaining_balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct DelinquencyResponse {
    pub is_delinquent: bool,
}

fn parse_loan_id(path: Result<Path<u64>, PathRejection>) -> Result<u64, LedgerError> {
    let Path(loan_id) =
        path.map_err(|rejection| LedgerError::InvalidInput(rejection.body_text()))?;
    Ok(loan_id)
}

/// `POST /loans`
pub async fn create_loan(
    State(state): State<AppState>,
    payload: Result<Json<CreateLoanRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| LedgerError::InvalidInput(rejection.body_text()))?;

    let loan = state
        .lifecycle
        .originate(request.borrower_id, request.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// `POST /loans/:loan_id/payments`
pub async fn make_payment(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let loan_id = parse_loan_id(path)?;
    let receipt = state.payments.apply_payment(loan_id).await?;
    Ok(Json(PaymentResponse {
        message: "Payment successful",
        remaining_balance: receipt.remaining_balance,
    }))
}

/// `GET /loans/:loan_id/outstanding`
pub async fn get_outstanding(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<OutstandingResponse>, ApiError> {
    let loan_id = parse_loan_id(path)?;
    let remaining_balance = state.status.get_outstanding(loan_id).await?;
    Ok(Json(OutstandingResponse { remaining_balance }))
}

/// `GET /loans/:loan_id/delinquent`
pub async fn get_delinquent(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<DelinquencyResponse>, ApiError> {
    let loan_id = parse_loan_id(path)?;
    let is_delinquent = state.status.is_delinquent(loan_id).await?;
    Ok(Json(DelinquencyResponse { is_delinquent }))
}
