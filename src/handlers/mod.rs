use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::AppState;
use crate::domain::TransactionType;
use crate::error::AppError;
use crate::schemas::{
    TransactionIdResponse, TransactionStatusResponse, TransferRequest, WithdrawRequest,
};
use crate::services::submission;

/// Submits a transfer command. The returned id is stable across duplicate
/// submissions of the same request; execution happens in the background, so
/// data that validates here can still fail later and surface through the
/// status endpoint.
pub async fn transfer(
    State(state): State<AppState>,
    Path(customer): Path<String>,
    Json(request): Json<TransferRequest>,
) -> Result<impl IntoResponse, AppError> {
    let transaction = request.to_transaction(&customer)?;
    let outcome = submission::submit(&state.db, &transaction).await?;
    let transaction_id = outcome.transaction_id();

    // Re-driving an existing transaction is a no-op in the executor, so both
    // outcomes dispatch.
    state
        .dispatcher
        .dispatch(TransactionType::Transfer, transaction_id)
        .await;

    Ok(Json(TransactionIdResponse { transaction_id }))
}

pub async fn withdraw(
    State(state): State<AppState>,
    Path(customer): Path<String>,
    Json(request): Json<WithdrawRequest>,
) -> Result<impl IntoResponse, AppError> {
    let transaction = request.to_transaction(&customer)?;
    let outcome = submission::submit(&state.db, &transaction).await?;
    let transaction_id = outcome.transaction_id();

    state
        .dispatcher
        .dispatch(TransactionType::Withdrawal, transaction_id)
        .await;

    Ok(Json(TransactionIdResponse { transaction_id }))
}

pub async fn transaction_status(
    State(state): State<AppState>,
    Path((customer, transaction_id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let status = state
        .query_service
        .transaction_status(transaction_id, &customer)
        .await?;

    Ok(Json(TransactionStatusResponse {
        transaction_id,
        status,
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = crate::health::check_health(
        crate::health::PostgresChecker::new(state.db.clone()),
        state.start_time,
    )
    .await;

    Json(response)
}
