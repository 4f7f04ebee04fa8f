//! Idempotent submission protocol.
//!
//! For N concurrent callers submitting the same `(request_id, payer)` pair,
//! exactly one transaction row is created and every caller observes the same
//! id. Losing the insert race is an expected outcome, not an error.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db::queries;
use crate::domain::Transaction;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// This call persisted the transaction.
    Created(Uuid),
    /// A transaction with the same idempotency key already existed.
    Existing(Uuid),
}

impl SubmitOutcome {
    pub fn transaction_id(&self) -> Uuid {
        match self {
            SubmitOutcome::Created(id) | SubmitOutcome::Existing(id) => *id,
        }
    }
}

pub async fn submit(pool: &PgPool, transaction: &Transaction) -> Result<SubmitOutcome, AppError> {
    // Fast path for sequential duplicates, and for the loser of the race
    // below on its next attempt.
    if let Some(id) = queries::find_transaction_id_by_request_id_and_payer(
        pool,
        transaction.request_id,
        &transaction.payer,
    )
    .await?
    {
        info!(
            "Transaction with request_id = '{}' and payer = '{}' already exists",
            transaction.request_id, transaction.payer
        );
        return Ok(SubmitOutcome::Existing(id));
    }

    let mut tx = pool.begin().await?;
    let inserted = match queries::insert_transaction(&mut tx, transaction).await {
        Ok(()) => {
            queries::insert_transaction_history(&mut tx, transaction).await?;
            tx.commit().await?;
            true
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            // Another caller won the race on the (request_id, payer) unique
            // constraint; their row is now authoritative.
            tx.rollback().await?;
            false
        }
        Err(e) => return Err(e.into()),
    };

    if inserted {
        return Ok(SubmitOutcome::Created(transaction.id));
    }

    info!(
        "Transaction with request_id = '{}' and payer = '{}' already exists",
        transaction.request_id, transaction.payer
    );
    let id = queries::find_transaction_id_by_request_id_and_payer(
        pool,
        transaction.request_id,
        &transaction.payer,
    )
    .await?
    .ok_or_else(|| {
        AppError::Internal(format!(
            "transaction with request_id = '{}' hit the unique constraint but is absent",
            transaction.request_id
        ))
    })?;

    Ok(SubmitOutcome::Existing(id))
}
