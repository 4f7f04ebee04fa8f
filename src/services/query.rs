//! Read-only transaction lookups.

use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use crate::db::queries;
use crate::domain::{Transaction, TransactionStatus};
use crate::error::AppError;

/// How long a transaction may sit in PROCESSING before it is considered
/// stuck. Deliberately independent from the recovery scan interval.
pub const STUCK_THRESHOLD: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct QueryService {
    pool: PgPool,
}

impl QueryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the status of the transaction as seen by its payer. The
    /// ownership check keeps one customer from reading another's
    /// transactions; the saga-internal AWAITING state is reported as
    /// PROCESSING.
    pub async fn transaction_status(
        &self,
        transaction_id: Uuid,
        payer: &str,
    ) -> Result<TransactionStatus, AppError> {
        match queries::get_transaction_status(&self.pool, transaction_id, payer).await? {
            None => Err(AppError::NotFound(format!(
                "Transaction with id = '{}' and payer = '{}' not found",
                transaction_id, payer
            ))),
            Some(TransactionStatus::Awaiting) => Ok(TransactionStatus::Processing),
            Some(status) => Ok(status),
        }
    }

    /// Lists transactions stuck in PROCESSING past the staleness threshold,
    /// candidates for re-dispatch by the recovery watcher.
    pub async fn stuck_transactions(&self) -> Result<Vec<Transaction>, AppError> {
        Ok(queries::find_stuck_transactions(&self.pool, STUCK_THRESHOLD).await?)
    }
}
