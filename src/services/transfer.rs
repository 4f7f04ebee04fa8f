//! Transfer command executor.
//!
//! Validates and moves funds between two accounts in one store transaction,
//! so exactly one of {no balance change + FAILED} or {both balances updated +
//! COMPLETED} ever becomes observable.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::{StoreTx, queries};
use crate::domain::{Transaction, TransactionStatus};
use crate::error::AppError;
use crate::services::{CommandExecutor, validation};

pub struct TransferExecutor {
    pool: PgPool,
}

impl TransferExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn apply(&self, tx: &mut StoreTx<'_>, transaction: &Transaction) -> Result<(), AppError> {
        validation::validate_transfer(tx, transaction).await?;

        // Validation guarantees the recipient account is present.
        let recipient_account_number = transaction
            .recipient_account_number
            .as_deref()
            .ok_or_else(|| AppError::Validation("recipientAccountNumber can't be blank".to_string()))?;

        queries::lock_accounts_ordered(tx, &transaction.payer_account_number, recipient_account_number)
            .await?;
        queries::subtract_from_balance(tx, &transaction.payer_account_number, transaction.amount.value())
            .await?;
        queries::add_to_balance(tx, recipient_account_number, transaction.amount.value()).await?;

        Ok(())
    }
}

#[async_trait]
impl CommandExecutor for TransferExecutor {
    async fn execute(&self, transaction_id: Uuid) -> Result<Option<TransactionStatus>, AppError> {
        let mut tx = self.pool.begin().await?;

        let Some(transaction) = queries::lock_transaction_by_id(&mut tx, transaction_id).await?
        else {
            error!("Transaction with id = '{}' doesn't exist", transaction_id);
            tx.rollback().await?;
            return Ok(None);
        };

        if transaction.status != TransactionStatus::Processing {
            info!("Transaction with id = '{}' is already processed", transaction_id);
            tx.rollback().await?;
            return Ok(Some(transaction.status));
        }

        match self.apply(&mut tx, &transaction).await {
            Ok(()) => {
                let completed = transaction.complete();
                queries::update_transaction(&mut tx, &completed).await?;
                tx.commit().await?;
                info!("Transfer transaction with id = '{}' is completed", transaction_id);
                Ok(Some(TransactionStatus::Completed))
            }
            Err(AppError::Validation(message)) => {
                // The failure and the absence of any balance mutation commit
                // together; apply() only mutates after validation passes.
                error!(
                    "Transfer transaction with id = '{}' failed to process: {}",
                    transaction_id, message
                );
                let failed = transaction.fail(message);
                queries::update_transaction(&mut tx, &failed).await?;
                tx.commit().await?;
                Ok(Some(TransactionStatus::Failed))
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }
}
