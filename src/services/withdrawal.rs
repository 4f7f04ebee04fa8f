//! Withdrawal command executor: a two-phase saga against the external
//! provider.
//!
//! PROCESSING phase: validate, debit the payer, hand off to the provider and
//! mark AWAITING in one store commit. On any failure the debit rolls back and
//! the FAILED state is recorded in a separate store transaction.
//!
//! AWAITING phase: poll the provider; COMPLETED keeps the debit, FAILED
//! refunds it (the saga's compensating action), still-processing and
//! provider unavailability leave the row untouched for the dispatcher's
//! delayed re-enqueue.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::{StoreTx, queries};
use crate::domain::{Transaction, TransactionStatus};
use crate::error::AppError;
use crate::provider::{WithdrawalProvider, WithdrawalState};
use crate::services::{CommandExecutor, validation};

pub struct WithdrawalExecutor {
    pool: PgPool,
    provider: Arc<dyn WithdrawalProvider>,
}

impl WithdrawalExecutor {
    pub fn new(pool: PgPool, provider: Arc<dyn WithdrawalProvider>) -> Self {
        Self { pool, provider }
    }

    async fn debit_and_request(
        &self,
        tx: &mut StoreTx<'_>,
        transaction: &Transaction,
    ) -> Result<(), AppError> {
        validation::validate_payer(tx, transaction).await?;

        let address = transaction
            .withdrawal_address
            .as_deref()
            .ok_or_else(|| AppError::Validation("address can't be blank".to_string()))?;

        queries::lock_account(tx, &transaction.payer_account_number).await?;
        queries::subtract_from_balance(tx, &transaction.payer_account_number, transaction.amount.value())
            .await?;

        // Idempotent per transaction id on the provider side; a timeout here
        // counts as a provider failure and rolls the debit back.
        self.provider
            .request_withdrawal(transaction.id, address, transaction.amount.value())
            .await?;

        info!(
            "Withdrawal transaction with id = '{}' is sent to address = '{}'",
            transaction.id, address
        );
        Ok(())
    }

    async fn process(
        &self,
        mut tx: StoreTx<'_>,
        transaction: Transaction,
    ) -> Result<Option<TransactionStatus>, AppError> {
        match self.debit_and_request(&mut tx, &transaction).await {
            Ok(()) => {
                let awaiting = transaction.await_provider();
                queries::update_transaction(&mut tx, &awaiting).await?;
                tx.commit().await?;
                Ok(Some(TransactionStatus::Awaiting))
            }
            Err(e @ (AppError::Validation(_) | AppError::Provider(_))) => {
                error!(
                    "Withdrawal transaction with id = '{}' failed to process: {}",
                    transaction.id, e
                );
                // The rollback that undoes the debit would also discard any
                // status write made in this attempt, so the failure is
                // recorded durably in its own store transaction.
                tx.rollback().await?;
                self.record_failure(transaction, e.to_string()).await?;
                Ok(Some(TransactionStatus::Failed))
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    async fn record_failure(&self, transaction: Transaction, message: String) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        queries::lock_transaction_by_id(&mut tx, transaction.id).await?;
        let failed = transaction.fail(message);
        queries::update_transaction(&mut tx, &failed).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn reconcile(
        &self,
        mut tx: StoreTx<'_>,
        transaction: Transaction,
    ) -> Result<Option<TransactionStatus>, AppError> {
        let state = match self.provider.get_state(transaction.id).await {
            Ok(state) => state,
            Err(e) => {
                // Provider unavailable: leave AWAITING for a later retry.
                error!(
                    "Withdrawal transaction with id = '{}' failed to reconcile: {}",
                    transaction.id, e
                );
                tx.rollback().await?;
                return Ok(Some(TransactionStatus::Awaiting));
            }
        };

        match state {
            WithdrawalState::Completed => {
                // The debit already happened in the PROCESSING phase.
                let completed = transaction.complete();
                queries::update_transaction(&mut tx, &completed).await?;
                tx.commit().await?;
                info!(
                    "Withdrawal transaction with id = '{}' is completed",
                    completed.id
                );
                Ok(Some(TransactionStatus::Completed))
            }
            WithdrawalState::Failed => {
                queries::lock_account(&mut tx, &transaction.payer_account_number).await?;
                queries::add_to_balance(
                    &mut tx,
                    &transaction.payer_account_number,
                    transaction.amount.value(),
                )
                .await?;
                let failed = transaction.fail("Withdrawal failed by external provider");
                queries::update_transaction(&mut tx, &failed).await?;
                tx.commit().await?;
                info!(
                    "Withdrawal transaction with id = '{}' failed by provider, payer refunded",
                    failed.id
                );
                Ok(Some(TransactionStatus::Failed))
            }
            WithdrawalState::Processing => {
                tx.rollback().await?;
                Ok(Some(TransactionStatus::Awaiting))
            }
        }
    }
}

#[async_trait]
impl CommandExecutor for WithdrawalExecutor {
    async fn execute(&self, transaction_id: Uuid) -> Result<Option<TransactionStatus>, AppError> {
        let mut tx = self.pool.begin().await?;

        let Some(transaction) = queries::lock_transaction_by_id(&mut tx, transaction_id).await?
        else {
            error!("Transaction with id = '{}' doesn't exist", transaction_id);
            tx.rollback().await?;
            return Ok(None);
        };

        match transaction.status {
            TransactionStatus::Processing => self.process(tx, transaction).await,
            TransactionStatus::Awaiting => self.reconcile(tx, transaction).await,
            status => {
                info!("Transaction with id = '{}' is already processed", transaction_id);
                tx.rollback().await?;
                Ok(Some(status))
            }
        }
    }
}
