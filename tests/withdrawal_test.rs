mod common;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use remit_core::domain::TransactionStatus;
use remit_core::provider::{
    ProviderError, StubWithdrawalProvider, WithdrawalProvider, WithdrawalState,
};
use remit_core::services::CommandExecutor;
use remit_core::services::withdrawal::WithdrawalExecutor;

use common::{balance_of, create_customer, history_statuses, persist, withdrawal_transaction};

/// Provider whose calls always fail, for exercising the compensation paths.
struct UnavailableProvider;

#[async_trait]
impl WithdrawalProvider for UnavailableProvider {
    async fn request_withdrawal(
        &self,
        _id: Uuid,
        _address: &str,
        _amount: &BigDecimal,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unavailable("connection refused".to_string()))
    }

    async fn get_state(&self, _id: Uuid) -> Result<WithdrawalState, ProviderError> {
        Err(ProviderError::Unavailable("connection refused".to_string()))
    }
}

fn executor_with(
    pool: &sqlx::PgPool,
    provider: Arc<dyn WithdrawalProvider>,
) -> WithdrawalExecutor {
    WithdrawalExecutor::new(pool.clone(), provider)
}

#[tokio::test]
async fn test_processing_phase_debits_and_awaits() {
    let db = common::setup().await;
    create_customer(&db.pool, "alice", "A-1", 200).await;

    let provider = Arc::new(StubWithdrawalProvider::with_fixed_outcome(
        WithdrawalState::Completed,
        Duration::from_secs(60),
    ));
    let executor = executor_with(&db.pool, provider);

    let transaction = withdrawal_transaction("alice", "A-1", 100);
    persist(&db.pool, &transaction).await;

    let status = executor.execute(transaction.id).await.unwrap();

    assert_eq!(status, Some(TransactionStatus::Awaiting));
    assert_eq!(balance_of(&db.pool, "A-1").await, BigDecimal::from(100));
    assert_eq!(
        history_statuses(&db.pool, transaction.id).await,
        vec![TransactionStatus::Processing, TransactionStatus::Awaiting]
    );
}

#[tokio::test]
async fn test_awaiting_stays_awaiting_while_provider_processes() {
    let db = common::setup().await;
    create_customer(&db.pool, "alice", "A-1", 200).await;

    let provider = Arc::new(StubWithdrawalProvider::with_fixed_outcome(
        WithdrawalState::Completed,
        Duration::from_secs(60),
    ));
    let executor = executor_with(&db.pool, provider);

    let transaction = withdrawal_transaction("alice", "A-1", 100);
    persist(&db.pool, &transaction).await;
    executor.execute(transaction.id).await.unwrap();

    // Provider hasn't finalized yet: reconciliation leaves everything as is.
    let status = executor.execute(transaction.id).await.unwrap();

    assert_eq!(status, Some(TransactionStatus::Awaiting));
    assert_eq!(balance_of(&db.pool, "A-1").await, BigDecimal::from(100));
    assert_eq!(
        history_statuses(&db.pool, transaction.id).await,
        vec![TransactionStatus::Processing, TransactionStatus::Awaiting]
    );
}

#[tokio::test]
async fn test_provider_completion_keeps_debit() {
    let db = common::setup().await;
    create_customer(&db.pool, "alice", "A-1", 200).await;

    let provider = Arc::new(StubWithdrawalProvider::with_fixed_outcome(
        WithdrawalState::Completed,
        Duration::ZERO,
    ));
    let executor = executor_with(&db.pool, provider);

    let transaction = withdrawal_transaction("alice", "A-1", 100);
    persist(&db.pool, &transaction).await;
    executor.execute(transaction.id).await.unwrap();
    let status = executor.execute(transaction.id).await.unwrap();

    assert_eq!(status, Some(TransactionStatus::Completed));
    assert_eq!(balance_of(&db.pool, "A-1").await, BigDecimal::from(100));
    assert_eq!(
        history_statuses(&db.pool, transaction.id).await,
        vec![
            TransactionStatus::Processing,
            TransactionStatus::Awaiting,
            TransactionStatus::Completed
        ]
    );
}

#[tokio::test]
async fn test_provider_failure_refunds_payer_exactly_once() {
    let db = common::setup().await;
    create_customer(&db.pool, "alice", "A-1", 200).await;

    let provider = Arc::new(StubWithdrawalProvider::with_fixed_outcome(
        WithdrawalState::Failed,
        Duration::ZERO,
    ));
    let executor = executor_with(&db.pool, provider);

    let transaction = withdrawal_transaction("alice", "A-1", 100);
    persist(&db.pool, &transaction).await;
    executor.execute(transaction.id).await.unwrap();
    let status = executor.execute(transaction.id).await.unwrap();

    assert_eq!(status, Some(TransactionStatus::Failed));
    assert_eq!(balance_of(&db.pool, "A-1").await, BigDecimal::from(200));

    // Re-driving the now-terminal transaction must not refund again.
    let redriven = executor.execute(transaction.id).await.unwrap();
    assert_eq!(redriven, Some(TransactionStatus::Failed));
    assert_eq!(balance_of(&db.pool, "A-1").await, BigDecimal::from(200));
    assert_eq!(
        history_statuses(&db.pool, transaction.id).await,
        vec![
            TransactionStatus::Processing,
            TransactionStatus::Awaiting,
            TransactionStatus::Failed
        ]
    );
}

#[tokio::test]
async fn test_insufficient_funds_fails_without_debit() {
    let db = common::setup().await;
    create_customer(&db.pool, "alice", "A-1", 200).await;

    let provider = Arc::new(StubWithdrawalProvider::new());
    let executor = executor_with(&db.pool, provider);

    let transaction = withdrawal_transaction("alice", "A-1", 300);
    persist(&db.pool, &transaction).await;
    let status = executor.execute(transaction.id).await.unwrap();

    assert_eq!(status, Some(TransactionStatus::Failed));
    assert_eq!(balance_of(&db.pool, "A-1").await, BigDecimal::from(200));

    let stored = common::stored_transaction(&db.pool, transaction.id).await;
    assert!(
        stored
            .error_message
            .as_deref()
            .unwrap()
            .contains("Insufficient funds in account 'A-1'")
    );
    // The FAILED write lands in its own store transaction after the rollback.
    assert_eq!(
        history_statuses(&db.pool, transaction.id).await,
        vec![TransactionStatus::Processing, TransactionStatus::Failed]
    );
}

#[tokio::test]
async fn test_provider_error_in_processing_phase_rolls_back_debit() {
    let db = common::setup().await;
    create_customer(&db.pool, "alice", "A-1", 200).await;

    let executor = executor_with(&db.pool, Arc::new(UnavailableProvider));

    let transaction = withdrawal_transaction("alice", "A-1", 100);
    persist(&db.pool, &transaction).await;
    let status = executor.execute(transaction.id).await.unwrap();

    assert_eq!(status, Some(TransactionStatus::Failed));
    // The debit never committed.
    assert_eq!(balance_of(&db.pool, "A-1").await, BigDecimal::from(200));
}

#[tokio::test]
async fn test_provider_error_in_awaiting_phase_leaves_state_untouched() {
    let db = common::setup().await;
    create_customer(&db.pool, "alice", "A-1", 200).await;

    // Hand off through a working provider first, then reconcile against a
    // dead one.
    let working = Arc::new(StubWithdrawalProvider::with_fixed_outcome(
        WithdrawalState::Completed,
        Duration::from_secs(60),
    ));
    let transaction = withdrawal_transaction("alice", "A-1", 100);
    persist(&db.pool, &transaction).await;
    executor_with(&db.pool, working)
        .execute(transaction.id)
        .await
        .unwrap();

    let status = executor_with(&db.pool, Arc::new(UnavailableProvider))
        .execute(transaction.id)
        .await
        .unwrap();

    assert_eq!(status, Some(TransactionStatus::Awaiting));
    assert_eq!(balance_of(&db.pool, "A-1").await, BigDecimal::from(100));
    assert_eq!(
        history_statuses(&db.pool, transaction.id).await,
        vec![TransactionStatus::Processing, TransactionStatus::Awaiting]
    );
}

#[tokio::test]
async fn test_unknown_transaction_reports_absent() {
    let db = common::setup().await;

    let executor = executor_with(&db.pool, Arc::new(StubWithdrawalProvider::new()));
    let status = executor.execute(Uuid::new_v4()).await.unwrap();

    assert_eq!(status, None);
}
