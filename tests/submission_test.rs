mod common;

use futures::future::join_all;
use uuid::Uuid;

use remit_core::domain::{Money, Transaction};
use remit_core::services::submission::{self, SubmitOutcome};

use common::{create_customer, money, transaction_count, transfer_transaction};

#[tokio::test]
async fn test_sequential_duplicate_returns_same_id() {
    let db = common::setup().await;
    create_customer(&db.pool, "alice", "A-1", 200).await;
    create_customer(&db.pool, "bob", "B-1", 100).await;

    let transaction = transfer_transaction("alice", "A-1", "bob", "B-1", 100);

    let first = submission::submit(&db.pool, &transaction).await.unwrap();
    assert_eq!(first, SubmitOutcome::Created(transaction.id));

    // Logically identical request: same (request_id, payer), fresh system id.
    let duplicate = Transaction::transfer(
        transaction.request_id,
        "alice".to_string(),
        "A-1".to_string(),
        "bob".to_string(),
        "B-1".to_string(),
        money(100),
    );
    let second = submission::submit(&db.pool, &duplicate).await.unwrap();

    assert_eq!(second, SubmitOutcome::Existing(transaction.id));
    assert_eq!(transaction_count(&db.pool).await, 1);
}

#[tokio::test]
async fn test_concurrent_duplicates_converge_on_one_transaction() {
    let db = common::setup().await;
    create_customer(&db.pool, "alice", "A-1", 200).await;
    create_customer(&db.pool, "bob", "B-1", 100).await;

    let request_id = Uuid::new_v4();

    let submissions = (0..10).map(|_| {
        let pool = db.pool.clone();
        async move {
            let transaction = Transaction::transfer(
                request_id,
                "alice".to_string(),
                "A-1".to_string(),
                "bob".to_string(),
                "B-1".to_string(),
                Money::new(100.into()).unwrap(),
            );
            submission::submit(&pool, &transaction).await.unwrap()
        }
    });

    let outcomes = join_all(submissions).await;

    let created: Vec<_> = outcomes
        .iter()
        .filter(|o| matches!(o, SubmitOutcome::Created(_)))
        .collect();
    assert_eq!(created.len(), 1, "exactly one caller must create the row");

    let winning_id = created[0].transaction_id();
    for outcome in &outcomes {
        assert_eq!(outcome.transaction_id(), winning_id);
    }

    assert_eq!(transaction_count(&db.pool).await, 1);
}

#[tokio::test]
async fn test_idempotency_key_wins_over_differing_payload() {
    let db = common::setup().await;
    create_customer(&db.pool, "alice", "A-1", 200).await;
    create_customer(&db.pool, "bob", "B-1", 100).await;

    let first = transfer_transaction("alice", "A-1", "bob", "B-1", 100);
    let first_outcome = submission::submit(&db.pool, &first).await.unwrap();

    // Same key, different payer account: must resolve to the first row, not
    // create a second one.
    let conflicting = Transaction::transfer(
        first.request_id,
        "alice".to_string(),
        "A-2".to_string(),
        "bob".to_string(),
        "B-1".to_string(),
        money(50),
    );
    let second_outcome = submission::submit(&db.pool, &conflicting).await.unwrap();

    assert_eq!(
        second_outcome,
        SubmitOutcome::Existing(first_outcome.transaction_id())
    );
    assert_eq!(transaction_count(&db.pool).await, 1);
}

#[tokio::test]
async fn test_submission_writes_initial_history_entry() {
    let db = common::setup().await;
    create_customer(&db.pool, "alice", "A-1", 200).await;
    create_customer(&db.pool, "bob", "B-1", 100).await;

    let transaction = transfer_transaction("alice", "A-1", "bob", "B-1", 100);
    submission::submit(&db.pool, &transaction).await.unwrap();

    let history = common::history_statuses(&db.pool, transaction.id).await;
    assert_eq!(
        history,
        vec![remit_core::domain::TransactionStatus::Processing]
    );
}

#[tokio::test]
async fn test_different_keys_create_separate_transactions() {
    let db = common::setup().await;
    create_customer(&db.pool, "alice", "A-1", 200).await;
    create_customer(&db.pool, "bob", "B-1", 100).await;

    let first = transfer_transaction("alice", "A-1", "bob", "B-1", 100);
    let second = transfer_transaction("alice", "A-1", "bob", "B-1", 100);

    let first_outcome = submission::submit(&db.pool, &first).await.unwrap();
    let second_outcome = submission::submit(&db.pool, &second).await.unwrap();

    assert_ne!(
        first_outcome.transaction_id(),
        second_outcome.transaction_id()
    );
    assert_eq!(transaction_count(&db.pool).await, 2);
}
