use bigdecimal::BigDecimal;
use chrono::Utc;
use sqlx::{PgPool, Result};
use std::time::Duration;
use uuid::Uuid;

use crate::db::StoreTx;
use crate::db::models::{AccountRow, TransactionHistoryRow, TransactionRow};
use crate::domain::{Account, Customer, Transaction, TransactionHistory, TransactionStatus};

// --- Transaction Queries ---

pub async fn find_transaction_id_by_request_id_and_payer(
    pool: &PgPool,
    request_id: Uuid,
    payer: &str,
) -> Result<Option<Uuid>> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM transactions WHERE request_id = $1 AND payer = $2")
            .bind(request_id)
            .bind(payer)
            .fetch_optional(pool)
            .await?;

    Ok(row.map(|(id,)| id))
}

pub async fn insert_transaction(tx: &mut StoreTx<'_>, transaction: &Transaction) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, request_id, payer, payer_account_number, recipient, recipient_account_number,
            withdrawal_address, amount, type, status, error_message, created, updated
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(transaction.id)
    .bind(transaction.request_id)
    .bind(&transaction.payer)
    .bind(&transaction.payer_account_number)
    .bind(&transaction.recipient)
    .bind(&transaction.recipient_account_number)
    .bind(&transaction.withdrawal_address)
    .bind(transaction.amount.value())
    .bind(transaction.transaction_type.as_str())
    .bind(transaction.status.as_str())
    .bind(&transaction.error_message)
    .bind(transaction.created)
    .bind(transaction.updated)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Locks the transaction row exclusively for the rest of the store
/// transaction. This is what serializes concurrent execution attempts for the
/// same transaction id across worker pools and processes.
pub async fn lock_transaction_by_id(
    tx: &mut StoreTx<'_>,
    transaction_id: Uuid,
) -> Result<Option<Transaction>> {
    let row = sqlx::query_as::<_, TransactionRow>(
        "SELECT * FROM transactions WHERE id = $1 FOR UPDATE",
    )
    .bind(transaction_id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(|r| r.into_domain()).transpose()
}

/// Writes the status/error/updated fields of the row and appends the matching
/// history entry, so every transition leaves an audit record.
pub async fn update_transaction(tx: &mut StoreTx<'_>, transaction: &Transaction) -> Result<()> {
    sqlx::query(
        "UPDATE transactions SET status = $1, error_message = $2, updated = $3 WHERE id = $4",
    )
    .bind(transaction.status.as_str())
    .bind(&transaction.error_message)
    .bind(transaction.updated)
    .bind(transaction.id)
    .execute(&mut **tx)
    .await?;

    insert_transaction_history(tx, transaction).await
}

pub async fn get_transaction(pool: &PgPool, transaction_id: Uuid) -> Result<Option<Transaction>> {
    let row = sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
        .bind(transaction_id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| r.into_domain()).transpose()
}

pub async fn get_transaction_status(
    pool: &PgPool,
    transaction_id: Uuid,
    payer: &str,
) -> Result<Option<TransactionStatus>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT status FROM transactions WHERE id = $1 AND payer = $2")
            .bind(transaction_id)
            .bind(payer)
            .fetch_optional(pool)
            .await?;

    row.map(|(status,)| {
        status
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))
    })
    .transpose()
}

pub async fn find_stuck_transactions(
    pool: &PgPool,
    staleness_threshold: Duration,
) -> Result<Vec<Transaction>> {
    let cutoff = Utc::now() - chrono::Duration::seconds(staleness_threshold.as_secs() as i64);

    let rows = sqlx::query_as::<_, TransactionRow>(
        "SELECT * FROM transactions WHERE status = 'PROCESSING' AND updated < $1",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|r| r.into_domain()).collect()
}

// --- Transaction History Queries ---

pub async fn insert_transaction_history(
    tx: &mut StoreTx<'_>,
    transaction: &Transaction,
) -> Result<()> {
    sqlx::query("INSERT INTO transaction_history (id, status, timestamp) VALUES ($1, $2, $3)")
        .bind(transaction.id)
        .bind(transaction.status.as_str())
        .bind(transaction.updated)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

pub async fn history_for_transaction(
    pool: &PgPool,
    transaction_id: Uuid,
) -> Result<Vec<TransactionHistory>> {
    let rows = sqlx::query_as::<_, TransactionHistoryRow>(
        "SELECT * FROM transaction_history WHERE id = $1 ORDER BY timestamp",
    )
    .bind(transaction_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(|r| r.into_domain()).collect()
}

// --- Account Queries ---

pub async fn get_account_by_number(
    tx: &mut StoreTx<'_>,
    account_number: &str,
) -> Result<Option<Account>> {
    let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE number = $1")
        .bind(account_number)
        .fetch_optional(&mut **tx)
        .await?;

    row.map(|r| r.into_domain()).transpose()
}

pub async fn lock_account(tx: &mut StoreTx<'_>, account_number: &str) -> Result<Option<Account>> {
    let row =
        sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE number = $1 FOR UPDATE")
            .bind(account_number)
            .fetch_optional(&mut **tx)
            .await?;

    row.map(|r| r.into_domain()).transpose()
}

/// Locks a pair of account rows in ascending account-number order. Every
/// caller taking locks on two accounts goes through here, so two transfers
/// crossing the same pair in opposite directions cannot deadlock.
pub async fn lock_accounts_ordered(tx: &mut StoreTx<'_>, first: &str, second: &str) -> Result<()> {
    let (lo, hi) = if first <= second {
        (first, second)
    } else {
        (second, first)
    };

    lock_account(tx, lo).await?;
    lock_account(tx, hi).await?;
    Ok(())
}

pub async fn add_to_balance(
    tx: &mut StoreTx<'_>,
    account_number: &str,
    amount: &BigDecimal,
) -> Result<()> {
    sqlx::query("UPDATE accounts SET balance = balance + $1 WHERE number = $2")
        .bind(amount)
        .bind(account_number)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

pub async fn subtract_from_balance(
    tx: &mut StoreTx<'_>,
    account_number: &str,
    amount: &BigDecimal,
) -> Result<()> {
    sqlx::query("UPDATE accounts SET balance = balance - $1 WHERE number = $2")
        .bind(amount)
        .bind(account_number)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

// --- Customer Queries ---

pub async fn get_account_owner(
    tx: &mut StoreTx<'_>,
    account_number: &str,
) -> Result<Option<String>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT customer_login FROM customer_accounts WHERE account_number = $1")
            .bind(account_number)
            .fetch_optional(&mut **tx)
            .await?;

    Ok(row.map(|(login,)| login))
}

/// Onboarding path: inserts the customer, their accounts, and the ownership
/// links as one atomic unit.
pub async fn insert_customer_with_accounts(pool: &PgPool, customer: &Customer) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO customers (login) VALUES ($1)")
        .bind(&customer.login)
        .execute(&mut *tx)
        .await?;

    for account in &customer.accounts {
        sqlx::query("INSERT INTO accounts (number, balance, currency) VALUES ($1, $2, $3)")
            .bind(&account.number)
            .bind(account.balance.value())
            .bind(&account.currency)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO customer_accounts (customer_login, account_number) VALUES ($1, $2)",
        )
        .bind(&customer.login)
        .bind(&account.number)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}
