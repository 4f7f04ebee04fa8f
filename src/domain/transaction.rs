//! Transaction domain entity and its state machine.
//!
//! A transaction is created in `Processing` and driven to a terminal state by
//! a command executor: `Processing -> Completed | Failed` for transfers,
//! `Processing -> Awaiting -> Completed | Failed` for withdrawals. Terminal
//! states are immutable; re-driving a terminal transaction is a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Processing,
    Awaiting,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Processing => "PROCESSING",
            TransactionStatus::Awaiting => "AWAITING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Failed)
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROCESSING" => Ok(TransactionStatus::Processing),
            "AWAITING" => Ok(TransactionStatus::Awaiting),
            "COMPLETED" => Ok(TransactionStatus::Completed),
            "FAILED" => Ok(TransactionStatus::Failed),
            other => Err(format!("unknown transaction status '{}'", other)),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Transfer,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Transfer => "TRANSFER",
            TransactionType::Withdrawal => "WITHDRAWAL",
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRANSFER" => Ok(TransactionType::Transfer),
            "WITHDRAWAL" => Ok(TransactionType::Withdrawal),
            other => Err(format!("unknown transaction type '{}'", other)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain entity representing a money-movement command. `(request_id, payer)`
/// is the idempotency key; the row in Postgres carries a unique constraint on
/// that pair.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: Uuid,
    pub request_id: Uuid,
    pub payer: String,
    pub payer_account_number: String,
    pub recipient: Option<String>,
    pub recipient_account_number: Option<String>,
    pub withdrawal_address: Option<String>,
    pub amount: Money,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub error_message: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Transaction {
    pub fn transfer(
        request_id: Uuid,
        payer: String,
        payer_account_number: String,
        recipient: String,
        recipient_account_number: String,
        amount: Money,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            request_id,
            payer,
            payer_account_number,
            recipient: Some(recipient),
            recipient_account_number: Some(recipient_account_number),
            withdrawal_address: None,
            amount,
            transaction_type: TransactionType::Transfer,
            status: TransactionStatus::Processing,
            error_message: None,
            created: now,
            updated: now,
        }
    }

    pub fn withdrawal(
        request_id: Uuid,
        payer: String,
        payer_account_number: String,
        withdrawal_address: String,
        amount: Money,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            request_id,
            payer,
            payer_account_number,
            recipient: None,
            recipient_account_number: None,
            withdrawal_address: Some(withdrawal_address),
            amount,
            transaction_type: TransactionType::Withdrawal,
            status: TransactionStatus::Processing,
            error_message: None,
            created: now,
            updated: now,
        }
    }

    pub fn complete(mut self) -> Self {
        self.status = TransactionStatus::Completed;
        self.updated = Utc::now();
        self
    }

    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.status = TransactionStatus::Failed;
        self.error_message = Some(message.into());
        self.updated = Utc::now();
        self
    }

    /// Marks the transaction as debited locally and handed off to the
    /// external withdrawal provider.
    pub fn await_provider(mut self) -> Self {
        self.status = TransactionStatus::Awaiting;
        self.updated = Utc::now();
        self
    }
}

/// Append-only record of a single status transition.
#[derive(Debug, Clone)]
pub struct TransactionHistory {
    pub transaction_id: Uuid,
    pub status: TransactionStatus,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn some_transfer() -> Transaction {
        Transaction::transfer(
            Uuid::new_v4(),
            "alice".to_string(),
            "A-1".to_string(),
            "bob".to_string(),
            "B-1".to_string(),
            Money::new(BigDecimal::from(100)).unwrap(),
        )
    }

    #[test]
    fn test_new_transfer_starts_processing() {
        let tx = some_transfer();
        assert_eq!(tx.status, TransactionStatus::Processing);
        assert_eq!(tx.transaction_type, TransactionType::Transfer);
        assert!(tx.error_message.is_none());
        assert!(tx.withdrawal_address.is_none());
    }

    #[test]
    fn test_fail_records_error_message() {
        let tx = some_transfer().fail("Insufficient funds in account 'A-1'");
        assert_eq!(tx.status, TransactionStatus::Failed);
        assert_eq!(
            tx.error_message.as_deref(),
            Some("Insufficient funds in account 'A-1'")
        );
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            TransactionStatus::Processing,
            TransactionStatus::Awaiting,
            TransactionStatus::Completed,
            TransactionStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<TransactionStatus>(), Ok(status));
        }
        assert!("PENDING".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(!TransactionStatus::Processing.is_terminal());
        assert!(!TransactionStatus::Awaiting.is_terminal());
    }
}
