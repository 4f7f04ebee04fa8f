//! Internal row types for SQLx. Status columns are stored as uppercase TEXT
//! and parsed back into domain enums in `into_domain`; rows are never exposed
//! outside the db layer.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{Account, Money, Transaction, TransactionHistory, TransactionStatus};

fn decode_err(e: impl std::fmt::Display) -> sqlx::Error {
    sqlx::Error::Decode(e.to_string().into())
}

#[derive(Debug, FromRow)]
pub struct TransactionRow {
    pub id: Uuid,
    pub request_id: Uuid,
    pub payer: String,
    pub payer_account_number: String,
    pub recipient: Option<String>,
    pub recipient_account_number: Option<String>,
    pub withdrawal_address: Option<String>,
    pub amount: BigDecimal,
    pub r#type: String,
    pub status: String,
    pub error_message: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl TransactionRow {
    pub fn into_domain(self) -> Result<Transaction, sqlx::Error> {
        Ok(Transaction {
            id: self.id,
            request_id: self.request_id,
            payer: self.payer,
            payer_account_number: self.payer_account_number,
            recipient: self.recipient,
            recipient_account_number: self.recipient_account_number,
            withdrawal_address: self.withdrawal_address,
            amount: Money::new(self.amount).map_err(decode_err)?,
            transaction_type: self.r#type.parse().map_err(decode_err)?,
            status: self.status.parse().map_err(decode_err)?,
            error_message: self.error_message,
            created: self.created,
            updated: self.updated,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct AccountRow {
    pub number: String,
    pub balance: BigDecimal,
    pub currency: String,
}

impl AccountRow {
    pub fn into_domain(self) -> Result<Account, sqlx::Error> {
        Ok(Account {
            number: self.number,
            balance: Money::new(self.balance).map_err(decode_err)?,
            currency: self.currency,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct TransactionHistoryRow {
    pub id: Uuid,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl TransactionHistoryRow {
    pub fn into_domain(self) -> Result<TransactionHistory, sqlx::Error> {
        Ok(TransactionHistory {
            transaction_id: self.id,
            status: self.status.parse::<TransactionStatus>().map_err(decode_err)?,
            timestamp: self.timestamp,
        })
    }
}
