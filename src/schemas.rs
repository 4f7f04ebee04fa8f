//! Request/response DTOs for the HTTP surface. Boundary validation happens
//! here; everything past `to_transaction` is a fully-formed domain command.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::domain::{Money, Transaction, TransactionStatus};
use crate::error::AppError;

fn require_not_blank(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} can't be blank", field)));
    }
    Ok(())
}

fn require_positive(amount: &BigDecimal) -> Result<(), AppError> {
    if amount <= &BigDecimal::from(0) {
        return Err(AppError::Validation(
            "amount can't be zero or negative".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub request_id: Uuid,
    pub payer_account_number: String,
    pub recipient_account_number: String,
    pub recipient: String,
    pub amount: BigDecimal,
}

impl TransferRequest {
    pub fn to_transaction(&self, payer: &str) -> Result<Transaction, AppError> {
        require_not_blank(payer, "payer")?;
        require_not_blank(&self.payer_account_number, "payerAccountNumber")?;
        require_not_blank(&self.recipient_account_number, "recipientAccountNumber")?;
        require_not_blank(&self.recipient, "recipient")?;

        if self
            .payer_account_number
            .eq_ignore_ascii_case(&self.recipient_account_number)
        {
            return Err(AppError::Validation(
                "payerAccountNumber and recipientAccountNumber can't be the same".to_string(),
            ));
        }

        require_positive(&self.amount)?;

        Ok(Transaction::transfer(
            self.request_id,
            payer.to_string(),
            self.payer_account_number.clone(),
            self.recipient.clone(),
            self.recipient_account_number.clone(),
            Money::new(self.amount.clone())?,
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub request_id: Uuid,
    pub payer_account_number: String,
    pub address: String,
    pub amount: BigDecimal,
}

impl WithdrawRequest {
    pub fn to_transaction(&self, payer: &str) -> Result<Transaction, AppError> {
        require_not_blank(payer, "payer")?;
        require_not_blank(&self.payer_account_number, "payerAccountNumber")?;
        require_not_blank(&self.address, "address")?;

        Url::parse(&self.address)
            .map_err(|_| AppError::Validation(format!("invalid address '{}'", self.address)))?;

        require_positive(&self.amount)?;

        Ok(Transaction::withdrawal(
            self.request_id,
            payer.to_string(),
            self.payer_account_number.clone(),
            self.address.clone(),
            Money::new(self.amount.clone())?,
        ))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionIdResponse {
    pub transaction_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatusResponse {
    pub transaction_id: Uuid,
    pub status: TransactionStatus,
}
