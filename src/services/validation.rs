//! Execution-time validation shared by the command executors. Raised errors
//! become the transaction's terminal FAILED state.

use crate::db::{StoreTx, queries};
use crate::domain::Transaction;
use crate::error::AppError;

/// Checks that the payer account exists, is owned by the payer, and covers
/// the amount.
pub async fn validate_payer(tx: &mut StoreTx<'_>, transaction: &Transaction) -> Result<(), AppError> {
    let payer_account =
        queries::get_account_by_number(tx, &transaction.payer_account_number).await?;
    let payer_account_owner =
        queries::get_account_owner(tx, &transaction.payer_account_number).await?;

    let payer_account = match (payer_account, payer_account_owner) {
        (Some(account), Some(owner)) if owner == transaction.payer => account,
        _ => {
            return Err(AppError::Validation(format!(
                "A pair of account with number '{}' and customer with login '{}' is not found",
                transaction.payer_account_number, transaction.payer
            )));
        }
    };

    if payer_account.balance < transaction.amount {
        return Err(AppError::Validation(format!(
            "Insufficient funds in account '{}'",
            transaction.payer_account_number
        )));
    }

    Ok(())
}

/// Transfer-specific validation on top of the payer checks: distinct
/// accounts, and a recipient account owned by the recipient.
pub async fn validate_transfer(
    tx: &mut StoreTx<'_>,
    transaction: &Transaction,
) -> Result<(), AppError> {
    validate_payer(tx, transaction).await?;

    let recipient = transaction
        .recipient
        .as_deref()
        .ok_or_else(|| AppError::Validation("recipient can't be blank".to_string()))?;
    let recipient_account_number = transaction
        .recipient_account_number
        .as_deref()
        .ok_or_else(|| AppError::Validation("recipientAccountNumber can't be blank".to_string()))?;

    if transaction
        .payer_account_number
        .eq_ignore_ascii_case(recipient_account_number)
    {
        return Err(AppError::Validation(format!(
            "Payer account '{}' and recipient account '{}' can't be the same",
            transaction.payer_account_number, recipient_account_number
        )));
    }

    let recipient_account = queries::get_account_by_number(tx, recipient_account_number).await?;
    let recipient_account_owner = queries::get_account_owner(tx, recipient_account_number).await?;

    match (recipient_account, recipient_account_owner) {
        (Some(_), Some(owner)) if owner == recipient => Ok(()),
        _ => Err(AppError::Validation(format!(
            "A pair of account with number '{}' and customer with login '{}' is not found",
            recipient_account_number, recipient
        ))),
    }
}
