pub mod dispatcher;
pub mod query;
pub mod recovery;
pub mod submission;
pub mod transfer;
pub mod validation;
pub mod withdrawal;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::TransactionStatus;
use crate::error::AppError;

/// A command executor drives one transaction id a single step further through
/// its state machine. Each invocation is a stateless resume-from-persisted-
/// state step, so re-dispatch after a restart is always safe.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Returns the resulting status, or `None` when no such transaction
    /// exists. Store-level failures propagate; the transaction then stays in
    /// its prior state for the recovery watcher to retry.
    async fn execute(&self, transaction_id: Uuid) -> Result<Option<TransactionStatus>, AppError>;
}
