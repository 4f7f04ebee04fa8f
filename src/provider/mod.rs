//! Port to the external withdrawal provider, the eventually-consistent
//! system that moves funds out of the ledger to an external address.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod http;
pub mod stub;

pub use http::HttpWithdrawalProvider;
pub use stub::StubWithdrawalProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WithdrawalState {
    Processing,
    Completed,
    Failed,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Withdrawal with id '{0}' is not known to the provider")]
    UnknownId(Uuid),

    /// A repeated request id carried a different address or amount. The
    /// provider is idempotent per id; mismatched payloads break the protocol.
    #[error("Withdrawal with id '{0}' was already requested with a different address or amount")]
    Mismatch(Uuid),

    #[error("Invalid response from withdrawal provider: {0}")]
    InvalidResponse(String),

    #[error("Withdrawal provider circuit breaker is open")]
    CircuitOpen,

    #[error("Withdrawal provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait WithdrawalProvider: Send + Sync {
    /// Requests a withdrawal of `amount` to `address`, keyed by the
    /// transaction id for idempotency. A repeat with the same payload is a
    /// silent duplicate; a repeat with a different payload fails.
    async fn request_withdrawal(
        &self,
        id: Uuid,
        address: &str,
        amount: &BigDecimal,
    ) -> Result<(), ProviderError>;

    /// Returns the provider's current view of the withdrawal.
    async fn get_state(&self, id: Uuid) -> Result<WithdrawalState, ProviderError>;
}
