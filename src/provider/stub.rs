//! In-memory withdrawal provider used when no provider URL is configured.
//! Each accepted request resolves to a random terminal state after a random
//! 1-10 s delay, which exercises the saga's AWAITING retry loop end to end.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::{ProviderError, WithdrawalProvider, WithdrawalState};

#[derive(Debug, Clone)]
struct StubWithdrawal {
    final_state: WithdrawalState,
    finalize_at: Instant,
    address: String,
    amount: BigDecimal,
}

impl StubWithdrawal {
    fn current_state(&self) -> WithdrawalState {
        if self.finalize_at <= Instant::now() {
            self.final_state
        } else {
            WithdrawalState::Processing
        }
    }
}

pub struct StubWithdrawalProvider {
    requests: Mutex<HashMap<Uuid, StubWithdrawal>>,
    fixed_outcome: Option<(WithdrawalState, Duration)>,
}

impl StubWithdrawalProvider {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            fixed_outcome: None,
        }
    }

    /// Test constructor: every request resolves to `state` after `delay`.
    pub fn with_fixed_outcome(state: WithdrawalState, delay: Duration) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            fixed_outcome: Some((state, delay)),
        }
    }

    fn outcome(&self) -> (WithdrawalState, Duration) {
        match self.fixed_outcome {
            Some(outcome) => outcome,
            None => {
                let mut rng = rand::thread_rng();
                let state = if rng.gen_bool(0.5) {
                    WithdrawalState::Completed
                } else {
                    WithdrawalState::Failed
                };
                (state, Duration::from_millis(rng.gen_range(1_000..10_000)))
            }
        }
    }
}

impl Default for StubWithdrawalProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WithdrawalProvider for StubWithdrawalProvider {
    async fn request_withdrawal(
        &self,
        id: Uuid,
        address: &str,
        amount: &BigDecimal,
    ) -> Result<(), ProviderError> {
        let (final_state, delay) = self.outcome();
        let mut requests = self.requests.lock().expect("stub provider lock poisoned");

        match requests.get(&id) {
            // First request wins; an identical repeat is a silent duplicate.
            Some(existing) if existing.address == address && &existing.amount == amount => Ok(()),
            Some(_) => Err(ProviderError::Mismatch(id)),
            None => {
                requests.insert(
                    id,
                    StubWithdrawal {
                        final_state,
                        finalize_at: Instant::now() + delay,
                        address: address.to_string(),
                        amount: amount.clone(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn get_state(&self, id: Uuid) -> Result<WithdrawalState, ProviderError> {
        let requests = self.requests.lock().expect("stub provider lock poisoned");
        requests
            .get(&id)
            .map(|w| w.current_state())
            .ok_or(ProviderError::UnknownId(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(value: i32) -> BigDecimal {
        BigDecimal::from(value)
    }

    #[tokio::test]
    async fn test_unknown_id_fails() {
        let stub = StubWithdrawalProvider::new();
        let result = stub.get_state(Uuid::new_v4()).await;
        assert!(matches!(result, Err(ProviderError::UnknownId(_))));
    }

    #[tokio::test]
    async fn test_repeat_with_same_payload_is_silent_duplicate() {
        let stub = StubWithdrawalProvider::new();
        let id = Uuid::new_v4();

        stub.request_withdrawal(id, "https://wallet.example.com/a", &amount(100))
            .await
            .unwrap();
        let repeat = stub
            .request_withdrawal(id, "https://wallet.example.com/a", &amount(100))
            .await;

        assert!(repeat.is_ok());
    }

    #[tokio::test]
    async fn test_repeat_with_different_address_is_mismatch() {
        let stub = StubWithdrawalProvider::new();
        let id = Uuid::new_v4();

        stub.request_withdrawal(id, "https://wallet.example.com/a", &amount(100))
            .await
            .unwrap();
        let repeat = stub
            .request_withdrawal(id, "https://wallet.example.com/b", &amount(100))
            .await;

        assert!(matches!(repeat, Err(ProviderError::Mismatch(got)) if got == id));
    }

    #[tokio::test]
    async fn test_repeat_with_different_amount_is_mismatch() {
        let stub = StubWithdrawalProvider::new();
        let id = Uuid::new_v4();

        stub.request_withdrawal(id, "https://wallet.example.com/a", &amount(100))
            .await
            .unwrap();
        let repeat = stub
            .request_withdrawal(id, "https://wallet.example.com/a", &amount(200))
            .await;

        assert!(matches!(repeat, Err(ProviderError::Mismatch(_))));
    }

    #[tokio::test]
    async fn test_fixed_outcome_resolves_after_delay() {
        let stub = StubWithdrawalProvider::with_fixed_outcome(
            WithdrawalState::Completed,
            Duration::from_millis(50),
        );
        let id = Uuid::new_v4();

        stub.request_withdrawal(id, "https://wallet.example.com/a", &amount(100))
            .await
            .unwrap();
        assert_eq!(stub.get_state(id).await.unwrap(), WithdrawalState::Processing);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(stub.get_state(id).await.unwrap(), WithdrawalState::Completed);
    }
}
