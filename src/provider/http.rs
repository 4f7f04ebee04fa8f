use async_trait::async_trait;
use bigdecimal::BigDecimal;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{Config, Error as FailsafeError, StateMachine, backoff, failure_policy};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::{ProviderError, WithdrawalProvider, WithdrawalState};

/// Provider calls are blocking from the executor's point of view; a hung
/// provider must not hold a withdrawal worker longer than this.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WithdrawalRequestBody {
    transaction_id: Uuid,
    address: String,
    amount: BigDecimal,
}

#[derive(Debug, Deserialize)]
struct WithdrawalStateResponse {
    state: WithdrawalState,
}

/// HTTP client for the external withdrawal provider.
#[derive(Clone)]
pub struct HttpWithdrawalProvider {
    client: Client,
    base_url: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl HttpWithdrawalProvider {
    pub fn new(base_url: String) -> Self {
        Self::with_circuit_breaker(base_url, 3, 60)
    }

    pub fn with_circuit_breaker(
        base_url: String,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        HttpWithdrawalProvider {
            client,
            base_url,
            circuit_breaker,
        }
    }

    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    fn withdrawals_url(&self) -> String {
        format!("{}/withdrawals", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl WithdrawalProvider for HttpWithdrawalProvider {
    async fn request_withdrawal(
        &self,
        id: Uuid,
        address: &str,
        amount: &BigDecimal,
    ) -> Result<(), ProviderError> {
        let url = self.withdrawals_url();
        let client = self.client.clone();
        let body = WithdrawalRequestBody {
            transaction_id: id,
            address: address.to_string(),
            amount: amount.clone(),
        };

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client.post(&url).json(&body).send().await?;

                match response.status() {
                    StatusCode::CONFLICT => Err(ProviderError::Mismatch(id)),
                    status if status.is_success() => Ok(()),
                    status => Err(ProviderError::Unavailable(format!(
                        "withdrawal request returned {}",
                        status
                    ))),
                }
            })
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(FailsafeError::Rejected) => Err(ProviderError::CircuitOpen),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }

    async fn get_state(&self, id: Uuid) -> Result<WithdrawalState, ProviderError> {
        let url = format!("{}/{}", self.withdrawals_url(), id);
        let client = self.client.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client.get(&url).send().await?;

                match response.status() {
                    StatusCode::NOT_FOUND => Err(ProviderError::UnknownId(id)),
                    status if status.is_success() => {
                        let state = response
                            .json::<WithdrawalStateResponse>()
                            .await
                            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
                        Ok(state.state)
                    }
                    status => Err(ProviderError::Unavailable(format!(
                        "withdrawal state query returned {}",
                        status
                    ))),
                }
            })
            .await;

        match result {
            Ok(state) => Ok(state),
            Err(FailsafeError::Rejected) => Err(ProviderError::CircuitOpen),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}
