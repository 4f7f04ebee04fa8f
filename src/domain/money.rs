//! Money value object.
//! Wraps a non-negative decimal amount; negative amounts are rejected at construction.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(BigDecimal);

impl Money {
    pub fn new(value: BigDecimal) -> Result<Self, AppError> {
        if value < BigDecimal::from(0) {
            return Err(AppError::Validation("amount can't be negative".to_string()));
        }
        Ok(Money(value))
    }

    pub fn zero() -> Self {
        Money(BigDecimal::from(0))
    }

    pub fn value(&self) -> &BigDecimal {
        &self.0
    }

    pub fn into_inner(self) -> BigDecimal {
        self.0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<BigDecimal> for Money {
    type Error = AppError;

    fn try_from(value: BigDecimal) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}
