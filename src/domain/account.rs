//! Account and customer domain entities.

use super::money::Money;

/// A ledger account. The balance is only ever mutated by command executors
/// while holding a row lock on the accounts table.
#[derive(Debug, Clone)]
pub struct Account {
    pub number: String,
    pub balance: Money,
    pub currency: String,
}

impl Account {
    pub fn new(number: String, balance: Money) -> Self {
        Self {
            number,
            balance,
            currency: "USD".to_string(),
        }
    }
}

/// A customer and the accounts they own.
#[derive(Debug, Clone)]
pub struct Customer {
    pub login: String,
    pub accounts: Vec<Account>,
}

impl Customer {
    pub fn new(login: String, accounts: Vec<Account>) -> Self {
        Self { login, accounts }
    }
}
