//! Customer and supplier due/advance balances

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterpartyKind {
    Customer,
    Supplier,
}

/// A customer or supplier with a running due balance.
///
/// A positive balance is an amount still owed on invoices (by a customer to us,
/// or by us to a supplier). A negative balance is an advance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counterparty {
    pub id: String,
    pub name: String,
    pub kind: CounterpartyKind,
    pub balance: BigDecimal,
}

impl Counterparty {
    pub fn customer(id: String, name: String) -> Self {
        Self {
            id,
            name,
            kind: CounterpartyKind::Customer,
            balance: BigDecimal::from(0),
        }
    }

    pub fn supplier(id: String, name: String) -> Self {
        Self {
            id,
            name,
            kind: CounterpartyKind::Supplier,
            balance: BigDecimal::from(0),
        }
    }

    pub fn with_balance(mut self, balance: BigDecimal) -> Self {
        self.balance = balance;
        self
    }

    /// Amount currently owed, zero when in advance
    pub fn due(&self) -> BigDecimal {
        if self.balance > BigDecimal::from(0) {
            self.balance.clone()
        } else {
            BigDecimal::from(0)
        }
    }

    /// Prepaid amount, zero when something is owed
    pub fn advance(&self) -> BigDecimal {
        if self.balance < BigDecimal::from(0) {
            -self.balance.clone()
        } else {
            BigDecimal::from(0)
        }
    }
}
