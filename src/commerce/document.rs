//! Sales, purchases and their payment state

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Payment state of a sale or purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Completed,
    Cancelled,
}

impl PaymentStatus {
    /// Status implied by the amount paid against a grand total.
    ///
    /// A document with nothing to pay is settled from the start.
    pub fn from_amounts(grand_total: &BigDecimal, paid_amount: &BigDecimal) -> Self {
        if *grand_total <= BigDecimal::from(0) {
            PaymentStatus::Completed
        } else if *paid_amount <= BigDecimal::from(0) {
            PaymentStatus::Pending
        } else if paid_amount < grand_total {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Completed
        }
    }

    /// Sales in these states count as revenue
    pub fn is_realized(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Partial)
    }
}

/// Product as known to the books
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Current purchase cost; may be edited after sales were made
    pub cost_price: BigDecimal,
    /// Current selling price
    pub unit_price: BigDecimal,
}

impl Product {
    pub fn new(id: String, name: String, cost_price: BigDecimal, unit_price: BigDecimal) -> Self {
        Self {
            id,
            name,
            cost_price,
            unit_price,
        }
    }
}

/// Trading branch that owns sales and purchases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub name: String,
}

impl Branch {
    pub fn new(id: String, name: String) -> Self {
        Self { id, name }
    }
}

/// Line of a sale or purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    /// quantity × unit price
    pub total: BigDecimal,
    /// Product cost at the time the line was recorded
    #[serde(default)]
    pub unit_cost: Option<BigDecimal>,
}

impl LineItem {
    pub fn new(product_id: String, quantity: BigDecimal, unit_price: BigDecimal) -> Self {
        let total = &quantity * &unit_price;
        Self {
            product_id,
            quantity,
            unit_price,
            total,
            unit_cost: None,
        }
    }

    pub fn with_unit_cost(mut self, unit_cost: BigDecimal) -> Self {
        self.unit_cost = Some(unit_cost);
        self
    }
}

/// Commercial transaction with a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub invoice_no: String,
    pub branch_id: String,
    pub customer_id: Option<String>,
    pub date: NaiveDateTime,
    pub items: Vec<LineItem>,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub discount: BigDecimal,
    pub grand_total: BigDecimal,
    pub paid_amount: BigDecimal,
    pub due_amount: BigDecimal,
    pub status: PaymentStatus,
}

impl Sale {
    /// Build a sale from its lines; totals, due and status are derived
    pub fn new(
        invoice_no: String,
        branch_id: String,
        customer_id: Option<String>,
        date: NaiveDateTime,
        items: Vec<LineItem>,
    ) -> Self {
        let subtotal: BigDecimal = items.iter().map(|item| &item.total).sum();
        let status = PaymentStatus::from_amounts(&subtotal, &BigDecimal::from(0));
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            invoice_no,
            branch_id,
            customer_id,
            date,
            items,
            grand_total: subtotal.clone(),
            due_amount: subtotal.clone(),
            subtotal,
            tax: BigDecimal::from(0),
            discount: BigDecimal::from(0),
            paid_amount: BigDecimal::from(0),
            status,
        }
    }

    /// Apply tax and discount and recompute the grand total
    pub fn with_adjustments(mut self, tax: BigDecimal, discount: BigDecimal) -> Self {
        self.tax = tax;
        self.discount = discount;
        self.grand_total = &self.subtotal + &self.tax - &self.discount;
        self.due_amount = &self.grand_total - &self.paid_amount;
        self.status = PaymentStatus::from_amounts(&self.grand_total, &self.paid_amount);
        self
    }

    /// Record an up-front payment
    pub fn with_paid(mut self, paid_amount: BigDecimal) -> Self {
        self.paid_amount = paid_amount;
        self.due_amount = &self.grand_total - &self.paid_amount;
        self.status = PaymentStatus::from_amounts(&self.grand_total, &self.paid_amount);
        self
    }

    pub fn business_date(&self) -> NaiveDate {
        self.date.date()
    }

    /// Apply a later payment; returns the new status
    pub fn apply_payment(&mut self, amount: &BigDecimal) -> LedgerResult<PaymentStatus> {
        let (paid, due, status) = settle(
            &self.invoice_no,
            self.status,
            &self.grand_total,
            &self.paid_amount,
            amount,
        )?;
        self.paid_amount = paid;
        self.due_amount = due;
        self.status = status;
        Ok(status)
    }

    /// Cancel the sale; returns the due amount that was outstanding
    pub fn cancel(&mut self) -> LedgerResult<BigDecimal> {
        cancel(&self.invoice_no, &mut self.status, &mut self.due_amount)
    }
}

/// Commercial transaction with a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub invoice_no: String,
    pub branch_id: String,
    pub supplier_id: Option<String>,
    pub date: NaiveDateTime,
    pub items: Vec<LineItem>,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub discount: BigDecimal,
    pub grand_total: BigDecimal,
    pub paid_amount: BigDecimal,
    pub due_amount: BigDecimal,
    pub status: PaymentStatus,
}

impl Purchase {
    pub fn new(
        invoice_no: String,
        branch_id: String,
        supplier_id: Option<String>,
        date: NaiveDateTime,
        items: Vec<LineItem>,
    ) -> Self {
        let subtotal: BigDecimal = items.iter().map(|item| &item.total).sum();
        let status = PaymentStatus::from_amounts(&subtotal, &BigDecimal::from(0));
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            invoice_no,
            branch_id,
            supplier_id,
            date,
            items,
            grand_total: subtotal.clone(),
            due_amount: subtotal.clone(),
            subtotal,
            tax: BigDecimal::from(0),
            discount: BigDecimal::from(0),
            paid_amount: BigDecimal::from(0),
            status,
        }
    }

    pub fn with_adjustments(mut self, tax: BigDecimal, discount: BigDecimal) -> Self {
        self.tax = tax;
        self.discount = discount;
        self.grand_total = &self.subtotal + &self.tax - &self.discount;
        self.due_amount = &self.grand_total - &self.paid_amount;
        self.status = PaymentStatus::from_amounts(&self.grand_total, &self.paid_amount);
        self
    }

    pub fn with_paid(mut self, paid_amount: BigDecimal) -> Self {
        self.paid_amount = paid_amount;
        self.due_amount = &self.grand_total - &self.paid_amount;
        self.status = PaymentStatus::from_amounts(&self.grand_total, &self.paid_amount);
        self
    }

    pub fn business_date(&self) -> NaiveDate {
        self.date.date()
    }

    pub fn apply_payment(&mut self, amount: &BigDecimal) -> LedgerResult<PaymentStatus> {
        let (paid, due, status) = settle(
            &self.invoice_no,
            self.status,
            &self.grand_total,
            &self.paid_amount,
            amount,
        )?;
        self.paid_amount = paid;
        self.due_amount = due;
        self.status = status;
        Ok(status)
    }

    pub fn cancel(&mut self) -> LedgerResult<BigDecimal> {
        cancel(&self.invoice_no, &mut self.status, &mut self.due_amount)
    }
}

fn settle(
    invoice_no: &str,
    status: PaymentStatus,
    grand_total: &BigDecimal,
    paid_amount: &BigDecimal,
    amount: &BigDecimal,
) -> LedgerResult<(BigDecimal, BigDecimal, PaymentStatus)> {
    if status == PaymentStatus::Cancelled {
        return Err(LedgerError::Validation(format!(
            "Invoice '{}' is cancelled and cannot take payments",
            invoice_no
        )));
    }

    if *amount <= BigDecimal::from(0) {
        return Err(LedgerError::Validation(
            "Payment amount must be positive".to_string(),
        ));
    }

    let due = grand_total - paid_amount;
    if *amount > due {
        return Err(LedgerError::Validation(format!(
            "Payment of {} exceeds the {} due on invoice '{}'",
            amount, due, invoice_no
        )));
    }

    let paid = paid_amount + amount;
    let due = grand_total - &paid;
    let status = PaymentStatus::from_amounts(grand_total, &paid);
    Ok((paid, due, status))
}

fn cancel(
    invoice_no: &str,
    status: &mut PaymentStatus,
    due_amount: &mut BigDecimal,
) -> LedgerResult<BigDecimal> {
    if *status == PaymentStatus::Cancelled {
        return Err(LedgerError::Validation(format!(
            "Invoice '{}' is already cancelled",
            invoice_no
        )));
    }

    let outstanding = std::mem::replace(due_amount, BigDecimal::from(0));
    *status = PaymentStatus::Cancelled;
    Ok(outstanding)
}
