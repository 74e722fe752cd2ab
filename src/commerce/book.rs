//! Recording sales and purchases and keeping counterparty balances in step

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::commerce::{
    Branch, Counterparty, CounterpartyKind, LineItem, Product, Purchase, Sale,
};
use crate::traits::*;
use crate::types::*;

/// Line of a document draft. The unit price defaults to the product's
/// selling price on sales and its cost price on purchases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDraft {
    pub product_id: String,
    pub quantity: BigDecimal,
    #[serde(default)]
    pub unit_price: Option<BigDecimal>,
}

impl LineDraft {
    pub fn new(product_id: impl Into<String>, quantity: BigDecimal) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price: None,
        }
    }

    pub fn at(mut self, unit_price: BigDecimal) -> Self {
        self.unit_price = Some(unit_price);
        self
    }
}

/// Input for recording a sale or a purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    pub invoice_no: String,
    pub branch_id: String,
    #[serde(default)]
    pub counterparty_id: Option<String>,
    pub date: NaiveDateTime,
    pub lines: Vec<LineDraft>,
    #[serde(default = "zero")]
    pub tax: BigDecimal,
    #[serde(default = "zero")]
    pub discount: BigDecimal,
    #[serde(default = "zero")]
    pub paid_amount: BigDecimal,
}

fn zero() -> BigDecimal {
    BigDecimal::from(0)
}

impl DocumentDraft {
    pub fn new(
        invoice_no: impl Into<String>,
        branch_id: impl Into<String>,
        date: NaiveDateTime,
        lines: Vec<LineDraft>,
    ) -> Self {
        Self {
            invoice_no: invoice_no.into(),
            branch_id: branch_id.into(),
            counterparty_id: None,
            date,
            lines,
            tax: zero(),
            discount: zero(),
            paid_amount: zero(),
        }
    }

    pub fn counterparty(mut self, counterparty_id: impl Into<String>) -> Self {
        self.counterparty_id = Some(counterparty_id.into());
        self
    }

    pub fn adjustments(mut self, tax: BigDecimal, discount: BigDecimal) -> Self {
        self.tax = tax;
        self.discount = discount;
        self
    }

    pub fn paid(mut self, paid_amount: BigDecimal) -> Self {
        self.paid_amount = paid_amount;
        self
    }
}

/// Sales, purchases, products and counterparties over a commerce store
pub struct CommerceBook<S: CommerceStorage> {
    storage: S,
}

impl<S: CommerceStorage> CommerceBook<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub async fn register_branch(&mut self, id: String, name: String) -> LedgerResult<Branch> {
        if id.trim().is_empty() || name.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Branch id and name are required".to_string(),
            ));
        }
        let branch = Branch::new(id, name);
        self.storage.save_branch(&branch).await?;
        Ok(branch)
    }

    pub async fn register_product(&mut self, product: Product) -> LedgerResult<Product> {
        if product.id.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Product id cannot be empty".to_string(),
            ));
        }
        if product.cost_price < zero() || product.unit_price < zero() {
            return Err(LedgerError::Validation(format!(
                "Product '{}' cannot have negative prices",
                product.id
            )));
        }
        self.storage.save_product(&product).await?;
        Ok(product)
    }

    /// Change a product's current cost price. Past sales are not touched.
    pub async fn update_cost_price(
        &mut self,
        product_id: &str,
        cost_price: BigDecimal,
    ) -> LedgerResult<Product> {
        if cost_price < zero() {
            return Err(LedgerError::Validation(
                "Cost price cannot be negative".to_string(),
            ));
        }
        let mut product = self.product_required(product_id).await?;
        product.cost_price = cost_price;
        self.storage.update_product(&product).await?;
        Ok(product)
    }

    pub async fn register_counterparty(
        &mut self,
        counterparty: Counterparty,
    ) -> LedgerResult<Counterparty> {
        if counterparty.id.trim().is_empty() || counterparty.name.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Counterparty id and name are required".to_string(),
            ));
        }
        self.storage.save_counterparty(&counterparty).await?;
        Ok(counterparty)
    }

    pub async fn get_counterparty(&self, counterparty_id: &str) -> LedgerResult<Counterparty> {
        self.storage
            .get_counterparty(counterparty_id)
            .await?
            .ok_or_else(|| LedgerError::CounterpartyNotFound(counterparty_id.to_string()))
    }

    /// Record money received from a customer (or paid to a supplier) ahead of invoicing
    pub async fn record_advance(
        &mut self,
        counterparty_id: &str,
        amount: &BigDecimal,
    ) -> LedgerResult<Counterparty> {
        crate::utils::validate_positive_amount(amount)?;
        let delta = -amount.clone();
        self.storage
            .apply_counterparty_delta(counterparty_id, &delta)
            .await
    }

    /// Record a sale, snapshotting each line's unit cost
    #[instrument(skip(self, draft), fields(invoice_no = %draft.invoice_no, branch_id = %draft.branch_id))]
    pub async fn record_sale(&mut self, draft: DocumentDraft) -> LedgerResult<Sale> {
        self.check_parties(&draft, CounterpartyKind::Customer).await?;

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let product = self.validated_product(line).await?;
            let unit_price = line.unit_price.clone().unwrap_or(product.unit_price);
            items.push(
                LineItem::new(line.product_id.clone(), line.quantity.clone(), unit_price)
                    .with_unit_cost(product.cost_price),
            );
        }

        let sale = Sale::new(
            draft.invoice_no,
            draft.branch_id,
            draft.counterparty_id,
            draft.date,
            items,
        )
        .with_adjustments(draft.tax, draft.discount)
        .with_paid(draft.paid_amount);
        check_totals(&sale.invoice_no, &sale.grand_total, &sale.discount, &sale.paid_amount)?;

        self.storage.save_sale(&sale).await?;
        if let Some(ref customer_id) = sale.customer_id {
            self.storage
                .apply_counterparty_delta(customer_id, &sale.due_amount)
                .await?;
        }

        info!(
            sale_id = %sale.id,
            grand_total = %sale.grand_total,
            due = %sale.due_amount,
            "Sale recorded"
        );
        Ok(sale)
    }

    pub async fn get_sale(&self, sale_id: &str) -> LedgerResult<Sale> {
        self.storage
            .get_sale(sale_id)
            .await?
            .ok_or_else(|| LedgerError::DocumentNotFound(sale_id.to_string()))
    }

    /// Apply a customer payment to a sale
    #[instrument(skip(self))]
    pub async fn receive_sale_payment(
        &mut self,
        sale_id: &str,
        amount: &BigDecimal,
    ) -> LedgerResult<Sale> {
        let mut sale = self.get_sale(sale_id).await?;
        let status = sale.apply_payment(amount)?;
        self.storage.update_sale(&sale).await?;
        if let Some(ref customer_id) = sale.customer_id {
            let delta = -amount.clone();
            self.storage
                .apply_counterparty_delta(customer_id, &delta)
                .await?;
        }
        debug!(?status, due = %sale.due_amount, "Sale payment applied");
        Ok(sale)
    }

    /// Cancel a sale and release its outstanding due from the customer
    pub async fn cancel_sale(&mut self, sale_id: &str) -> LedgerResult<Sale> {
        let mut sale = self.get_sale(sale_id).await?;
        let outstanding = sale.cancel()?;
        self.storage.update_sale(&sale).await?;
        if let Some(ref customer_id) = sale.customer_id {
            self.storage
                .apply_counterparty_delta(customer_id, &-outstanding)
                .await?;
        }
        info!(sale_id = %sale.id, "Sale cancelled");
        Ok(sale)
    }

    /// Record a purchase; lines default to the product's cost price
    #[instrument(skip(self, draft), fields(invoice_no = %draft.invoice_no, branch_id = %draft.branch_id))]
    pub async fn record_purchase(&mut self, draft: DocumentDraft) -> LedgerResult<Purchase> {
        self.check_parties(&draft, CounterpartyKind::Supplier).await?;

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let product = self.validated_product(line).await?;
            let unit_price = line.unit_price.clone().unwrap_or(product.cost_price);
            items.push(LineItem::new(
                line.product_id.clone(),
                line.quantity.clone(),
                unit_price,
            ));
        }

        let purchase = Purchase::new(
            draft.invoice_no,
            draft.branch_id,
            draft.counterparty_id,
            draft.date,
            items,
        )
        .with_adjustments(draft.tax, draft.discount)
        .with_paid(draft.paid_amount);
        check_totals(
            &purchase.invoice_no,
            &purchase.grand_total,
            &purchase.discount,
            &purchase.paid_amount,
        )?;

        self.storage.save_purchase(&purchase).await?;
        if let Some(ref supplier_id) = purchase.supplier_id {
            self.storage
                .apply_counterparty_delta(supplier_id, &purchase.due_amount)
                .await?;
        }

        info!(
            purchase_id = %purchase.id,
            grand_total = %purchase.grand_total,
            due = %purchase.due_amount,
            "Purchase recorded"
        );
        Ok(purchase)
    }

    pub async fn get_purchase(&self, purchase_id: &str) -> LedgerResult<Purchase> {
        self.storage
            .get_purchase(purchase_id)
            .await?
            .ok_or_else(|| LedgerError::DocumentNotFound(purchase_id.to_string()))
    }

    /// Apply a payment we made against a purchase
    #[instrument(skip(self))]
    pub async fn pay_purchase(
        &mut self,
        purchase_id: &str,
        amount: &BigDecimal,
    ) -> LedgerResult<Purchase> {
        let mut purchase = self.get_purchase(purchase_id).await?;
        let status = purchase.apply_payment(amount)?;
        self.storage.update_purchase(&purchase).await?;
        if let Some(ref supplier_id) = purchase.supplier_id {
            let delta = -amount.clone();
            self.storage
                .apply_counterparty_delta(supplier_id, &delta)
                .await?;
        }
        debug!(?status, due = %purchase.due_amount, "Purchase payment applied");
        Ok(purchase)
    }

    pub async fn cancel_purchase(&mut self, purchase_id: &str) -> LedgerResult<Purchase> {
        let mut purchase = self.get_purchase(purchase_id).await?;
        let outstanding = purchase.cancel()?;
        self.storage.update_purchase(&purchase).await?;
        if let Some(ref supplier_id) = purchase.supplier_id {
            self.storage
                .apply_counterparty_delta(supplier_id, &-outstanding)
                .await?;
        }
        info!(purchase_id = %purchase.id, "Purchase cancelled");
        Ok(purchase)
    }

    async fn product_required(&self, product_id: &str) -> LedgerResult<Product> {
        self.storage
            .get_product(product_id)
            .await?
            .ok_or_else(|| LedgerError::ProductNotFound(product_id.to_string()))
    }

    async fn validated_product(&self, line: &LineDraft) -> LedgerResult<Product> {
        if line.quantity <= zero() {
            return Err(LedgerError::Validation(format!(
                "Quantity for product '{}' must be positive",
                line.product_id
            )));
        }
        if let Some(ref price) = line.unit_price {
            if *price < zero() {
                return Err(LedgerError::Validation(format!(
                    "Unit price for product '{}' cannot be negative",
                    line.product_id
                )));
            }
        }
        self.product_required(&line.product_id).await
    }

    async fn check_parties(
        &self,
        draft: &DocumentDraft,
        expected: CounterpartyKind,
    ) -> LedgerResult<()> {
        if draft.invoice_no.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Invoice number cannot be empty".to_string(),
            ));
        }
        if draft.lines.is_empty() {
            return Err(LedgerError::Validation(format!(
                "Invoice '{}' has no lines",
                draft.invoice_no
            )));
        }
        if draft.tax < zero() || draft.discount < zero() || draft.paid_amount < zero() {
            return Err(LedgerError::Validation(format!(
                "Invoice '{}' has a negative tax, discount, or paid amount",
                draft.invoice_no
            )));
        }
        if self.storage.get_branch(&draft.branch_id).await?.is_none() {
            return Err(LedgerError::BranchNotFound(draft.branch_id.clone()));
        }
        if let Some(ref counterparty_id) = draft.counterparty_id {
            let counterparty = self.get_counterparty(counterparty_id).await?;
            if counterparty.kind != expected {
                return Err(LedgerError::Validation(format!(
                    "Counterparty '{}' is not a {:?}",
                    counterparty_id, expected
                )));
            }
        }
        Ok(())
    }
}

fn check_totals(
    invoice_no: &str,
    grand_total: &BigDecimal,
    discount: &BigDecimal,
    paid_amount: &BigDecimal,
) -> LedgerResult<()> {
    if *grand_total < zero() {
        return Err(LedgerError::Validation(format!(
            "Discount of {} takes invoice '{}' below zero",
            discount, invoice_no
        )));
    }
    if paid_amount > grand_total {
        return Err(LedgerError::Validation(format!(
            "Paid amount {} exceeds the total {} of invoice '{}'",
            paid_amount, grand_total, invoice_no
        )));
    }
    Ok(())
}
