//! Journal entry posting

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::ledger::AccountManager;
use crate::traits::*;
use crate::types::*;

/// Validates journal entries and commits them as balanced movements
pub struct JournalPoster<S: LedgerStorage> {
    accounts: AccountManager<S>,
    validator: Box<dyn TransactionValidator>,
}

impl<S: LedgerStorage> JournalPoster<S> {
    /// Create a new poster
    pub fn new(storage: S) -> Self {
        Self::with_validator(storage, Box::new(DefaultTransactionValidator))
    }

    /// Create a new poster with a custom validator
    pub fn with_validator(storage: S, validator: Box<dyn TransactionValidator>) -> Self {
        Self {
            accounts: AccountManager::new(storage),
            validator,
        }
    }

    /// Validate and commit a journal entry.
    ///
    /// Both accounts must exist and differ, and the debit and credit amounts must be
    /// equal and positive. The movement and both balance updates are stored as one unit.
    #[instrument(
        skip(self, request),
        fields(
            debit = %request.debit_account_id,
            credit = %request.credit_account_id,
            amount = %request.debit_amount,
        )
    )]
    pub async fn post_entry(&mut self, request: JournalEntryRequest) -> LedgerResult<PostedEntry> {
        if let Err(error) = self.validator.validate_entry(&request) {
            warn!(%error, "Journal entry rejected");
            return Err(error);
        }

        let movement = LedgerMovement::from_request(request);
        self.commit(movement).await
    }

    /// Post the offsetting entry for an existing movement.
    ///
    /// The accounts are swapped, the voucher type is Adjustment and the original
    /// voucher number becomes the reference. A movement can be reversed only once.
    #[instrument(skip(self, narration))]
    pub async fn reverse_entry(
        &mut self,
        movement_id: &str,
        entry_date: NaiveDate,
        narration: Option<String>,
    ) -> LedgerResult<PostedEntry> {
        let original = self.get_movement_required(movement_id).await?;

        if entry_date < original.entry_date {
            return Err(LedgerError::Validation(format!(
                "Reversal of '{}' cannot be dated before the original entry",
                original.voucher_no
            )));
        }

        // Storage repeats this check atomically when the reversal is committed
        let already_reversed = self
            .accounts
            .storage
            .list_movements(&MovementFilter::for_account(&original.debit_account_id))
            .await?
            .iter()
            .any(|m| m.reversal_of.as_deref() == Some(movement_id));
        if already_reversed {
            return Err(LedgerError::Validation(format!(
                "Movement '{}' has already been reversed",
                original.voucher_no
            )));
        }

        let mut request = JournalEntryRequest::new(
            entry_date,
            VoucherType::Adjustment,
            original.credit_account_id.clone(),
            original.debit_account_id.clone(),
            original.amount().clone(),
        )
        .narrations(narration.clone(), narration)
        .reference(original.voucher_no.clone());
        request.source = original.source.clone();
        request.branch_id = original.branch_id.clone();
        self.validator.validate_entry(&request)?;

        let mut movement = LedgerMovement::from_request(request);
        movement.reversal_of = Some(original.id);
        self.commit(movement).await
    }

    async fn commit(&mut self, movement: LedgerMovement) -> LedgerResult<PostedEntry> {
        let (debit_account, credit_account) = self.accounts.apply_movement(&movement).await?;

        info!(
            movement_id = %movement.id,
            voucher_no = %movement.voucher_no,
            debit_balance = %debit_account.current_balance,
            credit_balance = %credit_account.current_balance,
            "Journal entry posted"
        );

        Ok(PostedEntry {
            movement,
            debit_account,
            credit_account,
        })
    }

    /// Get a movement by ID
    pub async fn get_movement(&self, movement_id: &str) -> LedgerResult<Option<LedgerMovement>> {
        self.accounts.storage.get_movement(movement_id).await
    }

    /// Get a movement by ID, returning an error if not found
    pub async fn get_movement_required(&self, movement_id: &str) -> LedgerResult<LedgerMovement> {
        self.accounts
            .storage
            .get_movement(movement_id)
            .await?
            .ok_or_else(|| LedgerError::MovementNotFound(movement_id.to_string()))
    }

    /// List movements matching a filter
    pub async fn list_movements(&self, filter: &MovementFilter) -> LedgerResult<Vec<LedgerMovement>> {
        self.accounts.storage.list_movements(filter).await
    }
}

/// Common posting patterns for business events
pub mod patterns {
    use super::*;
    use crate::commerce::{Purchase, Sale};

    /// Sale invoice: debit cash or receivables, credit sales revenue
    pub fn sale_entry(
        sale: &Sale,
        cash_or_receivables_account_id: String,
        revenue_account_id: String,
    ) -> LedgerResult<JournalEntryRequest> {
        let request = JournalEntryRequest::new(
            sale.business_date(),
            VoucherType::Journal,
            cash_or_receivables_account_id,
            revenue_account_id,
            sale.grand_total.clone(),
        )
        .narrations(
            Some(format!("Sale invoice {}", sale.invoice_no)),
            Some("Sales revenue".to_string()),
        )
        .reference(sale.invoice_no.clone())
        .source(SourceDocument::Sale(sale.id.clone()))
        .branch(sale.branch_id.clone());
        request.validate()?;
        Ok(request)
    }

    /// Purchase invoice: debit inventory, credit cash or payables
    pub fn purchase_entry(
        purchase: &Purchase,
        inventory_account_id: String,
        cash_or_payables_account_id: String,
    ) -> LedgerResult<JournalEntryRequest> {
        let request = JournalEntryRequest::new(
            purchase.business_date(),
            VoucherType::Journal,
            inventory_account_id,
            cash_or_payables_account_id,
            purchase.grand_total.clone(),
        )
        .narrations(
            Some("Stock received".to_string()),
            Some(format!("Purchase invoice {}", purchase.invoice_no)),
        )
        .reference(purchase.invoice_no.clone())
        .source(SourceDocument::Purchase(purchase.id.clone()))
        .branch(purchase.branch_id.clone());
        request.validate()?;
        Ok(request)
    }

    /// Money received from a customer against a sale: debit cash, credit receivables
    pub fn customer_receipt(
        sale: &Sale,
        date: NaiveDate,
        cash_account_id: String,
        receivables_account_id: String,
        amount: BigDecimal,
    ) -> LedgerResult<JournalEntryRequest> {
        let request = JournalEntryRequest::new(
            date,
            VoucherType::Receipt,
            cash_account_id,
            receivables_account_id,
            amount,
        )
        .narrations(
            Some(format!("Received against {}", sale.invoice_no)),
            None,
        )
        .source(SourceDocument::Sale(sale.id.clone()))
        .branch(sale.branch_id.clone());
        request.validate()?;
        Ok(request)
    }

    /// Payment to a supplier against a purchase: debit payables, credit cash
    pub fn supplier_payment(
        purchase: &Purchase,
        date: NaiveDate,
        payables_account_id: String,
        cash_account_id: String,
        amount: BigDecimal,
    ) -> LedgerResult<JournalEntryRequest> {
        let request = JournalEntryRequest::new(
            date,
            VoucherType::Payment,
            payables_account_id,
            cash_account_id,
            amount,
        )
        .narrations(
            None,
            Some(format!("Paid against {}", purchase.invoice_no)),
        )
        .source(SourceDocument::Purchase(purchase.id.clone()))
        .branch(purchase.branch_id.clone());
        request.validate()?;
        Ok(request)
    }

    /// Operating expense paid from cash: debit expense, credit cash
    pub fn expense_payment(
        date: NaiveDate,
        branch_id: String,
        expense_account_id: String,
        cash_account_id: String,
        amount: BigDecimal,
        narration: String,
    ) -> LedgerResult<JournalEntryRequest> {
        let request = JournalEntryRequest::new(
            date,
            VoucherType::Payment,
            expense_account_id,
            cash_account_id,
            amount,
        )
        .narrations(Some(narration), None)
        .branch(branch_id);
        request.validate()?;
        Ok(request)
    }

    /// Miscellaneous income received: debit cash, credit an income head
    pub fn other_income_receipt(
        date: NaiveDate,
        branch_id: String,
        cash_account_id: String,
        income_account_id: String,
        amount: BigDecimal,
        narration: String,
    ) -> LedgerResult<JournalEntryRequest> {
        let request = JournalEntryRequest::new(
            date,
            VoucherType::Receipt,
            cash_account_id,
            income_account_id,
            amount,
        )
        .narrations(None, Some(narration))
        .branch(branch_id);
        request.validate()?;
        Ok(request)
    }

    /// Cash deposited to or withdrawn from the bank
    pub fn contra_transfer(
        date: NaiveDate,
        to_account_id: String,
        from_account_id: String,
        amount: BigDecimal,
    ) -> LedgerResult<JournalEntryRequest> {
        let request = JournalEntryRequest::new(
            date,
            VoucherType::Contra,
            to_account_id,
            from_account_id,
            amount,
        );
        request.validate()?;
        Ok(request)
    }

    /// Owner investment: debit cash, credit capital
    pub fn owner_investment(
        date: NaiveDate,
        cash_account_id: String,
        capital_account_id: String,
        amount: BigDecimal,
    ) -> LedgerResult<JournalEntryRequest> {
        let request = JournalEntryRequest::new(
            date,
            VoucherType::Receipt,
            cash_account_id,
            capital_account_id,
            amount,
        )
        .narrations(
            Some("Cash invested by owner".to_string()),
            Some("Owner's capital contribution".to_string()),
        );
        request.validate()?;
        Ok(request)
    }
}
