//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::commerce::{Branch, Counterparty, Product, Purchase, Sale};
use crate::types::*;

/// Storage abstraction for the chart of accounts and the journal
///
/// Implementations must apply balance changes as increments on the stored value,
/// never as read-then-overwrite, so concurrent postings against one account
/// cannot lose updates.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Save a new account
    async fn save_account(&mut self, account: &AccountHead) -> LedgerResult<()>;

    /// Get an account by ID
    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<AccountHead>>;

    /// Get an account by its unique code
    async fn get_account_by_code(&self, code: &str) -> LedgerResult<Option<AccountHead>>;

    /// List all accounts, optionally filtered by type
    async fn list_accounts(
        &self,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<AccountHead>>;

    /// Replace the descriptive fields of an account. Balances are left untouched.
    async fn update_account(&mut self, account: &AccountHead) -> LedgerResult<()>;

    /// Delete an account
    async fn delete_account(&mut self, account_id: &str) -> LedgerResult<()>;

    /// Append a movement and apply both balance deltas as one unit.
    ///
    /// Either the movement is stored and both balances change, or nothing changes.
    /// A movement whose `reversal_of` is already claimed by a stored movement must be
    /// rejected with `Validation` in the same unit. Returns the updated debit and
    /// credit accounts.
    async fn post_movement(
        &mut self,
        movement: &LedgerMovement,
        debit_delta: &BigDecimal,
        credit_delta: &BigDecimal,
    ) -> LedgerResult<(AccountHead, AccountHead)>;

    /// Get a movement by ID
    async fn get_movement(&self, movement_id: &str) -> LedgerResult<Option<LedgerMovement>>;

    /// List movements matching a filter, ordered by entry date then creation time
    async fn list_movements(&self, filter: &MovementFilter) -> LedgerResult<Vec<LedgerMovement>>;
}

/// Storage abstraction for branches, products, sales, purchases and counterparties
#[async_trait]
pub trait CommerceStorage: Send + Sync {
    async fn save_branch(&mut self, branch: &Branch) -> LedgerResult<()>;

    async fn get_branch(&self, branch_id: &str) -> LedgerResult<Option<Branch>>;

    async fn save_product(&mut self, product: &Product) -> LedgerResult<()>;

    async fn get_product(&self, product_id: &str) -> LedgerResult<Option<Product>>;

    async fn update_product(&mut self, product: &Product) -> LedgerResult<()>;

    async fn save_sale(&mut self, sale: &Sale) -> LedgerResult<()>;

    async fn get_sale(&self, sale_id: &str) -> LedgerResult<Option<Sale>>;

    async fn update_sale(&mut self, sale: &Sale) -> LedgerResult<()>;

    /// Sales of a branch whose business date falls in `[start_date, end_date]`
    async fn list_sales(
        &self,
        branch_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<Vec<Sale>>;

    async fn save_purchase(&mut self, purchase: &Purchase) -> LedgerResult<()>;

    async fn get_purchase(&self, purchase_id: &str) -> LedgerResult<Option<Purchase>>;

    async fn update_purchase(&mut self, purchase: &Purchase) -> LedgerResult<()>;

    /// Purchases of a branch whose business date falls in `[start_date, end_date]`
    async fn list_purchases(
        &self,
        branch_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<Vec<Purchase>>;

    async fn save_counterparty(&mut self, counterparty: &Counterparty) -> LedgerResult<()>;

    async fn get_counterparty(&self, counterparty_id: &str) -> LedgerResult<Option<Counterparty>>;

    /// Atomically add `delta` to a counterparty balance
    async fn apply_counterparty_delta(
        &mut self,
        counterparty_id: &str,
        delta: &BigDecimal,
    ) -> LedgerResult<Counterparty>;
}

/// Trait for implementing custom account validation rules
pub trait AccountValidator: Send + Sync {
    /// Validate an account before saving
    fn validate_account(&self, account: &AccountHead) -> LedgerResult<()>;
}

/// Trait for implementing custom journal entry validation rules
pub trait TransactionValidator: Send + Sync {
    /// Validate a journal entry before posting
    fn validate_entry(&self, request: &JournalEntryRequest) -> LedgerResult<()>;
}

/// Default account validator with basic rules
pub struct DefaultAccountValidator;

impl AccountValidator for DefaultAccountValidator {
    fn validate_account(&self, account: &AccountHead) -> LedgerResult<()> {
        if account.code.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Account code cannot be empty".to_string(),
            ));
        }

        if account.name.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Account name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Default validator with the double-entry rules only
pub struct DefaultTransactionValidator;

impl TransactionValidator for DefaultTransactionValidator {
    fn validate_entry(&self, request: &JournalEntryRequest) -> LedgerResult<()> {
        request.validate()
    }
}

/// Trait for navigating a hierarchical chart of accounts
#[async_trait]
pub trait ChartOfAccounts: Send + Sync {
    /// Get the full chart of accounts, ordered by code
    async fn get_chart(&self) -> LedgerResult<Vec<AccountHead>>;

    /// Get all direct child accounts of a parent account
    async fn get_child_accounts(&self, parent_id: &str) -> LedgerResult<Vec<AccountHead>>;

    /// Get the path from the root to an account (for hierarchical display)
    async fn get_account_path(&self, account_id: &str) -> LedgerResult<Vec<AccountHead>>;
}

/// Source of "today" for reports that are relative to the current date
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Clock backed by the system time in UTC
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Utc::now().date_naive()
    }
}

/// Clock pinned to one date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
