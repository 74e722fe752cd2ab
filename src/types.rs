//! Core types and data structures for the accounting system

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Account types following standard accounting principles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Assets - what the business owns (Cash, Inventory, Equipment, etc.)
    Asset,
    /// Liabilities - what the business owes (Loans, Accounts Payable, etc.)
    Liability,
    /// Equity - owner's interest in the business (Capital, Retained Earnings, etc.)
    Equity,
    /// Income/Revenue - money earned by the business
    Income,
    /// Expenses - costs incurred by the business
    Expense,
}

impl AccountType {
    /// Returns the normal balance side for this account type
    /// Assets and Expenses normally have debit balances
    /// Liabilities, Equity, and Income normally have credit balances
    pub fn normal_balance(&self) -> BalanceSide {
        match self {
            AccountType::Asset | AccountType::Expense => BalanceSide::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Income => {
                BalanceSide::Credit
            }
        }
    }
}

/// Sides of a double-entry movement, also used as an account's balance type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalanceSide {
    /// Debit side - increases debit-normal accounts (Assets, Expenses)
    Debit,
    /// Credit side - increases credit-normal accounts (Liabilities, Equity, Income)
    Credit,
}

impl BalanceSide {
    pub fn opposite(&self) -> BalanceSide {
        match self {
            BalanceSide::Debit => BalanceSide::Credit,
            BalanceSide::Credit => BalanceSide::Debit,
        }
    }
}

/// A node in the chart of accounts with its running balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountHead {
    /// Storage identifier
    pub id: String,
    /// Unique short code (e.g. "1010")
    pub code: String,
    /// Human-readable account name
    pub name: String,
    /// Type of account (Asset, Liability, etc.)
    pub account_type: AccountType,
    /// Free-form grouping
    pub category: Option<String>,
    pub sub_category: Option<String>,
    /// Side on which the balance grows; fixed at creation
    pub balance_type: BalanceSide,
    /// Balance carried in when the account was opened; fixed at creation
    pub opening_balance: BigDecimal,
    /// Running total: opening balance plus every signed movement posted against the account
    pub current_balance: BigDecimal,
    /// System accounts cannot be deleted
    pub is_system: bool,
    /// Optional parent account for hierarchical chart of accounts
    pub parent_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl AccountHead {
    /// Create a new account on the normal balance side of its type
    pub fn new(code: String, name: String, account_type: AccountType) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            code,
            name,
            account_type,
            category: None,
            sub_category: None,
            balance_type: account_type.normal_balance(),
            opening_balance: BigDecimal::from(0),
            current_balance: BigDecimal::from(0),
            is_system: false,
            parent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_sub_category(mut self, sub_category: impl Into<String>) -> Self {
        self.sub_category = Some(sub_category.into());
        self
    }

    /// Override the balance side, for contra accounts such as accumulated depreciation
    pub fn with_balance_type(mut self, balance_type: BalanceSide) -> Self {
        self.balance_type = balance_type;
        self
    }

    /// Set the opening balance; the current balance starts from it
    pub fn with_opening_balance(mut self, opening_balance: BigDecimal) -> Self {
        self.current_balance = opening_balance.clone();
        self.opening_balance = opening_balance;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    /// Signed effect of a movement on this account's balance
    pub fn signed_delta(&self, side: BalanceSide, amount: &BigDecimal) -> BigDecimal {
        if side == self.balance_type {
            amount.clone()
        } else {
            -amount.clone()
        }
    }

    /// Add an already signed delta to the running balance
    pub fn apply_delta(&mut self, delta: &BigDecimal) {
        self.current_balance += delta;
        self.updated_at = chrono::Utc::now().naive_utc();
    }
}

/// Voucher classification of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherType {
    Journal,
    Payment,
    Receipt,
    Contra,
    Adjustment,
}

impl VoucherType {
    /// Prefix used when numbering vouchers
    pub fn prefix(&self) -> &'static str {
        match self {
            VoucherType::Journal => "JV",
            VoucherType::Payment => "PV",
            VoucherType::Receipt => "RV",
            VoucherType::Contra => "CV",
            VoucherType::Adjustment => "AV",
        }
    }
}

/// Commercial document a movement was derived from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum SourceDocument {
    Sale(String),
    Purchase(String),
}

/// Proposed journal entry, as submitted by a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntryRequest {
    pub entry_date: NaiveDate,
    pub voucher_type: VoucherType,
    pub debit_account_id: String,
    pub debit_amount: BigDecimal,
    pub credit_account_id: String,
    pub credit_amount: BigDecimal,
    #[serde(default)]
    pub debit_narration: Option<String>,
    #[serde(default)]
    pub credit_narration: Option<String>,
    #[serde(default)]
    pub reference_no: Option<String>,
    #[serde(default)]
    pub source: Option<SourceDocument>,
    #[serde(default)]
    pub branch_id: Option<String>,
}

impl JournalEntryRequest {
    /// Create a balanced request moving `amount` from the credit account to the debit account
    pub fn new(
        entry_date: NaiveDate,
        voucher_type: VoucherType,
        debit_account_id: String,
        credit_account_id: String,
        amount: BigDecimal,
    ) -> Self {
        Self {
            entry_date,
            voucher_type,
            debit_account_id,
            debit_amount: amount.clone(),
            credit_account_id,
            credit_amount: amount,
            debit_narration: None,
            credit_narration: None,
            reference_no: None,
            source: None,
            branch_id: None,
        }
    }

    pub fn narrations(mut self, debit: Option<String>, credit: Option<String>) -> Self {
        self.debit_narration = debit;
        self.credit_narration = credit;
        self
    }

    pub fn reference(mut self, reference_no: impl Into<String>) -> Self {
        self.reference_no = Some(reference_no.into());
        self
    }

    pub fn source(mut self, source: SourceDocument) -> Self {
        self.source = Some(source);
        self
    }

    pub fn branch(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = Some(branch_id.into());
        self
    }

    /// Structural double-entry checks that need no storage access
    pub fn validate(&self) -> LedgerResult<()> {
        if self.debit_account_id.trim().is_empty() || self.credit_account_id.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Debit and credit accounts are required".to_string(),
            ));
        }

        if self.debit_account_id == self.credit_account_id {
            return Err(LedgerError::Validation(
                "Debit and credit accounts must differ".to_string(),
            ));
        }

        if self.debit_amount != self.credit_amount {
            return Err(LedgerError::Validation(format!(
                "Journal entry is not balanced: debit = {}, credit = {}",
                self.debit_amount, self.credit_amount
            )));
        }

        if self.debit_amount <= BigDecimal::from(0) {
            return Err(LedgerError::Validation(
                "Entry amount must be positive".to_string(),
            ));
        }

        crate::utils::validate_narration(self.debit_narration.as_deref())?;
        crate::utils::validate_narration(self.credit_narration.as_deref())?;

        Ok(())
    }
}

/// One committed double-entry transaction. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerMovement {
    pub id: String,
    pub voucher_no: String,
    pub entry_date: NaiveDate,
    pub voucher_type: VoucherType,
    pub debit_account_id: String,
    pub debit_amount: BigDecimal,
    pub credit_account_id: String,
    pub credit_amount: BigDecimal,
    pub debit_narration: Option<String>,
    pub credit_narration: Option<String>,
    pub reference_no: Option<String>,
    pub source: Option<SourceDocument>,
    pub branch_id: Option<String>,
    /// Movement this entry offsets, when it is a reversal
    pub reversal_of: Option<String>,
    pub created_at: NaiveDateTime,
}

impl LedgerMovement {
    /// Build the movement for a request that has already been validated
    pub fn from_request(request: JournalEntryRequest) -> Self {
        let id = uuid::Uuid::new_v4();
        let short = id.simple().to_string()[..8].to_uppercase();
        Self {
            id: id.to_string(),
            voucher_no: format!("{}-{}", request.voucher_type.prefix(), short),
            entry_date: request.entry_date,
            voucher_type: request.voucher_type,
            debit_account_id: request.debit_account_id,
            debit_amount: request.debit_amount,
            credit_account_id: request.credit_account_id,
            credit_amount: request.credit_amount,
            debit_narration: request.debit_narration,
            credit_narration: request.credit_narration,
            reference_no: request.reference_no,
            source: request.source,
            branch_id: request.branch_id,
            reversal_of: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Amount moved by this entry
    pub fn amount(&self) -> &BigDecimal {
        &self.debit_amount
    }

    /// Side on which this movement touches `account_id`, if at all
    pub fn side_for(&self, account_id: &str) -> Option<BalanceSide> {
        if self.debit_account_id == account_id {
            Some(BalanceSide::Debit)
        } else if self.credit_account_id == account_id {
            Some(BalanceSide::Credit)
        } else {
            None
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.debit_amount == self.credit_amount
            && self.debit_amount > BigDecimal::from(0)
            && self.debit_account_id != self.credit_account_id
    }
}

/// Result of a successful posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostedEntry {
    pub movement: LedgerMovement,
    pub debit_account: AccountHead,
    pub credit_account: AccountHead,
}

/// Filter for listing movements; every field is optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovementFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub account_id: Option<String>,
    pub branch_id: Option<String>,
}

impl MovementFilter {
    pub fn between(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
            ..Self::default()
        }
    }

    pub fn for_account(account_id: impl Into<String>) -> Self {
        Self {
            account_id: Some(account_id.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, movement: &LedgerMovement) -> bool {
        if let Some(start) = self.start_date {
            if movement.entry_date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if movement.entry_date > end {
                return false;
            }
        }
        if let Some(ref account_id) = self.account_id {
            if movement.side_for(account_id).is_none() {
                return false;
            }
        }
        if let Some(ref branch_id) = self.branch_id {
            if movement.branch_id.as_deref() != Some(branch_id.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Stored balance compared with the balance recomputed from the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceReconciliation {
    pub account_id: String,
    pub opening_balance: BigDecimal,
    pub movements_total: BigDecimal,
    pub expected_balance: BigDecimal,
    pub current_balance: BigDecimal,
    pub is_consistent: bool,
}

/// Trial Balance - snapshot of all account balances at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialBalance {
    pub as_of_date: NaiveDate,
    /// One line per account, ordered by account code
    pub lines: Vec<TrialBalanceLine>,
    pub total_debits: BigDecimal,
    pub total_credits: BigDecimal,
    pub is_balanced: bool,
}

/// Account balance information for trial balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialBalanceLine {
    pub account_id: String,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub debit_balance: Option<BigDecimal>,
    pub credit_balance: Option<BigDecimal>,
}

/// Broad classification of a [`LedgerError`], for mapping onto transport status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Computation,
    Internal,
}

/// Errors that can occur in the ledger system
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Movement not found: {0}")]
    MovementNotFound(String),
    #[error("Branch not found: {0}")]
    BranchNotFound(String),
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    #[error("Document not found: {0}")]
    DocumentNotFound(String),
    #[error("Counterparty not found: {0}")]
    CounterpartyNotFound(String),
    #[error("Computation error: {0}")]
    Computation(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::AccountNotFound(_)
            | LedgerError::MovementNotFound(_)
            | LedgerError::BranchNotFound(_)
            | LedgerError::ProductNotFound(_)
            | LedgerError::DocumentNotFound(_)
            | LedgerError::CounterpartyNotFound(_) => ErrorKind::NotFound,
            LedgerError::Computation(_) => ErrorKind::Computation,
            LedgerError::Storage(_) | LedgerError::Configuration(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
