//! Main ledger orchestrator that coordinates accounts and postings

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::ledger::{AccountManager, JournalPoster};
use crate::traits::*;
use crate::types::*;

/// Main ledger system that orchestrates all accounting operations
pub struct Ledger<S: LedgerStorage> {
    account_manager: AccountManager<S>,
    poster: JournalPoster<S>,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Create a new ledger with the given storage backend
    pub fn new(storage: S) -> Self {
        Self {
            account_manager: AccountManager::new(storage.clone()),
            poster: JournalPoster::new(storage),
        }
    }

    /// Create a new ledger with custom validators
    pub fn with_validators(
        storage: S,
        account_validator: Box<dyn AccountValidator>,
        transaction_validator: Box<dyn TransactionValidator>,
    ) -> Self {
        Self {
            account_manager: AccountManager::with_validator(storage.clone(), account_validator),
            poster: JournalPoster::with_validator(storage, transaction_validator),
        }
    }

    // Account operations
    /// Create a new account head
    pub async fn create_account(&mut self, account: AccountHead) -> LedgerResult<AccountHead> {
        self.account_manager.create_account(account).await
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: &str) -> LedgerResult<Option<AccountHead>> {
        self.account_manager.get_account(account_id).await
    }

    /// Get an account by code
    pub async fn get_account_by_code(&self, code: &str) -> LedgerResult<Option<AccountHead>> {
        self.account_manager.get_account_by_code(code).await
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> LedgerResult<Vec<AccountHead>> {
        self.account_manager.list_accounts().await
    }

    /// List accounts by type
    pub async fn list_accounts_by_type(
        &self,
        account_type: AccountType,
    ) -> LedgerResult<Vec<AccountHead>> {
        self.account_manager
            .list_accounts_by_type(account_type)
            .await
    }

    /// Update an account's descriptive fields
    pub async fn update_account(&mut self, account: &AccountHead) -> LedgerResult<()> {
        self.account_manager.update_account(account).await
    }

    /// Delete an account
    pub async fn delete_account(&mut self, account_id: &str) -> LedgerResult<()> {
        self.account_manager.delete_account(account_id).await
    }

    /// Access the chart of accounts tree
    pub fn chart(&self) -> &impl ChartOfAccounts {
        &self.account_manager
    }

    // Posting operations
    /// Validate and post a journal entry
    pub async fn post_entry(&mut self, request: JournalEntryRequest) -> LedgerResult<PostedEntry> {
        self.poster.post_entry(request).await
    }

    /// Post the offsetting entry for a movement
    pub async fn reverse_entry(
        &mut self,
        movement_id: &str,
        entry_date: NaiveDate,
        narration: Option<String>,
    ) -> LedgerResult<PostedEntry> {
        self.poster
            .reverse_entry(movement_id, entry_date, narration)
            .await
    }

    /// Get a movement by ID
    pub async fn get_movement(&self, movement_id: &str) -> LedgerResult<Option<LedgerMovement>> {
        self.poster.get_movement(movement_id).await
    }

    /// List movements matching a filter
    pub async fn list_movements(&self, filter: &MovementFilter) -> LedgerResult<Vec<LedgerMovement>> {
        self.poster.list_movements(filter).await
    }

    // Balance and reporting operations
    /// Current balance, or the balance recomputed as of a date
    pub async fn get_account_balance(
        &self,
        account_id: &str,
        as_of_date: Option<NaiveDate>,
    ) -> LedgerResult<BigDecimal> {
        match as_of_date {
            Some(date) => self.account_manager.balance_as_of(account_id, date).await,
            None => self.account_manager.get_balance(account_id).await,
        }
    }

    /// Reconcile one account against the journal
    pub async fn reconcile_account(&self, account_id: &str) -> LedgerResult<BalanceReconciliation> {
        self.account_manager.reconcile_account(account_id).await
    }

    /// Reconcile every account, ordered by code
    pub async fn reconcile_all(&self) -> LedgerResult<Vec<BalanceReconciliation>> {
        let mut results = Vec::new();
        for account in self.list_accounts().await? {
            results.push(self.reconcile_account(&account.id).await?);
        }
        Ok(results)
    }

    /// Trial balance as of a specific date
    pub async fn get_trial_balance(&self, as_of_date: NaiveDate) -> LedgerResult<TrialBalance> {
        let mut lines = Vec::new();
        let mut total_debits = BigDecimal::from(0);
        let mut total_credits = BigDecimal::from(0);

        for account in self.list_accounts().await? {
            let balance = self
                .account_manager
                .balance_as_of(&account.id, as_of_date)
                .await?;

            // A negative balance lands in the column opposite the account's balance type
            let side = if balance >= BigDecimal::from(0) {
                account.balance_type
            } else {
                account.balance_type.opposite()
            };
            let amount = balance.abs();

            let (debit_balance, credit_balance) = match side {
                BalanceSide::Debit => {
                    total_debits += &amount;
                    (Some(amount), None)
                }
                BalanceSide::Credit => {
                    total_credits += &amount;
                    (None, Some(amount))
                }
            };

            lines.push(TrialBalanceLine {
                account_id: account.id,
                code: account.code,
                name: account.name,
                account_type: account.account_type,
                debit_balance,
                credit_balance,
            });
        }

        let is_balanced = total_debits == total_credits;

        Ok(TrialBalance {
            as_of_date,
            lines,
            total_debits,
            total_credits,
            is_balanced,
        })
    }

    /// Setup the standard chart of accounts
    pub async fn setup_standard_chart_of_accounts(
        &mut self,
    ) -> LedgerResult<HashMap<String, AccountHead>> {
        crate::ledger::account::utils::create_standard_chart(&mut self.account_manager).await
    }

    /// Validate the integrity of the ledger
    pub async fn validate_integrity(
        &self,
        as_of_date: NaiveDate,
    ) -> LedgerResult<LedgerIntegrityReport> {
        let mut issues = Vec::new();

        let movements = self.list_movements(&MovementFilter::default()).await?;
        for movement in movements.iter().filter(|m| !m.is_balanced()) {
            issues.push(format!(
                "Movement {} violates double entry: debit {} on '{}', credit {} on '{}'",
                movement.voucher_no,
                movement.debit_amount,
                movement.debit_account_id,
                movement.credit_amount,
                movement.credit_account_id
            ));
        }

        let mut inconsistent_accounts = Vec::new();
        for reconciliation in self.reconcile_all().await? {
            if !reconciliation.is_consistent {
                issues.push(format!(
                    "Account '{}' balance {} differs from journal total {}",
                    reconciliation.account_id,
                    reconciliation.current_balance,
                    reconciliation.expected_balance
                ));
                inconsistent_accounts.push(reconciliation.account_id);
            }
        }

        let trial_balance = self.get_trial_balance(as_of_date).await?;
        if !trial_balance.is_balanced {
            issues.push(format!(
                "Trial balance is not balanced: debits = {}, credits = {}",
                trial_balance.total_debits, trial_balance.total_credits
            ));
        }

        if !issues.is_empty() {
            warn!(issue_count = issues.len(), "Ledger integrity check found issues");
        }

        Ok(LedgerIntegrityReport {
            as_of_date,
            is_valid: issues.is_empty(),
            issues,
            movement_count: movements.len(),
            inconsistent_accounts,
            trial_balance_total_debits: trial_balance.total_debits,
            trial_balance_total_credits: trial_balance.total_credits,
        })
    }
}

/// Report on ledger integrity and validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerIntegrityReport {
    pub as_of_date: NaiveDate,
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub movement_count: usize,
    pub inconsistent_accounts: Vec<String>,
    pub trial_balance_total_debits: BigDecimal,
    pub trial_balance_total_credits: BigDecimal,
}
