//! Account management and balance maintenance

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use crate::traits::*;
use crate::types::*;

/// Account manager for the chart of accounts and running balances
pub struct AccountManager<S: LedgerStorage> {
    pub(crate) storage: S,
    validator: Box<dyn AccountValidator>,
}

impl<S: LedgerStorage> AccountManager<S> {
    /// Create a new account manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultAccountValidator),
        }
    }

    /// Create a new account manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn AccountValidator>) -> Self {
        Self { storage, validator }
    }

    /// Create a new account head
    #[instrument(skip(self, account), fields(code = %account.code))]
    pub async fn create_account(&mut self, account: AccountHead) -> LedgerResult<AccountHead> {
        self.validator.validate_account(&account)?;

        if self.storage.get_account_by_code(&account.code).await?.is_some() {
            return Err(LedgerError::Validation(format!(
                "Account with code '{}' already exists",
                account.code
            )));
        }

        if let Some(ref parent_id) = account.parent_id {
            if self.storage.get_account(parent_id).await?.is_none() {
                return Err(LedgerError::Validation(format!(
                    "Parent account '{}' does not exist",
                    parent_id
                )));
            }
        }

        self.storage.save_account(&account).await?;
        info!(account_id = %account.id, "Account created");

        Ok(account)
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: &str) -> LedgerResult<Option<AccountHead>> {
        self.storage.get_account(account_id).await
    }

    /// Get an account by ID, returning an error if not found
    pub async fn get_account_required(&self, account_id: &str) -> LedgerResult<AccountHead> {
        self.storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    /// Get an account by its code
    pub async fn get_account_by_code(&self, code: &str) -> LedgerResult<Option<AccountHead>> {
        self.storage.get_account_by_code(code).await
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> LedgerResult<Vec<AccountHead>> {
        self.storage.list_accounts(None).await
    }

    /// List accounts by type
    pub async fn list_accounts_by_type(
        &self,
        account_type: AccountType,
    ) -> LedgerResult<Vec<AccountHead>> {
        self.storage.list_accounts(Some(account_type)).await
    }

    /// Update the descriptive fields of an account.
    ///
    /// Type, balance type and balances cannot be changed once the account exists.
    pub async fn update_account(&mut self, account: &AccountHead) -> LedgerResult<()> {
        self.validator.validate_account(account)?;

        let existing = self.get_account_required(&account.id).await?;
        if existing.account_type != account.account_type
            || existing.balance_type != account.balance_type
            || existing.opening_balance != account.opening_balance
        {
            return Err(LedgerError::Validation(format!(
                "Account '{}' cannot change its type, balance side, or opening balance",
                existing.code
            )));
        }
        if existing.code != account.code {
            return Err(LedgerError::Validation(format!(
                "Account code '{}' cannot be changed",
                existing.code
            )));
        }

        if let Some(ref parent_id) = account.parent_id {
            // Walking up from the new parent must never reach this account
            let mut cursor = Some(parent_id.clone());
            while let Some(id) = cursor {
                if id == account.id {
                    return Err(LedgerError::Validation(format!(
                        "Account '{}' cannot be placed under itself",
                        account.code
                    )));
                }
                cursor = self.get_account_required(&id).await?.parent_id;
            }
        }

        self.storage.update_account(account).await
    }

    /// Delete an account that has never been posted to
    pub async fn delete_account(&mut self, account_id: &str) -> LedgerResult<()> {
        let account = self.get_account_required(account_id).await?;

        if account.is_system {
            return Err(LedgerError::Validation(format!(
                "System account '{}' cannot be deleted",
                account.code
            )));
        }

        let movements = self
            .storage
            .list_movements(&MovementFilter::for_account(account_id))
            .await?;
        if !movements.is_empty() {
            return Err(LedgerError::Validation(format!(
                "Account '{}' has {} posted movements; post an offsetting entry instead",
                account.code,
                movements.len()
            )));
        }

        if !self.get_child_accounts(account_id).await?.is_empty() {
            return Err(LedgerError::Validation(format!(
                "Account '{}' still has child accounts",
                account.code
            )));
        }

        self.storage.delete_account(account_id).await
    }

    /// Signed change one side of a movement makes to an account's running balance.
    ///
    /// The amount counts positive when `side` matches the account's balance type
    /// and negative otherwise.
    pub async fn side_delta(
        &self,
        account_id: &str,
        side: BalanceSide,
        amount: &BigDecimal,
    ) -> LedgerResult<BigDecimal> {
        crate::utils::validate_positive_amount(amount)?;
        let account = self.get_account_required(account_id).await?;
        Ok(account.signed_delta(side, amount))
    }

    /// Append a movement to the journal and apply both of its sides.
    ///
    /// Balances only change together with the movement that explains them, so
    /// `reconcile_account` stays consistent. Returns the updated debit and credit heads.
    pub(crate) async fn apply_movement(
        &mut self,
        movement: &LedgerMovement,
    ) -> LedgerResult<(AccountHead, AccountHead)> {
        // Balance types never change after creation, so the deltas stay valid
        // until storage applies them.
        let debit_delta = self
            .side_delta(&movement.debit_account_id, BalanceSide::Debit, movement.amount())
            .await?;
        let credit_delta = self
            .side_delta(&movement.credit_account_id, BalanceSide::Credit, movement.amount())
            .await?;

        let (debit_account, credit_account) = self
            .storage
            .post_movement(movement, &debit_delta, &credit_delta)
            .await?;
        debug!(
            movement_id = %movement.id,
            %debit_delta,
            %credit_delta,
            "Balances updated"
        );
        Ok((debit_account, credit_account))
    }

    /// Current running balance
    pub async fn get_balance(&self, account_id: &str) -> LedgerResult<BigDecimal> {
        Ok(self.get_account_required(account_id).await?.current_balance)
    }

    /// Balance recomputed from the journal as of the end of `as_of_date`
    pub async fn balance_as_of(
        &self,
        account_id: &str,
        as_of_date: NaiveDate,
    ) -> LedgerResult<BigDecimal> {
        let account = self.get_account_required(account_id).await?;
        let filter = MovementFilter {
            end_date: Some(as_of_date),
            account_id: Some(account_id.to_string()),
            ..MovementFilter::default()
        };
        let movements = self.storage.list_movements(&filter).await?;
        Ok(&account.opening_balance + movements_total(&account, &movements))
    }

    /// Compare the stored balance with opening balance plus all posted movements
    pub async fn reconcile_account(&self, account_id: &str) -> LedgerResult<BalanceReconciliation> {
        let account = self.get_account_required(account_id).await?;
        let movements = self
            .storage
            .list_movements(&MovementFilter::for_account(account_id))
            .await?;

        let total = movements_total(&account, &movements);
        let expected = &account.opening_balance + &total;
        Ok(BalanceReconciliation {
            account_id: account.id,
            is_consistent: expected == account.current_balance,
            opening_balance: account.opening_balance,
            movements_total: total,
            expected_balance: expected,
            current_balance: account.current_balance,
        })
    }
}

/// Signed sum of the movements' effect on `account`
fn movements_total(account: &AccountHead, movements: &[LedgerMovement]) -> BigDecimal {
    movements
        .iter()
        .filter_map(|m| {
            m.side_for(&account.id)
                .map(|side| account.signed_delta(side, m.amount()))
        })
        .sum()
}

#[async_trait::async_trait]
impl<S: LedgerStorage> ChartOfAccounts for AccountManager<S> {
    async fn get_chart(&self) -> LedgerResult<Vec<AccountHead>> {
        self.list_accounts().await
    }

    async fn get_child_accounts(&self, parent_id: &str) -> LedgerResult<Vec<AccountHead>> {
        let all_accounts = self.list_accounts().await?;
        Ok(all_accounts
            .into_iter()
            .filter(|account| account.parent_id.as_deref() == Some(parent_id))
            .collect())
    }

    async fn get_account_path(&self, account_id: &str) -> LedgerResult<Vec<AccountHead>> {
        let mut path = Vec::new();
        let mut current_account_id = Some(account_id.to_string());

        while let Some(id) = current_account_id {
            let account = self.get_account_required(&id).await?;
            current_account_id = account.parent_id.clone();
            path.insert(0, account);
        }

        Ok(path)
    }
}

/// Utility functions for working with accounts
pub mod utils {
    use super::*;

    /// Create the standard chart of accounts for a machinery trading business.
    ///
    /// Every head is a system account; the map is keyed by a stable slug.
    pub async fn create_standard_chart<S: LedgerStorage>(
        account_manager: &mut AccountManager<S>,
    ) -> LedgerResult<HashMap<String, AccountHead>> {
        let heads = [
            ("cash", "1010", "Cash in Hand", AccountType::Asset, "Current Assets"),
            ("bank", "1020", "Bank Account", AccountType::Asset, "Current Assets"),
            ("accounts_receivable", "1100", "Accounts Receivable", AccountType::Asset, "Current Assets"),
            ("inventory", "1200", "Machinery Inventory", AccountType::Asset, "Current Assets"),
            ("accounts_payable", "2010", "Accounts Payable", AccountType::Liability, "Current Liabilities"),
            ("tax_payable", "2100", "Tax Payable", AccountType::Liability, "Current Liabilities"),
            ("owners_capital", "3010", "Owner's Capital", AccountType::Equity, "Capital"),
            ("retained_earnings", "3200", "Retained Earnings", AccountType::Equity, "Capital"),
            ("sales_revenue", "4010", "Sales Revenue", AccountType::Income, "Operating Income"),
            ("service_income", "4100", "Service & Repair Income", AccountType::Income, "Other Income"),
            ("cost_of_goods_sold", "5010", "Cost of Goods Sold", AccountType::Expense, "Direct Costs"),
            ("rent_expense", "6010", "Rent Expense", AccountType::Expense, "Operating Expenses"),
            ("salary_expense", "6020", "Salaries & Wages", AccountType::Expense, "Operating Expenses"),
            ("utilities_expense", "6030", "Utilities Expense", AccountType::Expense, "Operating Expenses"),
            ("transport_expense", "6040", "Transport & Delivery", AccountType::Expense, "Operating Expenses"),
        ];

        let mut accounts = HashMap::new();
        for (slug, code, name, account_type, category) in heads {
            let head = AccountHead::new(code.to_string(), name.to_string(), account_type)
                .with_category(category)
                .system();
            let head = account_manager.create_account(head).await?;
            accounts.insert(slug.to_string(), head);
        }

        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;

    #[tokio::test]
    async fn test_apply_movement_respects_balance_type() {
        let mut manager = AccountManager::new(MemoryStorage::new());
        let cash = manager
            .create_account(AccountHead::new("1010".into(), "Cash".into(), AccountType::Asset))
            .await
            .unwrap();
        let loan = manager
            .create_account(AccountHead::new("2200".into(), "Loan".into(), AccountType::Liability))
            .await
            .unwrap();

        assert_eq!(
            manager
                .side_delta(&cash.id, BalanceSide::Credit, &BigDecimal::from(40))
                .await
                .unwrap(),
            BigDecimal::from(-40)
        );

        // Loan repayment: debit the loan, credit cash
        let repayment = LedgerMovement::from_request(JournalEntryRequest::new(
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            VoucherType::Payment,
            loan.id.clone(),
            cash.id.clone(),
            BigDecimal::from(40),
        ));
        let (loan_after, cash_after) = manager.apply_movement(&repayment).await.unwrap();
        assert_eq!(loan_after.current_balance, BigDecimal::from(-40));
        assert_eq!(cash_after.current_balance, BigDecimal::from(-40));

        for account_id in [&cash.id, &loan.id] {
            let reconciliation = manager.reconcile_account(account_id).await.unwrap();
            assert!(reconciliation.is_consistent, "{:?}", reconciliation);
            assert_eq!(reconciliation.movements_total, BigDecimal::from(-40));
        }

        let missing = manager
            .side_delta("nope", BalanceSide::Debit, &BigDecimal::from(1))
            .await;
        assert!(matches!(missing, Err(LedgerError::AccountNotFound(_))));

        let orphan = LedgerMovement::from_request(JournalEntryRequest::new(
            NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
            VoucherType::Journal,
            cash.id.clone(),
            "nope".to_string(),
            BigDecimal::from(5),
        ));
        assert!(matches!(
            manager.apply_movement(&orphan).await,
            Err(LedgerError::AccountNotFound(_))
        ));
        assert_eq!(manager.get_balance(&cash.id).await.unwrap(), BigDecimal::from(-40));
    }

    #[tokio::test]
    async fn test_system_accounts_cannot_be_deleted() {
        let mut manager = AccountManager::new(MemoryStorage::new());
        let chart = utils::create_standard_chart(&mut manager).await.unwrap();
        let result = manager.delete_account(&chart["cash"].id).await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));

        let scratch = manager
            .create_account(AccountHead::new("9999".into(), "Scratch".into(), AccountType::Expense))
            .await
            .unwrap();
        manager.delete_account(&scratch.id).await.unwrap();
        assert!(manager.get_account(&scratch.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_account_path_and_cycle_guard() {
        let mut manager = AccountManager::new(MemoryStorage::new());
        let assets = manager
            .create_account(AccountHead::new("1000".into(), "Current Assets".into(), AccountType::Asset))
            .await
            .unwrap();
        let cash = manager
            .create_account(
                AccountHead::new("1010".into(), "Cash".into(), AccountType::Asset)
                    .with_parent(assets.id.clone()),
            )
            .await
            .unwrap();

        let path = manager.get_account_path(&cash.id).await.unwrap();
        let codes: Vec<&str> = path.iter().map(|a| a.code.as_str()).collect();
        assert_eq!(codes, vec!["1000", "1010"]);

        let mut looped = assets.clone();
        looped.parent_id = Some(cash.id.clone());
        assert!(manager.update_account(&looped).await.is_err());

        let mut retyped = cash.clone();
        retyped.account_type = AccountType::Expense;
        assert!(manager.update_account(&retyped).await.is_err());
    }
}
