//! In-memory storage implementation for testing

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::commerce::{Branch, Counterparty, Product, Purchase, Sale};
use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct LedgerTables {
    accounts: HashMap<String, AccountHead>,
    /// Append-only journal in posting order
    movements: Vec<LedgerMovement>,
}

#[derive(Debug, Default)]
struct CommerceTables {
    branches: HashMap<String, Branch>,
    products: HashMap<String, Product>,
    sales: HashMap<String, Sale>,
    purchases: HashMap<String, Purchase>,
    counterparties: HashMap<String, Counterparty>,
}

/// In-memory storage implementation for testing and development
///
/// Clones share the same underlying tables. All ledger tables sit behind one lock,
/// so a posting (movement plus both balances) is applied as a single unit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    ledger: Arc<RwLock<LedgerTables>>,
    commerce: Arc<RwLock<CommerceTables>>,
}

fn poisoned<T>(_: PoisonError<T>) -> LedgerError {
    LedgerError::Storage("in-memory store lock poisoned".to_string())
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> LedgerResult<()> {
        *self.ledger.write().map_err(poisoned)? = LedgerTables::default();
        *self.commerce.write().map_err(poisoned)? = CommerceTables::default();
        Ok(())
    }

    /// Number of movements in the journal
    pub fn movement_count(&self) -> LedgerResult<usize> {
        Ok(self.ledger.read().map_err(poisoned)?.movements.len())
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn save_account(&mut self, account: &AccountHead) -> LedgerResult<()> {
        let mut tables = self.ledger.write().map_err(poisoned)?;
        if tables.accounts.values().any(|a| a.code == account.code) {
            return Err(LedgerError::Validation(format!(
                "Account code '{}' is already in use",
                account.code
            )));
        }
        tables.accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<AccountHead>> {
        Ok(self
            .ledger
            .read()
            .map_err(poisoned)?
            .accounts
            .get(account_id)
            .cloned())
    }

    async fn get_account_by_code(&self, code: &str) -> LedgerResult<Option<AccountHead>> {
        Ok(self
            .ledger
            .read()
            .map_err(poisoned)?
            .accounts
            .values()
            .find(|account| account.code == code)
            .cloned())
    }

    async fn list_accounts(
        &self,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<AccountHead>> {
        let tables = self.ledger.read().map_err(poisoned)?;
        let mut accounts: Vec<AccountHead> = tables
            .accounts
            .values()
            .filter(|account| account_type.is_none_or(|t| account.account_type == t))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    async fn update_account(&mut self, account: &AccountHead) -> LedgerResult<()> {
        let mut tables = self.ledger.write().map_err(poisoned)?;
        let stored = tables
            .accounts
            .get_mut(&account.id)
            .ok_or_else(|| LedgerError::AccountNotFound(account.id.clone()))?;

        stored.name = account.name.clone();
        stored.category = account.category.clone();
        stored.sub_category = account.sub_category.clone();
        stored.parent_id = account.parent_id.clone();
        stored.is_system = account.is_system;
        stored.updated_at = chrono::Utc::now().naive_utc();
        Ok(())
    }

    async fn delete_account(&mut self, account_id: &str) -> LedgerResult<()> {
        if self
            .ledger
            .write()
            .map_err(poisoned)?
            .accounts
            .remove(account_id)
            .is_some()
        {
            Ok(())
        } else {
            Err(LedgerError::AccountNotFound(account_id.to_string()))
        }
    }

    async fn post_movement(
        &mut self,
        movement: &LedgerMovement,
        debit_delta: &BigDecimal,
        credit_delta: &BigDecimal,
    ) -> LedgerResult<(AccountHead, AccountHead)> {
        let mut tables = self.ledger.write().map_err(poisoned)?;

        // Check everything before touching anything
        for account_id in [&movement.debit_account_id, &movement.credit_account_id] {
            if !tables.accounts.contains_key(account_id) {
                return Err(LedgerError::AccountNotFound(account_id.clone()));
            }
        }
        if tables.movements.iter().any(|m| m.id == movement.id) {
            return Err(LedgerError::Storage(format!(
                "Movement '{}' already exists",
                movement.id
            )));
        }
        if let Some(original_id) = movement.reversal_of.as_deref() {
            if tables
                .movements
                .iter()
                .any(|m| m.reversal_of.as_deref() == Some(original_id))
            {
                return Err(LedgerError::Validation(format!(
                    "Movement '{}' has already been reversed",
                    original_id
                )));
            }
        }

        let mut updated = Vec::with_capacity(2);
        for (account_id, delta) in [
            (&movement.debit_account_id, debit_delta),
            (&movement.credit_account_id, credit_delta),
        ] {
            let account = tables
                .accounts
                .get_mut(account_id)
                .ok_or_else(|| LedgerError::AccountNotFound(account_id.clone()))?;
            account.apply_delta(delta);
            updated.push(account.clone());
        }
        tables.movements.push(movement.clone());

        let credit_account = updated
            .pop()
            .ok_or_else(|| LedgerError::Storage("posting lost its credit side".to_string()))?;
        let debit_account = updated
            .pop()
            .ok_or_else(|| LedgerError::Storage("posting lost its debit side".to_string()))?;
        Ok((debit_account, credit_account))
    }

    async fn get_movement(&self, movement_id: &str) -> LedgerResult<Option<LedgerMovement>> {
        Ok(self
            .ledger
            .read()
            .map_err(poisoned)?
            .movements
            .iter()
            .find(|m| m.id == movement_id)
            .cloned())
    }

    async fn list_movements(&self, filter: &MovementFilter) -> LedgerResult<Vec<LedgerMovement>> {
        let tables = self.ledger.read().map_err(poisoned)?;
        let mut movements: Vec<LedgerMovement> = tables
            .movements
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        // Stable sort keeps posting order within a day
        movements.sort_by_key(|m| m.entry_date);
        Ok(movements)
    }
}

#[async_trait]
impl CommerceStorage for MemoryStorage {
    async fn save_branch(&mut self, branch: &Branch) -> LedgerResult<()> {
        self.commerce
            .write()
            .map_err(poisoned)?
            .branches
            .insert(branch.id.clone(), branch.clone());
        Ok(())
    }

    async fn get_branch(&self, branch_id: &str) -> LedgerResult<Option<Branch>> {
        Ok(self
            .commerce
            .read()
            .map_err(poisoned)?
            .branches
            .get(branch_id)
            .cloned())
    }

    async fn save_product(&mut self, product: &Product) -> LedgerResult<()> {
        self.commerce
            .write()
            .map_err(poisoned)?
            .products
            .insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn get_product(&self, product_id: &str) -> LedgerResult<Option<Product>> {
        Ok(self
            .commerce
            .read()
            .map_err(poisoned)?
            .products
            .get(product_id)
            .cloned())
    }

    async fn update_product(&mut self, product: &Product) -> LedgerResult<()> {
        let mut tables = self.commerce.write().map_err(poisoned)?;
        match tables.products.get_mut(&product.id) {
            Some(stored) => {
                *stored = product.clone();
                Ok(())
            }
            None => Err(LedgerError::ProductNotFound(product.id.clone())),
        }
    }

    async fn save_sale(&mut self, sale: &Sale) -> LedgerResult<()> {
        self.commerce
            .write()
            .map_err(poisoned)?
            .sales
            .insert(sale.id.clone(), sale.clone());
        Ok(())
    }

    async fn get_sale(&self, sale_id: &str) -> LedgerResult<Option<Sale>> {
        Ok(self
            .commerce
            .read()
            .map_err(poisoned)?
            .sales
            .get(sale_id)
            .cloned())
    }

    async fn update_sale(&mut self, sale: &Sale) -> LedgerResult<()> {
        let mut tables = self.commerce.write().map_err(poisoned)?;
        match tables.sales.get_mut(&sale.id) {
            Some(stored) => {
                *stored = sale.clone();
                Ok(())
            }
            None => Err(LedgerError::DocumentNotFound(sale.id.clone())),
        }
    }

    async fn list_sales(
        &self,
        branch_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<Vec<Sale>> {
        let tables = self.commerce.read().map_err(poisoned)?;
        let mut sales: Vec<Sale> = tables
            .sales
            .values()
            .filter(|sale| {
                let day = sale.business_date();
                sale.branch_id == branch_id && day >= start_date && day <= end_date
            })
            .cloned()
            .collect();
        sales.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(sales)
    }

    async fn save_purchase(&mut self, purchase: &Purchase) -> LedgerResult<()> {
        self.commerce
            .write()
            .map_err(poisoned)?
            .purchases
            .insert(purchase.id.clone(), purchase.clone());
        Ok(())
    }

    async fn get_purchase(&self, purchase_id: &str) -> LedgerResult<Option<Purchase>> {
        Ok(self
            .commerce
            .read()
            .map_err(poisoned)?
            .purchases
            .get(purchase_id)
            .cloned())
    }

    async fn update_purchase(&mut self, purchase: &Purchase) -> LedgerResult<()> {
        let mut tables = self.commerce.write().map_err(poisoned)?;
        match tables.purchases.get_mut(&purchase.id) {
            Some(stored) => {
                *stored = purchase.clone();
                Ok(())
            }
            None => Err(LedgerError::DocumentNotFound(purchase.id.clone())),
        }
    }

    async fn list_purchases(
        &self,
        branch_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<Vec<Purchase>> {
        let tables = self.commerce.read().map_err(poisoned)?;
        let mut purchases: Vec<Purchase> = tables
            .purchases
            .values()
            .filter(|purchase| {
                let day = purchase.business_date();
                purchase.branch_id == branch_id && day >= start_date && day <= end_date
            })
            .cloned()
            .collect();
        purchases.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(purchases)
    }

    async fn save_counterparty(&mut self, counterparty: &Counterparty) -> LedgerResult<()> {
        self.commerce
            .write()
            .map_err(poisoned)?
            .counterparties
            .insert(counterparty.id.clone(), counterparty.clone());
        Ok(())
    }

    async fn get_counterparty(&self, counterparty_id: &str) -> LedgerResult<Option<Counterparty>> {
        Ok(self
            .commerce
            .read()
            .map_err(poisoned)?
            .counterparties
            .get(counterparty_id)
            .cloned())
    }

    async fn apply_counterparty_delta(
        &mut self,
        counterparty_id: &str,
        delta: &BigDecimal,
    ) -> LedgerResult<Counterparty> {
        let mut tables = self.commerce.write().map_err(poisoned)?;
        let counterparty = tables
            .counterparties
            .get_mut(counterparty_id)
            .ok_or_else(|| LedgerError::CounterpartyNotFound(counterparty_id.to_string()))?;
        counterparty.balance += delta;
        Ok(counterparty.clone())
    }
}
