//! Validation utilities

use crate::traits::*;
use crate::types::*;
use bigdecimal::BigDecimal;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> LedgerResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(LedgerError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that an account code is valid
pub fn validate_account_code(code: &str) -> LedgerResult<()> {
    if code.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account code cannot be empty".to_string(),
        ));
    }

    if code.len() > 20 {
        return Err(LedgerError::Validation(
            "Account code cannot exceed 20 characters".to_string(),
        ));
    }

    // Alphanumeric, dashes and dots only
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(LedgerError::Validation(
            "Account code can only contain letters, digits, dashes, and dots".to_string(),
        ));
    }

    Ok(())
}

/// Validate that an account name is valid
pub fn validate_account_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account name cannot be empty".to_string(),
        ));
    }

    if name.len() > 100 {
        return Err(LedgerError::Validation(
            "Account name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate an optional narration line
pub fn validate_narration(narration: Option<&str>) -> LedgerResult<()> {
    if let Some(text) = narration {
        if text.chars().count() > 500 {
            return Err(LedgerError::Validation(
                "Narration cannot exceed 500 characters".to_string(),
            ));
        }
    }

    Ok(())
}

/// Stricter journal entry validator
pub struct EnhancedTransactionValidator;

impl TransactionValidator for EnhancedTransactionValidator {
    fn validate_entry(&self, request: &JournalEntryRequest) -> LedgerResult<()> {
        request.validate()?;

        validate_positive_amount(&request.debit_amount)?;

        // Manual vouchers need something a bookkeeper can trace back
        if request.source.is_none()
            && request.reference_no.is_none()
            && request.debit_narration.is_none()
            && request.credit_narration.is_none()
        {
            return Err(LedgerError::Validation(
                "Entry needs a narration, a reference number, or a source document".to_string(),
            ));
        }

        Ok(())
    }
}

/// Stricter account validator
pub struct EnhancedAccountValidator;

impl AccountValidator for EnhancedAccountValidator {
    fn validate_account(&self, account: &AccountHead) -> LedgerResult<()> {
        validate_account_code(&account.code)?;
        validate_account_name(&account.name)?;

        if account.account_type.normal_balance() != account.balance_type
            && account.account_type != AccountType::Asset
        {
            // Contra balances are only expected on asset heads (depreciation, allowances)
            return Err(LedgerError::Validation(format!(
                "Account '{}' uses a balance side that does not match its type",
                account.code
            )));
        }

        Ok(())
    }
}
