//! Validation utilities and stricter opt-in validators

use crate::traits::*;
use crate::types::*;
use crate::utils::money;
use bigdecimal::BigDecimal;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> LedgerResult<()> {
    if *amount <= money::zero() {
        Err(LedgerError::Validation(format!(
            "Amount must be positive, got {}",
            amount
        )))
    } else {
        Ok(())
    }
}

/// Validate an account code: 1-20 characters of letters, digits, dashes or dots
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

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(LedgerError::Validation(format!(
            "Account code '{}' can only contain letters, digits, dashes and dots",
            code
        )));
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

/// Validate that an entry description is valid
pub fn validate_entry_description(description: &str) -> LedgerResult<()> {
    if description.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Entry description cannot be empty".to_string(),
        ));
    }

    if description.len() > 500 {
        return Err(LedgerError::Validation(
            "Entry description cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}

/// Entry validator that adds description and per-line checks to the
/// double-entry rules
pub struct StrictEntryValidator;

impl EntryValidator for StrictEntryValidator {
    fn validate_entry(&self, entry: &JournalEntry) -> LedgerResult<()> {
        entry.validate()?;
        validate_entry_description(&entry.description)?;

        let mut seen = std::collections::HashSet::new();
        for line in &entry.lines {
            let side = match (money::is_zero(&line.debit), money::is_zero(&line.credit)) {
                (false, true) => EntryType::Debit,
                (true, false) => EntryType::Credit,
                _ => {
                    return Err(LedgerError::InvalidEntry(
                        "Each line must carry exactly one of debit or credit".to_string(),
                    ))
                }
            };
            // Same account on the same side twice
            if !seen.insert((line.account_id, side)) {
                return Err(LedgerError::InvalidEntry(format!(
                    "Account {} appears more than once as a {:?}",
                    line.account_id, side
                )));
            }
        }

        Ok(())
    }
}

/// Account validator that checks code format and name length
pub struct StrictAccountValidator;

impl AccountValidator for StrictAccountValidator {
    fn validate_account(&self, account: &Account) -> LedgerResult<()> {
        validate_account_code(&account.code)?;
        validate_account_name(&account.name)?;
        Ok(())
    }
}
