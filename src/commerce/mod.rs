//! Business documents and the transaction modules that post them
//!
//! Each module adds operations to [`crate::Ledger`]. An operation validates
//! its input, stages the document, its journal entries and stock movements
//! in one [`crate::UnitOfWork`], and commits it.

pub mod budgets;
pub mod documents;
pub mod expenses;
pub mod inventory;
pub mod notes;
pub mod parties;
pub mod purchases;
pub mod sales;

pub use budgets::*;
pub use documents::*;
pub use expenses::*;
pub use inventory::*;
pub use notes::*;
pub use purchases::*;
pub use sales::*;

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{LedgerError, LedgerResult};
use crate::utils::money;

/// A persisted document together with what posting it produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutcome<D> {
    pub document: D,
    /// Journal entry recording the document, if one was created
    pub journal_entry_id: Option<Uuid>,
    /// Immediate payment of a pay-now document
    pub payment: Option<Payment>,
    /// Degraded-but-successful notices for the caller
    pub warnings: Vec<String>,
}

impl<D> DocumentOutcome<D> {
    pub(crate) fn new(document: D) -> Self {
        Self {
            document,
            journal_entry_id: None,
            payment: None,
            warnings: Vec::new(),
        }
    }
}

/// Validate line items and recompute every amount as `quantity * unit_price`
pub(crate) fn normalize_items(items: Vec<LineItem>) -> LedgerResult<Vec<LineItem>> {
    if items.is_empty() {
        return Err(LedgerError::Validation(
            "At least one line item is required".to_string(),
        ));
    }

    items
        .into_iter()
        .map(|mut item| {
            item.validate()?;
            item.amount = &item.quantity * &item.unit_price;
            Ok(item)
        })
        .collect()
}

pub(crate) fn validate_tax_rate(tax_rate: &BigDecimal) -> LedgerResult<()> {
    if *tax_rate < money::zero() {
        return Err(LedgerError::Validation(format!(
            "Tax rate cannot be negative, got {}",
            tax_rate
        )));
    }
    Ok(())
}

/// `date` plus the payment terms, or a validation error when out of range
pub(crate) fn due_date_after(date: NaiveDate, terms_days: i64) -> LedgerResult<NaiveDate> {
    Duration::try_days(terms_days)
        .and_then(|terms| date.checked_add_signed(terms))
        .ok_or_else(|| {
            LedgerError::Validation(format!(
                "Payment terms of {} days from {} are out of range",
                terms_days, date
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_items_recomputes_amounts() {
        let mut item = LineItem::new("Widget", BigDecimal::from(3), BigDecimal::from(7));
        item.amount = BigDecimal::from(1);
        let items = normalize_items(vec![item]).unwrap();
        assert_eq!(items[0].amount, BigDecimal::from(21));
    }

    #[test]
    fn test_normalize_items_rejects_empty_and_invalid() {
        assert!(normalize_items(Vec::new()).is_err());
        let bad = LineItem::new("Widget", BigDecimal::from(0), BigDecimal::from(7));
        assert!(normalize_items(vec![bad]).is_err());
        assert!(validate_tax_rate(&BigDecimal::from(-1)).is_err());
    }

    #[test]
    fn test_due_date_after_stays_in_range() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(due_date_after(date, 30).unwrap(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(matches!(due_date_after(date, 200_000_000), Err(LedgerError::Validation(_))));
        assert!(due_date_after(NaiveDate::MAX, 1).is_err());
    }
}
