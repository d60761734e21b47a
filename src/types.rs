//! Core types and data structures for the ledger

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::money;

/// Account types following standard accounting principles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccountType {
    /// Assets - what the business owns (Cash, Inventory, Equipment, etc.)
    Asset,
    /// Liabilities - what the business owes (Loans, Accounts Payable, etc.)
    Liability,
    /// Equity - owner's interest in the business (Capital, Retained Earnings, etc.)
    Equity,
    /// Revenue - money earned by the business
    Revenue,
    /// Expenses - costs incurred by the business
    Expense,
}

impl AccountType {
    /// Returns the normal balance side for this account type.
    ///
    /// Assets and Expenses normally carry debit balances; Liabilities, Equity
    /// and Revenue normally carry credit balances.
    pub fn normal_balance(&self) -> EntryType {
        match self {
            AccountType::Asset | AccountType::Expense => EntryType::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => {
                EntryType::Credit
            }
        }
    }

    /// All account types in statement order
    pub fn all() -> [AccountType; 5] {
        [
            AccountType::Asset,
            AccountType::Liability,
            AccountType::Equity,
            AccountType::Revenue,
            AccountType::Expense,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "Asset",
            AccountType::Liability => "Liability",
            AccountType::Equity => "Equity",
            AccountType::Revenue => "Revenue",
            AccountType::Expense => "Expense",
        }
    }
}

/// Sides of a double-entry posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Debit side - increases Assets and Expenses, decreases Liabilities, Equity, and Revenue
    Debit,
    /// Credit side - increases Liabilities, Equity, and Revenue, decreases Assets and Expenses
    Credit,
}

impl EntryType {
    pub fn opposite(&self) -> EntryType {
        match self {
            EntryType::Debit => EntryType::Credit,
            EntryType::Credit => EntryType::Debit,
        }
    }
}

/// A chart-of-accounts record, scoped to one tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for the account
    pub id: Uuid,
    /// Human-facing account code (e.g. "1200")
    pub code: String,
    /// Human-readable account name
    pub name: String,
    /// Type of account (Asset, Liability, etc.)
    pub account_type: AccountType,
    /// Free-form classification such as "Current Asset" or "Cost of Sales"
    pub sub_type: Option<String>,
    /// Side on which the account's balance is reported as positive
    pub normal_balance: EntryType,
    /// Optional parent account for hierarchical chart of accounts
    pub parent_id: Option<Uuid>,
    pub description: Option<String>,
    /// System accounts are seeded by the chart and cannot be deleted
    pub is_system: bool,
    pub is_active: bool,
    /// When the account was created
    pub created_at: NaiveDateTime,
    /// When the account was last updated
    pub updated_at: NaiveDateTime,
}

impl Account {
    /// Create a new active account with the type's default normal balance
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            account_type,
            sub_type: None,
            normal_balance: account_type.normal_balance(),
            parent_id: None,
            description: None,
            is_system: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_sub_type(mut self, sub_type: impl Into<String>) -> Self {
        self.sub_type = Some(sub_type.into());
        self
    }

    /// Override the normal balance (contra accounts such as accumulated depreciation)
    pub fn with_normal_balance(mut self, normal_balance: EntryType) -> Self {
        self.normal_balance = normal_balance;
        self
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    /// Whether the sub-type matches, ignoring case
    pub fn has_sub_type(&self, sub_type: &str) -> bool {
        self.sub_type
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(sub_type))
    }

    /// Convert raw totals to a signed balance using this account's normal balance
    pub fn signed_balance(&self, debit: &BigDecimal, credit: &BigDecimal) -> BigDecimal {
        match self.normal_balance {
            EntryType::Debit => debit - credit,
            EntryType::Credit => credit - debit,
        }
    }

    pub fn label(&self) -> String {
        format!("{} - {}", self.code, self.name)
    }
}

/// What produced a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Manual,
    Sale,
    Purchase,
    Payment,
    Expense,
    CreditNote,
    DebitNote,
    Reversal,
    YearEnd,
}

impl EntrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntrySource::Manual => "manual",
            EntrySource::Sale => "sale",
            EntrySource::Purchase => "purchase",
            EntrySource::Payment => "payment",
            EntrySource::Expense => "expense",
            EntrySource::CreditNote => "credit_note",
            EntrySource::DebitNote => "debit_note",
            EntrySource::Reversal => "reversal",
            EntrySource::YearEnd => "year_end",
        }
    }
}

/// One line of a journal entry. Exactly one of debit/credit is expected to be non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Account being affected
    pub account_id: Uuid,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    /// Optional description for this specific line
    pub description: Option<String>,
}

impl JournalLine {
    pub fn new(
        account_id: Uuid,
        debit: BigDecimal,
        credit: BigDecimal,
        description: Option<String>,
    ) -> Self {
        Self {
            account_id,
            debit,
            credit,
            description,
        }
    }

    /// Create a debit line
    pub fn debit(account_id: Uuid, amount: BigDecimal, description: impl Into<String>) -> Self {
        Self::new(account_id, amount, money::zero(), Some(description.into()))
    }

    /// Create a credit line
    pub fn credit(account_id: Uuid, amount: BigDecimal, description: impl Into<String>) -> Self {
        Self::new(account_id, money::zero(), amount, Some(description.into()))
    }

    /// The same line with debit and credit exchanged
    pub fn swapped(&self) -> Self {
        Self {
            account_id: self.account_id,
            debit: self.credit.clone(),
            credit: self.debit.clone(),
            description: self.description.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        money::is_zero(&self.debit) && money::is_zero(&self.credit)
    }
}

/// A dated, numbered set of journal lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier for the entry
    pub id: Uuid,
    /// Sequential human-facing number (`JE-00001`)
    pub entry_number: String,
    /// Date when the transaction occurred
    pub date: NaiveDate,
    pub description: String,
    /// Optional reference (document number, `REV-...`, `YE-...`)
    pub reference: Option<String>,
    pub source: EntrySource,
    /// Document that produced the entry, if any
    pub source_id: Option<Uuid>,
    /// Only posted entries contribute to balances
    pub is_posted: bool,
    /// Ordered lines
    pub lines: Vec<JournalLine>,
    /// When the entry was created
    pub created_at: NaiveDateTime,
}

impl JournalEntry {
    /// Calculate total debits
    pub fn total_debits(&self) -> BigDecimal {
        self.lines.iter().map(|l| &l.debit).sum()
    }

    /// Calculate total credits
    pub fn total_credits(&self) -> BigDecimal {
        self.lines.iter().map(|l| &l.credit).sum()
    }

    /// Check if debits equal credits within the balance tolerance
    pub fn is_balanced(&self) -> bool {
        money::within_tolerance(&(self.total_debits() - self.total_credits()))
    }

    pub fn touches_account(&self, account_id: Uuid) -> bool {
        self.lines.iter().any(|l| l.account_id == account_id)
    }

    /// Validate the entry's lines
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.lines.is_empty() {
            return Err(LedgerError::InvalidEntry(
                "Journal entry must have at least one line".to_string(),
            ));
        }

        let zero = money::zero();
        for line in &self.lines {
            if line.debit < zero || line.credit < zero {
                return Err(LedgerError::InvalidEntry(
                    "Line amounts cannot be negative".to_string(),
                ));
            }
        }

        if !self.is_balanced() {
            return Err(LedgerError::InvalidEntry(format!(
                "Journal entry is not balanced: debits = {}, credits = {}",
                self.total_debits(),
                self.total_credits()
            )));
        }

        Ok(())
    }
}

/// Filter for listing journal entries
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub source: Option<EntrySource>,
    pub account_id: Option<Uuid>,
    pub posted_only: bool,
}

impl EntryFilter {
    /// Posted entries dated within `[start, end]`
    pub fn posted_between(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        Self {
            start_date,
            end_date,
            posted_only: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, entry: &JournalEntry) -> bool {
        self.start_date.is_none_or(|d| entry.date >= d)
            && self.end_date.is_none_or(|d| entry.date <= d)
            && self.source.is_none_or(|s| entry.source == s)
            && self.account_id.is_none_or(|a| entry.touches_account(a))
            && (!self.posted_only || entry.is_posted)
    }
}

/// Requested quantity that exceeds stock on hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockShortage {
    pub product_id: Uuid,
    pub product_name: String,
    pub requested: BigDecimal,
    pub available: BigDecimal,
    pub short: BigDecimal,
}

impl std::fmt::Display for StockShortage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: requested {}, available {} (short {})",
            self.product_name, self.requested, self.available, self.short
        )
    }
}

fn format_shortages(shortages: &[StockShortage]) -> String {
    shortages
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur in the ledger system
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Invalid journal entry: {0}")]
    InvalidEntry(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Journal entry not found: {0}")]
    EntryNotFound(String),
    #[error("{kind} not found: {id}")]
    DocumentNotFound { kind: &'static str, id: String },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Fiscal period {year}-{month:02} is locked")]
    PeriodLocked { year: i32, month: u32 },
    #[error("Insufficient stock: {}", format_shortages(.0))]
    InsufficientStock(Vec<StockShortage>),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        LedgerError::DocumentNotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with(lines: Vec<JournalLine>) -> JournalEntry {
        JournalEntry {
            id: Uuid::new_v4(),
            entry_number: "JE-00001".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            description: "test".to_string(),
            reference: None,
            source: EntrySource::Manual,
            source_id: None,
            is_posted: false,
            lines,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_normal_balance_by_type() {
        assert_eq!(AccountType::Asset.normal_balance(), EntryType::Debit);
        assert_eq!(AccountType::Expense.normal_balance(), EntryType::Debit);
        assert_eq!(AccountType::Liability.normal_balance(), EntryType::Credit);
        assert_eq!(AccountType::Equity.normal_balance(), EntryType::Credit);
        assert_eq!(AccountType::Revenue.normal_balance(), EntryType::Credit);
    }

    #[test]
    fn test_signed_balance_respects_contra_accounts() {
        let equipment = Account::new("1500", "Office Equipment", AccountType::Asset);
        let accumulated = Account::new("1600", "Accumulated Depreciation", AccountType::Asset)
            .with_normal_balance(EntryType::Credit);

        let debit = BigDecimal::from(100);
        let credit = BigDecimal::from(30);
        assert_eq!(equipment.signed_balance(&debit, &credit), BigDecimal::from(70));
        assert_eq!(accumulated.signed_balance(&debit, &credit), BigDecimal::from(-70));
    }

    #[test]
    fn test_entry_balance_tolerance() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let cents = BigDecimal::from(1) / BigDecimal::from(200);

        let entry = entry_with(vec![
            JournalLine::debit(a, BigDecimal::from(100) + cents, "d"),
            JournalLine::credit(b, BigDecimal::from(100), "c"),
        ]);
        assert!(entry.is_balanced());
        assert!(entry.validate().is_ok());

        let off = entry_with(vec![
            JournalLine::debit(a, BigDecimal::from(101), "d"),
            JournalLine::credit(b, BigDecimal::from(100), "c"),
        ]);
        assert!(!off.is_balanced());
        assert!(matches!(off.validate(), Err(LedgerError::InvalidEntry(_))));
    }

    #[test]
    fn test_negative_and_empty_entries_rejected() {
        assert!(entry_with(vec![]).validate().is_err());

        let a = Uuid::new_v4();
        let negative = entry_with(vec![
            JournalLine::debit(a, BigDecimal::from(-5), "d"),
            JournalLine::credit(a, BigDecimal::from(-5), "c"),
        ]);
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_swapped_line() {
        let line = JournalLine::debit(Uuid::new_v4(), BigDecimal::from(10), "x");
        let swapped = line.swapped();
        assert_eq!(swapped.credit, BigDecimal::from(10));
        assert_eq!(swapped.debit, BigDecimal::from(0));
        assert_eq!(swapped.account_id, line.account_id);
    }

    #[test]
    fn test_period_locked_message() {
        let err = LedgerError::PeriodLocked {
            year: 2024,
            month: 3,
        };
        assert_eq!(err.to_string(), "Fiscal period 2024-03 is locked");
    }
}
