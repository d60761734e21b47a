//! Petty-cash expenses

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::commerce::documents::Expense;
use crate::config::AccountRole;
use crate::ledger::recipes;
use crate::ledger::Ledger;
use crate::numbering::DocumentKind;
use crate::traits::*;
use crate::types::*;
use crate::utils::money;

/// Expense categories and the account code each one posts to
pub const EXPENSE_CATEGORIES: &[(&str, &str)] = &[
    ("Office Supplies", "6300"),
    ("Transportation & Parking", "6700"),
    ("Meals & Refreshments", "6950"),
    ("Postage & Courier", "6300"),
    ("Printing & Stationery", "6300"),
    ("Cleaning & Janitorial", "6950"),
    ("Repairs & Maintenance", "6950"),
    ("Utilities (minor)", "6800"),
    ("Miscellaneous", "6950"),
];

pub fn expense_categories() -> Vec<&'static str> {
    EXPENSE_CATEGORIES.iter().map(|(name, _)| *name).collect()
}

fn category_code(category: &str) -> Option<&'static str> {
    EXPENSE_CATEGORIES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category.trim()))
        .map(|(_, code)| *code)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub date: NaiveDate,
    pub category: String,
    pub description: String,
    pub amount: BigDecimal,
    /// Defaults to petty cash, then cash
    pub paid_from_account_id: Option<Uuid>,
    pub receipt_reference: Option<String>,
}

impl NewExpense {
    pub fn new(
        date: NaiveDate,
        category: impl Into<String>,
        description: impl Into<String>,
        amount: BigDecimal,
    ) -> Self {
        Self {
            date,
            category: category.into(),
            description: description.into(),
            amount,
            paid_from_account_id: None,
            receipt_reference: None,
        }
    }

    pub fn paid_from(mut self, account_id: Uuid) -> Self {
        self.paid_from_account_id = Some(account_id);
        self
    }
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Record a petty-cash expense and its journal entry
    pub async fn record_expense(&mut self, input: NewExpense) -> LedgerResult<Expense> {
        if input.amount <= money::zero() {
            return Err(LedgerError::Validation(format!(
                "Expense amount must be positive, got {}",
                input.amount
            )));
        }
        if input.description.trim().is_empty() {
            return Err(LedgerError::Validation("Description cannot be empty".to_string()));
        }
        self.fiscal_manager.ensure_open(input.date).await?;

        let expense_account = self.expense_account(&input.category).await?;
        let paid_from = match input.paid_from_account_id {
            Some(id) => self.deposit_account(id).await?,
            None => self.petty_cash_account().await?,
        };

        let mut expense = Expense {
            id: Uuid::new_v4(),
            number: self.next_number(DocumentKind::PettyCash).await?,
            date: input.date,
            category: input.category,
            description: input.description,
            amount: input.amount,
            expense_account_id: expense_account.id,
            paid_from_account_id: paid_from.id,
            receipt_reference: input.receipt_reference,
            journal_entry_id: None,
            created_at: chrono::Utc::now().naive_utc(),
        };

        let entry = self
            .journal_manager
            .prepare(recipes::expense(&expense, &expense_account, &paid_from))
            .await?;
        expense.journal_entry_id = Some(entry.id);

        let mut unit = UnitOfWork::new();
        unit.push(Change::SaveEntry(entry));
        unit.push(Change::SaveExpense(expense.clone()));
        self.commit(unit).await?;

        tracing::info!(
            tenant = %self.tenant_id,
            expense = %expense.number,
            category = %expense.category,
            amount = %expense.amount,
            "petty cash expense recorded"
        );
        Ok(expense)
    }

    /// Expenses newest first, optionally within a date range
    pub async fn list_expenses(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<Expense>> {
        let mut expenses: Vec<Expense> = self
            .storage
            .list_expenses(&self.tenant_id)
            .await?
            .into_iter()
            .filter(|e| start_date.is_none_or(|start| e.date >= start))
            .filter(|e| end_date.is_none_or(|end| e.date <= end))
            .collect();
        expenses.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.number.cmp(&a.number)));
        Ok(expenses)
    }

    /// Current balance of the petty-cash account (or cash, if there is none)
    pub async fn petty_cash_balance(&self) -> LedgerResult<BigDecimal> {
        let account = self.petty_cash_account().await?;
        self.balances.balance(&account, None, None).await
    }

    async fn expense_account(&self, category: &str) -> LedgerResult<Account> {
        match category_code(category) {
            Some(code) => self
                .account_manager
                .find_by_code(code)
                .await?
                .filter(|a| a.is_active)
                .ok_or_else(|| {
                    LedgerError::AccountNotFound(format!("{} expense account ({})", category, code))
                }),
            None => self.require_role(AccountRole::MiscellaneousExpense).await,
        }
    }

    async fn petty_cash_account(&self) -> LedgerResult<Account> {
        match self.role_account(AccountRole::PettyCash).await? {
            Some(account) => Ok(account),
            None => self.require_role(AccountRole::Cash).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::utils::MemoryStorage;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_category_codes() {
        assert_eq!(category_code("Postage & Courier"), Some("6300"));
        assert_eq!(category_code("utilities (minor)"), Some("6800"));
        assert_eq!(category_code("Team offsite"), None);
        assert_eq!(expense_categories().len(), 9);
    }

    #[tokio::test]
    async fn test_expense_posts_from_petty_cash() {
        let mut ledger = Ledger::new(MemoryStorage::new(), "t1", LedgerConfig::default()).unwrap();
        let chart = ledger.setup_standard_chart_of_accounts().await.unwrap();

        let taxi = ledger
            .record_expense(NewExpense::new(d(2024, 3, 1), "Transportation & Parking", "Taxi", BigDecimal::from(25)))
            .await
            .unwrap();
        assert_eq!(taxi.number, "PC-00001");
        assert_eq!(taxi.expense_account_id, chart["6700"].id);
        assert!(taxi.journal_entry_id.is_some());

        let other = ledger
            .record_expense(NewExpense::new(d(2024, 3, 2), "Team offsite", "Snacks", BigDecimal::from(15)))
            .await
            .unwrap();
        assert_eq!(other.expense_account_id, chart["6950"].id);

        assert_eq!(ledger.petty_cash_balance().await.unwrap(), BigDecimal::from(-40));
        assert_eq!(
            ledger.account_balance(chart["6700"].id, None, None).await.unwrap(),
            BigDecimal::from(25)
        );

        let march_first = ledger.list_expenses(None, Some(d(2024, 3, 1))).await.unwrap();
        assert_eq!(march_first.len(), 1);
    }

    #[tokio::test]
    async fn test_expense_validation_and_lock() {
        let mut ledger = Ledger::new(MemoryStorage::new(), "t1", LedgerConfig::default()).unwrap();
        ledger.setup_standard_chart_of_accounts().await.unwrap();

        assert!(ledger
            .record_expense(NewExpense::new(d(2024, 3, 1), "Miscellaneous", "Nothing", money::zero()))
            .await
            .is_err());

        ledger.lock_period(2024, 3).await.unwrap();
        let locked = ledger
            .record_expense(NewExpense::new(d(2024, 3, 5), "Miscellaneous", "Tape", BigDecimal::from(3)))
            .await;
        assert!(matches!(locked, Err(LedgerError::PeriodLocked { .. })));
        assert!(ledger.list_expenses(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expense_without_chart_fails() {
        let mut ledger = Ledger::new(MemoryStorage::new(), "t1", LedgerConfig::default()).unwrap();
        let result = ledger
            .record_expense(NewExpense::new(d(2024, 3, 1), "Office Supplies", "Pens", BigDecimal::from(5)))
            .await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));
    }
}
