//! Budget versus actual

use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reports::Reports;
use crate::traits::LedgerStorage;
use crate::types::*;
use crate::utils::money;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRow {
    pub account_id: Uuid,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub budget: BigDecimal,
    pub actual: BigDecimal,
    /// `actual - budget`
    pub variance: BigDecimal,
    /// Variance as a percentage of the budget, rounded to cents
    pub variance_pct: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetVsActual {
    pub year: i32,
    pub rows: Vec<BudgetRow>,
    pub total_budget_revenue: BigDecimal,
    pub total_actual_revenue: BigDecimal,
    pub total_budget_expenses: BigDecimal,
    pub total_actual_expenses: BigDecimal,
}

impl<S: LedgerStorage + Clone> Reports<S> {
    /// Calendar-year budget against posted activity for every account with a
    /// non-zero budget
    pub async fn budget_vs_actual(&self, year: i32) -> LedgerResult<BudgetVsActual> {
        let invalid = || LedgerError::Validation(format!("Invalid budget year {}", year));
        let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(invalid)?;

        let mut budgets: BTreeMap<Uuid, BigDecimal> = BTreeMap::new();
        for budget in self.storage.list_budgets(&self.tenant_id, year).await? {
            *budgets.entry(budget.account_id).or_insert_with(money::zero) += budget.amount;
        }

        let mut report = BudgetVsActual {
            year,
            rows: Vec::new(),
            total_budget_revenue: money::zero(),
            total_actual_revenue: money::zero(),
            total_budget_expenses: money::zero(),
            total_actual_expenses: money::zero(),
        };

        for account_type in [AccountType::Revenue, AccountType::Expense] {
            let side = match account_type {
                AccountType::Revenue => EntryType::Credit,
                _ => EntryType::Debit,
            };
            for account in self.accounts_of(account_type).await? {
                let Some(budget) = budgets.get(&account.id).filter(|b| !money::is_zero(b)) else {
                    continue;
                };
                let actual = self
                    .balances
                    .balance_as(&account, side, Some(start), Some(end))
                    .await?;
                let variance = &actual - budget;
                let variance_pct = money::round(&(&variance * BigDecimal::from(100) / budget));

                if account_type == AccountType::Revenue {
                    report.total_budget_revenue += budget;
                    report.total_actual_revenue += &actual;
                } else {
                    report.total_budget_expenses += budget;
                    report.total_actual_expenses += &actual;
                }
                report.rows.push(BudgetRow {
                    account_id: account.id,
                    code: account.code.clone(),
                    name: account.name.clone(),
                    account_type,
                    budget: budget.clone(),
                    actual,
                    variance,
                    variance_pct,
                });
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::ledger::journal::ManualEntry;
    use crate::ledger::Ledger;
    use crate::utils::MemoryStorage;

    #[tokio::test]
    async fn test_budget_vs_actual() {
        let mut ledger = Ledger::new(MemoryStorage::new(), "t1", LedgerConfig::default()).unwrap();
        let c = ledger.setup_standard_chart_of_accounts().await.unwrap();

        let mut rent = std::array::from_fn(|_| money::zero());
        rent[0] = BigDecimal::from(500);
        rent[1] = BigDecimal::from(500);
        ledger.set_budget(c["6400"].id, 2024, rent).await.unwrap();
        let sales = std::array::from_fn(|_| BigDecimal::from(100));
        ledger.set_budget(c["4000"].id, 2024, sales).await.unwrap();
        ledger
            .set_budget(c["6600"].id, 2024, std::array::from_fn(|_| money::zero()))
            .await
            .unwrap();

        ledger
            .create_journal_entry(ManualEntry {
                date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                description: "Rent".to_string(),
                reference: None,
                lines: vec![
                    JournalLine::debit(c["6400"].id, BigDecimal::from(1100), "rent"),
                    JournalLine::credit(c["1100"].id, BigDecimal::from(1100), "rent"),
                ],
                post: true,
            })
            .await
            .unwrap();

        let report = ledger.reports().budget_vs_actual(2024).await.unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].code, "4000");
        assert_eq!(report.rows[0].budget, BigDecimal::from(1200));
        assert_eq!(report.rows[0].variance_pct, money::round(&BigDecimal::from(-100)));

        let rent_row = &report.rows[1];
        assert_eq!(rent_row.actual, BigDecimal::from(1100));
        assert_eq!(rent_row.variance, BigDecimal::from(100));
        assert_eq!(rent_row.variance_pct, money::round(&BigDecimal::from(10)));
        assert_eq!(report.total_budget_expenses, BigDecimal::from(1000));
    }
}
