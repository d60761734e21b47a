//! Monthly budgets for revenue and expense accounts

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::commerce::documents::Budget;
use crate::ledger::Ledger;
use crate::traits::*;
use crate::types::*;
use crate::utils::money;

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Set the twelve monthly amounts of an account's budget for `year`.
    ///
    /// Existing months are overwritten, zero included; a zero amount never
    /// creates a new row.
    pub async fn set_budget(
        &mut self,
        account_id: Uuid,
        year: i32,
        monthly_amounts: [BigDecimal; 12],
    ) -> LedgerResult<Vec<Budget>> {
        let account = self.require_account(account_id).await?;
        if !matches!(account.account_type, AccountType::Revenue | AccountType::Expense) {
            return Err(LedgerError::Validation(format!(
                "Budgets apply to revenue and expense accounts; {} is {:?}",
                account.code, account.account_type
            )));
        }

        let existing: Vec<Budget> = self
            .storage
            .list_budgets(&self.tenant_id, year)
            .await?
            .into_iter()
            .filter(|b| b.account_id == account_id)
            .collect();

        let mut unit = UnitOfWork::new();
        let mut saved = Vec::new();
        for (index, amount) in monthly_amounts.into_iter().enumerate() {
            let month = index as u32 + 1;
            let budget = match existing.iter().find(|b| b.month == month) {
                Some(row) => Budget {
                    amount,
                    ..row.clone()
                },
                None if money::is_zero(&amount) => continue,
                None => Budget {
                    id: Uuid::new_v4(),
                    account_id,
                    year,
                    month,
                    amount,
                },
            };
            unit.push(Change::SaveBudget(budget.clone()));
            saved.push(budget);
        }

        if !unit.is_empty() {
            self.commit(unit).await?;
        }
        tracing::info!(tenant = %self.tenant_id, account = %account.code, year, months = saved.len(), "budget saved");
        Ok(saved)
    }

    /// Budget rows of a year, ordered by account then month
    pub async fn list_budgets(&self, year: i32) -> LedgerResult<Vec<Budget>> {
        let mut budgets = self.storage.list_budgets(&self.tenant_id, year).await?;
        budgets.sort_by(|a, b| a.account_id.cmp(&b.account_id).then(a.month.cmp(&b.month)));
        Ok(budgets)
    }

    /// Remove every month of an account's budget for `year`
    pub async fn delete_budget(&mut self, account_id: Uuid, year: i32) -> LedgerResult<usize> {
        let mut unit = UnitOfWork::new();
        let mut removed = 0;
        for budget in self.storage.list_budgets(&self.tenant_id, year).await? {
            if budget.account_id == account_id {
                unit.push(Change::DeleteBudget(budget.id));
                removed += 1;
            }
        }
        if !unit.is_empty() {
            self.commit(unit).await?;
        }
        Ok(removed)
    }
}
