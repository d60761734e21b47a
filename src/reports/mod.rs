//! Read-side financial and operational reports
//!
//! Reports never write. Every figure is aggregated from posted journal lines
//! or from the stored documents at the time of the call.

pub mod aging;
pub mod budget;
pub mod cash_flow;
pub mod detail;
pub mod operations;
pub mod statements;

pub use aging::*;
pub use budget::*;
pub use cash_flow::*;
pub use detail::*;
pub use operations::*;
pub use statements::*;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::ledger::balance::BalanceAggregator;
use crate::traits::{LedgerStorage, ReportGenerator};
use crate::types::*;

/// One account's figure on a statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountAmount {
    pub account_id: Uuid,
    pub code: String,
    pub name: String,
    pub amount: BigDecimal,
}

impl AccountAmount {
    pub fn new(account: &Account, amount: BigDecimal) -> Self {
        Self {
            account_id: account.id,
            code: account.code.clone(),
            name: account.name.clone(),
            amount,
        }
    }
}

/// Report generator for one tenant
pub struct Reports<S: LedgerStorage> {
    pub(crate) storage: S,
    pub(crate) tenant_id: String,
    pub(crate) config: LedgerConfig,
    pub(crate) balances: BalanceAggregator<S>,
}

impl<S: LedgerStorage + Clone> Reports<S> {
    pub fn new(storage: S, tenant_id: impl Into<String>, config: LedgerConfig) -> Self {
        let tenant_id = tenant_id.into();
        Self {
            balances: BalanceAggregator::new(storage.clone(), tenant_id.clone()),
            storage,
            tenant_id,
            config,
        }
    }

    /// Accounts of a type, ordered by code
    pub(crate) async fn accounts_of(&self, account_type: AccountType) -> LedgerResult<Vec<Account>> {
        self.storage
            .list_accounts(&self.tenant_id, Some(account_type))
            .await
    }

    /// Accounts whose code is one of `codes`, in the order of `codes`
    pub(crate) async fn accounts_with_codes(&self, codes: &[&str]) -> LedgerResult<Vec<Account>> {
        let accounts = self.storage.list_accounts(&self.tenant_id, None).await?;
        Ok(codes
            .iter()
            .filter_map(|code| accounts.iter().find(|a| a.code == *code).cloned())
            .collect())
    }

    /// Revenue (credit - debit) less expenses (debit - credit) over the range
    pub(crate) async fn net_income(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<BigDecimal> {
        let revenue = self.accounts_of(AccountType::Revenue).await?;
        let expenses = self.accounts_of(AccountType::Expense).await?;
        let total_revenue = self
            .balances
            .sum_as(&revenue, EntryType::Credit, start_date, end_date)
            .await?;
        let total_expenses = self
            .balances
            .sum_as(&expenses, EntryType::Debit, start_date, end_date)
            .await?;
        Ok(total_revenue - total_expenses)
    }
}

#[async_trait]
impl<S: LedgerStorage + Clone> ReportGenerator for Reports<S> {
    async fn generate_balance_sheet(&self, as_of_date: NaiveDate) -> LedgerResult<BalanceSheet> {
        self.balance_sheet(as_of_date).await
    }

    async fn generate_profit_and_loss(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<ProfitAndLoss> {
        self.profit_and_loss(start_date, end_date).await
    }

    async fn generate_cash_flow(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<CashFlowStatement> {
        self.cash_flow(start_date, end_date).await
    }
}

/// The day before `date`, used for opening balances
pub(crate) fn day_before(date: NaiveDate) -> LedgerResult<NaiveDate> {
    date.pred_opt()
        .ok_or_else(|| LedgerError::Validation(format!("No date precedes {}", date)))
}

pub(crate) fn ensure_range(start_date: NaiveDate, end_date: NaiveDate) -> LedgerResult<()> {
    if start_date > end_date {
        return Err(LedgerError::Validation(format!(
            "Start date {} is after end date {}",
            start_date, end_date
        )));
    }
    Ok(())
}
