//! Trial balance, profit and loss, balance sheet and changes in equity

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::fiscal::fiscal_year_start;
use crate::reports::{day_before, ensure_range, AccountAmount, Reports};
use crate::traits::LedgerStorage;
use crate::types::*;
use crate::utils::money;

/// Sub-type that separates cost of sales from operating expenses
pub const COST_OF_SALES: &str = "Cost of Sales";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub account_id: Uuid,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    /// Net debit; zero when the account nets to a credit
    pub debit: BigDecimal,
    /// Net credit; zero when the account nets to a debit
    pub credit: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub start_date: Option<NaiveDate>,
    pub end_date: NaiveDate,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debits: BigDecimal,
    pub total_credits: BigDecimal,
    pub is_balanced: bool,
}

impl TrialBalance {
    pub fn row(&self, code: &str) -> Option<&TrialBalanceRow> {
        self.rows.iter().find(|r| r.code == code)
    }
}

/// Account figure for the report period and the period before it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparativeAmount {
    pub account_id: Uuid,
    pub code: String,
    pub name: String,
    pub current: BigDecimal,
    pub prior: BigDecimal,
}

/// Income statement with a same-length comparative period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitAndLoss {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub prior_start_date: NaiveDate,
    pub prior_end_date: NaiveDate,
    pub revenue: Vec<ComparativeAmount>,
    pub cost_of_sales: Vec<ComparativeAmount>,
    pub operating_expenses: Vec<ComparativeAmount>,
    pub total_revenue: BigDecimal,
    pub prior_total_revenue: BigDecimal,
    pub total_cost_of_sales: BigDecimal,
    pub prior_total_cost_of_sales: BigDecimal,
    pub gross_profit: BigDecimal,
    pub prior_gross_profit: BigDecimal,
    pub total_operating_expenses: BigDecimal,
    pub prior_total_operating_expenses: BigDecimal,
    /// Cost of sales plus operating expenses
    pub total_expenses: BigDecimal,
    pub prior_total_expenses: BigDecimal,
    pub net_income: BigDecimal,
    pub prior_net_income: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub as_of_date: NaiveDate,
    pub fiscal_year_start: NaiveDate,
    pub assets: Vec<AccountAmount>,
    pub liabilities: Vec<AccountAmount>,
    pub equity: Vec<AccountAmount>,
    pub total_assets: BigDecimal,
    pub total_liabilities: BigDecimal,
    /// Net income from the start of the fiscal year to `as_of_date`
    pub current_year_net_income: BigDecimal,
    /// Earlier net income not yet closed into retained earnings
    pub unclosed_prior_earnings: BigDecimal,
    /// Equity accounts plus both earnings lines
    pub total_equity: BigDecimal,
    pub total_liabilities_and_equity: BigDecimal,
    pub is_balanced: bool,
    pub prior_as_of_date: NaiveDate,
    pub prior_total_assets: BigDecimal,
    pub prior_total_liabilities: BigDecimal,
    pub prior_total_equity: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityRow {
    pub account_id: Uuid,
    pub code: String,
    pub name: String,
    pub opening: BigDecimal,
    pub change: BigDecimal,
    pub closing: BigDecimal,
}

/// Statement of changes in equity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityStatement {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rows: Vec<EquityRow>,
    pub net_income: BigDecimal,
    pub total_opening: BigDecimal,
    pub total_change: BigDecimal,
    pub total_closing: BigDecimal,
}

impl<S: LedgerStorage + Clone> Reports<S> {
    /// Net debit or credit of every account with activity in the range
    pub async fn trial_balance(
        &self,
        start_date: Option<NaiveDate>,
        end_date: NaiveDate,
    ) -> LedgerResult<TrialBalance> {
        if let Some(start) = start_date {
            ensure_range(start, end_date)?;
        }

        let mut rows = Vec::new();
        let mut total_debits = money::zero();
        let mut total_credits = money::zero();

        for account_type in AccountType::all() {
            for account in self.accounts_of(account_type).await? {
                let totals = self.balances.totals(account.id, start_date, Some(end_date)).await?;
                if !totals.is_material() {
                    continue;
                }
                let row = TrialBalanceRow {
                    account_id: account.id,
                    code: account.code.clone(),
                    name: account.name.clone(),
                    account_type,
                    debit: totals.net_debit(),
                    credit: totals.net_credit(),
                };
                total_debits += &row.debit;
                total_credits += &row.credit;
                rows.push(row);
            }
        }

        let is_balanced = money::within_tolerance(&(&total_debits - &total_credits));
        Ok(TrialBalance {
            start_date,
            end_date,
            rows,
            total_debits,
            total_credits,
            is_balanced,
        })
    }

    /// Profit and loss for the range, compared with the same number of days
    /// immediately before it
    pub async fn profit_and_loss(&self, start_date: NaiveDate, end_date: NaiveDate) -> LedgerResult<ProfitAndLoss> {
        ensure_range(start_date, end_date)?;
        let prior_end_date = day_before(start_date)?;
        let prior_start_date = prior_end_date
            .checked_sub_signed(end_date - start_date)
            .ok_or_else(|| {
                LedgerError::Validation(format!(
                    "No comparative period precedes {}",
                    start_date
                ))
            })?;

        let current = (Some(start_date), Some(end_date));
        let prior = (Some(prior_start_date), Some(prior_end_date));

        let revenue = self
            .comparative(AccountType::Revenue, EntryType::Credit, current, prior)
            .await?;
        let (cost_of_sales, operating_expenses): (Vec<_>, Vec<_>) = self
            .comparative(AccountType::Expense, EntryType::Debit, current, prior)
            .await?
            .into_iter()
            .partition(|(account, _)| account.has_sub_type(COST_OF_SALES));

        let revenue: Vec<ComparativeAmount> = revenue.into_iter().map(|(_, row)| row).collect();
        let cost_of_sales: Vec<ComparativeAmount> = cost_of_sales.into_iter().map(|(_, row)| row).collect();
        let operating_expenses: Vec<ComparativeAmount> =
            operating_expenses.into_iter().map(|(_, row)| row).collect();

        let (total_revenue, prior_total_revenue) = sum_comparative(&revenue);
        let (total_cost_of_sales, prior_total_cost_of_sales) = sum_comparative(&cost_of_sales);
        let (total_operating_expenses, prior_total_operating_expenses) = sum_comparative(&operating_expenses);

        let gross_profit = &total_revenue - &total_cost_of_sales;
        let prior_gross_profit = &prior_total_revenue - &prior_total_cost_of_sales;
        let total_expenses = &total_cost_of_sales + &total_operating_expenses;
        let prior_total_expenses = &prior_total_cost_of_sales + &prior_total_operating_expenses;
        let net_income = &total_revenue - &total_expenses;
        let prior_net_income = &prior_total_revenue - &prior_total_expenses;

        Ok(ProfitAndLoss {
            start_date,
            end_date,
            prior_start_date,
            prior_end_date,
            revenue,
            cost_of_sales,
            operating_expenses,
            total_revenue,
            prior_total_revenue,
            total_cost_of_sales,
            prior_total_cost_of_sales,
            gross_profit,
            prior_gross_profit,
            total_operating_expenses,
            prior_total_operating_expenses,
            total_expenses,
            prior_total_expenses,
            net_income,
            prior_net_income,
        })
    }

    /// Balance sheet as of a date, with unclosed earnings folded into equity
    /// and totals for the same date a year earlier
    pub async fn balance_sheet(&self, as_of_date: NaiveDate) -> LedgerResult<BalanceSheet> {
        let fiscal_year_start = fiscal_year_start(as_of_date, self.config.fiscal_year_start_month)?;

        let (assets, total_assets) = self.section(AccountType::Asset, EntryType::Debit, as_of_date).await?;
        let (liabilities, total_liabilities) =
            self.section(AccountType::Liability, EntryType::Credit, as_of_date).await?;
        let (equity, equity_accounts) = self.section(AccountType::Equity, EntryType::Credit, as_of_date).await?;

        let current_year_net_income = self.net_income(Some(fiscal_year_start), Some(as_of_date)).await?;
        let unclosed_prior_earnings = self.net_income(None, Some(day_before(fiscal_year_start)?)).await?;
        let total_equity = equity_accounts + &current_year_net_income + &unclosed_prior_earnings;
        let total_liabilities_and_equity = &total_liabilities + &total_equity;
        let is_balanced = money::within_tolerance(&(&total_assets - &total_liabilities_and_equity));

        let prior_as_of_date = NaiveDate::from_ymd_opt(
            as_of_date.year() - 1,
            as_of_date.month(),
            as_of_date.day().min(28),
        )
        .ok_or_else(|| LedgerError::Validation(format!("No comparative date for {}", as_of_date)))?;
        let (_, prior_total_assets) = self.section(AccountType::Asset, EntryType::Debit, prior_as_of_date).await?;
        let (_, prior_total_liabilities) =
            self.section(AccountType::Liability, EntryType::Credit, prior_as_of_date).await?;
        let (_, prior_equity_accounts) =
            self.section(AccountType::Equity, EntryType::Credit, prior_as_of_date).await?;
        let prior_total_equity = prior_equity_accounts + self.net_income(None, Some(prior_as_of_date)).await?;

        Ok(BalanceSheet {
            as_of_date,
            fiscal_year_start,
            assets,
            liabilities,
            equity,
            total_assets,
            total_liabilities,
            current_year_net_income,
            unclosed_prior_earnings,
            total_equity,
            total_liabilities_and_equity,
            is_balanced,
            prior_as_of_date,
            prior_total_assets,
            prior_total_liabilities,
            prior_total_equity,
        })
    }

    /// Opening, change and closing of each equity account over the range
    pub async fn equity_statement(&self, start_date: NaiveDate, end_date: NaiveDate) -> LedgerResult<EquityStatement> {
        ensure_range(start_date, end_date)?;
        let opening_date = day_before(start_date)?;

        let mut rows = Vec::new();
        let mut total_opening = money::zero();
        let mut total_change = money::zero();
        let mut total_closing = money::zero();

        for account in self.accounts_of(AccountType::Equity).await? {
            let opening = self
                .balances
                .balance_as(&account, EntryType::Credit, None, Some(opening_date))
                .await?;
            let change = self
                .balances
                .balance_as(&account, EntryType::Credit, Some(start_date), Some(end_date))
                .await?;
            if !account.is_active && !money::is_material(&opening) && !money::is_material(&change) {
                continue;
            }
            let closing = &opening + &change;
            total_opening += &opening;
            total_change += &change;
            total_closing += &closing;
            rows.push(EquityRow {
                account_id: account.id,
                code: account.code.clone(),
                name: account.name.clone(),
                opening,
                change,
                closing,
            });
        }

        Ok(EquityStatement {
            start_date,
            end_date,
            rows,
            net_income: self.net_income(Some(start_date), Some(end_date)).await?,
            total_opening,
            total_change,
            total_closing,
        })
    }

    /// Materially non-zero balances of one type as of a date, signed towards `side`
    async fn section(
        &self,
        account_type: AccountType,
        side: EntryType,
        as_of_date: NaiveDate,
    ) -> LedgerResult<(Vec<AccountAmount>, BigDecimal)> {
        let mut rows = Vec::new();
        let mut total = money::zero();
        for account in self.accounts_of(account_type).await? {
            let balance = self.balances.balance_as(&account, side, None, Some(as_of_date)).await?;
            if money::is_material(&balance) {
                total += &balance;
                rows.push(AccountAmount::new(&account, balance));
            }
        }
        Ok((rows, total))
    }

    async fn comparative(
        &self,
        account_type: AccountType,
        side: EntryType,
        (start, end): (Option<NaiveDate>, Option<NaiveDate>),
        (prior_start, prior_end): (Option<NaiveDate>, Option<NaiveDate>),
    ) -> LedgerResult<Vec<(Account, ComparativeAmount)>> {
        let mut rows = Vec::new();
        for account in self.accounts_of(account_type).await? {
            let current = self.balances.balance_as(&account, side, start, end).await?;
            let prior = self.balances.balance_as(&account, side, prior_start, prior_end).await?;
            if !money::is_material(&current) && !money::is_material(&prior) {
                continue;
            }
            let row = ComparativeAmount {
                account_id: account.id,
                code: account.code.clone(),
                name: account.name.clone(),
                current,
                prior,
            };
            rows.push((account, row));
        }
        Ok(rows)
    }
}

fn sum_comparative(rows: &[ComparativeAmount]) -> (BigDecimal, BigDecimal) {
    rows.iter().fold((money::zero(), money::zero()), |(current, prior), row| {
        (current + &row.current, prior + &row.prior)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::ledger::journal::ManualEntry;
    use crate::ledger::Ledger;
    use crate::utils::MemoryStorage;
    use std::collections::HashMap;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn post(
        ledger: &mut Ledger<MemoryStorage>,
        chart: &HashMap<String, Account>,
        date: NaiveDate,
        debit: &str,
        credit: &str,
        amount: i64,
    ) {
        ledger
            .create_journal_entry(ManualEntry {
                date,
                description: format!("{} / {}", debit, credit),
                reference: None,
                lines: vec![
                    JournalLine::debit(chart[debit].id, BigDecimal::from(amount), "dr"),
                    JournalLine::credit(chart[credit].id, BigDecimal::from(amount), "cr"),
                ],
                post: true,
            })
            .await
            .unwrap();
    }

    async fn trading_ledger() -> (Ledger<MemoryStorage>, HashMap<String, Account>) {
        let mut ledger = Ledger::new(MemoryStorage::new(), "t1", LedgerConfig::default()).unwrap();
        let chart = ledger.setup_standard_chart_of_accounts().await.unwrap();
        post(&mut ledger, &chart, d(2023, 6, 1), "1100", "3000", 10000).await;
        post(&mut ledger, &chart, d(2023, 12, 10), "1200", "4000", 3000).await;
        post(&mut ledger, &chart, d(2023, 12, 11), "5000", "1300", 1000).await;
        post(&mut ledger, &chart, d(2024, 1, 10), "1200", "4000", 5000).await;
        post(&mut ledger, &chart, d(2024, 1, 11), "5000", "1300", 2000).await;
        post(&mut ledger, &chart, d(2024, 1, 20), "6400", "1100", 800).await;
        post(&mut ledger, &chart, d(2024, 1, 25), "1100", "1200", 4000).await;
        (ledger, chart)
    }

    #[tokio::test]
    async fn test_trial_balance_nets_each_account() {
        let (ledger, _) = trading_ledger().await;
        let tb = ledger.reports().trial_balance(None, d(2024, 1, 31)).await.unwrap();

        assert!(tb.is_balanced);
        assert_eq!(tb.total_debits, tb.total_credits);
        let receivable = tb.row("1200").unwrap();
        assert_eq!(receivable.debit, BigDecimal::from(4000));
        assert_eq!(receivable.credit, money::zero());
        let inventory = tb.row("1300").unwrap();
        assert_eq!(inventory.debit, money::zero());
        assert_eq!(inventory.credit, BigDecimal::from(3000));
        assert!(tb.rows.iter().all(|r| money::is_zero(&r.debit) || money::is_zero(&r.credit)));
        assert!(tb.row("6000").is_none());
    }

    #[tokio::test]
    async fn test_profit_and_loss_with_prior_period() {
        let (ledger, _) = trading_ledger().await;
        let pl = ledger
            .reports()
            .profit_and_loss(d(2024, 1, 1), d(2024, 1, 31))
            .await
            .unwrap();

        assert_eq!(pl.prior_start_date, d(2023, 12, 1));
        assert_eq!(pl.prior_end_date, d(2023, 12, 31));
        assert_eq!(pl.total_revenue, BigDecimal::from(5000));
        assert_eq!(pl.total_cost_of_sales, BigDecimal::from(2000));
        assert_eq!(pl.gross_profit, BigDecimal::from(3000));
        assert_eq!(pl.total_operating_expenses, BigDecimal::from(800));
        assert_eq!(pl.net_income, BigDecimal::from(2200));
        assert_eq!(pl.prior_total_revenue, BigDecimal::from(3000));
        assert_eq!(pl.prior_net_income, BigDecimal::from(2000));
        assert_eq!(pl.cost_of_sales.len(), 1);
        assert_eq!(pl.operating_expenses[0].code, "6400");

        assert!(ledger.reports().profit_and_loss(d(2024, 2, 1), d(2024, 1, 1)).await.is_err());

        let earliest = NaiveDate::MIN.succ_opt().unwrap();
        let unbounded = ledger.reports().profit_and_loss(earliest, d(2024, 1, 31)).await;
        assert!(matches!(unbounded, Err(LedgerError::Validation(_))));
        assert!(ledger.reports().profit_and_loss(NaiveDate::MIN, d(2024, 1, 31)).await.is_err());
    }

    #[tokio::test]
    async fn test_balance_sheet_folds_in_earnings() {
        let (ledger, _) = trading_ledger().await;
        let sheet = ledger.reports().balance_sheet(d(2024, 1, 31)).await.unwrap();

        assert_eq!(sheet.fiscal_year_start, d(2024, 1, 1));
        assert_eq!(sheet.current_year_net_income, BigDecimal::from(2200));
        assert_eq!(sheet.unclosed_prior_earnings, BigDecimal::from(2000));
        assert_eq!(sheet.total_assets, BigDecimal::from(14200));
        assert_eq!(sheet.total_equity, BigDecimal::from(14200));
        assert!(sheet.is_balanced);

        assert_eq!(sheet.prior_as_of_date, d(2023, 1, 31));
        assert_eq!(sheet.prior_total_assets, money::zero());
    }

    #[tokio::test]
    async fn test_balance_sheet_after_year_end_close() {
        let (mut ledger, chart) = trading_ledger().await;
        ledger.close_fiscal_year(2023).await.unwrap();
        let sheet = ledger.reports().balance_sheet(d(2024, 1, 31)).await.unwrap();

        assert_eq!(sheet.unclosed_prior_earnings, money::zero());
        let retained = sheet.equity.iter().find(|a| a.account_id == chart["3200"].id).unwrap();
        assert_eq!(retained.amount, BigDecimal::from(2000));
        assert!(sheet.is_balanced);
    }

    #[tokio::test]
    async fn test_equity_statement() {
        let (mut ledger, chart) = trading_ledger().await;
        post(&mut ledger, &chart, d(2024, 1, 28), "3100", "1100", 500).await;
        let statement = ledger
            .reports()
            .equity_statement(d(2024, 1, 1), d(2024, 1, 31))
            .await
            .unwrap();

        let capital = statement.rows.iter().find(|r| r.code == "3000").unwrap();
        assert_eq!(capital.opening, BigDecimal::from(10000));
        assert_eq!(capital.change, money::zero());
        let draw = statement.rows.iter().find(|r| r.code == "3100").unwrap();
        assert_eq!(draw.change, BigDecimal::from(-500));
        assert_eq!(statement.total_closing, BigDecimal::from(9500));
        assert_eq!(statement.net_income, BigDecimal::from(2200));
    }
}
