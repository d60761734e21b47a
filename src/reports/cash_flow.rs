//! Indirect-method cash-flow statement

use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reports::{day_before, ensure_range, Reports};
use crate::traits::LedgerStorage;
use crate::types::*;
use crate::utils::money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashFlowActivity {
    Operating,
    Investing,
    Financing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowItem {
    pub label: String,
    pub amount: BigDecimal,
    /// Journal entry behind an investing or financing item
    pub entry_id: Option<Uuid>,
}

impl CashFlowItem {
    fn new(label: impl Into<String>, amount: BigDecimal) -> Self {
        Self {
            label: label.into(),
            amount,
            entry_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub net_income: BigDecimal,
    /// Net income, non-cash add-backs and working-capital changes
    pub operating: Vec<CashFlowItem>,
    pub investing: Vec<CashFlowItem>,
    pub financing: Vec<CashFlowItem>,
    pub net_operating: BigDecimal,
    pub net_investing: BigDecimal,
    pub net_financing: BigDecimal,
    pub net_change: BigDecimal,
    pub opening_cash: BigDecimal,
    pub closing_cash: BigDecimal,
    /// Closing minus opening cash, straight from the cash accounts
    pub actual_cash_change: BigDecimal,
    /// Cash moved by entries the three sections do not explain
    pub unclassified_cash_movement: BigDecimal,
    pub is_reconciled: bool,
}

impl<S: LedgerStorage + Clone> Reports<S> {
    pub async fn cash_flow(&self, start_date: NaiveDate, end_date: NaiveDate) -> LedgerResult<CashFlowStatement> {
        ensure_range(start_date, end_date)?;
        let roles = &self.config.roles;
        let opening_date = day_before(start_date)?;
        let (start, end) = (Some(start_date), Some(end_date));

        let cash_accounts = self.accounts_with_codes(&roles.cash_codes()).await?;
        let opening_cash = self
            .balances
            .sum_as(&cash_accounts, EntryType::Debit, None, Some(opening_date))
            .await?;
        let closing_cash = self
            .balances
            .sum_as(&cash_accounts, EntryType::Debit, None, Some(end_date))
            .await?;
        let actual_cash_change = &closing_cash - &opening_cash;

        let net_income = self.net_income(start, end).await?;
        let mut operating = vec![CashFlowItem::new("Net income", net_income.clone())];

        for account in self.accounts_with_codes(&[roles.depreciation.as_str()]).await? {
            let depreciation = self.balances.balance_as(&account, EntryType::Debit, start, end).await?;
            if money::is_material(&depreciation) {
                operating.push(CashFlowItem::new(format!("Add back: {}", account.name), depreciation));
            }
        }

        for account in self.accounts_with_codes(&roles.working_capital_assets()).await? {
            let change = self.balances.balance_as(&account, EntryType::Debit, start, end).await?;
            if money::is_material(&change) {
                let label = if change > money::zero() { "Increase" } else { "Decrease" };
                operating.push(CashFlowItem::new(format!("{} in {}", label, account.name), -change));
            }
        }
        for account in self.accounts_with_codes(&roles.working_capital_liabilities()).await? {
            let change = self.balances.balance_as(&account, EntryType::Credit, start, end).await?;
            if money::is_material(&change) {
                let label = if change > money::zero() { "Increase" } else { "Decrease" };
                operating.push(CashFlowItem::new(format!("{} in {}", label, account.name), change));
            }
        }

        let (investing, financing) = self.classify_cash_entries(&cash_accounts, start_date, end_date).await?;

        let net_operating = total(&operating);
        let net_investing = total(&investing);
        let net_financing = total(&financing);
        let net_change = &net_operating + &net_investing + &net_financing;
        let unclassified_cash_movement = &actual_cash_change - &net_change;
        let is_reconciled = money::within_tolerance(&unclassified_cash_movement);

        if !is_reconciled {
            tracing::debug!(
                tenant = %self.tenant_id,
                unclassified = %unclassified_cash_movement,
                "cash flow does not reconcile to cash accounts"
            );
        }

        Ok(CashFlowStatement {
            start_date,
            end_date,
            net_income,
            operating,
            investing,
            financing,
            net_operating,
            net_investing,
            net_financing,
            net_change,
            opening_cash,
            closing_cash,
            actual_cash_change,
            unclassified_cash_movement,
            is_reconciled,
        })
    }

    /// Sort posted entries that move cash into investing and financing items
    /// by the first non-cash account they touch
    async fn classify_cash_entries(
        &self,
        cash_accounts: &[Account],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<(Vec<CashFlowItem>, Vec<CashFlowItem>)> {
        let accounts: HashMap<Uuid, Account> = self
            .storage
            .list_accounts(&self.tenant_id, None)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();
        let is_cash = |id: Uuid| cash_accounts.iter().any(|a| a.id == id);

        let entries = self
            .storage
            .list_entries(
                &self.tenant_id,
                &EntryFilter::posted_between(Some(start_date), Some(end_date)),
            )
            .await?;

        let mut investing = Vec::new();
        let mut financing = Vec::new();
        for entry in entries {
            let cash_movement: BigDecimal = entry
                .lines
                .iter()
                .filter(|line| is_cash(line.account_id))
                .map(|line| &line.debit - &line.credit)
                .sum();
            if !money::is_material(&cash_movement) {
                continue;
            }
            let inflow = cash_movement > money::zero();

            let classified = entry
                .lines
                .iter()
                .filter(|line| !is_cash(line.account_id))
                .filter_map(|line| accounts.get(&line.account_id))
                .find_map(|account| self.classify(account, inflow));

            if let Some((activity, label)) = classified {
                let item = CashFlowItem {
                    label,
                    amount: cash_movement,
                    entry_id: Some(entry.id),
                };
                match activity {
                    CashFlowActivity::Investing => investing.push(item),
                    CashFlowActivity::Financing => financing.push(item),
                    CashFlowActivity::Operating => {}
                }
            }
        }
        Ok((investing, financing))
    }

    fn classify(&self, account: &Account, inflow: bool) -> Option<(CashFlowActivity, String)> {
        let pick = |inflow_label: &str, outflow_label: &str| {
            if inflow {
                inflow_label.to_string()
            } else {
                outflow_label.to_string()
            }
        };

        if account.has_sub_type("Fixed Asset") {
            let label = if inflow {
                "Sale of assets".to_string()
            } else {
                format!("Purchase of assets ({})", account.name)
            };
            return Some((CashFlowActivity::Investing, label));
        }
        if account.account_type == AccountType::Equity {
            return Some((CashFlowActivity::Financing, pick("Capital contributed", "Owner's draw")));
        }
        if account.has_sub_type("Long-term Liability") {
            return Some((CashFlowActivity::Financing, pick("Loan proceeds", "Loan repayment")));
        }
        if account.has_sub_type("Current Liability") && account.code == self.config.roles.short_term_loan {
            return Some((
                CashFlowActivity::Financing,
                pick("Short-term borrowing", "Short-term loan repayment"),
            ));
        }
        None
    }
}

fn total(items: &[CashFlowItem]) -> BigDecimal {
    items.iter().map(|item| &item.amount).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::ledger::journal::ManualEntry;
    use crate::ledger::Ledger;
    use crate::utils::MemoryStorage;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn post(ledger: &mut Ledger<MemoryStorage>, date: NaiveDate, lines: Vec<JournalLine>) {
        ledger
            .create_journal_entry(ManualEntry {
                date,
                description: "test".to_string(),
                reference: None,
                lines,
                post: true,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cash_flow_reconciles() {
        let mut ledger = Ledger::new(MemoryStorage::new(), "t1", LedgerConfig::default()).unwrap();
        let c = ledger.setup_standard_chart_of_accounts().await.unwrap();
        let amt = BigDecimal::from;
        let date = d(2024, 3, 1);

        post(&mut ledger, date, vec![
            JournalLine::debit(c["1100"].id, amt(10000), "capital"),
            JournalLine::credit(c["3000"].id, amt(10000), "capital"),
        ]).await;
        post(&mut ledger, date, vec![
            JournalLine::debit(c["1200"].id, amt(5000), "sale"),
            JournalLine::credit(c["4000"].id, amt(5000), "sale"),
        ]).await;
        post(&mut ledger, date, vec![
            JournalLine::debit(c["1100"].id, amt(4000), "collection"),
            JournalLine::credit(c["1200"].id, amt(4000), "collection"),
        ]).await;
        post(&mut ledger, date, vec![
            JournalLine::debit(c["6400"].id, amt(800), "rent"),
            JournalLine::credit(c["1100"].id, amt(800), "rent"),
        ]).await;
        post(&mut ledger, date, vec![
            JournalLine::debit(c["1500"].id, amt(2000), "laptop"),
            JournalLine::credit(c["1100"].id, amt(2000), "laptop"),
        ]).await;
        post(&mut ledger, date, vec![
            JournalLine::debit(c["6900"].id, amt(200), "depreciation"),
            JournalLine::credit(c["1600"].id, amt(200), "depreciation"),
        ]).await;

        let statement = ledger.reports().cash_flow(d(2024, 3, 1), d(2024, 3, 31)).await.unwrap();

        assert_eq!(statement.net_income, amt(4000));
        assert_eq!(statement.net_operating, amt(3200));
        assert_eq!(statement.net_investing, amt(-2000));
        assert_eq!(statement.investing[0].label, "Purchase of assets (Office Equipment)");
        assert_eq!(statement.net_financing, amt(10000));
        assert_eq!(statement.financing[0].label, "Capital contributed");
        assert_eq!(statement.opening_cash, money::zero());
        assert_eq!(statement.closing_cash, amt(11200));
        assert_eq!(statement.net_change, amt(11200));
        assert!(statement.is_reconciled);
    }

    #[tokio::test]
    async fn test_unexplained_cash_is_reported() {
        let mut ledger = Ledger::new(MemoryStorage::new(), "t1", LedgerConfig::default()).unwrap();
        let c = ledger.setup_standard_chart_of_accounts().await.unwrap();
        let deposits = ledger
            .create_account(Account::new("1450", "Security Deposits", AccountType::Asset).with_sub_type("Current Asset"))
            .await
            .unwrap();

        post(&mut ledger, d(2024, 3, 5), vec![
            JournalLine::debit(c["1100"].id, BigDecimal::from(300), "interest"),
            JournalLine::credit(c["4200"].id, BigDecimal::from(300), "interest"),
        ]).await;
        post(&mut ledger, d(2024, 3, 6), vec![
            JournalLine::debit(deposits.id, BigDecimal::from(500), "lease deposit"),
            JournalLine::credit(c["1100"].id, BigDecimal::from(500), "lease deposit"),
        ]).await;

        let statement = ledger.reports().cash_flow(d(2024, 3, 1), d(2024, 3, 31)).await.unwrap();
        assert_eq!(statement.net_operating, BigDecimal::from(300));
        assert_eq!(statement.actual_cash_change, BigDecimal::from(-200));
        assert_eq!(statement.unclassified_cash_movement, BigDecimal::from(-500));
        assert!(!statement.is_reconciled);

        let wrong_way = ledger.reports().cash_flow(d(2024, 4, 1), d(2024, 3, 1)).await;
        assert!(wrong_way.is_err());
    }
}
