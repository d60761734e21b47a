//! Derived account balances
//!
//! Balances are never stored. Every figure is a sum over posted journal lines,
//! optionally bounded by an inclusive date range.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::traits::LedgerStorage;
use crate::types::*;
use crate::utils::money;

/// Raw debit and credit totals of an account's posted lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountTotals {
    pub debit: BigDecimal,
    pub credit: BigDecimal,
}

impl Default for AccountTotals {
    fn default() -> Self {
        Self {
            debit: money::zero(),
            credit: money::zero(),
        }
    }
}

impl AccountTotals {
    pub fn new(debit: BigDecimal, credit: BigDecimal) -> Self {
        Self { debit, credit }
    }

    pub fn add_line(&mut self, line: &JournalLine) {
        self.debit += &line.debit;
        self.credit += &line.credit;
    }

    /// Balance signed towards `side`
    pub fn signed(&self, side: EntryType) -> BigDecimal {
        match side {
            EntryType::Debit => &self.debit - &self.credit,
            EntryType::Credit => &self.credit - &self.debit,
        }
    }

    /// `max(debit - credit, 0)`
    pub fn net_debit(&self) -> BigDecimal {
        money::positive_part(&self.signed(EntryType::Debit))
    }

    /// `max(credit - debit, 0)`
    pub fn net_credit(&self) -> BigDecimal {
        money::positive_part(&self.signed(EntryType::Credit))
    }

    pub fn is_material(&self) -> bool {
        money::is_material(&self.debit) || money::is_material(&self.credit)
    }
}

impl std::ops::Add for AccountTotals {
    type Output = AccountTotals;

    fn add(self, other: AccountTotals) -> AccountTotals {
        AccountTotals::new(self.debit + other.debit, self.credit + other.credit)
    }
}

/// Read-side balance queries for one tenant
#[derive(Clone)]
pub struct BalanceAggregator<S: LedgerStorage> {
    storage: S,
    tenant_id: String,
}

impl<S: LedgerStorage> BalanceAggregator<S> {
    pub fn new(storage: S, tenant_id: impl Into<String>) -> Self {
        Self {
            storage,
            tenant_id: tenant_id.into(),
        }
    }

    /// Posted debit/credit totals, dates inclusive
    pub async fn totals(
        &self,
        account_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<AccountTotals> {
        self.storage
            .account_totals(&self.tenant_id, account_id, start_date, end_date)
            .await
    }

    /// Balance signed by the account's own normal balance
    pub async fn balance(
        &self,
        account: &Account,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<BigDecimal> {
        let totals = self.totals(account.id, start_date, end_date).await?;
        Ok(totals.signed(account.normal_balance))
    }

    /// Balance signed towards a fixed side, regardless of the account's own convention
    pub async fn balance_as(
        &self,
        account: &Account,
        side: EntryType,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<BigDecimal> {
        let totals = self.totals(account.id, start_date, end_date).await?;
        Ok(totals.signed(side))
    }

    /// Sum of balances of several accounts, each signed towards `side`
    pub async fn sum_as(
        &self,
        accounts: &[Account],
        side: EntryType,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<BigDecimal> {
        let mut sum = money::zero();
        for account in accounts {
            sum += self.balance_as(account, side, start_date, end_date).await?;
        }
        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_columns_never_both_positive() {
        let totals = AccountTotals::new(BigDecimal::from(300), BigDecimal::from(120));
        assert_eq!(totals.net_debit(), BigDecimal::from(180));
        assert_eq!(totals.net_credit(), BigDecimal::from(0));

        let credit_heavy = AccountTotals::new(BigDecimal::from(20), BigDecimal::from(50));
        assert_eq!(credit_heavy.net_debit(), BigDecimal::from(0));
        assert_eq!(credit_heavy.net_credit(), BigDecimal::from(30));
    }

    #[test]
    fn test_totals_add() {
        let a = AccountTotals::new(BigDecimal::from(1), BigDecimal::from(2));
        let b = AccountTotals::new(BigDecimal::from(3), BigDecimal::from(4));
        assert_eq!(a + b, AccountTotals::new(BigDecimal::from(4), BigDecimal::from(6)));
    }

    #[test]
    fn test_signed() {
        let totals = AccountTotals::new(BigDecimal::from(10), BigDecimal::from(4));
        assert_eq!(totals.signed(EntryType::Debit), BigDecimal::from(6));
        assert_eq!(totals.signed(EntryType::Credit), BigDecimal::from(-6));
    }
}
