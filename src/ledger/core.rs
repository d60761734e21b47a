//! Main ledger orchestrator for one tenant

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::{AccountRole, LedgerConfig};
use crate::ledger::balance::BalanceAggregator;
use crate::ledger::fiscal::{fiscal_year_bounds, FiscalManager, FiscalPeriod, LockOutcome};
use crate::ledger::journal::{JournalDraft, JournalManager, ManualEntry};
use crate::ledger::recipes;
use crate::ledger::AccountManager;
use crate::numbering::{year_end_reference, DocumentKind};
use crate::reports::Reports;
use crate::traits::*;
use crate::types::*;
use crate::utils::money;

/// Result of closing a fiscal year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearEndOutcome {
    pub year: i32,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub net_income: BigDecimal,
    /// `None` when no revenue or expense account carried a balance
    pub entry: Option<JournalEntry>,
    pub warnings: Vec<String>,
}

/// Main ledger system that orchestrates all accounting operations of a tenant
///
/// Every document operation (sales, purchases, notes, expenses, inventory)
/// is implemented on this type in the `commerce` modules and commits one
/// [`UnitOfWork`].
pub struct Ledger<S: LedgerStorage> {
    pub(crate) tenant_id: String,
    pub(crate) config: LedgerConfig,
    pub(crate) storage: S,
    pub(crate) account_manager: AccountManager<S>,
    pub(crate) journal_manager: JournalManager<S>,
    pub(crate) fiscal_manager: FiscalManager<S>,
    pub(crate) balances: BalanceAggregator<S>,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Create a new ledger for `tenant_id` with the given storage backend
    pub fn new(storage: S, tenant_id: impl Into<String>, config: LedgerConfig) -> LedgerResult<Self> {
        Self::with_validators(
            storage,
            tenant_id,
            config,
            Box::new(DefaultAccountValidator),
            Box::new(DefaultEntryValidator),
        )
    }

    /// Create a new ledger with custom validators
    pub fn with_validators(
        storage: S,
        tenant_id: impl Into<String>,
        config: LedgerConfig,
        account_validator: Box<dyn AccountValidator>,
        entry_validator: Box<dyn EntryValidator>,
    ) -> LedgerResult<Self> {
        config.validate()?;
        let tenant_id = tenant_id.into();
        if tenant_id.trim().is_empty() {
            return Err(LedgerError::Config("Tenant id cannot be empty".to_string()));
        }

        Ok(Self {
            account_manager: AccountManager::with_validator(storage.clone(), tenant_id.clone(), account_validator),
            journal_manager: JournalManager::with_validator(storage.clone(), tenant_id.clone(), entry_validator),
            fiscal_manager: FiscalManager::new(storage.clone(), tenant_id.clone()),
            balances: BalanceAggregator::new(storage.clone(), tenant_id.clone()),
            storage,
            tenant_id,
            config,
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Chart of accounts view of this tenant
    pub fn chart(&self) -> &AccountManager<S> {
        &self.account_manager
    }

    /// Read-only report generator over this tenant's ledger
    pub fn reports(&self) -> Reports<S> {
        Reports::new(self.storage.clone(), self.tenant_id.clone(), self.config.clone())
    }

    // Account operations

    pub async fn create_account(&mut self, account: Account) -> LedgerResult<Account> {
        self.account_manager.create_account(account).await
    }

    pub async fn get_account(&self, account_id: Uuid) -> LedgerResult<Option<Account>> {
        self.account_manager.get_account(account_id).await
    }

    pub async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        self.account_manager.list_accounts().await
    }

    pub async fn list_accounts_by_type(&self, account_type: AccountType) -> LedgerResult<Vec<Account>> {
        self.account_manager.list_accounts_by_type(account_type).await
    }

    pub async fn update_account(&mut self, account: &Account) -> LedgerResult<Account> {
        self.account_manager.update_account(account).await
    }

    pub async fn delete_account(&mut self, account_id: Uuid) -> LedgerResult<()> {
        self.account_manager.delete_account(account_id).await
    }

    /// Seed the standard chart of accounts for a small business
    pub async fn setup_standard_chart_of_accounts(&mut self) -> LedgerResult<HashMap<String, Account>> {
        self.account_manager.setup_standard_chart().await
    }

    /// Active account mapped to `role`
    pub async fn role_account(&self, role: AccountRole) -> LedgerResult<Option<Account>> {
        self.account_manager.resolve_role(&self.config.roles, role).await
    }

    /// Roles whose configured code has no active account in this tenant
    pub async fn validate_account_roles(&self) -> LedgerResult<Vec<AccountRole>> {
        let missing = self.account_manager.missing_roles(&self.config.roles).await?;
        for role in &missing {
            tracing::warn!(
                tenant = %self.tenant_id,
                role = role.label(),
                code = self.config.roles.code(*role),
                "account role is not mapped to an active account"
            );
        }
        Ok(missing)
    }

    /// Signed balance of one account, dates inclusive
    pub async fn account_balance(
        &self,
        account_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<BigDecimal> {
        let account = self.account_manager.get_account_required(account_id).await?;
        self.balances.balance(&account, start_date, end_date).await
    }

    // Journal operations

    pub async fn create_journal_entry(&mut self, entry: ManualEntry) -> LedgerResult<JournalEntry> {
        self.journal_manager.create_entry(entry).await
    }

    pub async fn get_journal_entry(&self, entry_id: Uuid) -> LedgerResult<Option<JournalEntry>> {
        self.journal_manager.get_entry(entry_id).await
    }

    pub async fn list_journal_entries(&self, filter: &EntryFilter) -> LedgerResult<Vec<JournalEntry>> {
        self.journal_manager.list_entries(filter).await
    }

    pub async fn post_journal_entry(&mut self, entry_id: Uuid) -> LedgerResult<JournalEntry> {
        self.journal_manager.post_entry(entry_id).await
    }

    pub async fn delete_journal_entry(&mut self, entry_id: Uuid) -> LedgerResult<()> {
        self.journal_manager.delete_entry(entry_id).await
    }

    pub async fn reverse_journal_entry(&mut self, entry_id: Uuid, date: NaiveDate) -> LedgerResult<JournalEntry> {
        self.journal_manager.reverse_entry(entry_id, date).await
    }

    // Fiscal operations

    pub async fn is_period_locked(&self, date: NaiveDate) -> LedgerResult<bool> {
        self.fiscal_manager.is_period_locked(date).await
    }

    pub async fn lock_period(&mut self, year: i32, month: u32) -> LedgerResult<LockOutcome> {
        self.fiscal_manager.lock_period(year, month).await
    }

    pub async fn unlock_period(&mut self, year: i32, month: u32) -> LedgerResult<LockOutcome> {
        self.fiscal_manager.unlock_period(year, month).await
    }

    pub async fn list_fiscal_periods(&self, year: i32) -> LedgerResult<Vec<FiscalPeriod>> {
        self.fiscal_manager.list_periods(year).await
    }

    /// Close revenue and expense balances of a fiscal year into retained earnings
    pub async fn close_fiscal_year(&mut self, year: i32) -> LedgerResult<YearEndOutcome> {
        let (period_start, period_end) = fiscal_year_bounds(year, self.config.fiscal_year_start_month)?;
        let reference = year_end_reference(year);

        let closed = self
            .journal_manager
            .list_entries(&EntryFilter {
                source: Some(EntrySource::YearEnd),
                ..EntryFilter::default()
            })
            .await?;
        if closed
            .iter()
            .any(|e| e.reference.as_deref() == Some(reference.as_str()))
        {
            return Err(LedgerError::Validation(format!(
                "Fiscal year {} has already been closed",
                year
            )));
        }

        self.fiscal_manager.ensure_open(period_end).await?;
        let retained_earnings = self.require_role(AccountRole::RetainedEarnings).await?;

        let (start, end) = (Some(period_start), Some(period_end));
        let mut revenue = Vec::new();
        for account in self.list_accounts_by_type(AccountType::Revenue).await? {
            let balance = self.balances.balance_as(&account, EntryType::Credit, start, end).await?;
            revenue.push((account, balance));
        }
        let mut expenses = Vec::new();
        for account in self.list_accounts_by_type(AccountType::Expense).await? {
            let balance = self.balances.balance_as(&account, EntryType::Debit, start, end).await?;
            expenses.push((account, balance));
        }

        let total_revenue: BigDecimal = revenue.iter().map(|(_, b)| b).sum();
        let total_expenses: BigDecimal = expenses.iter().map(|(_, b)| b).sum();
        let net_income = total_revenue - total_expenses;

        let mut outcome = YearEndOutcome {
            year,
            period_start,
            period_end,
            net_income,
            entry: None,
            warnings: Vec::new(),
        };

        let Some(draft) = recipes::year_end_close(year, period_end, &revenue, &expenses, &retained_earnings) else {
            outcome
                .warnings
                .push(format!("No revenue or expense balances to close for {}", year));
            tracing::info!(tenant = %self.tenant_id, year, "nothing to close");
            return Ok(outcome);
        };

        let entry = self.journal_manager.prepare(draft).await?;
        self.commit(Change::SaveEntry(entry.clone()).into()).await?;

        tracing::info!(
            tenant = %self.tenant_id,
            year,
            entry = %entry.entry_number,
            net_income = %outcome.net_income,
            "fiscal year closed"
        );
        outcome.entry = Some(entry);
        Ok(outcome)
    }

    /// Validate the integrity of the ledger as of a date
    pub async fn validate_integrity(&self, as_of_date: NaiveDate) -> LedgerResult<LedgerIntegrityReport> {
        let reports = self.reports();
        let trial_balance = reports.trial_balance(None, as_of_date).await?;
        let balance_sheet = reports.balance_sheet(as_of_date).await?;

        let mut issues = Vec::new();

        let entries = self
            .journal_manager
            .list_entries(&EntryFilter::posted_between(None, Some(as_of_date)))
            .await?;
        for entry in entries.iter().filter(|e| !e.is_balanced()) {
            issues.push(format!(
                "Entry {} is not balanced: debits = {}, credits = {}",
                entry.entry_number,
                entry.total_debits(),
                entry.total_credits()
            ));
        }

        if !trial_balance.is_balanced {
            issues.push(format!(
                "Trial balance is not balanced: debits = {}, credits = {}",
                trial_balance.total_debits, trial_balance.total_credits
            ));
        }

        if !balance_sheet.is_balanced {
            issues.push(format!(
                "Balance sheet is not balanced: assets = {}, liabilities + equity = {}",
                balance_sheet.total_assets, balance_sheet.total_liabilities_and_equity
            ));
        }

        Ok(LedgerIntegrityReport {
            as_of_date,
            is_valid: issues.is_empty(),
            issues,
            trial_balance_total_debits: trial_balance.total_debits,
            trial_balance_total_credits: trial_balance.total_credits,
            balance_sheet_total_assets: balance_sheet.total_assets,
            balance_sheet_total_liabilities_equity: balance_sheet.total_liabilities_and_equity,
        })
    }

    // Helpers shared by the commerce modules

    pub(crate) async fn commit(&mut self, unit: UnitOfWork) -> LedgerResult<()> {
        self.storage.commit(&self.tenant_id, unit).await
    }

    pub(crate) async fn next_number(&mut self, kind: DocumentKind) -> LedgerResult<String> {
        let sequence = self.storage.next_sequence(&self.tenant_id, kind).await?;
        Ok(kind.format(sequence))
    }

    pub(crate) async fn require_role(&self, role: AccountRole) -> LedgerResult<Account> {
        self.role_account(role).await?.ok_or_else(|| {
            LedgerError::AccountNotFound(format!(
                "{} ({})",
                role.label(),
                self.config.roles.code(role)
            ))
        })
    }

    pub(crate) async fn require_account(&self, account_id: Uuid) -> LedgerResult<Account> {
        self.account_manager.get_account_required(account_id).await
    }

    /// Number a recipe's draft and stage it in `unit`. A missing draft means a
    /// structurally required account is absent: a warning is recorded instead.
    pub(crate) async fn stage_journal(
        &mut self,
        unit: &mut UnitOfWork,
        draft: Option<JournalDraft>,
        document: &str,
        warnings: &mut Vec<String>,
    ) -> LedgerResult<Option<Uuid>> {
        match draft {
            Some(draft) => {
                let entry = self.journal_manager.prepare(draft).await?;
                let id = entry.id;
                unit.push(Change::SaveEntry(entry));
                Ok(Some(id))
            }
            None => {
                tracing::warn!(
                    tenant = %self.tenant_id,
                    document,
                    "journal entry skipped: required account missing"
                );
                warnings.push(format!(
                    "No journal entry was recorded for {}: a required account is missing from the chart",
                    document
                ));
                Ok(None)
            }
        }
    }
}

/// Report on ledger integrity and validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerIntegrityReport {
    pub as_of_date: NaiveDate,
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub trial_balance_total_debits: BigDecimal,
    pub trial_balance_total_credits: BigDecimal,
    pub balance_sheet_total_assets: BigDecimal,
    pub balance_sheet_total_liabilities_equity: BigDecimal,
}

impl LedgerIntegrityReport {
    /// Difference between the trial balance columns
    pub fn trial_balance_difference(&self) -> BigDecimal {
        (&self.trial_balance_total_debits - &self.trial_balance_total_credits).abs()
    }

    pub fn is_within_tolerance(&self) -> bool {
        money::within_tolerance(&self.trial_balance_difference())
    }
}
