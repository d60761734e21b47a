//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::commerce::documents::*;
use crate::ledger::balance::AccountTotals;
use crate::ledger::fiscal::FiscalPeriod;
use crate::numbering::DocumentKind;
use crate::reports::{BalanceSheet, CashFlowStatement, ProfitAndLoss};
use crate::types::*;

/// A single write inside a [`UnitOfWork`]. `Save*` variants upsert by id.
#[derive(Debug, Clone)]
pub enum Change {
    SaveAccount(Account),
    DeleteAccount(Uuid),
    SaveEntry(JournalEntry),
    DeleteEntry(Uuid),
    SaveFiscalPeriod(FiscalPeriod),
    SaveBudget(Budget),
    DeleteBudget(Uuid),
    SaveParty(Party),
    DeleteParty(Uuid),
    SaveProduct(Product),
    DeleteProduct(Uuid),
    RecordMovement(StockMovement),
    SaveInvoice(Invoice),
    DeleteInvoice(Uuid),
    SaveBill(Bill),
    DeleteBill(Uuid),
    SavePayment(Payment),
    SaveNote(Note),
    SaveExpense(Expense),
}

/// Writes that must be applied together or not at all
#[derive(Debug, Clone, Default)]
pub struct UnitOfWork {
    changes: Vec<Change>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: Change) -> &mut Self {
        self.changes.push(change);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }
}

impl From<Change> for UnitOfWork {
    fn from(change: Change) -> Self {
        Self {
            changes: vec![change],
        }
    }
}

/// Storage abstraction for the ledger system
///
/// Every method is scoped to a tenant. Reads return owned snapshots; all
/// writes go through [`LedgerStorage::commit`], which must apply the whole
/// unit of work atomically. Backends (PostgreSQL, SQLite, in-memory, etc.)
/// implement these methods.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Apply every change in `unit`, or none of them
    async fn commit(&mut self, tenant_id: &str, unit: UnitOfWork) -> LedgerResult<()>;

    /// Atomically allocate the next sequence number (starting at 1) for a document kind
    async fn next_sequence(&mut self, tenant_id: &str, kind: DocumentKind) -> LedgerResult<u64>;

    /// Get an account by ID
    async fn get_account(&self, tenant_id: &str, account_id: Uuid) -> LedgerResult<Option<Account>>;

    /// List accounts ordered by code, optionally filtered by type
    async fn list_accounts(
        &self,
        tenant_id: &str,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<Account>>;

    async fn get_entry(&self, tenant_id: &str, entry_id: Uuid) -> LedgerResult<Option<JournalEntry>>;

    /// Entries matching `filter`, ordered by date then entry number
    async fn list_entries(&self, tenant_id: &str, filter: &EntryFilter) -> LedgerResult<Vec<JournalEntry>>;

    /// Debit and credit totals of posted lines for an account, dates inclusive
    async fn account_totals(
        &self,
        tenant_id: &str,
        account_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<AccountTotals>;

    /// Whether any journal line (posted or not) references the account
    async fn account_has_lines(&self, tenant_id: &str, account_id: Uuid) -> LedgerResult<bool>;

    async fn get_fiscal_period(
        &self,
        tenant_id: &str,
        year: i32,
        month: u32,
    ) -> LedgerResult<Option<FiscalPeriod>>;

    async fn list_fiscal_periods(&self, tenant_id: &str) -> LedgerResult<Vec<FiscalPeriod>>;

    async fn list_budgets(&self, tenant_id: &str, year: i32) -> LedgerResult<Vec<Budget>>;

    async fn get_party(&self, tenant_id: &str, party_id: Uuid) -> LedgerResult<Option<Party>>;

    async fn list_parties(&self, tenant_id: &str, kind: PartyKind) -> LedgerResult<Vec<Party>>;

    async fn get_product(&self, tenant_id: &str, product_id: Uuid) -> LedgerResult<Option<Product>>;

    async fn list_products(&self, tenant_id: &str) -> LedgerResult<Vec<Product>>;

    /// Movements in recorded order, optionally for one product
    async fn list_movements(
        &self,
        tenant_id: &str,
        product_id: Option<Uuid>,
    ) -> LedgerResult<Vec<StockMovement>>;

    async fn get_invoice(&self, tenant_id: &str, invoice_id: Uuid) -> LedgerResult<Option<Invoice>>;

    async fn list_invoices(&self, tenant_id: &str) -> LedgerResult<Vec<Invoice>>;

    async fn get_bill(&self, tenant_id: &str, bill_id: Uuid) -> LedgerResult<Option<Bill>>;

    async fn list_bills(&self, tenant_id: &str) -> LedgerResult<Vec<Bill>>;

    async fn list_payments(
        &self,
        tenant_id: &str,
        direction: PaymentDirection,
    ) -> LedgerResult<Vec<Payment>>;

    async fn get_note(&self, tenant_id: &str, note_id: Uuid) -> LedgerResult<Option<Note>>;

    async fn list_notes(&self, tenant_id: &str, kind: NoteKind) -> LedgerResult<Vec<Note>>;

    async fn list_expenses(&self, tenant_id: &str) -> LedgerResult<Vec<Expense>>;
}

/// Trait for implementing custom account validation rules
pub trait AccountValidator: Send + Sync {
    /// Validate an account before saving
    fn validate_account(&self, account: &Account) -> LedgerResult<()>;
}

/// Trait for implementing custom journal entry validation rules
pub trait EntryValidator: Send + Sync {
    /// Validate an entry before saving
    fn validate_entry(&self, entry: &JournalEntry) -> LedgerResult<()>;
}

/// Default account validator with basic rules
pub struct DefaultAccountValidator;

impl AccountValidator for DefaultAccountValidator {
    fn validate_account(&self, account: &Account) -> LedgerResult<()> {
        if account.code.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Account code cannot be empty".to_string(),
            ));
        }

        if account.name.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Account name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Default entry validator with the double-entry rules
pub struct DefaultEntryValidator;

impl EntryValidator for DefaultEntryValidator {
    fn validate_entry(&self, entry: &JournalEntry) -> LedgerResult<()> {
        entry.validate()
    }
}

/// Hierarchical view of a tenant's chart of accounts
#[async_trait]
pub trait ChartOfAccounts: Send + Sync {
    /// Get the full chart of accounts ordered by code
    async fn get_chart(&self) -> LedgerResult<Vec<Account>>;

    /// Get all child accounts of a parent account
    async fn get_child_accounts(&self, parent_id: Uuid) -> LedgerResult<Vec<Account>>;

    /// Get the root-to-account path (for hierarchical display)
    async fn get_account_path(&self, account_id: Uuid) -> LedgerResult<Vec<Account>>;
}

/// Trait for report generation
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    /// Generate a balance sheet as of a specific date
    async fn generate_balance_sheet(&self, as_of_date: NaiveDate) -> LedgerResult<BalanceSheet>;

    /// Generate a profit and loss statement for a date range
    async fn generate_profit_and_loss(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<ProfitAndLoss>;

    /// Generate a cash flow statement for a date range
    async fn generate_cash_flow(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<CashFlowStatement>;
}
