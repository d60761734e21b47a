//! In-memory storage implementation for testing

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::commerce::documents::*;
use crate::ledger::balance::AccountTotals;
use crate::ledger::fiscal::FiscalPeriod;
use crate::numbering::DocumentKind;
use crate::traits::*;
use crate::types::*;

/// Everything stored for one tenant. Vectors keep insertion order.
#[derive(Debug, Clone, Default)]
struct TenantData {
    accounts: Vec<Account>,
    entries: Vec<JournalEntry>,
    periods: Vec<FiscalPeriod>,
    budgets: Vec<Budget>,
    parties: Vec<Party>,
    products: Vec<Product>,
    movements: Vec<StockMovement>,
    invoices: Vec<Invoice>,
    bills: Vec<Bill>,
    payments: Vec<Payment>,
    notes: Vec<Note>,
    expenses: Vec<Expense>,
    sequences: HashMap<DocumentKind, u64>,
}

fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T) -> bool) {
    match items.iter_mut().find(|existing| same(existing)) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

impl TenantData {
    /// Reject the unit before any change is applied
    fn check(&self, unit: &UnitOfWork) -> LedgerResult<()> {
        let mut staged: HashMap<&str, Uuid> = HashMap::new();
        for change in unit.changes() {
            match change {
                Change::DeleteAccount(id) if !self.accounts.iter().any(|a| a.id == *id) => {
                    return Err(LedgerError::AccountNotFound(id.to_string()));
                }
                Change::DeleteEntry(id) if !self.entries.iter().any(|e| e.id == *id) => {
                    return Err(LedgerError::EntryNotFound(id.to_string()));
                }
                Change::DeleteInvoice(id) if !self.invoices.iter().any(|i| i.id == *id) => {
                    return Err(LedgerError::not_found("Invoice", id));
                }
                Change::DeleteBill(id) if !self.bills.iter().any(|b| b.id == *id) => {
                    return Err(LedgerError::not_found("Bill", id));
                }
                Change::DeleteParty(id) if !self.parties.iter().any(|p| p.id == *id) => {
                    return Err(LedgerError::not_found("Party", id));
                }
                Change::DeleteProduct(id) if !self.products.iter().any(|p| p.id == *id) => {
                    return Err(LedgerError::not_found("Product", id));
                }
                Change::SaveEntry(entry) => {
                    let staged_clash = staged
                        .insert(entry.entry_number.as_str(), entry.id)
                        .is_some_and(|id| id != entry.id);
                    let clash = staged_clash
                        || self
                            .entries
                            .iter()
                            .any(|e| e.entry_number == entry.entry_number && e.id != entry.id);
                    if clash {
                        return Err(LedgerError::Storage(format!(
                            "Duplicate entry number {}",
                            entry.entry_number
                        )));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn apply(&mut self, change: Change) {
        match change {
            Change::SaveAccount(account) => {
                let id = account.id;
                upsert(&mut self.accounts, account, |a| a.id == id)
            }
            Change::DeleteAccount(id) => self.accounts.retain(|a| a.id != id),
            Change::SaveEntry(entry) => {
                let id = entry.id;
                upsert(&mut self.entries, entry, |e| e.id == id)
            }
            Change::DeleteEntry(id) => self.entries.retain(|e| e.id != id),
            Change::SaveFiscalPeriod(period) => {
                let key = (period.year, period.month);
                upsert(&mut self.periods, period, |p| (p.year, p.month) == key)
            }
            Change::SaveBudget(budget) => {
                let key = (budget.account_id, budget.year, budget.month);
                upsert(&mut self.budgets, budget, |b| {
                    (b.account_id, b.year, b.month) == key
                })
            }
            Change::DeleteBudget(id) => self.budgets.retain(|b| b.id != id),
            Change::SaveParty(party) => {
                let id = party.id;
                upsert(&mut self.parties, party, |p| p.id == id)
            }
            Change::DeleteParty(id) => self.parties.retain(|p| p.id != id),
            Change::SaveProduct(product) => {
                let id = product.id;
                upsert(&mut self.products, product, |p| p.id == id)
            }
            Change::DeleteProduct(id) => self.products.retain(|p| p.id != id),
            Change::RecordMovement(movement) => self.movements.push(movement),
            Change::SaveInvoice(invoice) => {
                let id = invoice.id;
                upsert(&mut self.invoices, invoice, |i| i.id == id)
            }
            Change::DeleteInvoice(id) => self.invoices.retain(|i| i.id != id),
            Change::SaveBill(bill) => {
                let id = bill.id;
                upsert(&mut self.bills, bill, |b| b.id == id)
            }
            Change::DeleteBill(id) => self.bills.retain(|b| b.id != id),
            Change::SavePayment(payment) => {
                let id = payment.id;
                upsert(&mut self.payments, payment, |p| p.id == id)
            }
            Change::SaveNote(note) => {
                let id = note.id;
                upsert(&mut self.notes, note, |n| n.id == id)
            }
            Change::SaveExpense(expense) => {
                let id = expense.id;
                upsert(&mut self.expenses, expense, |e| e.id == id)
            }
        }
    }
}

/// In-memory storage implementation for testing and development
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    tenants: Arc<RwLock<HashMap<String, TenantData>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data for every tenant
    pub fn clear(&self) -> LedgerResult<()> {
        self.write()?.clear();
        Ok(())
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, HashMap<String, TenantData>>> {
        self.tenants
            .read()
            .map_err(|_| LedgerError::Storage("memory storage lock poisoned".to_string()))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, HashMap<String, TenantData>>> {
        self.tenants
            .write()
            .map_err(|_| LedgerError::Storage("memory storage lock poisoned".to_string()))
    }

    /// Run `f` against a tenant's data; unknown tenants read as empty
    fn with_tenant<T>(&self, tenant_id: &str, f: impl FnOnce(&TenantData) -> T) -> LedgerResult<T> {
        let tenants = self.read()?;
        match tenants.get(tenant_id) {
            Some(data) => Ok(f(data)),
            None => Ok(f(&TenantData::default())),
        }
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn commit(&mut self, tenant_id: &str, unit: UnitOfWork) -> LedgerResult<()> {
        let mut tenants = self.write()?;
        let data = tenants.entry(tenant_id.to_string()).or_default();
        data.check(&unit)?;
        for change in unit.into_changes() {
            data.apply(change);
        }
        Ok(())
    }

    async fn next_sequence(&mut self, tenant_id: &str, kind: DocumentKind) -> LedgerResult<u64> {
        let mut tenants = self.write()?;
        let counter = tenants
            .entry(tenant_id.to_string())
            .or_default()
            .sequences
            .entry(kind)
            .or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn get_account(&self, tenant_id: &str, account_id: Uuid) -> LedgerResult<Option<Account>> {
        self.with_tenant(tenant_id, |data| {
            data.accounts.iter().find(|a| a.id == account_id).cloned()
        })
    }

    async fn list_accounts(
        &self,
        tenant_id: &str,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<Account>> {
        self.with_tenant(tenant_id, |data| {
            let mut accounts: Vec<Account> = data
                .accounts
                .iter()
                .filter(|account| account_type.is_none_or(|t| account.account_type == t))
                .cloned()
                .collect();
            accounts.sort_by(|a, b| a.code.cmp(&b.code));
            accounts
        })
    }

    async fn get_entry(&self, tenant_id: &str, entry_id: Uuid) -> LedgerResult<Option<JournalEntry>> {
        self.with_tenant(tenant_id, |data| {
            data.entries.iter().find(|e| e.id == entry_id).cloned()
        })
    }

    async fn list_entries(&self, tenant_id: &str, filter: &EntryFilter) -> LedgerResult<Vec<JournalEntry>> {
        self.with_tenant(tenant_id, |data| {
            let mut entries: Vec<JournalEntry> = data
                .entries
                .iter()
                .filter(|entry| filter.matches(entry))
                .cloned()
                .collect();
            entries.sort_by(|a, b| {
                a.date
                    .cmp(&b.date)
                    .then_with(|| a.entry_number.cmp(&b.entry_number))
            });
            entries
        })
    }

    async fn account_totals(
        &self,
        tenant_id: &str,
        account_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<AccountTotals> {
        let filter = EntryFilter::posted_between(start_date, end_date);
        self.with_tenant(tenant_id, |data| {
            let mut totals = AccountTotals::default();
            for entry in data.entries.iter().filter(|e| filter.matches(e)) {
                for line in entry.lines.iter().filter(|l| l.account_id == account_id) {
                    totals.add_line(line);
                }
            }
            totals
        })
    }

    async fn account_has_lines(&self, tenant_id: &str, account_id: Uuid) -> LedgerResult<bool> {
        self.with_tenant(tenant_id, |data| {
            data.entries.iter().any(|e| e.touches_account(account_id))
        })
    }

    async fn get_fiscal_period(
        &self,
        tenant_id: &str,
        year: i32,
        month: u32,
    ) -> LedgerResult<Option<FiscalPeriod>> {
        self.with_tenant(tenant_id, |data| {
            data.periods
                .iter()
                .find(|p| p.year == year && p.month == month)
                .cloned()
        })
    }

    async fn list_fiscal_periods(&self, tenant_id: &str) -> LedgerResult<Vec<FiscalPeriod>> {
        self.with_tenant(tenant_id, |data| {
            let mut periods = data.periods.clone();
            periods.sort_by_key(|p| (p.year, p.month));
            periods
        })
    }

    async fn list_budgets(&self, tenant_id: &str, year: i32) -> LedgerResult<Vec<Budget>> {
        self.with_tenant(tenant_id, |data| {
            data.budgets.iter().filter(|b| b.year == year).cloned().collect()
        })
    }

    async fn get_party(&self, tenant_id: &str, party_id: Uuid) -> LedgerResult<Option<Party>> {
        self.with_tenant(tenant_id, |data| {
            data.parties.iter().find(|p| p.id == party_id).cloned()
        })
    }

    async fn list_parties(&self, tenant_id: &str, kind: PartyKind) -> LedgerResult<Vec<Party>> {
        self.with_tenant(tenant_id, |data| {
            data.parties.iter().filter(|p| p.kind == kind).cloned().collect()
        })
    }

    async fn get_product(&self, tenant_id: &str, product_id: Uuid) -> LedgerResult<Option<Product>> {
        self.with_tenant(tenant_id, |data| {
            data.products.iter().find(|p| p.id == product_id).cloned()
        })
    }

    async fn list_products(&self, tenant_id: &str) -> LedgerResult<Vec<Product>> {
        self.with_tenant(tenant_id, |data| data.products.clone())
    }

    async fn list_movements(
        &self,
        tenant_id: &str,
        product_id: Option<Uuid>,
    ) -> LedgerResult<Vec<StockMovement>> {
        self.with_tenant(tenant_id, |data| {
            data.movements
                .iter()
                .filter(|m| product_id.is_none_or(|id| m.product_id == id))
                .cloned()
                .collect()
        })
    }

    async fn get_invoice(&self, tenant_id: &str, invoice_id: Uuid) -> LedgerResult<Option<Invoice>> {
        self.with_tenant(tenant_id, |data| {
            data.invoices.iter().find(|i| i.id == invoice_id).cloned()
        })
    }

    async fn list_invoices(&self, tenant_id: &str) -> LedgerResult<Vec<Invoice>> {
        self.with_tenant(tenant_id, |data| data.invoices.clone())
    }

    async fn get_bill(&self, tenant_id: &str, bill_id: Uuid) -> LedgerResult<Option<Bill>> {
        self.with_tenant(tenant_id, |data| {
            data.bills.iter().find(|b| b.id == bill_id).cloned()
        })
    }

    async fn list_bills(&self, tenant_id: &str) -> LedgerResult<Vec<Bill>> {
        self.with_tenant(tenant_id, |data| data.bills.clone())
    }

    async fn list_payments(
        &self,
        tenant_id: &str,
        direction: PaymentDirection,
    ) -> LedgerResult<Vec<Payment>> {
        self.with_tenant(tenant_id, |data| {
            data.payments
                .iter()
                .filter(|p| p.direction == direction)
                .cloned()
                .collect()
        })
    }

    async fn get_note(&self, tenant_id: &str, note_id: Uuid) -> LedgerResult<Option<Note>> {
        self.with_tenant(tenant_id, |data| {
            data.notes.iter().find(|n| n.id == note_id).cloned()
        })
    }

    async fn list_notes(&self, tenant_id: &str, kind: NoteKind) -> LedgerResult<Vec<Note>> {
        self.with_tenant(tenant_id, |data| {
            data.notes.iter().filter(|n| n.kind == kind).cloned().collect()
        })
    }

    async fn list_expenses(&self, tenant_id: &str) -> LedgerResult<Vec<Expense>> {
        self.with_tenant(tenant_id, |data| data.expenses.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn entry(number: &str, lines: Vec<JournalLine>, posted: bool) -> JournalEntry {
        JournalEntry {
            id: Uuid::new_v4(),
            entry_number: number.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            description: "test".to_string(),
            reference: None,
            source: EntrySource::Manual,
            source_id: None,
            is_posted: posted,
            lines,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let mut storage = MemoryStorage::new();
        let account = Account::new("1000", "Cash", AccountType::Asset);

        let mut unit = UnitOfWork::new();
        unit.push(Change::SaveAccount(account.clone()))
            .push(Change::DeleteEntry(Uuid::new_v4()));

        let result = storage.commit("t1", unit).await;
        assert!(matches!(result, Err(LedgerError::EntryNotFound(_))));
        assert!(storage.get_account("t1", account.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_entry_number_within_one_unit() {
        let mut storage = MemoryStorage::new();
        let lines = vec![
            JournalLine::debit(Uuid::new_v4(), BigDecimal::from(10), "a"),
            JournalLine::credit(Uuid::new_v4(), BigDecimal::from(10), "b"),
        ];

        let mut unit = UnitOfWork::new();
        unit.push(Change::SaveEntry(entry("JE-00001", lines.clone(), true)))
            .push(Change::SaveEntry(entry("JE-00001", lines.clone(), true)));
        let result = storage.commit("t1", unit).await;
        assert!(matches!(result, Err(LedgerError::Storage(_))));
        assert!(storage.list_entries("t1", &EntryFilter::default()).await.unwrap().is_empty());

        let draft = entry("JE-00001", lines, false);
        let mut posted = draft.clone();
        posted.is_posted = true;
        let mut unit = UnitOfWork::new();
        unit.push(Change::SaveEntry(draft)).push(Change::SaveEntry(posted));
        storage.commit("t1", unit).await.unwrap();
        let stored = storage.list_entries("t1", &EntryFilter::default()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].is_posted);
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let mut storage = MemoryStorage::new();
        let account = Account::new("1000", "Cash", AccountType::Asset);
        storage
            .commit("t1", Change::SaveAccount(account.clone()).into())
            .await
            .unwrap();

        assert!(storage.get_account("t1", account.id).await.unwrap().is_some());
        assert!(storage.get_account("t2", account.id).await.unwrap().is_none());
        assert!(storage.list_accounts("t2", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sequences_per_tenant_and_kind() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.next_sequence("t1", DocumentKind::Invoice).await.unwrap(), 1);
        assert_eq!(storage.next_sequence("t1", DocumentKind::Invoice).await.unwrap(), 2);
        assert_eq!(storage.next_sequence("t1", DocumentKind::Bill).await.unwrap(), 1);
        assert_eq!(storage.next_sequence("t2", DocumentKind::Invoice).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_totals_ignore_unposted_entries() {
        let mut storage = MemoryStorage::new();
        let cash = Uuid::new_v4();
        let revenue = Uuid::new_v4();
        let lines = vec![
            JournalLine::debit(cash, BigDecimal::from(100), "cash"),
            JournalLine::credit(revenue, BigDecimal::from(100), "sale"),
        ];

        let mut unit = UnitOfWork::new();
        unit.push(Change::SaveEntry(entry("JE-00001", lines.clone(), true)))
            .push(Change::SaveEntry(entry("JE-00002", lines, false)));
        storage.commit("t1", unit).await.unwrap();

        let totals = storage.account_totals("t1", cash, None, None).await.unwrap();
        assert_eq!(totals.debit, BigDecimal::from(100));
        assert!(storage.account_has_lines("t1", revenue).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_entry_number_rejected() {
        let mut storage = MemoryStorage::new();
        let a = Uuid::new_v4();
        let lines = vec![
            JournalLine::debit(a, BigDecimal::from(1), "d"),
            JournalLine::credit(a, BigDecimal::from(1), "c"),
        ];
        storage
            .commit("t1", Change::SaveEntry(entry("JE-00001", lines.clone(), true)).into())
            .await
            .unwrap();
        let result = storage
            .commit("t1", Change::SaveEntry(entry("JE-00001", lines, true)).into())
            .await;
        assert!(matches!(result, Err(LedgerError::Storage(_))));
    }
}
