//! Credit notes (sales returns) and debit notes (purchase returns)

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::commerce::documents::*;
use crate::commerce::inventory::movements_for;
use crate::commerce::purchases::purchase_split;
use crate::commerce::{normalize_items, validate_tax_rate, DocumentOutcome};
use crate::config::AccountRole;
use crate::ledger::recipes::{self, SaleAccounts};
use crate::ledger::Ledger;
use crate::numbering::DocumentKind;
use crate::traits::*;
use crate::types::*;
use crate::utils::money;

/// Input for a credit or debit note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNote {
    /// Customer for credit notes, vendor for debit notes
    pub party_id: Uuid,
    /// Invoice or bill to apply the note against
    pub document_id: Option<Uuid>,
    pub date: NaiveDate,
    pub items: Vec<LineItem>,
    pub tax_rate: BigDecimal,
    pub reason: Option<String>,
}

impl NewNote {
    pub fn new(party_id: Uuid, date: NaiveDate, items: Vec<LineItem>) -> Self {
        Self {
            party_id,
            document_id: None,
            date,
            items,
            tax_rate: money::zero(),
            reason: None,
        }
    }

    pub fn against(mut self, document_id: Uuid) -> Self {
        self.document_id = Some(document_id);
        self
    }

    pub fn with_tax_rate(mut self, tax_rate: BigDecimal) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Record a sales return. Returned goods come back into stock at cost and
    /// a linked invoice is settled by the note total.
    pub async fn create_credit_note(&mut self, input: NewNote) -> LedgerResult<DocumentOutcome<Note>> {
        let items = normalize_items(input.items)?;
        validate_tax_rate(&input.tax_rate)?;
        let customer = self.require_party(PartyKind::Customer, input.party_id).await?;
        self.fiscal_manager.ensure_open(input.date).await?;

        let mut invoice = match input.document_id {
            Some(id) => {
                let invoice = self.get_invoice_required(id).await?;
                ensure_applicable("Invoice", &invoice.number, invoice.customer_id == customer.id, &invoice.settlement)?;
                Some(invoice)
            }
            None => None,
        };

        let totals = DocumentTotals::without_discount(&items, input.tax_rate);
        let mut note = Note {
            id: Uuid::new_v4(),
            kind: NoteKind::Credit,
            number: self.next_number(DocumentKind::CreditNote).await?,
            party_id: customer.id,
            document_id: input.document_id,
            date: input.date,
            reason: input.reason,
            status: NoteStatus::Applied,
            items,
            totals,
            journal_entry_id: None,
            created_at: chrono::Utc::now().naive_utc(),
        };

        let mut warnings = Vec::new();
        let mut unit = UnitOfWork::new();

        let accounts = SaleAccounts {
            receivable: self.role_account(AccountRole::AccountsReceivable).await?,
            revenue: self.role_account(AccountRole::SalesRevenue).await?,
            tax_payable: self.role_account(AccountRole::SalesTaxPayable).await?,
            ..SaleAccounts::default()
        };
        let label = format!("credit note {}", note.number);
        note.journal_entry_id = self
            .stage_journal(&mut unit, recipes::credit_note(&note, &accounts), &label, &mut warnings)
            .await?;

        let stocked = self.stocked_lines(&note.items).await?;
        for movement in movements_for(
            &stocked,
            MovementType::In,
            note.date,
            &note.number,
            &format!("Sales return - Credit Note {}", note.number),
            |line| line.product.cost_price.clone(),
        ) {
            unit.push(Change::RecordMovement(movement));
        }

        if let Some(invoice) = invoice.as_mut() {
            invoice.settlement.apply(&invoice.totals.total, &note.totals.total, note.date);
            unit.push(Change::SaveInvoice(invoice.clone()));
        }

        unit.push(Change::SaveNote(note.clone()));
        self.commit(unit).await?;

        tracing::info!(
            tenant = %self.tenant_id,
            note = %note.number,
            customer = %customer.name,
            total = %note.totals.total,
            invoice = ?invoice.map(|i| i.number),
            "credit note applied"
        );

        Ok(DocumentOutcome {
            journal_entry_id: note.journal_entry_id,
            document: note,
            payment: None,
            warnings,
        })
    }

    /// Record a purchase return. Returned goods leave stock at the returned
    /// unit cost and a linked bill is settled by the note total.
    pub async fn create_debit_note(&mut self, input: NewNote) -> LedgerResult<DocumentOutcome<Note>> {
        let items = normalize_items(input.items)?;
        validate_tax_rate(&input.tax_rate)?;
        let vendor = self.require_party(PartyKind::Vendor, input.party_id).await?;
        self.fiscal_manager.ensure_open(input.date).await?;

        let mut bill = match input.document_id {
            Some(id) => {
                let bill = self.get_bill_required(id).await?;
                ensure_applicable("Bill", &bill.number, bill.vendor_id == vendor.id, &bill.settlement)?;
                Some(bill)
            }
            None => None,
        };

        let totals = DocumentTotals::without_discount(&items, input.tax_rate);
        let mut note = Note {
            id: Uuid::new_v4(),
            kind: NoteKind::Debit,
            number: self.next_number(DocumentKind::DebitNote).await?,
            party_id: vendor.id,
            document_id: input.document_id,
            date: input.date,
            reason: input.reason,
            status: NoteStatus::Applied,
            items,
            totals,
            journal_entry_id: None,
            created_at: chrono::Utc::now().naive_utc(),
        };

        let mut warnings = Vec::new();
        let mut unit = UnitOfWork::new();

        let stocked = self.stocked_lines(&note.items).await?;
        let accounts = self.purchase_accounts().await?;
        let split = purchase_split(&note.items, &stocked);
        let label = format!("debit note {}", note.number);
        note.journal_entry_id = self
            .stage_journal(&mut unit, recipes::debit_note(&note, &accounts, &split), &label, &mut warnings)
            .await?;

        for movement in movements_for(
            &stocked,
            MovementType::Out,
            note.date,
            &note.number,
            &format!("Purchase return - Debit Note {}", note.number),
            |line| line.item.unit_price.clone(),
        ) {
            unit.push(Change::RecordMovement(movement));
        }

        if let Some(bill) = bill.as_mut() {
            bill.settlement.apply(&bill.totals.total, &note.totals.total, note.date);
            unit.push(Change::SaveBill(bill.clone()));
        }

        unit.push(Change::SaveNote(note.clone()));
        self.commit(unit).await?;

        tracing::info!(
            tenant = %self.tenant_id,
            note = %note.number,
            vendor = %vendor.name,
            total = %note.totals.total,
            bill = ?bill.map(|b| b.number),
            "debit note applied"
        );

        Ok(DocumentOutcome {
            journal_entry_id: note.journal_entry_id,
            document: note,
            payment: None,
            warnings,
        })
    }

    /// Void an applied note: reverse its journal entry, undo its stock
    /// movements and take it back off the linked document.
    ///
    /// A note that is already void is rejected and left untouched.
    pub async fn void_note(&mut self, note_id: Uuid, date: NaiveDate) -> LedgerResult<DocumentOutcome<Note>> {
        let mut note = self
            .storage
            .get_note(&self.tenant_id, note_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Note", note_id))?;

        if note.status == NoteStatus::Void {
            tracing::warn!(tenant = %self.tenant_id, note = %note.number, "void rejected: already void");
            return Err(LedgerError::Validation(format!(
                "{} is already void",
                note.number
            )));
        }

        self.fiscal_manager.ensure_open(date).await?;
        let mut unit = UnitOfWork::new();
        let mut outcome_entry = None;

        if let Some(entry_id) = note.journal_entry_id {
            let reversal = self.journal_manager.prepare_reversal(entry_id, date).await?;
            outcome_entry = Some(reversal.id);
            unit.push(Change::SaveEntry(reversal));
        }

        let movements = self.storage.list_movements(&self.tenant_id, None).await?;
        for original in movements
            .iter()
            .filter(|m| m.reference.as_deref() == Some(note.number.as_str()))
        {
            let opposite = match original.movement_type {
                MovementType::In => MovementType::Out,
                MovementType::Out => MovementType::In,
                MovementType::Adjustment => continue,
            };
            let mut movement = StockMovement::new(
                original.product_id,
                opposite,
                original.quantity.clone(),
                original.unit_cost.clone(),
                date,
            )
            .with_reference(format!("Void {}", note.number));
            movement.notes = Some(format!("Void of {}", note.number));
            unit.push(Change::RecordMovement(movement));
        }

        match (note.kind, note.document_id) {
            (NoteKind::Credit, Some(invoice_id)) => {
                let mut invoice = self.get_invoice_required(invoice_id).await?;
                invoice.settlement.unapply(&invoice.totals.total, &note.totals.total, date);
                unit.push(Change::SaveInvoice(invoice));
            }
            (NoteKind::Debit, Some(bill_id)) => {
                let mut bill = self.get_bill_required(bill_id).await?;
                bill.settlement.unapply(&bill.totals.total, &note.totals.total, date);
                unit.push(Change::SaveBill(bill));
            }
            (_, None) => {}
        }

        note.status = NoteStatus::Void;
        unit.push(Change::SaveNote(note.clone()));
        self.commit(unit).await?;

        tracing::info!(tenant = %self.tenant_id, note = %note.number, "note voided");

        let mut outcome = DocumentOutcome::new(note);
        outcome.journal_entry_id = outcome_entry;
        Ok(outcome)
    }

    pub async fn get_note(&self, note_id: Uuid) -> LedgerResult<Option<Note>> {
        self.storage.get_note(&self.tenant_id, note_id).await
    }

    /// Credit notes newest first
    pub async fn list_credit_notes(&self) -> LedgerResult<Vec<Note>> {
        self.list_notes(NoteKind::Credit).await
    }

    /// Debit notes newest first
    pub async fn list_debit_notes(&self) -> LedgerResult<Vec<Note>> {
        self.list_notes(NoteKind::Debit).await
    }

    async fn list_notes(&self, kind: NoteKind) -> LedgerResult<Vec<Note>> {
        let mut notes = self.storage.list_notes(&self.tenant_id, kind).await?;
        notes.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.number.cmp(&a.number)));
        Ok(notes)
    }
}

/// A note may only be applied to an issued document of the same party
fn ensure_applicable(kind: &str, number: &str, same_party: bool, settlement: &Settlement) -> LedgerResult<()> {
    if !same_party {
        return Err(LedgerError::Validation(format!(
            "{} {} belongs to a different party",
            kind, number
        )));
    }
    if settlement.status == DocumentStatus::Draft {
        return Err(LedgerError::Validation(format!(
            "{} {} is a draft; issue it before applying a note",
            kind, number
        )));
    }
    Ok(())
}
