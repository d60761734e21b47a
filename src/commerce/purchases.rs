//! Purchases: bills, payments made and vendor balances

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::commerce::documents::*;
use crate::commerce::inventory::{movements_for, StockedLine};
use crate::commerce::sales::{ensure_payable, validate_payment_amount, NewPayment};
use crate::commerce::{due_date_after, normalize_items, validate_tax_rate, DocumentOutcome};
use crate::config::AccountRole;
use crate::ledger::recipes::{self, PurchaseAccounts, PurchaseSplit};
use crate::ledger::Ledger;
use crate::numbering::DocumentKind;
use crate::traits::*;
use crate::types::*;
use crate::utils::money;

/// Input for a new purchase bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBill {
    pub vendor_id: Uuid,
    pub vendor_reference: Option<String>,
    pub date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    /// `unit_price` is the unit cost
    pub items: Vec<LineItem>,
    pub tax_rate: BigDecimal,
    pub payment_type: PaymentType,
    /// Required for pay-now bills
    pub paid_from_account_id: Option<Uuid>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub save_as_draft: bool,
}

impl NewBill {
    /// A bill on credit terms with no tax
    pub fn new(vendor_id: Uuid, date: NaiveDate, items: Vec<LineItem>) -> Self {
        Self {
            vendor_id,
            vendor_reference: None,
            date,
            due_date: None,
            items,
            tax_rate: money::zero(),
            payment_type: PaymentType::Owe,
            paid_from_account_id: None,
            payment_method: None,
            notes: None,
            save_as_draft: false,
        }
    }

    pub fn with_tax_rate(mut self, tax_rate: BigDecimal) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    pub fn with_vendor_reference(mut self, reference: impl Into<String>) -> Self {
        self.vendor_reference = Some(reference.into());
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn pay_now(mut self, paid_from_account_id: Uuid) -> Self {
        self.payment_type = PaymentType::PayNow;
        self.paid_from_account_id = Some(paid_from_account_id);
        self
    }

    pub fn as_draft(mut self) -> Self {
        self.save_as_draft = true;
        self
    }
}

/// How a posted bill is settled
struct BillSettlement {
    paid_from: Option<Account>,
    method: Option<String>,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Record a vendor bill: journal entry, stock receipts at the billed
    /// unit cost, and an immediate payment for pay-now bills
    pub async fn create_bill(&mut self, input: NewBill) -> LedgerResult<DocumentOutcome<Bill>> {
        let items = normalize_items(input.items)?;
        validate_tax_rate(&input.tax_rate)?;
        let totals = DocumentTotals::without_discount(&items, input.tax_rate);

        let vendor = self.require_party(PartyKind::Vendor, input.vendor_id).await?;
        self.fiscal_manager.ensure_open(input.date).await?;

        let paid_from = match (input.payment_type, input.paid_from_account_id) {
            (_, Some(id)) => Some(self.deposit_account(id).await?),
            (PaymentType::PayNow, None) if !input.save_as_draft => {
                return Err(LedgerError::Validation(
                    "A paid-from account is required for pay-now bills".to_string(),
                ));
            }
            _ => None,
        };

        let status = if input.save_as_draft {
            DocumentStatus::Draft
        } else {
            DocumentStatus::Owed
        };
        let bill = Bill {
            id: Uuid::new_v4(),
            number: self.next_number(DocumentKind::Bill).await?,
            vendor_id: vendor.id,
            vendor_reference: input.vendor_reference,
            date: input.date,
            payment_type: input.payment_type,
            settlement: Settlement::outstanding(&totals.total, status, input.due_date),
            items,
            totals,
            notes: input.notes,
            journal_entry_id: None,
            created_at: chrono::Utc::now().naive_utc(),
        };

        if input.save_as_draft {
            self.commit(Change::SaveBill(bill.clone()).into()).await?;
            tracing::info!(tenant = %self.tenant_id, bill = %bill.number, "draft bill saved");
            return Ok(DocumentOutcome::new(bill));
        }

        let settlement = BillSettlement {
            paid_from,
            method: input.payment_method,
        };
        self.post_bill(bill, settlement).await
    }

    /// Post a draft bill as received on credit terms
    pub async fn issue_bill(&mut self, bill_id: Uuid) -> LedgerResult<DocumentOutcome<Bill>> {
        let mut bill = self.get_bill_required(bill_id).await?;
        if bill.settlement.status != DocumentStatus::Draft {
            return Err(LedgerError::Validation(format!(
                "Bill {} has already been issued",
                bill.number
            )));
        }
        self.fiscal_manager.ensure_open(bill.date).await?;

        bill.payment_type = PaymentType::Owe;
        bill.settlement = Settlement::outstanding(
            &bill.totals.total,
            DocumentStatus::Received,
            bill.settlement.due_date,
        );
        let settlement = BillSettlement {
            paid_from: None,
            method: None,
        };
        self.post_bill(bill, settlement).await
    }

    async fn post_bill(&mut self, mut bill: Bill, settlement: BillSettlement) -> LedgerResult<DocumentOutcome<Bill>> {
        let vendor = self.require_party(PartyKind::Vendor, bill.vendor_id).await?;
        let stocked = self.stocked_lines(&bill.items).await?;
        let mut warnings = Vec::new();
        let mut unit = UnitOfWork::new();

        let accounts = self.purchase_accounts().await?;
        let split = purchase_split(&bill.items, &stocked);
        let draft = recipes::purchase(&bill, &accounts, &split);
        let label = format!("bill {}", bill.number);
        bill.journal_entry_id = self.stage_journal(&mut unit, draft, &label, &mut warnings).await?;

        for movement in movements_for(
            &stocked,
            MovementType::In,
            bill.date,
            &bill.number,
            &format!("Purchase from {}", vendor.name),
            |line| line.item.unit_price.clone(),
        ) {
            unit.push(Change::RecordMovement(movement));
        }
        for line in &stocked {
            let mut product = line.product.clone();
            product.cost_price = line.item.unit_price.clone();
            unit.push(Change::SaveProduct(product));
        }

        let mut payment = None;
        match bill.payment_type {
            PaymentType::PayNow => {
                let total = bill.totals.total.clone();
                if total > money::zero() {
                    let paid_from = settlement.paid_from.ok_or_else(|| {
                        LedgerError::Validation("A paid-from account is required for pay-now bills".to_string())
                    })?;
                    let mut made = Payment {
                        id: Uuid::new_v4(),
                        direction: PaymentDirection::Made,
                        number: self.next_number(DocumentKind::PaymentMade).await?,
                        party_id: vendor.id,
                        document_id: Some(bill.id),
                        account_id: paid_from.id,
                        date: bill.date,
                        amount: total.clone(),
                        method: settlement.method.or_else(|| Some("cash".to_string())),
                        reference: Some(format!("Immediate payment for {}", bill.number)),
                        journal_entry_id: None,
                        created_at: chrono::Utc::now().naive_utc(),
                    };
                    let draft = recipes::payment_made(&made, accounts.payable.as_ref(), &paid_from);
                    let label = format!("payment {}", made.number);
                    made.journal_entry_id = self.stage_journal(&mut unit, draft, &label, &mut warnings).await?;
                    unit.push(Change::SavePayment(made.clone()));
                    payment = Some(made);
                }
                bill.settlement.apply(&bill.totals.total, &total, bill.date);
            }
            PaymentType::Owe => {
                if bill.settlement.due_date.is_none() {
                    bill.settlement.due_date = Some(due_date_after(bill.date, self.config.payment_terms_days)?);
                }
            }
        }

        unit.push(Change::SaveBill(bill.clone()));
        self.commit(unit).await?;

        tracing::info!(
            tenant = %self.tenant_id,
            bill = %bill.number,
            vendor = %vendor.name,
            total = %bill.totals.total,
            status = bill.settlement.status.as_str(),
            "bill recorded"
        );

        Ok(DocumentOutcome {
            journal_entry_id: bill.journal_entry_id,
            document: bill,
            payment,
            warnings,
        })
    }

    /// Get a bill, marking it overdue if it is past due on `today`
    pub async fn get_bill(&mut self, bill_id: Uuid, today: NaiveDate) -> LedgerResult<Option<Bill>> {
        let Some(mut bill) = self.storage.get_bill(&self.tenant_id, bill_id).await? else {
            return Ok(None);
        };
        if bill.settlement.refresh_overdue(today) {
            self.commit(Change::SaveBill(bill.clone()).into()).await?;
        }
        Ok(Some(bill))
    }

    /// Bills newest first, with overdue statuses refreshed for `today`
    pub async fn list_bills(&mut self, today: NaiveDate) -> LedgerResult<Vec<Bill>> {
        let mut bills = self.storage.list_bills(&self.tenant_id).await?;
        let mut unit = UnitOfWork::new();
        for bill in bills.iter_mut() {
            if bill.settlement.refresh_overdue(today) {
                unit.push(Change::SaveBill(bill.clone()));
            }
        }
        if !unit.is_empty() {
            self.commit(unit).await?;
        }
        bills.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.number.cmp(&a.number)));
        Ok(bills)
    }

    /// Delete a draft bill
    pub async fn delete_bill(&mut self, bill_id: Uuid) -> LedgerResult<()> {
        let bill = self.get_bill_required(bill_id).await?;
        if bill.settlement.status != DocumentStatus::Draft {
            return Err(LedgerError::Validation(format!(
                "Only draft bills can be deleted; {} is {}",
                bill.number,
                bill.settlement.status.as_str()
            )));
        }
        self.commit(Change::DeleteBill(bill_id).into()).await?;
        Ok(())
    }

    /// Record money paid to a vendor, optionally against a bill
    pub async fn make_payment(&mut self, input: NewPayment) -> LedgerResult<DocumentOutcome<Payment>> {
        validate_payment_amount(&input.amount)?;
        let vendor = self.require_party(PartyKind::Vendor, input.party_id).await?;
        let paid_from = self.deposit_account(input.account_id).await?;
        self.fiscal_manager.ensure_open(input.date).await?;

        let mut unit = UnitOfWork::new();
        if let Some(bill_id) = input.document_id {
            let mut bill = self.get_bill_required(bill_id).await?;
            ensure_payable("Bill", &bill.number, bill.vendor_id == vendor.id, &bill.settlement, &input.amount)?;
            bill.settlement.apply(&bill.totals.total, &input.amount, input.date);
            unit.push(Change::SaveBill(bill));
        }

        let mut payment = Payment {
            id: Uuid::new_v4(),
            direction: PaymentDirection::Made,
            number: self.next_number(DocumentKind::PaymentMade).await?,
            party_id: vendor.id,
            document_id: input.document_id,
            account_id: paid_from.id,
            date: input.date,
            amount: input.amount,
            method: input.method,
            reference: input.reference,
            journal_entry_id: None,
            created_at: chrono::Utc::now().naive_utc(),
        };

        let mut warnings = Vec::new();
        let payable = self.role_account(AccountRole::AccountsPayable).await?;
        let draft = recipes::payment_made(&payment, payable.as_ref(), &paid_from);
        let label = format!("payment {}", payment.number);
        payment.journal_entry_id = self.stage_journal(&mut unit, draft, &label, &mut warnings).await?;
        unit.push(Change::SavePayment(payment.clone()));
        self.commit(unit).await?;

        tracing::info!(
            tenant = %self.tenant_id,
            payment = %payment.number,
            vendor = %vendor.name,
            amount = %payment.amount,
            "payment made"
        );

        Ok(DocumentOutcome {
            journal_entry_id: payment.journal_entry_id,
            document: payment,
            payment: None,
            warnings,
        })
    }

    /// Payments made, oldest first
    pub async fn list_payments_made(&self) -> LedgerResult<Vec<Payment>> {
        let mut payments = self
            .storage
            .list_payments(&self.tenant_id, PaymentDirection::Made)
            .await?;
        payments.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.number.cmp(&b.number)));
        Ok(payments)
    }

    /// What the tenant owes the vendor: bills less payments and applied debit notes
    pub async fn vendor_balance(&self, vendor_id: Uuid) -> LedgerResult<BigDecimal> {
        self.require_party(PartyKind::Vendor, vendor_id).await?;

        let billed: BigDecimal = self
            .storage
            .list_bills(&self.tenant_id)
            .await?
            .iter()
            .filter(|b| b.vendor_id == vendor_id && b.settlement.status != DocumentStatus::Draft)
            .map(|b| &b.totals.total)
            .sum();
        let paid: BigDecimal = self
            .storage
            .list_payments(&self.tenant_id, PaymentDirection::Made)
            .await?
            .iter()
            .filter(|p| p.party_id == vendor_id)
            .map(|p| &p.amount)
            .sum();
        let returned: BigDecimal = self
            .storage
            .list_notes(&self.tenant_id, NoteKind::Debit)
            .await?
            .iter()
            .filter(|n| n.party_id == vendor_id && n.status == NoteStatus::Applied)
            .map(|n| &n.totals.total)
            .sum();

        Ok(billed - paid - returned)
    }

    pub(crate) async fn get_bill_required(&self, bill_id: Uuid) -> LedgerResult<Bill> {
        self.storage
            .get_bill(&self.tenant_id, bill_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Bill", bill_id))
    }

    pub(crate) async fn purchase_accounts(&self) -> LedgerResult<PurchaseAccounts> {
        Ok(PurchaseAccounts {
            payable: self.role_account(AccountRole::AccountsPayable).await?,
            inventory: self.role_account(AccountRole::Inventory).await?,
            expense: self.role_account(AccountRole::PurchaseExpense).await?,
            tax_payable: self.role_account(AccountRole::SalesTaxPayable).await?,
        })
    }
}

/// Stocked lines go to inventory; everything else to expense
pub(crate) fn purchase_split(items: &[LineItem], stocked: &[StockedLine]) -> PurchaseSplit {
    let subtotal: BigDecimal = items.iter().map(|i| &i.amount).sum();
    let inventory: BigDecimal = stocked.iter().map(|l| &l.item.amount).sum();
    PurchaseSplit {
        expense: subtotal - &inventory,
        inventory,
    }
}
