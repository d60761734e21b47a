//! Sales: invoices, payments received and customer balances

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::commerce::documents::*;
use crate::commerce::inventory::{movements_for, StockedLine};
use crate::commerce::{due_date_after, normalize_items, validate_tax_rate, DocumentOutcome};
use crate::config::AccountRole;
use crate::ledger::recipes::{self, SaleAccounts};
use crate::ledger::Ledger;
use crate::numbering::DocumentKind;
use crate::traits::*;
use crate::types::*;
use crate::utils::money;

/// Input for a new sales invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub customer_id: Uuid,
    pub date: NaiveDate,
    /// Defaults to `date + payment_terms_days` for credit sales
    pub due_date: Option<NaiveDate>,
    pub items: Vec<LineItem>,
    pub tax_rate: BigDecimal,
    pub discount: BigDecimal,
    pub payment_type: PaymentType,
    /// Required for pay-now sales
    pub deposit_account_id: Option<Uuid>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    /// Accept the invoice even when stock is short
    pub allow_insufficient_stock: bool,
    /// Store without posting; drafts can be issued or deleted later
    pub save_as_draft: bool,
}

impl NewInvoice {
    /// A credit sale with no tax or discount
    pub fn new(customer_id: Uuid, date: NaiveDate, items: Vec<LineItem>) -> Self {
        Self {
            customer_id,
            date,
            due_date: None,
            items,
            tax_rate: money::zero(),
            discount: money::zero(),
            payment_type: PaymentType::Owe,
            deposit_account_id: None,
            payment_method: None,
            notes: None,
            allow_insufficient_stock: false,
            save_as_draft: false,
        }
    }

    pub fn with_tax_rate(mut self, tax_rate: BigDecimal) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    pub fn with_discount(mut self, discount: BigDecimal) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Settle in full at creation into `deposit_account_id`
    pub fn pay_now(mut self, deposit_account_id: Uuid) -> Self {
        self.payment_type = PaymentType::PayNow;
        self.deposit_account_id = Some(deposit_account_id);
        self
    }

    pub fn allow_insufficient_stock(mut self) -> Self {
        self.allow_insufficient_stock = true;
        self
    }

    pub fn as_draft(mut self) -> Self {
        self.save_as_draft = true;
        self
    }
}

/// Input for a payment received or made
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub party_id: Uuid,
    /// Invoice or bill to settle
    pub document_id: Option<Uuid>,
    /// Deposit account (received) or paid-from account (made)
    pub account_id: Uuid,
    pub date: NaiveDate,
    pub amount: BigDecimal,
    pub method: Option<String>,
    pub reference: Option<String>,
}

impl NewPayment {
    pub fn new(party_id: Uuid, account_id: Uuid, date: NaiveDate, amount: BigDecimal) -> Self {
        Self {
            party_id,
            document_id: None,
            account_id,
            date,
            amount,
            method: None,
            reference: None,
        }
    }

    pub fn against(mut self, document_id: Uuid) -> Self {
        self.document_id = Some(document_id);
        self
    }
}

/// How an issued invoice is settled
struct InvoiceSettlement {
    deposit: Option<Account>,
    method: Option<String>,
    allow_insufficient_stock: bool,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Create a sales invoice, post its journal entry and stock movements,
    /// and settle it at once for pay-now sales
    pub async fn create_invoice(&mut self, input: NewInvoice) -> LedgerResult<DocumentOutcome<Invoice>> {
        let items = normalize_items(input.items)?;
        validate_tax_rate(&input.tax_rate)?;
        let totals = DocumentTotals::with_discount(&items, input.tax_rate, input.discount);
        if totals.discount_amount < money::zero() || totals.discount_amount > totals.subtotal {
            return Err(LedgerError::Validation(format!(
                "Discount must be between 0 and the subtotal {}",
                totals.subtotal
            )));
        }

        self.require_party(PartyKind::Customer, input.customer_id).await?;
        self.fiscal_manager.ensure_open(input.date).await?;

        let deposit = match (input.payment_type, input.deposit_account_id) {
            (_, Some(id)) => Some(self.deposit_account(id).await?),
            (PaymentType::PayNow, None) if !input.save_as_draft => {
                return Err(LedgerError::Validation(
                    "A deposit account is required for pay-now invoices".to_string(),
                ));
            }
            _ => None,
        };

        let status = if input.save_as_draft {
            DocumentStatus::Draft
        } else {
            DocumentStatus::Owed
        };
        let number = self.next_number(DocumentKind::Invoice).await?;
        let invoice = Invoice {
            id: Uuid::new_v4(),
            number,
            customer_id: input.customer_id,
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
            self.commit(Change::SaveInvoice(invoice.clone()).into()).await?;
            tracing::info!(tenant = %self.tenant_id, invoice = %invoice.number, "draft invoice saved");
            return Ok(DocumentOutcome::new(invoice));
        }

        let settlement = InvoiceSettlement {
            deposit,
            method: input.payment_method,
            allow_insufficient_stock: input.allow_insufficient_stock,
        };
        self.post_invoice(invoice, settlement).await
    }

    /// Post a draft invoice as a credit sale sent to the customer
    pub async fn issue_invoice(
        &mut self,
        invoice_id: Uuid,
        allow_insufficient_stock: bool,
    ) -> LedgerResult<DocumentOutcome<Invoice>> {
        let mut invoice = self.get_invoice_required(invoice_id).await?;
        if invoice.settlement.status != DocumentStatus::Draft {
            return Err(LedgerError::Validation(format!(
                "Invoice {} has already been issued",
                invoice.number
            )));
        }
        self.fiscal_manager.ensure_open(invoice.date).await?;

        invoice.payment_type = PaymentType::Owe;
        invoice.settlement = Settlement::outstanding(
            &invoice.totals.total,
            DocumentStatus::Sent,
            invoice.settlement.due_date,
        );
        let settlement = InvoiceSettlement {
            deposit: None,
            method: None,
            allow_insufficient_stock,
        };
        self.post_invoice(invoice, settlement).await
    }

    async fn post_invoice(
        &mut self,
        mut invoice: Invoice,
        settlement: InvoiceSettlement,
    ) -> LedgerResult<DocumentOutcome<Invoice>> {
        let customer = self.require_party(PartyKind::Customer, invoice.customer_id).await?;
        let stocked = self.stocked_lines(&invoice.items).await?;

        let shortages = self.stock_shortages(&stocked).await?;
        if !shortages.is_empty() {
            if !settlement.allow_insufficient_stock {
                tracing::warn!(
                    tenant = %self.tenant_id,
                    invoice = %invoice.number,
                    shortages = shortages.len(),
                    "invoice rejected: insufficient stock"
                );
                return Err(LedgerError::InsufficientStock(shortages));
            }
            tracing::warn!(tenant = %self.tenant_id, invoice = %invoice.number, "stock shortage overridden");
        }

        let mut warnings = Vec::new();
        let cost_of_sales = cost_of_sales(&stocked, &mut warnings);

        let accounts = SaleAccounts {
            receivable: self.role_account(AccountRole::AccountsReceivable).await?,
            revenue: self.role_account(AccountRole::SalesRevenue).await?,
            tax_payable: self.role_account(AccountRole::SalesTaxPayable).await?,
            cost_of_sales: self.role_account(AccountRole::CostOfGoodsSold).await?,
            inventory: self.role_account(AccountRole::Inventory).await?,
        };

        let mut unit = UnitOfWork::new();
        let draft = recipes::sale(&invoice, &accounts, &cost_of_sales);
        let label = format!("invoice {}", invoice.number);
        invoice.journal_entry_id = self.stage_journal(&mut unit, draft, &label, &mut warnings).await?;

        for movement in movements_for(
            &stocked,
            MovementType::Out,
            invoice.date,
            &invoice.number,
            &format!("Sale to {}", customer.name),
            |line| line.product.cost_price.clone(),
        ) {
            unit.push(Change::RecordMovement(movement));
        }

        let mut payment = None;
        match invoice.payment_type {
            PaymentType::PayNow => {
                let total = invoice.totals.total.clone();
                if total > money::zero() {
                    let deposit = settlement.deposit.ok_or_else(|| {
                        LedgerError::Validation(
                            "A deposit account is required for pay-now invoices".to_string(),
                        )
                    })?;
                    let mut received = Payment {
                        id: Uuid::new_v4(),
                        direction: PaymentDirection::Received,
                        number: self.next_number(DocumentKind::PaymentReceived).await?,
                        party_id: customer.id,
                        document_id: Some(invoice.id),
                        account_id: deposit.id,
                        date: invoice.date,
                        amount: total.clone(),
                        method: settlement.method.or_else(|| Some("cash".to_string())),
                        reference: Some(format!("Cash sale for {}", invoice.number)),
                        journal_entry_id: None,
                        created_at: chrono::Utc::now().naive_utc(),
                    };
                    let receivable = accounts.receivable.as_ref();
                    let draft = recipes::payment_received(&received, &deposit, receivable);
                    let label = format!("payment {}", received.number);
                    received.journal_entry_id =
                        self.stage_journal(&mut unit, draft, &label, &mut warnings).await?;
                    unit.push(Change::SavePayment(received.clone()));
                    payment = Some(received);
                }
                invoice.settlement.apply(&invoice.totals.total, &total, invoice.date);
            }
            PaymentType::Owe => {
                if invoice.settlement.due_date.is_none() {
                    invoice.settlement.due_date =
                        Some(due_date_after(invoice.date, self.config.payment_terms_days)?);
                }
            }
        }

        unit.push(Change::SaveInvoice(invoice.clone()));
        self.commit(unit).await?;

        tracing::info!(
            tenant = %self.tenant_id,
            invoice = %invoice.number,
            customer = %customer.name,
            total = %invoice.totals.total,
            status = invoice.settlement.status.as_str(),
            "invoice created"
        );

        Ok(DocumentOutcome {
            journal_entry_id: invoice.journal_entry_id,
            document: invoice,
            payment,
            warnings,
        })
    }

    /// Get an invoice, marking it overdue if it is past due on `today`
    pub async fn get_invoice(&mut self, invoice_id: Uuid, today: NaiveDate) -> LedgerResult<Option<Invoice>> {
        let Some(mut invoice) = self.storage.get_invoice(&self.tenant_id, invoice_id).await? else {
            return Ok(None);
        };
        if invoice.settlement.refresh_overdue(today) {
            self.commit(Change::SaveInvoice(invoice.clone()).into()).await?;
        }
        Ok(Some(invoice))
    }

    /// Invoices newest first, with overdue statuses refreshed for `today`
    pub async fn list_invoices(&mut self, today: NaiveDate) -> LedgerResult<Vec<Invoice>> {
        let mut invoices = self.storage.list_invoices(&self.tenant_id).await?;
        let mut unit = UnitOfWork::new();
        for invoice in invoices.iter_mut() {
            if invoice.settlement.refresh_overdue(today) {
                unit.push(Change::SaveInvoice(invoice.clone()));
            }
        }
        if !unit.is_empty() {
            tracing::debug!(tenant = %self.tenant_id, count = unit.len(), "invoices marked overdue");
            self.commit(unit).await?;
        }
        invoices.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.number.cmp(&a.number)));
        Ok(invoices)
    }

    /// Delete a draft invoice
    pub async fn delete_invoice(&mut self, invoice_id: Uuid) -> LedgerResult<()> {
        let invoice = self.get_invoice_required(invoice_id).await?;
        if invoice.settlement.status != DocumentStatus::Draft {
            return Err(LedgerError::Validation(format!(
                "Only draft invoices can be deleted; {} is {}",
                invoice.number,
                invoice.settlement.status.as_str()
            )));
        }
        self.commit(Change::DeleteInvoice(invoice_id).into()).await?;
        tracing::info!(tenant = %self.tenant_id, invoice = %invoice.number, "draft invoice deleted");
        Ok(())
    }

    /// Record money received from a customer, optionally against an invoice
    pub async fn receive_payment(&mut self, input: NewPayment) -> LedgerResult<DocumentOutcome<Payment>> {
        validate_payment_amount(&input.amount)?;
        let customer = self.require_party(PartyKind::Customer, input.party_id).await?;
        let deposit = self.deposit_account(input.account_id).await?;
        self.fiscal_manager.ensure_open(input.date).await?;

        let mut unit = UnitOfWork::new();
        if let Some(invoice_id) = input.document_id {
            let mut invoice = self.get_invoice_required(invoice_id).await?;
            ensure_payable(
                "Invoice",
                &invoice.number,
                invoice.customer_id == customer.id,
                &invoice.settlement,
                &input.amount,
            )?;
            invoice.settlement.apply(&invoice.totals.total, &input.amount, input.date);
            unit.push(Change::SaveInvoice(invoice));
        }

        let mut payment = Payment {
            id: Uuid::new_v4(),
            direction: PaymentDirection::Received,
            number: self.next_number(DocumentKind::PaymentReceived).await?,
            party_id: customer.id,
            document_id: input.document_id,
            account_id: deposit.id,
            date: input.date,
            amount: input.amount,
            method: input.method,
            reference: input.reference,
            journal_entry_id: None,
            created_at: chrono::Utc::now().naive_utc(),
        };

        let mut warnings = Vec::new();
        let receivable = self.role_account(AccountRole::AccountsReceivable).await?;
        let draft = recipes::payment_received(&payment, &deposit, receivable.as_ref());
        let label = format!("payment {}", payment.number);
        payment.journal_entry_id = self.stage_journal(&mut unit, draft, &label, &mut warnings).await?;
        unit.push(Change::SavePayment(payment.clone()));
        self.commit(unit).await?;

        tracing::info!(
            tenant = %self.tenant_id,
            payment = %payment.number,
            customer = %customer.name,
            amount = %payment.amount,
            "payment received"
        );

        Ok(DocumentOutcome {
            journal_entry_id: payment.journal_entry_id,
            document: payment,
            payment: None,
            warnings,
        })
    }

    /// Payments received, oldest first
    pub async fn list_payments_received(&self) -> LedgerResult<Vec<Payment>> {
        let mut payments = self
            .storage
            .list_payments(&self.tenant_id, PaymentDirection::Received)
            .await?;
        payments.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.number.cmp(&b.number)));
        Ok(payments)
    }

    /// What the customer owes: invoices less payments and applied credit notes
    pub async fn customer_balance(&self, customer_id: Uuid) -> LedgerResult<BigDecimal> {
        self.require_party(PartyKind::Customer, customer_id).await?;

        let invoiced: BigDecimal = self
            .storage
            .list_invoices(&self.tenant_id)
            .await?
            .iter()
            .filter(|i| i.customer_id == customer_id && i.settlement.status != DocumentStatus::Draft)
            .map(|i| &i.totals.total)
            .sum();
        let paid: BigDecimal = self
            .storage
            .list_payments(&self.tenant_id, PaymentDirection::Received)
            .await?
            .iter()
            .filter(|p| p.party_id == customer_id)
            .map(|p| &p.amount)
            .sum();
        let credited: BigDecimal = self
            .storage
            .list_notes(&self.tenant_id, NoteKind::Credit)
            .await?
            .iter()
            .filter(|n| n.party_id == customer_id && n.status == NoteStatus::Applied)
            .map(|n| &n.totals.total)
            .sum();

        Ok(invoiced - paid - credited)
    }

    pub(crate) async fn get_invoice_required(&self, invoice_id: Uuid) -> LedgerResult<Invoice> {
        self.storage
            .get_invoice(&self.tenant_id, invoice_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Invoice", invoice_id))
    }

    /// Account money is deposited to or paid from
    pub(crate) async fn deposit_account(&self, account_id: Uuid) -> LedgerResult<Account> {
        match self.get_account(account_id).await? {
            Some(account) if account.is_active => Ok(account),
            _ => Err(LedgerError::Validation(format!(
                "Payment account {} was not found",
                account_id
            ))),
        }
    }
}

/// Σ quantity × cost price of stocked lines. Zero-cost products are skipped with a warning.
fn cost_of_sales(stocked: &[StockedLine], warnings: &mut Vec<String>) -> BigDecimal {
    let mut total = money::zero();
    let mut zero_cost: Vec<&str> = Vec::new();
    for line in stocked {
        if line.product.cost_price > money::zero() {
            total += &line.item.quantity * &line.product.cost_price;
        } else if !zero_cost.contains(&line.product.name.as_str()) {
            zero_cost.push(&line.product.name);
        }
    }
    if !zero_cost.is_empty() {
        warnings.push(format!(
            "{}: cost price is 0, so cost of goods sold was not recorded",
            zero_cost.join(", ")
        ));
    }
    total
}

pub(crate) fn validate_payment_amount(amount: &BigDecimal) -> LedgerResult<()> {
    if *amount <= money::zero() {
        return Err(LedgerError::Validation(format!(
            "Payment amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

/// A payment may settle an open document of the same party, up to its balance due
pub(crate) fn ensure_payable(
    kind: &str,
    number: &str,
    same_party: bool,
    settlement: &Settlement,
    amount: &BigDecimal,
) -> LedgerResult<()> {
    if !same_party {
        return Err(LedgerError::Validation(format!(
            "{} {} belongs to a different party",
            kind, number
        )));
    }
    if !settlement.status.is_open() {
        return Err(LedgerError::Validation(format!(
            "{} {} is {} and cannot take payments",
            kind,
            number,
            settlement.status.as_str()
        )));
    }
    if amount - &settlement.balance_due > money::tolerance() {
        return Err(LedgerError::Validation(format!(
            "Payment of {} exceeds the balance due of {} on {}",
            amount, settlement.balance_due, number
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commerce::inventory::OpeningStock;
    use crate::config::LedgerConfig;
    use crate::utils::MemoryStorage;
    use std::collections::HashMap;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn setup() -> (Ledger<MemoryStorage>, HashMap<String, Account>, Party) {
        let mut ledger = Ledger::new(MemoryStorage::new(), "t1", LedgerConfig::default()).unwrap();
        let chart = ledger.setup_standard_chart_of_accounts().await.unwrap();
        let customer = ledger.create_party(Party::customer("Acme Ltd")).await.unwrap();
        (ledger, chart, customer)
    }

    fn consulting() -> Vec<LineItem> {
        vec![LineItem::new("Consulting", BigDecimal::from(1), BigDecimal::from(1000))]
    }

    #[tokio::test]
    async fn test_credit_sale_defaults_due_date() {
        let (mut ledger, _, customer) = setup().await;
        let outcome = ledger
            .create_invoice(NewInvoice::new(customer.id, d(2024, 1, 15), consulting()).with_tax_rate(BigDecimal::from(10)))
            .await
            .unwrap();

        let invoice = outcome.document;
        assert_eq!(invoice.number, "INV-00001");
        assert_eq!(invoice.settlement.status, DocumentStatus::Owed);
        assert_eq!(invoice.settlement.due_date, Some(d(2024, 2, 14)));
        assert_eq!(invoice.settlement.balance_due, BigDecimal::from(1100));
        assert!(outcome.journal_entry_id.is_some());
        assert!(outcome.warnings.is_empty());
        assert_eq!(ledger.customer_balance(customer.id).await.unwrap(), BigDecimal::from(1100));
    }

    #[tokio::test]
    async fn test_pay_now_settles_immediately() {
        let (mut ledger, chart, customer) = setup().await;
        let outcome = ledger
            .create_invoice(NewInvoice::new(customer.id, d(2024, 1, 15), consulting()).pay_now(chart["1100"].id))
            .await
            .unwrap();

        let invoice = outcome.document;
        assert!(invoice.settlement.is_paid());
        assert_eq!(invoice.settlement.paid_date, Some(d(2024, 1, 15)));
        let payment = outcome.payment.unwrap();
        assert_eq!(payment.number, "PR-00001");
        assert!(payment.journal_entry_id.is_some());
        assert_eq!(ledger.customer_balance(customer.id).await.unwrap(), money::zero());
        assert_eq!(
            ledger.account_balance(chart["1100"].id, None, None).await.unwrap(),
            BigDecimal::from(1000)
        );

        let missing_deposit = NewInvoice {
            payment_type: PaymentType::PayNow,
            ..NewInvoice::new(customer.id, d(2024, 1, 15), consulting())
        };
        assert!(ledger.create_invoice(missing_deposit).await.is_err());
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let (mut ledger, chart, customer) = setup().await;
        let invoice = ledger
            .create_invoice(NewInvoice::new(customer.id, d(2024, 1, 15), consulting()))
            .await
            .unwrap()
            .document;

        let first = NewPayment::new(customer.id, chart["1000"].id, d(2024, 1, 20), BigDecimal::from(400)).against(invoice.id);
        ledger.receive_payment(first).await.unwrap();
        let partial = ledger.get_invoice(invoice.id, d(2024, 1, 21)).await.unwrap().unwrap();
        assert_eq!(partial.settlement.status, DocumentStatus::Partial);
        assert_eq!(partial.settlement.balance_due, BigDecimal::from(600));

        let too_much = NewPayment::new(customer.id, chart["1000"].id, d(2024, 1, 22), BigDecimal::from(700)).against(invoice.id);
        assert!(ledger.receive_payment(too_much).await.is_err());

        let rest = NewPayment::new(customer.id, chart["1000"].id, d(2024, 1, 25), BigDecimal::from(600)).against(invoice.id);
        ledger.receive_payment(rest).await.unwrap();
        let paid = ledger.get_invoice(invoice.id, d(2024, 1, 26)).await.unwrap().unwrap();
        assert!(paid.settlement.is_paid());
        assert_eq!(paid.settlement.balance_due, money::zero());
        assert_eq!(paid.settlement.paid_date, Some(d(2024, 1, 25)));
    }

    #[tokio::test]
    async fn test_overdue_refresh_on_list() {
        let (mut ledger, _, customer) = setup().await;
        let invoice = ledger
            .create_invoice(NewInvoice::new(customer.id, d(2024, 1, 1), consulting()).with_due_date(d(2024, 1, 31)))
            .await
            .unwrap()
            .document;

        let listed = ledger.list_invoices(d(2024, 1, 31)).await.unwrap();
        assert_eq!(listed[0].settlement.status, DocumentStatus::Owed);

        let listed = ledger.list_invoices(d(2024, 2, 1)).await.unwrap();
        assert_eq!(listed[0].settlement.status, DocumentStatus::Overdue);
        let stored = ledger.get_invoice(invoice.id, d(2024, 1, 1)).await.unwrap().unwrap();
        assert_eq!(stored.settlement.status, DocumentStatus::Overdue);
    }

    #[tokio::test]
    async fn test_stock_shortage_requires_override() {
        let (mut ledger, _, customer) = setup().await;
        let widget = ledger
            .create_product(
                Product::new("Widget", BigDecimal::from(100), BigDecimal::from(40)),
                Some(OpeningStock {
                    quantity: BigDecimal::from(3),
                    date: d(2024, 1, 1),
                }),
            )
            .await
            .unwrap();
        let items = vec![LineItem::new("Widget", BigDecimal::from(5), BigDecimal::from(100)).for_product(widget.id)];

        let rejected = ledger
            .create_invoice(NewInvoice::new(customer.id, d(2024, 1, 10), items.clone()))
            .await;
        match rejected {
            Err(LedgerError::InsufficientStock(shortages)) => {
                assert_eq!(shortages.len(), 1);
                assert_eq!(shortages[0].short, BigDecimal::from(2));
            }
            other => panic!("expected shortage, got {:?}", other),
        }
        assert!(ledger.list_invoices(d(2024, 1, 10)).await.unwrap().is_empty());

        let outcome = ledger
            .create_invoice(NewInvoice::new(customer.id, d(2024, 1, 10), items).allow_insufficient_stock())
            .await
            .unwrap();
        assert!(outcome.journal_entry_id.is_some());
        assert_eq!(ledger.quantity_on_hand(widget.id).await.unwrap(), BigDecimal::from(-2));
    }

    #[tokio::test]
    async fn test_zero_cost_product_warns() {
        let (mut ledger, _, customer) = setup().await;
        let freebie = ledger
            .create_product(
                Product::new("Sticker", BigDecimal::from(2), money::zero()),
                Some(OpeningStock {
                    quantity: BigDecimal::from(100),
                    date: d(2024, 1, 1),
                }),
            )
            .await
            .unwrap();
        let items = vec![LineItem::new("Sticker", BigDecimal::from(10), BigDecimal::from(2)).for_product(freebie.id)];

        let outcome = ledger
            .create_invoice(NewInvoice::new(customer.id, d(2024, 1, 10), items))
            .await
            .unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("Sticker"));
    }

    #[tokio::test]
    async fn test_draft_lifecycle() {
        let (mut ledger, _, customer) = setup().await;
        let draft = ledger
            .create_invoice(NewInvoice::new(customer.id, d(2024, 1, 10), consulting()).as_draft())
            .await
            .unwrap();
        assert!(draft.journal_entry_id.is_none());
        assert_eq!(ledger.customer_balance(customer.id).await.unwrap(), money::zero());

        let issued = ledger.issue_invoice(draft.document.id, false).await.unwrap();
        assert_eq!(issued.document.settlement.status, DocumentStatus::Sent);
        assert_eq!(issued.document.settlement.due_date, Some(d(2024, 2, 9)));
        assert!(issued.journal_entry_id.is_some());
        assert_eq!(ledger.customer_balance(customer.id).await.unwrap(), BigDecimal::from(1000));

        let overdue = ledger.list_invoices(d(2024, 3, 1)).await.unwrap();
        let listed = overdue.iter().find(|i| i.id == draft.document.id).unwrap();
        assert_eq!(listed.settlement.status, DocumentStatus::Overdue);
        assert!(ledger.delete_invoice(draft.document.id).await.is_err());

        let other = ledger
            .create_invoice(NewInvoice::new(customer.id, d(2024, 1, 11), consulting()).as_draft())
            .await
            .unwrap();
        ledger.delete_invoice(other.document.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_due_date_overflow_is_rejected() {
        let (mut ledger, _, customer) = setup().await;
        let result = ledger
            .create_invoice(NewInvoice::new(customer.id, NaiveDate::MAX, consulting()))
            .await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert!(ledger.list_invoices(d(2024, 1, 1)).await.unwrap().is_empty());

        let long_terms = LedgerConfig {
            payment_terms_days: 200_000_000,
            ..LedgerConfig::default()
        };
        assert!(matches!(
            Ledger::new(MemoryStorage::new(), "t2", long_terms),
            Err(LedgerError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_invoices_rejected() {
        let (mut ledger, _, customer) = setup().await;
        assert!(ledger
            .create_invoice(NewInvoice::new(customer.id, d(2024, 1, 10), Vec::new()))
            .await
            .is_err());
        assert!(ledger
            .create_invoice(NewInvoice::new(customer.id, d(2024, 1, 10), consulting()).with_discount(BigDecimal::from(2000)))
            .await
            .is_err());
        assert!(ledger
            .create_invoice(NewInvoice::new(Uuid::new_v4(), d(2024, 1, 10), consulting()))
            .await
            .is_err());
    }
}
