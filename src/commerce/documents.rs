//! Business documents and subsidiary records

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{LedgerError, LedgerResult};
use crate::utils::money;

/// Invoice / bill lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    /// Invoice issued to the customer
    Sent,
    /// Bill received from the vendor
    Received,
    /// Outstanding on credit terms
    Owed,
    Partial,
    Paid,
    Overdue,
}

impl DocumentStatus {
    /// Statuses that still expect payment and may become overdue
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Sent
                | DocumentStatus::Received
                | DocumentStatus::Owed
                | DocumentStatus::Partial
                | DocumentStatus::Overdue
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Sent => "sent",
            DocumentStatus::Received => "received",
            DocumentStatus::Owed => "owed",
            DocumentStatus::Partial => "partial",
            DocumentStatus::Paid => "paid",
            DocumentStatus::Overdue => "overdue",
        }
    }
}

/// Credit / debit note lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    Draft,
    Applied,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Settled in full at creation
    PayNow,
    /// Left outstanding until the due date
    Owe,
}

/// One line of an invoice, bill or note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: Option<Uuid>,
    pub description: String,
    pub quantity: BigDecimal,
    /// Unit price on sales documents, unit cost on purchase documents
    pub unit_price: BigDecimal,
    /// `quantity * unit_price`
    pub amount: BigDecimal,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: BigDecimal, unit_price: BigDecimal) -> Self {
        let amount = &quantity * &unit_price;
        Self {
            product_id: None,
            description: description.into(),
            quantity,
            unit_price,
            amount,
        }
    }

    pub fn for_product(mut self, product_id: Uuid) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.quantity <= money::zero() {
            return Err(LedgerError::Validation(format!(
                "Quantity for '{}' must be positive",
                self.description
            )));
        }
        if self.unit_price < money::zero() {
            return Err(LedgerError::Validation(format!(
                "Price for '{}' cannot be negative",
                self.description
            )));
        }
        Ok(())
    }
}

/// Header totals of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub subtotal: BigDecimal,
    /// Percentage, e.g. 10 for 10%
    pub tax_rate: BigDecimal,
    pub tax_amount: BigDecimal,
    pub discount_amount: BigDecimal,
    pub total: BigDecimal,
}

impl DocumentTotals {
    /// `subtotal + tax - discount`
    pub fn with_discount(items: &[LineItem], tax_rate: BigDecimal, discount: BigDecimal) -> Self {
        let subtotal: BigDecimal = items.iter().map(|i| &i.amount).sum();
        let tax_amount = money::percent_of(&subtotal, &tax_rate);
        let total = &subtotal + &tax_amount - &discount;
        Self {
            subtotal,
            tax_rate,
            tax_amount,
            discount_amount: discount,
            total,
        }
    }

    /// `subtotal + tax`, used by bills and notes
    pub fn without_discount(items: &[LineItem], tax_rate: BigDecimal) -> Self {
        Self::with_discount(items, tax_rate, money::zero())
    }

    /// Revenue portion of a sale
    pub fn net_of_discount(&self) -> BigDecimal {
        &self.subtotal - &self.discount_amount
    }
}

/// Payment progress of an invoice or bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub status: DocumentStatus,
    pub due_date: Option<NaiveDate>,
    pub amount_paid: BigDecimal,
    /// Never negative; clamped to zero once within 0.01
    pub balance_due: BigDecimal,
    pub paid_date: Option<NaiveDate>,
    /// Status to fall back to when nothing is paid
    unpaid_status: DocumentStatus,
}

impl Settlement {
    pub fn outstanding(total: &BigDecimal, status: DocumentStatus, due_date: Option<NaiveDate>) -> Self {
        Self {
            status,
            due_date,
            amount_paid: money::zero(),
            balance_due: total.clone(),
            paid_date: None,
            unpaid_status: status,
        }
    }

    /// Record `amount` paid on `date` against a document of `total`
    pub fn apply(&mut self, total: &BigDecimal, amount: &BigDecimal, date: NaiveDate) {
        self.amount_paid += amount;
        self.recompute(total, date);
    }

    /// Take back a previously applied amount
    pub fn unapply(&mut self, total: &BigDecimal, amount: &BigDecimal, date: NaiveDate) {
        self.amount_paid -= amount;
        if self.amount_paid < money::zero() {
            self.amount_paid = money::zero();
        }
        self.paid_date = None;
        self.recompute(total, date);
    }

    fn recompute(&mut self, total: &BigDecimal, date: NaiveDate) {
        let balance = total - &self.amount_paid;
        if balance <= money::tolerance() {
            self.balance_due = money::zero();
            self.status = DocumentStatus::Paid;
            if self.paid_date.is_none() {
                self.paid_date = Some(date);
            }
        } else {
            self.balance_due = balance;
            self.paid_date = None;
            self.status = if self.amount_paid > money::zero() {
                DocumentStatus::Partial
            } else {
                self.unpaid_status
            };
        }
    }

    /// Mark overdue when an open document is past due. Returns true if the status changed.
    pub fn refresh_overdue(&mut self, today: NaiveDate) -> bool {
        let past_due = self.due_date.is_some_and(|due| due < today);
        if past_due
            && self.status.is_open()
            && self.status != DocumentStatus::Overdue
            && self.balance_due > money::tolerance()
        {
            self.status = DocumentStatus::Overdue;
            return true;
        }
        false
    }

    pub fn is_paid(&self) -> bool {
        self.status == DocumentStatus::Paid
    }
}

/// Sales invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    /// `INV-00001`
    pub number: String,
    pub customer_id: Uuid,
    pub date: NaiveDate,
    pub payment_type: PaymentType,
    pub items: Vec<LineItem>,
    pub totals: DocumentTotals,
    pub settlement: Settlement,
    pub notes: Option<String>,
    pub journal_entry_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

/// Purchase bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    /// `BILL-00001`
    pub number: String,
    pub vendor_id: Uuid,
    /// Vendor's own invoice number
    pub vendor_reference: Option<String>,
    pub date: NaiveDate,
    pub payment_type: PaymentType,
    pub items: Vec<LineItem>,
    pub totals: DocumentTotals,
    pub settlement: Settlement,
    pub notes: Option<String>,
    pub journal_entry_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// Sales return, issued to a customer
    Credit,
    /// Purchase return, issued to a vendor
    Debit,
}

/// Credit or debit note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub kind: NoteKind,
    /// `CN-00001` / `DN-00001`
    pub number: String,
    /// Customer for credit notes, vendor for debit notes
    pub party_id: Uuid,
    /// Invoice or bill the note is applied against
    pub document_id: Option<Uuid>,
    pub date: NaiveDate,
    pub reason: Option<String>,
    pub status: NoteStatus,
    pub items: Vec<LineItem>,
    pub totals: DocumentTotals,
    pub journal_entry_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentDirection {
    Received,
    Made,
}

/// Money received from a customer or paid to a vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub direction: PaymentDirection,
    /// `PR-00001` / `PM-00001`
    pub number: String,
    pub party_id: Uuid,
    /// Invoice or bill settled by this payment
    pub document_id: Option<Uuid>,
    /// Deposit account (received) or paid-from account (made)
    pub account_id: Uuid,
    pub date: NaiveDate,
    pub amount: BigDecimal,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub journal_entry_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    Customer,
    Vendor,
}

/// Customer or vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub id: Uuid,
    pub kind: PartyKind,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl Party {
    pub fn new(kind: PartyKind, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name: name.into(),
            email: None,
            phone: None,
            address: None,
            tax_id: None,
            is_active: true,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn customer(name: impl Into<String>) -> Self {
        Self::new(PartyKind::Customer, name)
    }

    pub fn vendor(name: impl Into<String>) -> Self {
        Self::new(PartyKind::Vendor, name)
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Stocked good or service offered by the tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub selling_price: BigDecimal,
    /// Latest purchase cost, used for COGS
    pub cost_price: BigDecimal,
    pub reorder_level: BigDecimal,
    pub unit: String,
    /// Services never move stock
    pub is_service: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl Product {
    pub fn new(name: impl Into<String>, selling_price: BigDecimal, cost_price: BigDecimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            sku: None,
            description: None,
            selling_price,
            cost_price,
            reorder_level: money::zero(),
            unit: "pcs".to_string(),
            is_service: false,
            is_active: true,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn service(name: impl Into<String>, selling_price: BigDecimal) -> Self {
        let mut product = Self::new(name, selling_price, money::zero());
        product.is_service = true;
        product
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn with_reorder_level(mut self, level: BigDecimal) -> Self {
        self.reorder_level = level;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    In,
    Out,
    /// Sets the on-hand quantity to an exact value
    Adjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    Broken,
    Lost,
    Expired,
    Returned,
    Correction,
    Theft,
    Restock,
    Production,
    Sample,
    Other,
}

/// Append-only stock ledger row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: BigDecimal,
    pub unit_cost: BigDecimal,
    /// Document number or free text ("Opening Balance")
    pub reference: Option<String>,
    pub reason: Option<AdjustmentReason>,
    pub notes: Option<String>,
    pub date: NaiveDate,
    pub created_at: NaiveDateTime,
}

impl StockMovement {
    pub fn new(
        product_id: Uuid,
        movement_type: MovementType,
        quantity: BigDecimal,
        unit_cost: BigDecimal,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            movement_type,
            quantity,
            unit_cost,
            reference: None,
            reason: None,
            notes: None,
            date,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Quantity after applying this movement to `on_hand`
    pub fn apply_to(&self, on_hand: BigDecimal) -> BigDecimal {
        match self.movement_type {
            MovementType::In => on_hand + &self.quantity,
            MovementType::Out => on_hand - &self.quantity,
            MovementType::Adjustment => self.quantity.clone(),
        }
    }
}

/// On-hand quantity folded from movements in recorded order
pub fn quantity_on_hand<'a>(movements: impl IntoIterator<Item = &'a StockMovement>) -> BigDecimal {
    movements
        .into_iter()
        .fold(money::zero(), |on_hand, movement| movement.apply_to(on_hand))
}

/// Petty-cash expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    /// `PC-00001`
    pub number: String,
    pub date: NaiveDate,
    pub category: String,
    pub description: String,
    pub amount: BigDecimal,
    pub expense_account_id: Uuid,
    pub paid_from_account_id: Uuid,
    pub receipt_reference: Option<String>,
    pub journal_entry_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

/// Budgeted amount for an account and month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub account_id: Uuid,
    pub year: i32,
    /// 1-12
    pub month: u32,
    pub amount: BigDecimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_invoice_totals() {
        let items = vec![
            LineItem::new("Widget", BigDecimal::from(4), BigDecimal::from(200)),
            LineItem::new("Gadget", BigDecimal::from(1), BigDecimal::from(200)),
        ];
        let totals = DocumentTotals::with_discount(&items, BigDecimal::from(10), BigDecimal::from(50));
        assert_eq!(totals.subtotal, BigDecimal::from(1000));
        assert_eq!(totals.tax_amount, BigDecimal::from(100));
        assert_eq!(totals.total, BigDecimal::from(1050));
        assert_eq!(totals.net_of_discount(), BigDecimal::from(950));

        let bill = DocumentTotals::without_discount(&items, BigDecimal::from(10));
        assert_eq!(bill.total, BigDecimal::from(1100));
    }

    #[test]
    fn test_settlement_partial_then_paid() {
        let total = BigDecimal::from(1100);
        let mut settlement =
            Settlement::outstanding(&total, DocumentStatus::Owed, Some(d(2024, 2, 1)));

        settlement.apply(&total, &BigDecimal::from(600), d(2024, 1, 10));
        assert_eq!(settlement.status, DocumentStatus::Partial);
        assert_eq!(settlement.balance_due, BigDecimal::from(500));
        assert!(settlement.paid_date.is_none());

        let almost = BigDecimal::from_str("499.995").unwrap();
        settlement.apply(&total, &almost, d(2024, 1, 20));
        assert_eq!(settlement.status, DocumentStatus::Paid);
        assert_eq!(settlement.balance_due, BigDecimal::from(0));
        assert_eq!(settlement.paid_date, Some(d(2024, 1, 20)));
    }

    #[test]
    fn test_overpayment_clamps_balance() {
        let total = BigDecimal::from(100);
        let mut settlement = Settlement::outstanding(&total, DocumentStatus::Owed, None);
        settlement.apply(&total, &BigDecimal::from(150), d(2024, 1, 1));
        assert_eq!(settlement.balance_due, BigDecimal::from(0));
        assert!(settlement.is_paid());
    }

    #[test]
    fn test_unapply_restores_unpaid_status() {
        let total = BigDecimal::from(100);
        let mut settlement = Settlement::outstanding(&total, DocumentStatus::Owed, None);
        settlement.apply(&total, &BigDecimal::from(100), d(2024, 1, 1));
        settlement.unapply(&total, &BigDecimal::from(100), d(2024, 1, 2));
        assert_eq!(settlement.status, DocumentStatus::Owed);
        assert_eq!(settlement.balance_due, BigDecimal::from(100));
        assert!(settlement.paid_date.is_none());
    }

    #[test]
    fn test_overdue_refresh() {
        let total = BigDecimal::from(100);
        let mut settlement =
            Settlement::outstanding(&total, DocumentStatus::Owed, Some(d(2024, 1, 31)));
        assert!(!settlement.refresh_overdue(d(2024, 1, 31)));
        assert!(settlement.refresh_overdue(d(2024, 2, 1)));
        assert_eq!(settlement.status, DocumentStatus::Overdue);
        assert!(!settlement.refresh_overdue(d(2024, 2, 2)));

        let mut paid = Settlement::outstanding(&total, DocumentStatus::Owed, Some(d(2024, 1, 31)));
        paid.apply(&total, &total, d(2024, 1, 5));
        assert!(!paid.refresh_overdue(d(2024, 3, 1)));
    }

    #[test]
    fn test_quantity_on_hand_fold() {
        let product = Uuid::new_v4();
        let day = d(2024, 1, 1);
        let movements = vec![
            StockMovement::new(product, MovementType::In, BigDecimal::from(10), BigDecimal::from(5), day),
            StockMovement::new(product, MovementType::Out, BigDecimal::from(3), BigDecimal::from(5), day),
            StockMovement::new(product, MovementType::Adjustment, BigDecimal::from(4), BigDecimal::from(5), day),
            StockMovement::new(product, MovementType::In, BigDecimal::from(2), BigDecimal::from(5), day),
        ];
        assert_eq!(quantity_on_hand(&movements), BigDecimal::from(6));
    }

    #[test]
    fn test_line_item_validation() {
        assert!(LineItem::new("x", BigDecimal::from(0), BigDecimal::from(1)).validate().is_err());
        assert!(LineItem::new("x", BigDecimal::from(1), BigDecimal::from(-1)).validate().is_err());
        assert!(LineItem::new("x", BigDecimal::from(2), BigDecimal::from(3)).validate().is_ok());
    }
}
