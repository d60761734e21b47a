//! Journal recipes for each kind of business transaction
//!
//! Every function is pure: given a document and the accounts it posts to, it
//! returns a balanced draft, or `None` when a structurally required account
//! is missing.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::commerce::documents::{Bill, Expense, Invoice, Note, Payment};
use crate::ledger::journal::{EntryBuilder, JournalDraft};
use crate::numbering::{reversal_reference, year_end_reference};
use crate::types::*;
use crate::utils::money;

/// Accounts a sale posts to
#[derive(Debug, Clone, Default)]
pub struct SaleAccounts {
    pub receivable: Option<Account>,
    pub revenue: Option<Account>,
    pub tax_payable: Option<Account>,
    pub cost_of_sales: Option<Account>,
    pub inventory: Option<Account>,
}

/// Accounts a purchase or purchase return posts to
#[derive(Debug, Clone, Default)]
pub struct PurchaseAccounts {
    pub payable: Option<Account>,
    pub inventory: Option<Account>,
    pub expense: Option<Account>,
    pub tax_payable: Option<Account>,
}

/// Split of a purchase document between stocked and non-stocked lines
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseSplit {
    pub inventory: BigDecimal,
    pub expense: BigDecimal,
}

/// Sale: Dr receivable total; Cr revenue (subtotal - discount); Cr tax;
/// plus Dr COGS / Cr inventory for `cost_of_sales` when both accounts exist.
pub fn sale(invoice: &Invoice, accounts: &SaleAccounts, cost_of_sales: &BigDecimal) -> Option<JournalDraft> {
    let receivable = accounts.receivable.as_ref()?;
    let revenue = accounts.revenue.as_ref()?;
    let totals = &invoice.totals;
    let number = &invoice.number;

    let mut builder = EntryBuilder::new(invoice.date, format!("Sales invoice {}", number), EntrySource::Sale)
        .reference(number.clone())
        .source_id(invoice.id)
        .debit(receivable.id, totals.total.clone(), format!("Invoice {}", number))
        .credit(revenue.id, totals.net_of_discount(), format!("Sales - {}", number));

    if money::is_material(&totals.tax_amount) {
        let tax = accounts.tax_payable.as_ref()?;
        builder = builder.credit(tax.id, totals.tax_amount.clone(), format!("Sales tax - {}", number));
    }

    if *cost_of_sales > money::zero() {
        if let (Some(cogs), Some(inventory)) = (&accounts.cost_of_sales, &accounts.inventory) {
            builder = builder
                .debit(cogs.id, cost_of_sales.clone(), format!("Cost of goods sold - {}", number))
                .credit(inventory.id, cost_of_sales.clone(), format!("Inventory released - {}", number));
        }
    }

    Some(builder.build())
}

/// Purchase: Dr inventory / expense by line kind; Dr tax (input tax); Cr payable total
pub fn purchase(bill: &Bill, accounts: &PurchaseAccounts, split: &PurchaseSplit) -> Option<JournalDraft> {
    let payable = accounts.payable.as_ref()?;
    let totals = &bill.totals;
    let number = &bill.number;

    let builder = EntryBuilder::new(bill.date, format!("Purchase bill {}", number), EntrySource::Purchase)
        .reference(number.clone())
        .source_id(bill.id);

    let builder = cost_legs(builder, accounts, split, &totals.subtotal, number, EntryType::Debit)?;
    let builder = tax_leg(builder, accounts, &totals.tax_amount, number, EntryType::Debit)?;

    Some(
        builder
            .credit(payable.id, totals.total.clone(), format!("Bill {}", number))
            .build(),
    )
}

/// Payment received: Dr deposit account, Cr receivable
pub fn payment_received(payment: &Payment, deposit: &Account, receivable: Option<&Account>) -> Option<JournalDraft> {
    let receivable = receivable?;
    Some(
        EntryBuilder::new(payment.date, format!("Payment received {}", payment.number), EntrySource::Payment)
            .reference(payment.number.clone())
            .source_id(payment.id)
            .debit(deposit.id, payment.amount.clone(), format!("Deposit - {}", payment.number))
            .credit(receivable.id, payment.amount.clone(), format!("Customer payment - {}", payment.number))
            .build(),
    )
}

/// Payment made: Dr payable, Cr paid-from account
pub fn payment_made(payment: &Payment, payable: Option<&Account>, paid_from: &Account) -> Option<JournalDraft> {
    let payable = payable?;
    Some(
        EntryBuilder::new(payment.date, format!("Payment made {}", payment.number), EntrySource::Payment)
            .reference(payment.number.clone())
            .source_id(payment.id)
            .debit(payable.id, payment.amount.clone(), format!("Vendor payment - {}", payment.number))
            .credit(paid_from.id, payment.amount.clone(), format!("Paid from - {}", payment.number))
            .build(),
    )
}

/// Credit note: Dr revenue subtotal; Dr tax; Cr receivable total
pub fn credit_note(note: &Note, accounts: &SaleAccounts) -> Option<JournalDraft> {
    let receivable = accounts.receivable.as_ref()?;
    let revenue = accounts.revenue.as_ref()?;
    let totals = &note.totals;
    let number = &note.number;

    let mut builder = EntryBuilder::new(note.date, format!("Credit note {}", number), EntrySource::CreditNote)
        .reference(number.clone())
        .source_id(note.id)
        .debit(revenue.id, totals.subtotal.clone(), format!("Sales return - {}", number));

    if money::is_material(&totals.tax_amount) {
        let tax = accounts.tax_payable.as_ref()?;
        builder = builder.debit(tax.id, totals.tax_amount.clone(), format!("Sales tax reversed - {}", number));
    }

    Some(
        builder
            .credit(receivable.id, totals.total.clone(), format!("Credit note {}", number))
            .build(),
    )
}

/// Debit note: Dr payable total; Cr inventory / expense by line kind; Cr tax
pub fn debit_note(note: &Note, accounts: &PurchaseAccounts, split: &PurchaseSplit) -> Option<JournalDraft> {
    let payable = accounts.payable.as_ref()?;
    let totals = &note.totals;
    let number = &note.number;

    let builder = EntryBuilder::new(note.date, format!("Debit note {}", number), EntrySource::DebitNote)
        .reference(number.clone())
        .source_id(note.id)
        .debit(payable.id, totals.total.clone(), format!("Debit note {}", number));

    let builder = cost_legs(builder, accounts, split, &totals.subtotal, number, EntryType::Credit)?;
    let builder = tax_leg(builder, accounts, &totals.tax_amount, number, EntryType::Credit)?;
    Some(builder.build())
}

/// Petty-cash expense: Dr expense account, Cr paid-from account
pub fn expense(expense: &Expense, expense_account: &Account, paid_from: &Account) -> JournalDraft {
    EntryBuilder::new(
        expense.date,
        format!("Petty cash {}: {}", expense.number, expense.description),
        EntrySource::Expense,
    )
    .reference(expense.number.clone())
    .source_id(expense.id)
    .debit(expense_account.id, expense.amount.clone(), expense.category.clone())
    .credit(paid_from.id, expense.amount.clone(), format!("Petty cash - {}", expense.number))
    .build()
}

/// Reversal: every line with debit and credit swapped, order preserved
pub fn reversal(original: &JournalEntry, date: NaiveDate) -> JournalDraft {
    let builder = EntryBuilder::new(
        date,
        format!("Reversal of {}: {}", original.entry_number, original.description),
        EntrySource::Reversal,
    )
    .reference(reversal_reference(&original.entry_number))
    .source_id(original.id);

    original
        .lines
        .iter()
        .fold(builder, |b, line| {
            let mut swapped = line.swapped();
            swapped.description = Some(format!(
                "Reversal: {}",
                line.description.as_deref().unwrap_or_default()
            ));
            b.line(swapped)
        })
        .build()
}

/// Year-end close
///
/// `revenue` balances are credit - debit, `expenses` balances debit - credit.
/// Each non-trivial balance is zeroed, and net income moves to retained earnings.
pub fn year_end_close(
    year: i32,
    closing_date: NaiveDate,
    revenue: &[(Account, BigDecimal)],
    expenses: &[(Account, BigDecimal)],
    retained_earnings: &Account,
) -> Option<JournalDraft> {
    let mut builder = EntryBuilder::new(
        closing_date,
        format!("Year-end closing entry for {}", year),
        EntrySource::YearEnd,
    )
    .reference(year_end_reference(year));

    let mut total_revenue = money::zero();
    let mut total_expenses = money::zero();
    let mut closed_any = false;

    for (account, balance) in revenue {
        if money::within_tolerance(balance) {
            continue;
        }
        closed_any = true;
        total_revenue += balance;
        let description = format!("Close {}", account.name);
        builder = if *balance > money::zero() {
            builder.debit(account.id, balance.clone(), description)
        } else {
            builder.credit(account.id, balance.abs(), description)
        };
    }

    for (account, balance) in expenses {
        if money::within_tolerance(balance) {
            continue;
        }
        closed_any = true;
        total_expenses += balance;
        let description = format!("Close {}", account.name);
        builder = if *balance > money::zero() {
            builder.credit(account.id, balance.clone(), description)
        } else {
            builder.debit(account.id, balance.abs(), description)
        };
    }

    if !closed_any {
        return None;
    }

    let net_income = total_revenue - total_expenses;
    if !money::within_tolerance(&net_income) {
        let description = format!("Net income {} to retained earnings", year);
        builder = if net_income > money::zero() {
            builder.credit(retained_earnings.id, net_income, description)
        } else {
            builder.debit(retained_earnings.id, net_income.abs(), description)
        };
    }

    Some(builder.build())
}

/// Inventory and expense legs on `side`, falling back to whichever account exists
fn cost_legs(
    builder: EntryBuilder,
    accounts: &PurchaseAccounts,
    split: &PurchaseSplit,
    subtotal: &BigDecimal,
    number: &str,
    side: EntryType,
) -> Option<EntryBuilder> {
    let (mut inventory_amount, mut expense_amount) = (split.inventory.clone(), split.expense.clone());
    if money::is_zero(&inventory_amount) && money::is_zero(&expense_amount) {
        expense_amount = subtotal.clone();
    }

    let inventory = accounts.inventory.as_ref();
    let expense = accounts.expense.as_ref();
    match (inventory, expense) {
        (Some(_), Some(_)) => {}
        (Some(_), None) => {
            inventory_amount += expense_amount;
            expense_amount = money::zero();
        }
        (None, Some(_)) => {
            expense_amount += inventory_amount;
            inventory_amount = money::zero();
        }
        (None, None) => return None,
    }

    let mut builder = builder;
    if let Some(account) = inventory {
        builder = post(builder, side, account, inventory_amount, format!("Inventory - {}", number));
    }
    if let Some(account) = expense {
        builder = post(builder, side, account, expense_amount, format!("Expense - {}", number));
    }
    Some(builder)
}

fn tax_leg(
    builder: EntryBuilder,
    accounts: &PurchaseAccounts,
    tax_amount: &BigDecimal,
    number: &str,
    side: EntryType,
) -> Option<EntryBuilder> {
    if !money::is_material(tax_amount) {
        return Some(builder);
    }
    let tax = accounts.tax_payable.as_ref()?;
    Some(post(builder, side, tax, tax_amount.clone(), format!("Input tax - {}", number)))
}

fn post(builder: EntryBuilder, side: EntryType, account: &Account, amount: BigDecimal, description: String) -> EntryBuilder {
    match side {
        EntryType::Debit => builder.debit(account.id, amount, description),
        EntryType::Credit => builder.credit(account.id, amount, description),
    }
}
