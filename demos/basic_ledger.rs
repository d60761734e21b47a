//! Basic ledger usage example
//!
//! Run with `RUST_LOG=bookkeeping_core=debug` to see the ledger's own logging.

use bigdecimal::BigDecimal;
use bookkeeping_core::{
    JournalLine, Ledger, LedgerConfig, LineItem, ManualEntry, MemoryStorage, NewBill, NewExpense,
    NewInvoice, NewPayment, OpeningStock, Party, Product,
};
use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let date = |m: u32, d: u32| NaiveDate::from_ymd_opt(2024, m, d).ok_or("invalid date");
    let config = LedgerConfig {
        company_name: "Corner Hardware".to_string(),
        ..LedgerConfig::default()
    };
    let mut ledger = Ledger::new(MemoryStorage::new(), "corner-hardware", config)?;

    println!("Setting up the chart of accounts...");
    let chart = ledger.setup_standard_chart_of_accounts().await?;
    let mut codes: Vec<_> = chart.keys().collect();
    codes.sort();
    println!("  {} accounts: {}\n", codes.len(), codes.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", "));

    ledger
        .create_journal_entry(ManualEntry {
            date: date(1, 1)?,
            description: "Owner investment".to_string(),
            reference: None,
            lines: vec![
                JournalLine::debit(chart["1100"].id, BigDecimal::from(20000), "Deposit"),
                JournalLine::credit(chart["3000"].id, BigDecimal::from(20000), "Capital"),
            ],
            post: true,
        })
        .await?;

    let hammer = ledger
        .create_product(
            Product::new("Claw Hammer", BigDecimal::from(35), BigDecimal::from(18)).with_reorder_level(BigDecimal::from(10)),
            Some(OpeningStock {
                quantity: BigDecimal::from(5),
                date: date(1, 1)?,
            }),
        )
        .await?;
    let supplier = ledger.create_party(Party::vendor("Tool Wholesale")).await?;
    let customer = ledger.create_party(Party::customer("Builders & Co").with_email("ap@builders.example")).await?;

    let bill = ledger
        .create_bill(
            NewBill::new(
                supplier.id,
                date(1, 5)?,
                vec![LineItem::new("Claw Hammer", BigDecimal::from(40), BigDecimal::from(18)).for_product(hammer.id)],
            )
            .with_tax_rate(BigDecimal::from(10))
            .with_vendor_reference("TW-2291"),
        )
        .await?;
    println!("Bill {} for {}", bill.document.number, bill.document.totals.total);

    let invoice = ledger
        .create_invoice(
            NewInvoice::new(
                customer.id,
                date(1, 12)?,
                vec![LineItem::new("Claw Hammer", BigDecimal::from(30), BigDecimal::from(35)).for_product(hammer.id)],
            )
            .with_tax_rate(BigDecimal::from(10)),
        )
        .await?;
    println!("Invoice {} for {}", invoice.document.number, invoice.document.totals.total);

    ledger
        .receive_payment(
            NewPayment::new(customer.id, chart["1100"].id, date(1, 25)?, BigDecimal::from(600)).against(invoice.document.id),
        )
        .await?;
    ledger
        .make_payment(NewPayment::new(supplier.id, chart["1100"].id, date(1, 28)?, bill.document.totals.total.clone()).against(bill.document.id))
        .await?;
    ledger
        .record_expense(NewExpense::new(date(1, 30)?, "Cleaning & Janitorial", "Shop cleaning", BigDecimal::from(45)))
        .await?;

    let reports = ledger.reports();
    let (start, end) = (date(1, 1)?, date(1, 31)?);

    let tb = reports.trial_balance(None, end).await?;
    println!("\nTrial balance as of {}", end);
    for row in &tb.rows {
        println!("  {:<6} {:<28} {:>12} {:>12}", row.code, row.name, row.debit, row.credit);
    }
    println!("  {:<35} {:>12} {:>12}  balanced: {}", "Totals", tb.total_debits, tb.total_credits, tb.is_balanced);

    let pl = reports.profit_and_loss(start, end).await?;
    println!("\nRevenue {}  COGS {}  Gross profit {}  Net income {}", pl.total_revenue, pl.total_cost_of_sales, pl.gross_profit, pl.net_income);

    let sheet = reports.balance_sheet(end).await?;
    println!("Assets {} = Liabilities {} + Equity {}", sheet.total_assets, sheet.total_liabilities, sheet.total_equity);

    let cash_flow = reports.cash_flow(start, end).await?;
    println!(
        "Cash: opening {} closing {} (operating {}, financing {}, reconciled: {})",
        cash_flow.opening_cash, cash_flow.closing_cash, cash_flow.net_operating, cash_flow.net_financing, cash_flow.is_reconciled
    );

    let aging = reports.receivables_aging(date(3, 15)?).await?;
    for party in &aging.parties {
        println!("{} owes {}", party.party_name, party.totals.total);
    }

    let inventory = reports.inventory_report().await?;
    for row in &inventory.rows {
        println!("{}: {} on hand, valued at {}{}", row.name, row.quantity_on_hand, row.stock_value, if row.is_low_stock { " (reorder)" } else { "" });
    }

    let integrity = ledger.validate_integrity(end).await?;
    println!("\nLedger integrity: {}", if integrity.is_valid { "ok" } else { "issues found" });
    Ok(())
}
