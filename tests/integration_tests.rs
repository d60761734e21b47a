//! Integration tests for bookkeeping-core

use bigdecimal::BigDecimal;
use bookkeeping_core::{
    utils::{StrictAccountValidator, StrictEntryValidator},
    AccountType, BusinessType, EntryFilter, JournalLine, Ledger, LedgerConfig, LedgerError,
    LedgerStorage, LineItem, ManualEntry, MemoryStorage, NewBill, NewExpense, NewInvoice, NewNote,
    NewPayment, NoteStatus, OpeningStock, Party, Product, ReportGenerator,
};
use chrono::NaiveDate;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn amount(value: i64) -> BigDecimal {
    BigDecimal::from(value)
}

async fn new_ledger(config: LedgerConfig) -> (Ledger<MemoryStorage>, std::collections::HashMap<String, bookkeeping_core::Account>) {
    let mut ledger = Ledger::new(MemoryStorage::new(), "tenant-1", config).unwrap();
    let chart = ledger.setup_standard_chart_of_accounts().await.unwrap();
    (ledger, chart)
}

#[tokio::test]
async fn test_cash_sale_with_tax() {
    let (mut ledger, chart) = new_ledger(LedgerConfig::default()).await;
    let customer = ledger.create_party(Party::customer("Acme Ltd")).await.unwrap();

    let outcome = ledger
        .create_invoice(
            NewInvoice::new(
                customer.id,
                d(2024, 1, 15),
                vec![LineItem::new("Consulting", amount(1), amount(1000))],
            )
            .with_tax_rate(amount(10))
            .pay_now(chart["1100"].id),
        )
        .await
        .unwrap();

    assert_eq!(outcome.document.number, "INV-00001");
    assert_eq!(outcome.document.totals.total, amount(1100));
    assert!(outcome.document.settlement.is_paid());
    assert_eq!(outcome.payment.as_ref().unwrap().number, "PR-00001");
    assert!(outcome.warnings.is_empty());

    let tb = ledger.reports().trial_balance(None, d(2024, 1, 31)).await.unwrap();
    assert!(tb.is_balanced);
    let receivable = tb.row("1200").unwrap();
    assert_eq!(receivable.debit, amount(0));
    assert_eq!(receivable.credit, amount(0));
    assert_eq!(tb.row("4000").unwrap().credit, amount(1000));
    assert_eq!(tb.row("2200").unwrap().credit, amount(100));
    assert_eq!(tb.row("1100").unwrap().debit, amount(1100));
    assert_eq!(ledger.customer_balance(customer.id).await.unwrap(), amount(0));
}

#[tokio::test]
async fn test_locked_period_persists_nothing() {
    let (mut ledger, _) = new_ledger(LedgerConfig::default()).await;
    let customer = ledger.create_party(Party::customer("Acme Ltd")).await.unwrap();
    ledger.lock_period(2024, 3).await.unwrap();

    let result = ledger
        .create_invoice(NewInvoice::new(
            customer.id,
            d(2024, 3, 10),
            vec![LineItem::new("Consulting", amount(1), amount(500))],
        ))
        .await;
    assert!(matches!(result, Err(LedgerError::PeriodLocked { year: 2024, month: 3 })));

    assert!(ledger.list_invoices(d(2024, 4, 1)).await.unwrap().is_empty());
    assert!(ledger
        .list_journal_entries(&EntryFilter::default())
        .await
        .unwrap()
        .is_empty());

    ledger.unlock_period(2024, 3).await.unwrap();
    let outcome = ledger
        .create_invoice(NewInvoice::new(
            customer.id,
            d(2024, 3, 10),
            vec![LineItem::new("Consulting", amount(1), amount(500))],
        ))
        .await
        .unwrap();
    assert_eq!(outcome.document.number, "INV-00001");
}

#[tokio::test]
async fn test_stock_shortage_and_override() {
    let (mut ledger, chart) = new_ledger(LedgerConfig::default()).await;
    let customer = ledger.create_party(Party::customer("Acme Ltd")).await.unwrap();
    let widget = ledger
        .create_product(
            Product::new("Widget", amount(40), amount(25)),
            Some(OpeningStock {
                quantity: amount(2),
                date: d(2024, 1, 1),
            }),
        )
        .await
        .unwrap();
    let items = vec![LineItem::new("Widget", amount(5), amount(40)).for_product(widget.id)];

    let rejected = ledger
        .create_invoice(NewInvoice::new(customer.id, d(2024, 2, 1), items.clone()))
        .await;
    match rejected {
        Err(LedgerError::InsufficientStock(shortages)) => {
            assert_eq!(shortages.len(), 1);
            assert_eq!(shortages[0].available, amount(2));
            assert_eq!(shortages[0].short, amount(3));
        }
        other => panic!("expected a stock shortage, got {:?}", other),
    }
    assert!(ledger.list_invoices(d(2024, 2, 1)).await.unwrap().is_empty());

    ledger
        .create_invoice(NewInvoice::new(customer.id, d(2024, 2, 1), items).allow_insufficient_stock())
        .await
        .unwrap();
    assert_eq!(ledger.quantity_on_hand(widget.id).await.unwrap(), amount(-3));
    assert_eq!(
        ledger.account_balance(chart["5000"].id, None, None).await.unwrap(),
        amount(125)
    );
    assert_eq!(
        ledger.account_balance(chart["1200"].id, None, None).await.unwrap(),
        amount(200)
    );
}

#[tokio::test]
async fn test_year_end_close() {
    let (mut ledger, chart) = new_ledger(LedgerConfig::default()).await;
    ledger
        .create_journal_entry(ManualEntry {
            date: d(2023, 6, 1),
            description: "Consulting income".to_string(),
            reference: None,
            lines: vec![
                JournalLine::debit(chart["1100"].id, amount(900), "bank"),
                JournalLine::credit(chart["4100"].id, amount(900), "income"),
            ],
            post: true,
        })
        .await
        .unwrap();
    ledger
        .record_expense(NewExpense::new(d(2023, 7, 1), "Office Supplies", "Toner", amount(150)))
        .await
        .unwrap();

    let outcome = ledger.close_fiscal_year(2023).await.unwrap();
    assert_eq!(outcome.net_income, amount(750));
    assert!(outcome.entry.is_some());

    let revenue = ledger
        .account_balance(chart["4100"].id, Some(d(2023, 1, 1)), Some(d(2023, 12, 31)))
        .await
        .unwrap();
    assert_eq!(revenue, amount(0));
    assert_eq!(
        ledger.account_balance(chart["3200"].id, None, None).await.unwrap(),
        amount(750)
    );

    let again = ledger.close_fiscal_year(2023).await;
    assert!(matches!(again, Err(LedgerError::Validation(_))));

    let empty = ledger.close_fiscal_year(2022).await.unwrap();
    assert!(empty.entry.is_none());
    assert_eq!(empty.warnings.len(), 1);
}

#[tokio::test]
async fn test_trading_month_reconciles() {
    let (mut ledger, chart) = new_ledger(LedgerConfig::default()).await;
    let bank = chart["1100"].id;
    let customer = ledger.create_party(Party::customer("Acme Ltd")).await.unwrap();
    let vendor = ledger.create_party(Party::vendor("Supply Co")).await.unwrap();
    let widget = ledger
        .create_product(Product::new("Widget", amount(40), amount(25)), None)
        .await
        .unwrap();

    ledger
        .create_journal_entry(ManualEntry {
            date: d(2024, 4, 1),
            description: "Owner capital".to_string(),
            reference: None,
            lines: vec![
                JournalLine::debit(bank, amount(5000), "bank"),
                JournalLine::credit(chart["3000"].id, amount(5000), "capital"),
            ],
            post: true,
        })
        .await
        .unwrap();
    let bill = ledger
        .create_bill(
            NewBill::new(
                vendor.id,
                d(2024, 4, 2),
                vec![LineItem::new("Widget", amount(10), amount(25)).for_product(widget.id)],
            )
            .with_tax_rate(amount(10)),
        )
        .await
        .unwrap();
    ledger
        .make_payment(NewPayment::new(vendor.id, bank, d(2024, 4, 10), amount(200)).against(bill.document.id))
        .await
        .unwrap();
    let invoice = ledger
        .create_invoice(
            NewInvoice::new(
                customer.id,
                d(2024, 4, 12),
                vec![LineItem::new("Widget", amount(4), amount(40)).for_product(widget.id)],
            )
            .with_tax_rate(amount(10)),
        )
        .await
        .unwrap();
    ledger
        .receive_payment(NewPayment::new(customer.id, bank, d(2024, 4, 20), amount(100)).against(invoice.document.id))
        .await
        .unwrap();
    ledger
        .create_credit_note(
            NewNote::new(
                customer.id,
                d(2024, 4, 22),
                vec![LineItem::new("Widget", amount(1), amount(40)).for_product(widget.id)],
            )
            .with_tax_rate(amount(10))
            .against(invoice.document.id),
        )
        .await
        .unwrap();
    ledger
        .record_expense(NewExpense::new(d(2024, 4, 25), "Postage & Courier", "Courier", amount(30)))
        .await
        .unwrap();

    let reports = ledger.reports();
    let (start, end) = (d(2024, 4, 1), d(2024, 4, 30));

    let cash_flow = reports.generate_cash_flow(start, end).await.unwrap();
    assert!(cash_flow.is_reconciled, "unclassified: {}", cash_flow.unclassified_cash_movement);
    assert_eq!(cash_flow.net_financing, amount(5000));
    assert_eq!(cash_flow.closing_cash, amount(4870));

    let sheet = reports.generate_balance_sheet(end).await.unwrap();
    assert!(sheet.is_balanced);

    let pl = reports.generate_profit_and_loss(start, end).await.unwrap();
    assert_eq!(pl.total_revenue, amount(120));
    assert_eq!(pl.total_cost_of_sales, amount(100));
    assert_eq!(pl.total_operating_expenses, amount(30));
    assert_eq!(pl.net_income, amount(-10));

    assert_eq!(ledger.quantity_on_hand(widget.id).await.unwrap(), amount(7));
    let integrity = ledger.validate_integrity(end).await.unwrap();
    assert!(integrity.is_valid, "{:?}", integrity.issues);

    let aging = reports.receivables_aging(end).await.unwrap();
    assert_eq!(aging.totals.total, amount(32));
    let payables = reports.payables_aging(end).await.unwrap();
    assert_eq!(payables.totals.total, amount(75));
}

#[tokio::test]
async fn test_void_credit_note_restores_position() {
    let (mut ledger, chart) = new_ledger(LedgerConfig::default()).await;
    let customer = ledger.create_party(Party::customer("Acme Ltd")).await.unwrap();
    let invoice = ledger
        .create_invoice(NewInvoice::new(
            customer.id,
            d(2024, 5, 1),
            vec![LineItem::new("Design", amount(1), amount(300))],
        ))
        .await
        .unwrap();
    let note = ledger
        .create_credit_note(
            NewNote::new(customer.id, d(2024, 5, 3), vec![LineItem::new("Design", amount(1), amount(100))])
                .against(invoice.document.id),
        )
        .await
        .unwrap();
    assert_eq!(ledger.customer_balance(customer.id).await.unwrap(), amount(200));

    let voided = ledger.void_note(note.document.id, d(2024, 5, 4)).await.unwrap();
    assert_eq!(voided.document.status, NoteStatus::Void);
    assert_eq!(ledger.customer_balance(customer.id).await.unwrap(), amount(300));
    assert_eq!(
        ledger.account_balance(chart["1200"].id, None, None).await.unwrap(),
        amount(300)
    );

    let again = ledger.void_note(note.document.id, d(2024, 5, 5)).await;
    assert!(matches!(again, Err(LedgerError::Validation(_))));
    assert_eq!(ledger.customer_balance(customer.id).await.unwrap(), amount(300));
}

#[tokio::test]
async fn test_service_tenant_never_moves_stock() {
    let config = LedgerConfig::default().with_business_type(BusinessType::Service);
    let (mut ledger, chart) = new_ledger(config).await;
    let vendor = ledger.create_party(Party::vendor("Cloud Host")).await.unwrap();
    let plan = ledger
        .create_product(Product::new("Hosting plan", amount(100), amount(60)), None)
        .await
        .unwrap();
    assert!(plan.is_service);

    ledger
        .create_bill(NewBill::new(
            vendor.id,
            d(2024, 2, 1),
            vec![LineItem::new("Hosting", amount(2), amount(60)).for_product(plan.id)],
        ))
        .await
        .unwrap();

    assert_eq!(
        ledger.account_balance(chart["5000"].id, None, None).await.unwrap(),
        amount(120)
    );
    assert_eq!(
        ledger.account_balance(chart["1300"].id, None, None).await.unwrap(),
        amount(0)
    );
    assert!(ledger.reports().inventory_report().await.unwrap().rows.is_empty());
}

#[tokio::test]
async fn test_balances_are_additive_over_ranges() {
    let (mut ledger, chart) = new_ledger(LedgerConfig::default()).await;
    for (month, value) in [(1, 100), (2, 250), (3, 75), (6, 40)] {
        ledger
            .create_journal_entry(ManualEntry {
                date: d(2024, month, 15),
                description: "Rent".to_string(),
                reference: None,
                lines: vec![
                    JournalLine::debit(chart["6400"].id, amount(value), "rent"),
                    JournalLine::credit(chart["1100"].id, amount(value), "bank"),
                ],
                post: true,
            })
            .await
            .unwrap();
    }
    let rent = chart["6400"].id;

    let first = ledger.account_balance(rent, Some(d(2024, 1, 1)), Some(d(2024, 2, 29))).await.unwrap();
    let second = ledger.account_balance(rent, Some(d(2024, 3, 1)), Some(d(2024, 12, 31))).await.unwrap();
    let whole = ledger.account_balance(rent, Some(d(2024, 1, 1)), Some(d(2024, 12, 31))).await.unwrap();
    assert_eq!(first + second, whole);
    assert_eq!(whole, amount(465));
    assert_eq!(
        ledger.account_balance(chart["1100"].id, None, None).await.unwrap(),
        amount(-465)
    );
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let storage = MemoryStorage::new();
    let mut first = Ledger::new(storage.clone(), "tenant-a", LedgerConfig::default()).unwrap();
    let mut second = Ledger::new(storage.clone(), "tenant-b", LedgerConfig::default()).unwrap();

    let chart_a = first.setup_standard_chart_of_accounts().await.unwrap();
    first
        .create_party(Party::customer("Only in A"))
        .await
        .unwrap();
    assert!(second.list_accounts().await.unwrap().is_empty());
    assert!(second.list_customers().await.unwrap().is_empty());

    let chart_b = second.setup_standard_chart_of_accounts().await.unwrap();
    assert_ne!(chart_a["1100"].id, chart_b["1100"].id);
    assert!(storage
        .get_account("tenant-b", chart_a["1100"].id)
        .await
        .unwrap()
        .is_none());

    let customer_a = first.list_customers().await.unwrap()[0].clone();
    let cross = second
        .create_invoice(NewInvoice::new(
            customer_a.id,
            d(2024, 1, 1),
            vec![LineItem::new("Hours", amount(1), amount(10))],
        ))
        .await;
    assert!(matches!(cross, Err(LedgerError::DocumentNotFound { .. })));
}

#[tokio::test]
async fn test_strict_validators_and_reports_serialize() {
    let mut ledger = Ledger::with_validators(
        MemoryStorage::new(),
        "tenant-1",
        LedgerConfig::default(),
        Box::new(StrictAccountValidator),
        Box::new(StrictEntryValidator),
    )
    .unwrap();
    let chart = ledger.setup_standard_chart_of_accounts().await.unwrap();
    ledger
        .create_account(bookkeeping_core::Account::new("1150", "Savings Account", AccountType::Asset))
        .await
        .unwrap();
    ledger
        .create_journal_entry(ManualEntry {
            date: d(2024, 1, 2),
            description: "Capital".to_string(),
            reference: Some("DEP-1".to_string()),
            lines: vec![
                JournalLine::debit(chart["1100"].id, amount(2500), "bank"),
                JournalLine::credit(chart["3000"].id, amount(2500), "capital"),
            ],
            post: true,
        })
        .await
        .unwrap();

    let sheet = ledger.reports().balance_sheet(d(2024, 1, 31)).await.unwrap();
    let json = serde_json::to_value(&sheet).unwrap();
    assert_eq!(json["as_of_date"], "2024-01-31");
    assert_eq!(json["is_balanced"], true);
    assert_eq!(json["assets"][0]["code"], "1100");
}
