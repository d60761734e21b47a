//! Sales, petty-cash and inventory summaries built from stored documents

use std::collections::BTreeMap;
use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::commerce::documents::*;
use crate::commerce::inventory::quantities_by_product;
use crate::reports::{ensure_range, Reports};
use crate::traits::LedgerStorage;
use crate::types::*;
use crate::utils::money;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSales {
    pub customer_id: Uuid,
    pub customer_name: String,
    pub invoice_count: usize,
    pub total_sales: BigDecimal,
    pub total_paid: BigDecimal,
    pub outstanding: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub invoice_count: usize,
    pub total_sales: BigDecimal,
    pub total_tax: BigDecimal,
    pub total_paid: BigDecimal,
    pub outstanding: BigDecimal,
    /// Largest total first
    pub by_customer: Vec<CustomerSales>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub count: usize,
    pub total: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Ordered by category name
    pub by_category: Vec<CategoryTotal>,
    pub total: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub product_id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub quantity_on_hand: BigDecimal,
    pub cost_price: BigDecimal,
    /// `quantity_on_hand * cost_price`
    pub stock_value: BigDecimal,
    pub reorder_level: BigDecimal,
    pub is_low_stock: bool,
    pub is_out_of_stock: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryReport {
    pub rows: Vec<InventoryRow>,
    pub total_value: BigDecimal,
    pub low_stock_count: usize,
    pub out_of_stock_count: usize,
}

impl<S: LedgerStorage + Clone> Reports<S> {
    /// Non-draft invoices dated within the range
    pub async fn sales_report(&self, start_date: NaiveDate, end_date: NaiveDate) -> LedgerResult<SalesReport> {
        ensure_range(start_date, end_date)?;
        let names: HashMap<Uuid, String> = self
            .storage
            .list_parties(&self.tenant_id, PartyKind::Customer)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let invoices: Vec<Invoice> = self
            .storage
            .list_invoices(&self.tenant_id)
            .await?
            .into_iter()
            .filter(|i| i.settlement.status != DocumentStatus::Draft)
            .filter(|i| i.date >= start_date && i.date <= end_date)
            .collect();

        let mut report = SalesReport {
            start_date,
            end_date,
            invoice_count: invoices.len(),
            total_sales: money::zero(),
            total_tax: money::zero(),
            total_paid: money::zero(),
            outstanding: money::zero(),
            by_customer: Vec::new(),
        };
        let mut by_customer: HashMap<Uuid, CustomerSales> = HashMap::new();

        for invoice in &invoices {
            report.total_sales += &invoice.totals.total;
            report.total_tax += &invoice.totals.tax_amount;
            report.total_paid += &invoice.settlement.amount_paid;
            report.outstanding += &invoice.settlement.balance_due;

            let row = by_customer.entry(invoice.customer_id).or_insert_with(|| CustomerSales {
                customer_id: invoice.customer_id,
                customer_name: names
                    .get(&invoice.customer_id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string()),
                invoice_count: 0,
                total_sales: money::zero(),
                total_paid: money::zero(),
                outstanding: money::zero(),
            });
            row.invoice_count += 1;
            row.total_sales += &invoice.totals.total;
            row.total_paid += &invoice.settlement.amount_paid;
            row.outstanding += &invoice.settlement.balance_due;
        }

        report.by_customer = by_customer.into_values().collect();
        report.by_customer.sort_by(|a, b| {
            b.total_sales
                .cmp(&a.total_sales)
                .then_with(|| a.customer_name.cmp(&b.customer_name))
        });
        Ok(report)
    }

    /// Petty-cash expenses per category
    pub async fn expense_report(&self, start_date: NaiveDate, end_date: NaiveDate) -> LedgerResult<ExpenseReport> {
        ensure_range(start_date, end_date)?;
        let mut categories: BTreeMap<String, CategoryTotal> = BTreeMap::new();
        let mut total = money::zero();

        for expense in self.storage.list_expenses(&self.tenant_id).await? {
            if expense.date < start_date || expense.date > end_date {
                continue;
            }
            total += &expense.amount;
            let row = categories
                .entry(expense.category.clone())
                .or_insert_with(|| CategoryTotal {
                    category: expense.category.clone(),
                    count: 0,
                    total: money::zero(),
                });
            row.count += 1;
            row.total += &expense.amount;
        }

        Ok(ExpenseReport {
            start_date,
            end_date,
            by_category: categories.into_values().collect(),
            total,
        })
    }

    /// Stock position of every active stocked product, valued at cost
    pub async fn inventory_report(&self) -> LedgerResult<InventoryReport> {
        let movements = self.storage.list_movements(&self.tenant_id, None).await?;
        let quantities = quantities_by_product(&movements);

        let mut products: Vec<Product> = self
            .storage
            .list_products(&self.tenant_id)
            .await?
            .into_iter()
            .filter(|p| p.is_active && !p.is_service)
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));

        let mut report = InventoryReport {
            rows: Vec::new(),
            total_value: money::zero(),
            low_stock_count: 0,
            out_of_stock_count: 0,
        };
        for product in products {
            let quantity_on_hand = quantities.get(&product.id).cloned().unwrap_or_else(money::zero);
            let stock_value = &quantity_on_hand * &product.cost_price;
            let is_out_of_stock = quantity_on_hand <= money::zero();
            let is_low_stock = product.reorder_level > money::zero() && quantity_on_hand <= product.reorder_level;

            report.total_value += &stock_value;
            report.low_stock_count += usize::from(is_low_stock);
            report.out_of_stock_count += usize::from(is_out_of_stock);
            report.rows.push(InventoryRow {
                product_id: product.id,
                name: product.name,
                sku: product.sku,
                quantity_on_hand,
                cost_price: product.cost_price,
                stock_value,
                reorder_level: product.reorder_level,
                is_low_stock,
                is_out_of_stock,
            });
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commerce::{NewExpense, NewInvoice, NewPayment, OpeningStock};
    use crate::config::{BusinessType, LedgerConfig};
    use crate::ledger::Ledger;
    use crate::utils::MemoryStorage;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn test_sales_report_by_customer() {
        let mut ledger = Ledger::new(
            MemoryStorage::new(),
            "t1",
            LedgerConfig::default().with_business_type(BusinessType::Service),
        )
        .unwrap();
        let c = ledger.setup_standard_chart_of_accounts().await.unwrap();
        let acme = ledger.create_party(Party::customer("Acme")).await.unwrap();
        let bolt = ledger.create_party(Party::customer("Bolt")).await.unwrap();
        let hours = |n: i64| vec![LineItem::new("Hours", BigDecimal::from(n), BigDecimal::from(50))];

        let first = ledger
            .create_invoice(NewInvoice::new(acme.id, d(2024, 5, 2), hours(4)).with_tax_rate(BigDecimal::from(10)))
            .await
            .unwrap();
        ledger
            .create_invoice(NewInvoice::new(bolt.id, d(2024, 5, 3), hours(10)))
            .await
            .unwrap();
        ledger
            .create_invoice(NewInvoice::new(acme.id, d(2024, 5, 4), hours(1)).as_draft())
            .await
            .unwrap();
        ledger
            .receive_payment(
                NewPayment::new(acme.id, c["1100"].id, d(2024, 5, 9), BigDecimal::from(220)).against(first.document.id),
            )
            .await
            .unwrap();

        let report = ledger.reports().sales_report(d(2024, 5, 1), d(2024, 5, 31)).await.unwrap();
        assert_eq!(report.invoice_count, 2);
        assert_eq!(report.total_sales, BigDecimal::from(720));
        assert_eq!(report.total_tax, BigDecimal::from(20));
        assert_eq!(report.total_paid, BigDecimal::from(220));
        assert_eq!(report.outstanding, BigDecimal::from(500));
        assert_eq!(report.by_customer[0].customer_name, "Bolt");
        assert_eq!(report.by_customer[1].outstanding, money::zero());
    }

    #[tokio::test]
    async fn test_expense_report_by_category() {
        let mut ledger = Ledger::new(MemoryStorage::new(), "t1", LedgerConfig::default()).unwrap();
        ledger.setup_standard_chart_of_accounts().await.unwrap();
        for (day, category, amount) in [(1, "Office Supplies", 12), (2, "Office Supplies", 8), (3, "Miscellaneous", 5)] {
            ledger
                .record_expense(NewExpense::new(d(2024, 6, day), category, "receipt", BigDecimal::from(amount)))
                .await
                .unwrap();
        }

        let report = ledger.reports().expense_report(d(2024, 6, 1), d(2024, 6, 2)).await.unwrap();
        assert_eq!(report.by_category.len(), 1);
        assert_eq!(report.by_category[0].count, 2);
        assert_eq!(report.total, BigDecimal::from(20));
    }

    #[tokio::test]
    async fn test_inventory_report_flags() {
        let mut ledger = Ledger::new(MemoryStorage::new(), "t1", LedgerConfig::default()).unwrap();
        ledger.setup_standard_chart_of_accounts().await.unwrap();
        let opening = |qty: i64| OpeningStock {
            quantity: BigDecimal::from(qty),
            date: d(2024, 1, 1),
        };

        ledger
            .create_product(
                Product::new("Widget", BigDecimal::from(20), BigDecimal::from(8)).with_reorder_level(BigDecimal::from(5)),
                Some(opening(3)),
            )
            .await
            .unwrap();
        ledger
            .create_product(Product::new("Gadget", BigDecimal::from(50), BigDecimal::from(30)), Some(opening(10)))
            .await
            .unwrap();
        ledger
            .create_product(Product::new("Gizmo", BigDecimal::from(5), BigDecimal::from(2)), None)
            .await
            .unwrap();
        ledger
            .create_product(Product::service("Setup", BigDecimal::from(100)), None)
            .await
            .unwrap();

        let report = ledger.reports().inventory_report().await.unwrap();
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.rows[0].name, "Gadget");
        assert_eq!(report.total_value, BigDecimal::from(324));
        assert_eq!(report.low_stock_count, 1);
        assert_eq!(report.out_of_stock_count, 1);
        let widget = report.rows.iter().find(|r| r.name == "Widget").unwrap();
        assert!(widget.is_low_stock);
        assert!(!widget.is_out_of_stock);
    }
}
