//! # Bookkeeping Core
//!
//! A multi-tenant double-entry bookkeeping library: journal engine, derived
//! account balances, business documents and financial reporting.
//!
//! ## Features
//!
//! - **Double-entry journal**: balanced entries, posting, reversal and fiscal period locks
//! - **Chart of accounts**: a standard chart, custom accounts and role-to-code mapping
//! - **Documents**: invoices, bills, payments, credit/debit notes and petty-cash expenses
//! - **Inventory**: products and an append-only stock ledger
//! - **Reports**: trial balance, P&L, balance sheet, cash flow, aging, budgets and statements
//! - **Storage abstraction**: every tenant-scoped read and atomic write goes through [`LedgerStorage`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bookkeeping_core::{Ledger, LedgerConfig, MemoryStorage, NewInvoice, Party, LineItem};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! # async fn run() -> bookkeeping_core::LedgerResult<()> {
//! let mut ledger = Ledger::new(MemoryStorage::new(), "tenant-1", LedgerConfig::default())?;
//! let chart = ledger.setup_standard_chart_of_accounts().await?;
//! let customer = ledger.create_party(Party::customer("Acme")).await?;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
//! let items = vec![LineItem::new("Consulting", BigDecimal::from(1), BigDecimal::from(1000))];
//! ledger
//!     .create_invoice(NewInvoice::new(customer.id, date, items).pay_now(chart["1100"].id))
//!     .await?;
//!
//! let trial_balance = ledger.reports().trial_balance(None, date).await?;
//! assert!(trial_balance.is_balanced);
//! # Ok(())
//! # }
//! ```

pub mod commerce;
pub mod config;
pub mod ledger;
pub mod numbering;
pub mod reports;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use commerce::*;
pub use config::*;
pub use ledger::*;
pub use numbering::*;
pub use reports::*;
pub use traits::*;
pub use types::*;
pub use utils::MemoryStorage;
