//! Per-tenant ledger configuration
//!
//! Configuration can be built from defaults, parsed from TOML, or read from
//! `LEDGER_*` environment variables:
//!
//! ```toml
//! company_name = "Acme Trading"
//! fiscal_year_start_month = 7
//! business_type = "service"
//!
//! [roles]
//! bank = "1110"
//! ```

use serde::{Deserialize, Serialize};
use std::env;

use crate::types::{LedgerError, LedgerResult};

/// Whether the tenant sells stocked goods or services only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    /// Stock is tracked and COGS recorded on sales
    #[default]
    Product,
    /// No stock movements, no COGS
    Service,
}

impl BusinessType {
    pub fn tracks_inventory(&self) -> bool {
        matches!(self, BusinessType::Product)
    }
}

impl std::str::FromStr for BusinessType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product" => Ok(BusinessType::Product),
            "service" => Ok(BusinessType::Service),
            other => Err(LedgerError::Config(format!(
                "Unknown business type '{}'",
                other
            ))),
        }
    }
}

/// Structural roles the journal engine posts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Cash,
    PettyCash,
    Bank,
    AccountsReceivable,
    Inventory,
    Prepaid,
    AccountsPayable,
    AccruedLiabilities,
    SalesTaxPayable,
    ShortTermLoan,
    RetainedEarnings,
    SalesRevenue,
    CostOfGoodsSold,
    PurchaseExpense,
    Depreciation,
    MiscellaneousExpense,
}

impl AccountRole {
    pub fn all() -> [AccountRole; 16] {
        [
            AccountRole::Cash,
            AccountRole::PettyCash,
            AccountRole::Bank,
            AccountRole::AccountsReceivable,
            AccountRole::Inventory,
            AccountRole::Prepaid,
            AccountRole::AccountsPayable,
            AccountRole::AccruedLiabilities,
            AccountRole::SalesTaxPayable,
            AccountRole::ShortTermLoan,
            AccountRole::RetainedEarnings,
            AccountRole::SalesRevenue,
            AccountRole::CostOfGoodsSold,
            AccountRole::PurchaseExpense,
            AccountRole::Depreciation,
            AccountRole::MiscellaneousExpense,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccountRole::Cash => "Cash",
            AccountRole::PettyCash => "Petty Cash",
            AccountRole::Bank => "Bank",
            AccountRole::AccountsReceivable => "Accounts Receivable",
            AccountRole::Inventory => "Inventory",
            AccountRole::Prepaid => "Prepaid Expenses",
            AccountRole::AccountsPayable => "Accounts Payable",
            AccountRole::AccruedLiabilities => "Accrued Liabilities",
            AccountRole::SalesTaxPayable => "Sales Tax Payable",
            AccountRole::ShortTermLoan => "Short-term Loan",
            AccountRole::RetainedEarnings => "Retained Earnings",
            AccountRole::SalesRevenue => "Sales Revenue",
            AccountRole::CostOfGoodsSold => "Cost of Goods Sold",
            AccountRole::PurchaseExpense => "Purchase Expense",
            AccountRole::Depreciation => "Depreciation",
            AccountRole::MiscellaneousExpense => "Miscellaneous Expense",
        }
    }
}

/// Role → account code mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountRoles {
    pub cash: String,
    pub petty_cash: String,
    pub bank: String,
    pub accounts_receivable: String,
    pub inventory: String,
    pub prepaid: String,
    pub accounts_payable: String,
    pub accrued_liabilities: String,
    pub sales_tax_payable: String,
    pub short_term_loan: String,
    pub retained_earnings: String,
    pub sales_revenue: String,
    pub cost_of_goods_sold: String,
    /// Debited for non-inventory bill lines
    pub purchase_expense: String,
    pub depreciation: String,
    /// Fallback for unknown petty-cash categories
    pub miscellaneous_expense: String,
}

impl Default for AccountRoles {
    fn default() -> Self {
        Self {
            cash: "1000".to_string(),
            petty_cash: "1050".to_string(),
            bank: "1100".to_string(),
            accounts_receivable: "1200".to_string(),
            inventory: "1300".to_string(),
            prepaid: "1400".to_string(),
            accounts_payable: "2000".to_string(),
            accrued_liabilities: "2100".to_string(),
            sales_tax_payable: "2200".to_string(),
            short_term_loan: "2300".to_string(),
            retained_earnings: "3200".to_string(),
            sales_revenue: "4000".to_string(),
            cost_of_goods_sold: "5000".to_string(),
            purchase_expense: "5000".to_string(),
            depreciation: "6900".to_string(),
            miscellaneous_expense: "6950".to_string(),
        }
    }
}

impl AccountRoles {
    /// Account code mapped to a role
    pub fn code(&self, role: AccountRole) -> &str {
        match role {
            AccountRole::Cash => &self.cash,
            AccountRole::PettyCash => &self.petty_cash,
            AccountRole::Bank => &self.bank,
            AccountRole::AccountsReceivable => &self.accounts_receivable,
            AccountRole::Inventory => &self.inventory,
            AccountRole::Prepaid => &self.prepaid,
            AccountRole::AccountsPayable => &self.accounts_payable,
            AccountRole::AccruedLiabilities => &self.accrued_liabilities,
            AccountRole::SalesTaxPayable => &self.sales_tax_payable,
            AccountRole::ShortTermLoan => &self.short_term_loan,
            AccountRole::RetainedEarnings => &self.retained_earnings,
            AccountRole::SalesRevenue => &self.sales_revenue,
            AccountRole::CostOfGoodsSold => &self.cost_of_goods_sold,
            AccountRole::PurchaseExpense => &self.purchase_expense,
            AccountRole::Depreciation => &self.depreciation,
            AccountRole::MiscellaneousExpense => &self.miscellaneous_expense,
        }
    }

    /// Codes of the accounts treated as cash on the cash-flow statement
    pub fn cash_codes(&self) -> [&str; 3] {
        [
            self.cash.as_str(),
            self.petty_cash.as_str(),
            self.bank.as_str(),
        ]
    }

    /// Working-capital asset codes (increase = cash outflow)
    pub fn working_capital_assets(&self) -> [&str; 3] {
        [
            self.accounts_receivable.as_str(),
            self.inventory.as_str(),
            self.prepaid.as_str(),
        ]
    }

    /// Working-capital liability codes (increase = cash inflow)
    pub fn working_capital_liabilities(&self) -> [&str; 3] {
        [
            self.accounts_payable.as_str(),
            self.accrued_liabilities.as_str(),
            self.sales_tax_payable.as_str(),
        ]
    }
}

/// Longest credit term accepted, ten years
pub const MAX_PAYMENT_TERMS_DAYS: i64 = 3650;

/// Ledger configuration for a single tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub company_name: String,
    pub currency_symbol: String,
    /// First month of the fiscal year (1-12)
    pub fiscal_year_start_month: u32,
    pub business_type: BusinessType,
    /// Days added to the document date when a bill or invoice is owed
    pub payment_terms_days: i64,
    pub roles: AccountRoles,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            company_name: "My Company".to_string(),
            currency_symbol: "$".to_string(),
            fiscal_year_start_month: 1,
            business_type: BusinessType::Product,
            payment_terms_days: 30,
            roles: AccountRoles::default(),
        }
    }
}

impl LedgerConfig {
    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> LedgerResult<Self> {
        let config: LedgerConfig =
            toml::from_str(content).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `LEDGER_*` environment variables, defaulting anything unset
    pub fn from_env() -> LedgerResult<Self> {
        let defaults = Self::default();

        let company_name = env::var("LEDGER_COMPANY_NAME").unwrap_or(defaults.company_name);
        let currency_symbol =
            env::var("LEDGER_CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol);

        let fiscal_year_start_month = env::var("LEDGER_FISCAL_YEAR_START_MONTH")
            .unwrap_or_else(|_| defaults.fiscal_year_start_month.to_string())
            .parse::<u32>()
            .map_err(|e| {
                LedgerError::Config(format!("Invalid LEDGER_FISCAL_YEAR_START_MONTH: {}", e))
            })?;

        let business_type = match env::var("LEDGER_BUSINESS_TYPE") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.business_type,
        };

        let payment_terms_days = env::var("LEDGER_PAYMENT_TERMS_DAYS")
            .unwrap_or_else(|_| defaults.payment_terms_days.to_string())
            .parse::<i64>()
            .map_err(|e| LedgerError::Config(format!("Invalid LEDGER_PAYMENT_TERMS_DAYS: {}", e)))?;

        let config = Self {
            company_name,
            currency_symbol,
            fiscal_year_start_month,
            business_type,
            payment_terms_days,
            roles: defaults.roles,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_business_type(mut self, business_type: BusinessType) -> Self {
        self.business_type = business_type;
        self
    }

    pub fn with_fiscal_year_start_month(mut self, month: u32) -> Self {
        self.fiscal_year_start_month = month;
        self
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if !(1..=12).contains(&self.fiscal_year_start_month) {
            return Err(LedgerError::Config(format!(
                "fiscal_year_start_month must be between 1 and 12, got {}",
                self.fiscal_year_start_month
            )));
        }

        if !(0..=MAX_PAYMENT_TERMS_DAYS).contains(&self.payment_terms_days) {
            return Err(LedgerError::Config(format!(
                "payment_terms_days must be between 0 and {}, got {}",
                MAX_PAYMENT_TERMS_DAYS, self.payment_terms_days
            )));
        }

        for role in AccountRole::all() {
            if self.roles.code(role).trim().is_empty() {
                return Err(LedgerError::Config(format!(
                    "No account code mapped for role '{}'",
                    role.label()
                )));
            }
        }

        Ok(())
    }
}
