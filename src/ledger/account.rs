//! Account management functionality

use std::collections::HashMap;
use uuid::Uuid;

use crate::config::{AccountRole, AccountRoles};
use crate::traits::*;
use crate::types::*;

/// Account manager for handling chart of accounts operations
pub struct AccountManager<S: LedgerStorage> {
    storage: S,
    tenant_id: String,
    validator: Box<dyn AccountValidator>,
}

impl<S: LedgerStorage> AccountManager<S> {
    /// Create a new account manager
    pub fn new(storage: S, tenant_id: impl Into<String>) -> Self {
        Self::with_validator(storage, tenant_id, Box::new(DefaultAccountValidator))
    }

    /// Create a new account manager with custom validator
    pub fn with_validator(
        storage: S,
        tenant_id: impl Into<String>,
        validator: Box<dyn AccountValidator>,
    ) -> Self {
        Self {
            storage,
            tenant_id: tenant_id.into(),
            validator,
        }
    }

    /// Create a new account
    pub async fn create_account(&mut self, account: Account) -> LedgerResult<Account> {
        self.validator.validate_account(&account)?;

        if self.find_by_code(&account.code).await?.is_some() {
            return Err(LedgerError::Validation(format!(
                "Account with code '{}' already exists",
                account.code
            )));
        }

        if let Some(parent_id) = account.parent_id {
            if self.get_account(parent_id).await?.is_none() {
                return Err(LedgerError::Validation(format!(
                    "Parent account '{}' does not exist",
                    parent_id
                )));
            }
        }

        self.storage
            .commit(&self.tenant_id, Change::SaveAccount(account.clone()).into())
            .await?;

        tracing::debug!(tenant = %self.tenant_id, code = %account.code, "account created");
        Ok(account)
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: Uuid) -> LedgerResult<Option<Account>> {
        self.storage.get_account(&self.tenant_id, account_id).await
    }

    /// Get an account by ID, returning an error if not found
    pub async fn get_account_required(&self, account_id: Uuid) -> LedgerResult<Account> {
        self.get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    /// First account carrying `code`
    pub async fn find_by_code(&self, code: &str) -> LedgerResult<Option<Account>> {
        Ok(self
            .list_accounts()
            .await?
            .into_iter()
            .find(|a| a.code == code))
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        self.storage.list_accounts(&self.tenant_id, None).await
    }

    /// List accounts by type
    pub async fn list_accounts_by_type(&self, account_type: AccountType) -> LedgerResult<Vec<Account>> {
        self.storage
            .list_accounts(&self.tenant_id, Some(account_type))
            .await
    }

    /// Update an account
    pub async fn update_account(&mut self, account: &Account) -> LedgerResult<Account> {
        self.validator.validate_account(account)?;
        let existing = self.get_account_required(account.id).await?;

        if existing.code != account.code {
            if let Some(other) = self.find_by_code(&account.code).await? {
                if other.id != account.id {
                    return Err(LedgerError::Validation(format!(
                        "Account with code '{}' already exists",
                        account.code
                    )));
                }
            }
        }

        if account.parent_id == Some(account.id) {
            return Err(LedgerError::Validation(
                "An account cannot be its own parent".to_string(),
            ));
        }

        let mut updated = account.clone();
        updated.created_at = existing.created_at;
        updated.updated_at = chrono::Utc::now().naive_utc();
        self.storage
            .commit(&self.tenant_id, Change::SaveAccount(updated.clone()).into())
            .await?;
        Ok(updated)
    }

    /// Delete an account. System accounts and accounts with journal lines are kept.
    pub async fn delete_account(&mut self, account_id: Uuid) -> LedgerResult<()> {
        let account = self.get_account_required(account_id).await?;

        if account.is_system {
            return Err(LedgerError::Validation(format!(
                "System account {} cannot be deleted",
                account.label()
            )));
        }

        if self
            .storage
            .account_has_lines(&self.tenant_id, account_id)
            .await?
        {
            return Err(LedgerError::Validation(format!(
                "Account {} has journal lines and cannot be deleted",
                account.label()
            )));
        }

        self.storage
            .commit(&self.tenant_id, Change::DeleteAccount(account_id).into())
            .await?;
        tracing::info!(tenant = %self.tenant_id, code = %account.code, "account deleted");
        Ok(())
    }

    /// Active account mapped to a role, if the tenant has one
    pub async fn resolve_role(&self, roles: &AccountRoles, role: AccountRole) -> LedgerResult<Option<Account>> {
        Ok(self
            .find_by_code(roles.code(role))
            .await?
            .filter(|a| a.is_active))
    }

    /// Roles with no active account in the chart
    pub async fn missing_roles(&self, roles: &AccountRoles) -> LedgerResult<Vec<AccountRole>> {
        let accounts = self.list_accounts().await?;
        Ok(AccountRole::all()
            .into_iter()
            .filter(|role| {
                !accounts
                    .iter()
                    .any(|a| a.is_active && a.code == roles.code(*role))
            })
            .collect())
    }

    /// Seed the standard chart, skipping codes that already exist.
    /// Returns every standard account keyed by code.
    pub async fn setup_standard_chart(&mut self) -> LedgerResult<HashMap<String, Account>> {
        let existing = self.list_accounts().await?;
        let mut accounts = HashMap::new();
        let mut unit = UnitOfWork::new();

        for template in STANDARD_CHART {
            let account = match existing.iter().find(|a| a.code == template.code) {
                Some(account) => account.clone(),
                None => {
                    let account = template.build();
                    unit.push(Change::SaveAccount(account.clone()));
                    account
                }
            };
            accounts.insert(template.code.to_string(), account);
        }

        let created = unit.len();
        if !unit.is_empty() {
            self.storage.commit(&self.tenant_id, unit).await?;
        }
        tracing::info!(tenant = %self.tenant_id, created, "standard chart of accounts seeded");
        Ok(accounts)
    }
}

#[async_trait::async_trait]
impl<S: LedgerStorage> ChartOfAccounts for AccountManager<S> {
    async fn get_chart(&self) -> LedgerResult<Vec<Account>> {
        self.list_accounts().await
    }

    async fn get_child_accounts(&self, parent_id: Uuid) -> LedgerResult<Vec<Account>> {
        let all_accounts = self.list_accounts().await?;
        Ok(all_accounts
            .into_iter()
            .filter(|account| account.parent_id == Some(parent_id))
            .collect())
    }

    async fn get_account_path(&self, account_id: Uuid) -> LedgerResult<Vec<Account>> {
        let mut path: Vec<Account> = Vec::new();
        let mut current = Some(account_id);

        while let Some(id) = current {
            if path.iter().any(|a| a.id == id) {
                return Err(LedgerError::Validation(format!(
                    "Account hierarchy contains a cycle at {}",
                    id
                )));
            }
            let account = self.get_account_required(id).await?;
            current = account.parent_id;
            path.insert(0, account);
        }

        Ok(path)
    }
}

struct AccountTemplate {
    code: &'static str,
    name: &'static str,
    account_type: AccountType,
    sub_type: &'static str,
    normal_balance: Option<EntryType>,
}

impl AccountTemplate {
    fn build(&self) -> Account {
        let account = Account::new(self.code, self.name, self.account_type)
            .with_sub_type(self.sub_type)
            .system();
        match self.normal_balance {
            Some(side) => account.with_normal_balance(side),
            None => account,
        }
    }
}

const fn template(
    code: &'static str,
    name: &'static str,
    account_type: AccountType,
    sub_type: &'static str,
) -> AccountTemplate {
    AccountTemplate {
        code,
        name,
        account_type,
        sub_type,
        normal_balance: None,
    }
}

const fn contra(
    code: &'static str,
    name: &'static str,
    account_type: AccountType,
    sub_type: &'static str,
    normal_balance: EntryType,
) -> AccountTemplate {
    AccountTemplate {
        code,
        name,
        account_type,
        sub_type,
        normal_balance: Some(normal_balance),
    }
}

/// Default chart for a small trading business
const STANDARD_CHART: &[AccountTemplate] = &[
    template("1000", "Cash", AccountType::Asset, "Current Asset"),
    template("1050", "Petty Cash", AccountType::Asset, "Current Asset"),
    template("1100", "Bank Account", AccountType::Asset, "Current Asset"),
    template("1200", "Accounts Receivable", AccountType::Asset, "Current Asset"),
    template("1300", "Inventory Asset", AccountType::Asset, "Current Asset"),
    template("1400", "Prepaid Expenses", AccountType::Asset, "Current Asset"),
    template("1500", "Office Equipment", AccountType::Asset, "Fixed Asset"),
    contra("1600", "Accumulated Depreciation", AccountType::Asset, "Fixed Asset", EntryType::Credit),
    template("2000", "Accounts Payable", AccountType::Liability, "Current Liability"),
    template("2100", "Accrued Liabilities", AccountType::Liability, "Current Liability"),
    template("2200", "Sales Tax Payable", AccountType::Liability, "Current Liability"),
    template("2300", "Short-term Loan", AccountType::Liability, "Current Liability"),
    template("2500", "Long-term Loan", AccountType::Liability, "Long-term Liability"),
    template("3000", "Owner's Equity", AccountType::Equity, "Equity"),
    contra("3100", "Owner's Draw", AccountType::Equity, "Equity", EntryType::Debit),
    template("3200", "Retained Earnings", AccountType::Equity, "Equity"),
    template("4000", "Sales Revenue", AccountType::Revenue, "Operating Revenue"),
    template("4100", "Service Revenue", AccountType::Revenue, "Operating Revenue"),
    template("4200", "Interest Income", AccountType::Revenue, "Other Income"),
    template("4300", "Other Income", AccountType::Revenue, "Other Income"),
    template("5000", "Cost of Goods Sold", AccountType::Expense, "Cost of Sales"),
    template("6000", "Advertising", AccountType::Expense, "Operating Expense"),
    template("6100", "Bank Fees", AccountType::Expense, "Operating Expense"),
    template("6200", "Insurance", AccountType::Expense, "Operating Expense"),
    template("6300", "Office Supplies", AccountType::Expense, "Operating Expense"),
    template("6400", "Rent", AccountType::Expense, "Operating Expense"),
    template("6500", "Salaries & Wages", AccountType::Expense, "Operating Expense"),
    template("6600", "Telephone & Internet", AccountType::Expense, "Operating Expense"),
    template("6700", "Travel", AccountType::Expense, "Operating Expense"),
    template("6800", "Utilities", AccountType::Expense, "Operating Expense"),
    template("6900", "Depreciation Expense", AccountType::Expense, "Operating Expense"),
    template("6950", "Miscellaneous Expense", AccountType::Expense, "Operating Expense"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MemoryStorage;
    use bigdecimal::BigDecimal;

    fn manager() -> AccountManager<MemoryStorage> {
        AccountManager::new(MemoryStorage::new(), "t1")
    }

    #[tokio::test]
    async fn test_standard_chart_is_idempotent() {
        let mut accounts = manager();
        let first = accounts.setup_standard_chart().await.unwrap();
        let second = accounts.setup_standard_chart().await.unwrap();

        assert_eq!(first.len(), STANDARD_CHART.len());
        assert_eq!(first["1200"].id, second["1200"].id);
        assert_eq!(accounts.list_accounts().await.unwrap().len(), STANDARD_CHART.len());

        assert_eq!(first["1600"].normal_balance, EntryType::Credit);
        assert_eq!(first["3100"].normal_balance, EntryType::Debit);
        assert!(first["5000"].has_sub_type("cost of sales"));
        assert!(first["3200"].is_system);
    }

    #[tokio::test]
    async fn test_duplicate_code_and_missing_parent() {
        let mut accounts = manager();
        accounts
            .create_account(Account::new("1000", "Cash", AccountType::Asset))
            .await
            .unwrap();

        let duplicate = accounts
            .create_account(Account::new("1000", "Cash again", AccountType::Asset))
            .await;
        assert!(matches!(duplicate, Err(LedgerError::Validation(_))));

        let orphan = accounts
            .create_account(Account::new("1010", "Till", AccountType::Asset).with_parent(Uuid::new_v4()))
            .await;
        assert!(orphan.is_err());

        let empty = accounts.create_account(Account::new("", "No code", AccountType::Asset)).await;
        assert!(empty.is_err());
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let storage = MemoryStorage::new();
        let mut accounts = AccountManager::new(storage.clone(), "t1");
        let chart = accounts.setup_standard_chart().await.unwrap();

        let system = accounts.delete_account(chart["1000"].id).await;
        assert!(matches!(system, Err(LedgerError::Validation(_))));

        let custom = accounts
            .create_account(Account::new("6960", "Subscriptions", AccountType::Expense))
            .await
            .unwrap();
        let used = accounts
            .create_account(Account::new("6970", "Training", AccountType::Expense))
            .await
            .unwrap();

        let mut journal = crate::ledger::JournalManager::new(storage.clone(), "t1");
        journal
            .create_entry(crate::ledger::ManualEntry {
                date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                description: "Course".to_string(),
                reference: None,
                lines: vec![
                    JournalLine::debit(used.id, BigDecimal::from(80), "course"),
                    JournalLine::credit(chart["1000"].id, BigDecimal::from(80), "cash"),
                ],
                post: false,
            })
            .await
            .unwrap();

        assert!(accounts.delete_account(used.id).await.is_err());
        accounts.delete_account(custom.id).await.unwrap();
        assert!(accounts.get_account(custom.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hierarchy_navigation() {
        let mut accounts = manager();
        let parent = accounts
            .create_account(Account::new("6000", "Operating Expenses", AccountType::Expense))
            .await
            .unwrap();
        let child = accounts
            .create_account(Account::new("6010", "Marketing", AccountType::Expense).with_parent(parent.id))
            .await
            .unwrap();
        let grandchild = accounts
            .create_account(Account::new("6011", "Online Ads", AccountType::Expense).with_parent(child.id))
            .await
            .unwrap();

        let children = accounts.get_child_accounts(parent.id).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, child.id);

        let path = accounts.get_account_path(grandchild.id).await.unwrap();
        let codes: Vec<&str> = path.iter().map(|a| a.code.as_str()).collect();
        assert_eq!(codes, vec!["6000", "6010", "6011"]);
    }

    #[tokio::test]
    async fn test_role_resolution() {
        let mut accounts = manager();
        let roles = AccountRoles::default();
        assert_eq!(accounts.missing_roles(&roles).await.unwrap().len(), AccountRole::all().len());

        accounts.setup_standard_chart().await.unwrap();
        assert!(accounts.missing_roles(&roles).await.unwrap().is_empty());

        let ar = accounts
            .resolve_role(&roles, AccountRole::AccountsReceivable)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ar.code, "1200");

        let mut inactive = ar.clone();
        inactive.is_active = false;
        accounts.update_account(&inactive).await.unwrap();
        assert!(accounts
            .resolve_role(&roles, AccountRole::AccountsReceivable)
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            accounts.missing_roles(&roles).await.unwrap(),
            vec![AccountRole::AccountsReceivable]
        );
    }
}
