//! Fiscal period locking and fiscal-year boundaries

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::traits::*;
use crate::types::*;

/// Lock state of one (year, month)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub year: i32,
    /// 1-12
    pub month: u32,
    pub is_locked: bool,
    pub locked_at: Option<NaiveDateTime>,
}

impl FiscalPeriod {
    pub fn open(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            is_locked: false,
            locked_at: None,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn label(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

/// Result of a lock/unlock request. Repeating a request is a no-op with a notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockOutcome {
    pub period: FiscalPeriod,
    /// False when the period was already in the requested state
    pub changed: bool,
    pub message: String,
}

/// First and last day of the fiscal year that starts in `year`
pub fn fiscal_year_bounds(year: i32, start_month: u32) -> LedgerResult<(NaiveDate, NaiveDate)> {
    let invalid = || LedgerError::Validation(format!("Invalid fiscal year {} / start month {}", year, start_month));

    let start = NaiveDate::from_ymd_opt(year, start_month, 1).ok_or_else(invalid)?;
    let next_start = year
        .checked_add(1)
        .and_then(|next| NaiveDate::from_ymd_opt(next, start_month, 1))
        .ok_or_else(invalid)?;
    let end = next_start.pred_opt().ok_or_else(invalid)?;
    Ok((start, end))
}

/// Start of the fiscal year containing `date`
pub fn fiscal_year_start(date: NaiveDate, start_month: u32) -> LedgerResult<NaiveDate> {
    let year = if date.month() >= start_month {
        date.year()
    } else {
        date.year() - 1
    };
    Ok(fiscal_year_bounds(year, start_month)?.0)
}

fn validate_month(month: u32) -> LedgerResult<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(LedgerError::Validation(format!(
            "Month must be between 1 and 12, got {}",
            month
        )))
    }
}

/// Period lock gate for one tenant
pub struct FiscalManager<S: LedgerStorage> {
    storage: S,
    tenant_id: String,
}

impl<S: LedgerStorage> FiscalManager<S> {
    pub fn new(storage: S, tenant_id: impl Into<String>) -> Self {
        Self {
            storage,
            tenant_id: tenant_id.into(),
        }
    }

    pub async fn is_period_locked(&self, date: NaiveDate) -> LedgerResult<bool> {
        Ok(self
            .storage
            .get_fiscal_period(&self.tenant_id, date.year(), date.month())
            .await?
            .is_some_and(|p| p.is_locked))
    }

    /// Fail with [`LedgerError::PeriodLocked`] when `date` falls in a locked month
    pub async fn ensure_open(&self, date: NaiveDate) -> LedgerResult<()> {
        if self.is_period_locked(date).await? {
            tracing::warn!(tenant = %self.tenant_id, %date, "posting rejected: period locked");
            return Err(LedgerError::PeriodLocked {
                year: date.year(),
                month: date.month(),
            });
        }
        Ok(())
    }

    pub async fn lock_period(&mut self, year: i32, month: u32) -> LedgerResult<LockOutcome> {
        self.set_locked(year, month, true).await
    }

    pub async fn unlock_period(&mut self, year: i32, month: u32) -> LedgerResult<LockOutcome> {
        self.set_locked(year, month, false).await
    }

    async fn set_locked(&mut self, year: i32, month: u32, locked: bool) -> LedgerResult<LockOutcome> {
        validate_month(month)?;

        let mut period = self
            .storage
            .get_fiscal_period(&self.tenant_id, year, month)
            .await?
            .unwrap_or_else(|| FiscalPeriod::open(year, month));

        let verb = if locked { "locked" } else { "unlocked" };
        if period.is_locked == locked {
            return Ok(LockOutcome {
                message: format!("Period {} is already {}", period.label(), verb),
                period,
                changed: false,
            });
        }

        period.is_locked = locked;
        period.locked_at = locked.then(|| chrono::Utc::now().naive_utc());
        self.storage
            .commit(&self.tenant_id, Change::SaveFiscalPeriod(period.clone()).into())
            .await?;

        tracing::info!(tenant = %self.tenant_id, period = %period.label(), "fiscal period {}", verb);

        Ok(LockOutcome {
            message: format!("Period {} {}", period.label(), verb),
            period,
            changed: true,
        })
    }

    /// All twelve months of `year`, open unless stored as locked
    pub async fn list_periods(&self, year: i32) -> LedgerResult<Vec<FiscalPeriod>> {
        let stored = self.storage.list_fiscal_periods(&self.tenant_id).await?;
        Ok((1..=12)
            .map(|month| {
                stored
                    .iter()
                    .find(|p| p.year == year && p.month == month)
                    .cloned()
                    .unwrap_or_else(|| FiscalPeriod::open(year, month))
            })
            .collect())
    }
}
