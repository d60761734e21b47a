//! Receivables and payables aging

use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::commerce::documents::{PartyKind, Settlement};
use crate::reports::Reports;
use crate::traits::LedgerStorage;
use crate::types::*;
use crate::utils::money;

/// Age of an open document, counted in days since its date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgingBucket {
    Current,
    Days31To60,
    Days61To90,
    Over90,
}

impl AgingBucket {
    pub fn for_age(days: i64) -> Self {
        match days {
            i64::MIN..=30 => AgingBucket::Current,
            31..=60 => AgingBucket::Days31To60,
            61..=90 => AgingBucket::Days61To90,
            _ => AgingBucket::Over90,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgingBucket::Current => "0-30 days",
            AgingBucket::Days31To60 => "31-60 days",
            AgingBucket::Days61To90 => "61-90 days",
            AgingBucket::Over90 => "90+ days",
        }
    }
}

/// Amounts per bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgingTotals {
    pub current: BigDecimal,
    pub days_31_60: BigDecimal,
    pub days_61_90: BigDecimal,
    pub over_90: BigDecimal,
    pub total: BigDecimal,
}

impl Default for AgingTotals {
    fn default() -> Self {
        Self {
            current: money::zero(),
            days_31_60: money::zero(),
            days_61_90: money::zero(),
            over_90: money::zero(),
            total: money::zero(),
        }
    }
}

impl AgingTotals {
    fn add(&mut self, bucket: AgingBucket, amount: &BigDecimal) {
        let slot = match bucket {
            AgingBucket::Current => &mut self.current,
            AgingBucket::Days31To60 => &mut self.days_31_60,
            AgingBucket::Days61To90 => &mut self.days_61_90,
            AgingBucket::Over90 => &mut self.over_90,
        };
        *slot += amount;
        self.total += amount;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgingItem {
    pub document_id: Uuid,
    pub number: String,
    pub party_id: Uuid,
    pub party_name: String,
    pub date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub days_outstanding: i64,
    pub bucket: AgingBucket,
    pub balance_due: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyAging {
    pub party_id: Uuid,
    pub party_name: String,
    pub totals: AgingTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgingReport {
    pub as_of_date: NaiveDate,
    pub kind: PartyKind,
    /// Oldest first
    pub items: Vec<AgingItem>,
    /// Ordered by party name
    pub parties: Vec<PartyAging>,
    pub totals: AgingTotals,
}

/// Open document reduced to what aging needs
struct OpenDocument<'a> {
    id: Uuid,
    number: &'a str,
    party_id: Uuid,
    date: NaiveDate,
    settlement: &'a Settlement,
}

impl<S: LedgerStorage + Clone> Reports<S> {
    /// Unpaid invoices grouped by customer and age
    pub async fn receivables_aging(&self, as_of_date: NaiveDate) -> LedgerResult<AgingReport> {
        let invoices = self.storage.list_invoices(&self.tenant_id).await?;
        let documents = invoices.iter().map(|i| OpenDocument {
            id: i.id,
            number: &i.number,
            party_id: i.customer_id,
            date: i.date,
            settlement: &i.settlement,
        });
        self.aging(PartyKind::Customer, as_of_date, documents).await
    }

    /// Unpaid bills grouped by vendor and age
    pub async fn payables_aging(&self, as_of_date: NaiveDate) -> LedgerResult<AgingReport> {
        let bills = self.storage.list_bills(&self.tenant_id).await?;
        let documents = bills.iter().map(|b| OpenDocument {
            id: b.id,
            number: &b.number,
            party_id: b.vendor_id,
            date: b.date,
            settlement: &b.settlement,
        });
        self.aging(PartyKind::Vendor, as_of_date, documents).await
    }

    async fn aging<'a>(
        &self,
        kind: PartyKind,
        as_of_date: NaiveDate,
        documents: impl Iterator<Item = OpenDocument<'a>>,
    ) -> LedgerResult<AgingReport> {
        let names: HashMap<Uuid, String> = self
            .storage
            .list_parties(&self.tenant_id, kind)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let mut items = Vec::new();
        let mut by_party: HashMap<Uuid, PartyAging> = HashMap::new();
        let mut totals = AgingTotals::default();

        for document in documents {
            let settlement = document.settlement;
            if !settlement.status.is_open() || settlement.balance_due <= money::tolerance() {
                continue;
            }
            if document.date > as_of_date {
                continue;
            }

            let days_outstanding = (as_of_date - document.date).num_days();
            let bucket = AgingBucket::for_age(days_outstanding);
            let party_name = names
                .get(&document.party_id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());

            totals.add(bucket, &settlement.balance_due);
            by_party
                .entry(document.party_id)
                .or_insert_with(|| PartyAging {
                    party_id: document.party_id,
                    party_name: party_name.clone(),
                    totals: AgingTotals::default(),
                })
                .totals
                .add(bucket, &settlement.balance_due);

            items.push(AgingItem {
                document_id: document.id,
                number: document.number.to_string(),
                party_id: document.party_id,
                party_name,
                date: document.date,
                due_date: settlement.due_date,
                days_outstanding,
                bucket,
                balance_due: settlement.balance_due.clone(),
            });
        }

        items.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.number.cmp(&b.number)));
        let mut parties: Vec<PartyAging> = by_party.into_values().collect();
        parties.sort_by(|a, b| a.party_name.cmp(&b.party_name));

        Ok(AgingReport {
            as_of_date,
            kind,
            items,
            parties,
            totals,
        })
    }
}
