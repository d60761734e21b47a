//! General ledger and party statements

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::commerce::documents::*;
use crate::reports::{ensure_range, Reports};
use crate::traits::LedgerStorage;
use crate::types::*;
use crate::utils::money;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralLedgerLine {
    pub entry_id: Uuid,
    pub entry_number: String,
    pub date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub running_balance: BigDecimal,
}

/// Posted activity of one account, signed by its normal balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralLedger {
    pub account_id: Uuid,
    pub code: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub opening_balance: BigDecimal,
    pub lines: Vec<GeneralLedgerLine>,
    pub total_debits: BigDecimal,
    pub total_credits: BigDecimal,
    pub closing_balance: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub date: NaiveDate,
    pub number: String,
    pub description: String,
    /// Increases what is owed
    pub debit: BigDecimal,
    /// Reduces what is owed
    pub credit: BigDecimal,
    pub running_balance: BigDecimal,
}

/// Running account of what a customer owes the tenant, or the tenant owes a vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyStatement {
    pub party_id: Uuid,
    pub party_name: String,
    pub kind: PartyKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub opening_balance: BigDecimal,
    pub lines: Vec<StatementLine>,
    pub closing_balance: BigDecimal,
}

struct Activity {
    date: NaiveDate,
    number: String,
    description: String,
    debit: BigDecimal,
    credit: BigDecimal,
}

impl<S: LedgerStorage + Clone> Reports<S> {
    pub async fn general_ledger(
        &self,
        account_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<GeneralLedger> {
        ensure_range(start_date, end_date)?;
        let account = self
            .storage
            .get_account(&self.tenant_id, account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;
        let side = account.normal_balance;

        let opening_balance = match start_date.pred_opt() {
            Some(day) => self.balances.balance(&account, None, Some(day)).await?,
            None => money::zero(),
        };

        let entries = self
            .storage
            .list_entries(
                &self.tenant_id,
                &EntryFilter {
                    account_id: Some(account_id),
                    ..EntryFilter::posted_between(Some(start_date), Some(end_date))
                },
            )
            .await?;

        let mut running_balance = opening_balance.clone();
        let mut totals = crate::ledger::balance::AccountTotals::default();
        let mut lines = Vec::new();
        for entry in &entries {
            for line in entry.lines.iter().filter(|l| l.account_id == account_id) {
                totals.add_line(line);
                running_balance += match side {
                    EntryType::Debit => &line.debit - &line.credit,
                    EntryType::Credit => &line.credit - &line.debit,
                };
                lines.push(GeneralLedgerLine {
                    entry_id: entry.id,
                    entry_number: entry.entry_number.clone(),
                    date: entry.date,
                    description: line
                        .description
                        .clone()
                        .unwrap_or_else(|| entry.description.clone()),
                    reference: entry.reference.clone(),
                    debit: line.debit.clone(),
                    credit: line.credit.clone(),
                    running_balance: running_balance.clone(),
                });
            }
        }

        Ok(GeneralLedger {
            account_id,
            code: account.code,
            name: account.name,
            start_date,
            end_date,
            opening_balance,
            lines,
            total_debits: totals.debit,
            total_credits: totals.credit,
            closing_balance: running_balance,
        })
    }

    /// Invoices against payments and applied credit notes for a customer
    pub async fn customer_statement(
        &self,
        customer_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<PartyStatement> {
        let customer = self.party(PartyKind::Customer, customer_id).await?;

        let mut activity: Vec<Activity> = self
            .storage
            .list_invoices(&self.tenant_id)
            .await?
            .into_iter()
            .filter(|i| i.customer_id == customer_id && i.settlement.status != DocumentStatus::Draft)
            .map(|i| Activity {
                date: i.date,
                description: format!("Invoice {}", i.number),
                number: i.number,
                debit: i.totals.total,
                credit: money::zero(),
            })
            .collect();
        activity.extend(self.payment_activity(PaymentDirection::Received, customer_id).await?);
        activity.extend(self.note_activity(NoteKind::Credit, customer_id).await?);

        Ok(build_statement(customer, start_date, end_date, activity))
    }

    /// Bills against payments and applied debit notes for a vendor
    pub async fn vendor_statement(
        &self,
        vendor_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<PartyStatement> {
        let vendor = self.party(PartyKind::Vendor, vendor_id).await?;

        let mut activity: Vec<Activity> = self
            .storage
            .list_bills(&self.tenant_id)
            .await?
            .into_iter()
            .filter(|b| b.vendor_id == vendor_id && b.settlement.status != DocumentStatus::Draft)
            .map(|b| Activity {
                date: b.date,
                description: match &b.vendor_reference {
                    Some(reference) => format!("Bill {} ({})", b.number, reference),
                    None => format!("Bill {}", b.number),
                },
                number: b.number,
                debit: b.totals.total,
                credit: money::zero(),
            })
            .collect();
        activity.extend(self.payment_activity(PaymentDirection::Made, vendor_id).await?);
        activity.extend(self.note_activity(NoteKind::Debit, vendor_id).await?);

        Ok(build_statement(vendor, start_date, end_date, activity))
    }

    async fn party(&self, kind: PartyKind, party_id: Uuid) -> LedgerResult<Party> {
        let label = match kind {
            PartyKind::Customer => "Customer",
            PartyKind::Vendor => "Vendor",
        };
        self.storage
            .get_party(&self.tenant_id, party_id)
            .await?
            .filter(|p| p.kind == kind)
            .ok_or_else(|| LedgerError::not_found(label, party_id))
    }

    async fn payment_activity(&self, direction: PaymentDirection, party_id: Uuid) -> LedgerResult<Vec<Activity>> {
        Ok(self
            .storage
            .list_payments(&self.tenant_id, direction)
            .await?
            .into_iter()
            .filter(|p| p.party_id == party_id)
            .map(|p| Activity {
                date: p.date,
                description: match &p.method {
                    Some(method) => format!("Payment {} ({})", p.number, method),
                    None => format!("Payment {}", p.number),
                },
                number: p.number,
                debit: money::zero(),
                credit: p.amount,
            })
            .collect())
    }

    async fn note_activity(&self, kind: NoteKind, party_id: Uuid) -> LedgerResult<Vec<Activity>> {
        let label = match kind {
            NoteKind::Credit => "Credit note",
            NoteKind::Debit => "Debit note",
        };
        Ok(self
            .storage
            .list_notes(&self.tenant_id, kind)
            .await?
            .into_iter()
            .filter(|n| n.party_id == party_id && n.status == NoteStatus::Applied)
            .map(|n| Activity {
                date: n.date,
                description: format!("{} {}", label, n.number),
                number: n.number,
                debit: money::zero(),
                credit: n.totals.total,
            })
            .collect())
    }
}

fn build_statement(
    party: Party,
    start_date: NaiveDate,
    end_date: NaiveDate,
    mut activity: Vec<Activity>,
) -> PartyStatement {
    // Documents before settlements on the same day
    activity.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| b.debit.cmp(&a.debit))
            .then_with(|| a.number.cmp(&b.number))
    });

    let mut opening_balance = money::zero();
    let mut running_balance = money::zero();
    let mut lines = Vec::new();
    for item in activity {
        if item.date > end_date {
            break;
        }
        if item.date < start_date {
            opening_balance += &item.debit - &item.credit;
            running_balance = opening_balance.clone();
            continue;
        }
        running_balance += &item.debit - &item.credit;
        lines.push(StatementLine {
            date: item.date,
            number: item.number,
            description: item.description,
            debit: item.debit,
            credit: item.credit,
            running_balance: running_balance.clone(),
        });
    }

    PartyStatement {
        party_id: party.id,
        party_name: party.name,
        kind: party.kind,
        start_date,
        end_date,
        opening_balance,
        lines,
        closing_balance: running_balance,
    }
}
