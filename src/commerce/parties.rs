//! Customers and vendors

use uuid::Uuid;

use crate::commerce::documents::*;
use crate::ledger::Ledger;
use crate::traits::*;
use crate::types::*;

impl<S: LedgerStorage + Clone> Ledger<S> {
    pub async fn create_party(&mut self, party: Party) -> LedgerResult<Party> {
        validate_party(&party)?;
        self.commit(Change::SaveParty(party.clone()).into()).await?;
        tracing::debug!(tenant = %self.tenant_id, kind = ?party.kind, name = %party.name, "party created");
        Ok(party)
    }

    /// Update name and contact details. The kind of a party never changes.
    pub async fn update_party(&mut self, party: &Party) -> LedgerResult<Party> {
        validate_party(party)?;
        let existing = self.require_party(party.kind, party.id).await?;

        let mut updated = party.clone();
        updated.created_at = existing.created_at;
        self.commit(Change::SaveParty(updated.clone()).into()).await?;
        Ok(updated)
    }

    /// Delete a party that has no documents, payments or notes
    pub async fn delete_party(&mut self, party_id: Uuid) -> LedgerResult<()> {
        let party = self
            .get_party(party_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Party", party_id))?;

        let in_use = match party.kind {
            PartyKind::Customer => {
                self.storage
                    .list_invoices(&self.tenant_id)
                    .await?
                    .iter()
                    .any(|i| i.customer_id == party_id)
                    || self.has_payments_or_notes(party_id, PaymentDirection::Received, NoteKind::Credit).await?
            }
            PartyKind::Vendor => {
                self.storage
                    .list_bills(&self.tenant_id)
                    .await?
                    .iter()
                    .any(|b| b.vendor_id == party_id)
                    || self.has_payments_or_notes(party_id, PaymentDirection::Made, NoteKind::Debit).await?
            }
        };

        if in_use {
            return Err(LedgerError::Validation(format!(
                "Cannot delete '{}': it has existing documents",
                party.name
            )));
        }

        self.commit(Change::DeleteParty(party_id).into()).await?;
        tracing::info!(tenant = %self.tenant_id, name = %party.name, "party deleted");
        Ok(())
    }

    pub async fn get_party(&self, party_id: Uuid) -> LedgerResult<Option<Party>> {
        self.storage.get_party(&self.tenant_id, party_id).await
    }

    /// Customers ordered by name
    pub async fn list_customers(&self) -> LedgerResult<Vec<Party>> {
        self.list_parties(PartyKind::Customer).await
    }

    /// Vendors ordered by name
    pub async fn list_vendors(&self) -> LedgerResult<Vec<Party>> {
        self.list_parties(PartyKind::Vendor).await
    }

    async fn list_parties(&self, kind: PartyKind) -> LedgerResult<Vec<Party>> {
        let mut parties = self.storage.list_parties(&self.tenant_id, kind).await?;
        parties.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(parties)
    }

    async fn has_payments_or_notes(
        &self,
        party_id: Uuid,
        direction: PaymentDirection,
        note_kind: NoteKind,
    ) -> LedgerResult<bool> {
        let paid = self
            .storage
            .list_payments(&self.tenant_id, direction)
            .await?
            .iter()
            .any(|p| p.party_id == party_id);
        let noted = self
            .storage
            .list_notes(&self.tenant_id, note_kind)
            .await?
            .iter()
            .any(|n| n.party_id == party_id);
        Ok(paid || noted)
    }

    /// Party of the given kind, or an error naming what is missing
    pub(crate) async fn require_party(&self, kind: PartyKind, party_id: Uuid) -> LedgerResult<Party> {
        let label = match kind {
            PartyKind::Customer => "Customer",
            PartyKind::Vendor => "Vendor",
        };
        match self.get_party(party_id).await? {
            Some(party) if party.kind == kind => Ok(party),
            _ => Err(LedgerError::not_found(label, party_id)),
        }
    }
}

fn validate_party(party: &Party) -> LedgerResult<()> {
    if party.name.trim().is_empty() {
        return Err(LedgerError::Validation("Name cannot be empty".to_string()));
    }
    Ok(())
}
