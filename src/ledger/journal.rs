//! Journal entry processing and management

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::ledger::fiscal::FiscalManager;
use crate::numbering::{reversal_reference, DocumentKind};
use crate::traits::*;
use crate::types::*;
use crate::utils::money;

/// An unnumbered entry waiting to be prepared and committed
#[derive(Debug, Clone, PartialEq)]
pub struct JournalDraft {
    pub date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub source: EntrySource,
    pub source_id: Option<Uuid>,
    pub lines: Vec<JournalLine>,
    pub posted: bool,
}

impl JournalDraft {
    pub fn total_debits(&self) -> BigDecimal {
        self.lines.iter().map(|l| &l.debit).sum()
    }

    pub fn total_credits(&self) -> BigDecimal {
        self.lines.iter().map(|l| &l.credit).sum()
    }
}

/// Builder for journal drafts
///
/// Zero-amount lines are dropped, so optional legs (tax, COGS) can be added
/// unconditionally.
pub struct EntryBuilder {
    draft: JournalDraft,
}

impl EntryBuilder {
    /// Start a posted draft
    pub fn new(date: NaiveDate, description: impl Into<String>, source: EntrySource) -> Self {
        Self {
            draft: JournalDraft {
                date,
                description: description.into(),
                reference: None,
                source,
                source_id: None,
                lines: Vec::new(),
                posted: true,
            },
        }
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.draft.reference = Some(reference.into());
        self
    }

    pub fn source_id(mut self, source_id: Uuid) -> Self {
        self.draft.source_id = Some(source_id);
        self
    }

    pub fn unposted(mut self) -> Self {
        self.draft.posted = false;
        self
    }

    /// Add a debit line
    pub fn debit(mut self, account_id: Uuid, amount: BigDecimal, description: impl Into<String>) -> Self {
        if !money::is_zero(&amount) {
            self.draft
                .lines
                .push(JournalLine::debit(account_id, amount, description));
        }
        self
    }

    /// Add a credit line
    pub fn credit(mut self, account_id: Uuid, amount: BigDecimal, description: impl Into<String>) -> Self {
        if !money::is_zero(&amount) {
            self.draft
                .lines
                .push(JournalLine::credit(account_id, amount, description));
        }
        self
    }

    /// Add a prepared line as-is
    pub fn line(mut self, line: JournalLine) -> Self {
        self.draft.lines.push(line);
        self
    }

    pub fn build(self) -> JournalDraft {
        self.draft
    }
}

/// Manually keyed journal entry
#[derive(Debug, Clone)]
pub struct ManualEntry {
    pub date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub lines: Vec<JournalLine>,
    /// Post immediately, or keep as a draft
    pub post: bool,
}

/// Journal manager for creating, posting and reversing entries
pub struct JournalManager<S: LedgerStorage> {
    storage: S,
    tenant_id: String,
    fiscal: FiscalManager<S>,
    validator: Box<dyn EntryValidator>,
}

impl<S: LedgerStorage + Clone> JournalManager<S> {
    /// Create a new journal manager
    pub fn new(storage: S, tenant_id: impl Into<String>) -> Self {
        Self::with_validator(storage, tenant_id, Box::new(DefaultEntryValidator))
    }

    /// Create a new journal manager with custom validator
    pub fn with_validator(
        storage: S,
        tenant_id: impl Into<String>,
        validator: Box<dyn EntryValidator>,
    ) -> Self {
        let tenant_id = tenant_id.into();
        Self {
            fiscal: FiscalManager::new(storage.clone(), tenant_id.clone()),
            storage,
            tenant_id,
            validator,
        }
    }

    /// Number and validate a draft. The entry is not stored.
    pub async fn prepare(&mut self, draft: JournalDraft) -> LedgerResult<JournalEntry> {
        let mut entry = JournalEntry {
            id: Uuid::new_v4(),
            entry_number: String::new(),
            date: draft.date,
            description: draft.description,
            reference: draft.reference,
            source: draft.source,
            source_id: draft.source_id,
            is_posted: draft.posted,
            lines: draft.lines,
            created_at: chrono::Utc::now().naive_utc(),
        };

        self.validator.validate_entry(&entry)?;

        let sequence = self
            .storage
            .next_sequence(&self.tenant_id, DocumentKind::JournalEntry)
            .await?;
        entry.entry_number = DocumentKind::JournalEntry.format(sequence);
        Ok(entry)
    }

    /// Record a manual entry
    pub async fn create_entry(&mut self, input: ManualEntry) -> LedgerResult<JournalEntry> {
        let lines: Vec<JournalLine> = input.lines.into_iter().filter(|l| !l.is_empty()).collect();
        if lines.is_empty() {
            return Err(LedgerError::InvalidEntry(
                "Journal entry must have at least one non-zero line".to_string(),
            ));
        }

        for line in &lines {
            if self
                .storage
                .get_account(&self.tenant_id, line.account_id)
                .await?
                .is_none()
            {
                return Err(LedgerError::AccountNotFound(line.account_id.to_string()));
            }
        }

        self.fiscal.ensure_open(input.date).await?;

        let mut builder = EntryBuilder::new(input.date, input.description, EntrySource::Manual);
        if let Some(reference) = input.reference {
            builder = builder.reference(reference);
        }
        if !input.post {
            builder = builder.unposted();
        }
        let draft = lines.into_iter().fold(builder, |b, line| b.line(line)).build();

        let entry = self.prepare(draft).await?;
        self.storage
            .commit(&self.tenant_id, Change::SaveEntry(entry.clone()).into())
            .await?;

        tracing::info!(
            tenant = %self.tenant_id,
            entry = %entry.entry_number,
            posted = entry.is_posted,
            "journal entry recorded"
        );
        Ok(entry)
    }

    /// Get an entry by ID
    pub async fn get_entry(&self, entry_id: Uuid) -> LedgerResult<Option<JournalEntry>> {
        self.storage.get_entry(&self.tenant_id, entry_id).await
    }

    /// Get an entry by ID, returning an error if not found
    pub async fn get_entry_required(&self, entry_id: Uuid) -> LedgerResult<JournalEntry> {
        self.get_entry(entry_id)
            .await?
            .ok_or_else(|| LedgerError::EntryNotFound(entry_id.to_string()))
    }

    pub async fn list_entries(&self, filter: &EntryFilter) -> LedgerResult<Vec<JournalEntry>> {
        self.storage.list_entries(&self.tenant_id, filter).await
    }

    /// Post a draft entry. Only balanced entries can be posted.
    pub async fn post_entry(&mut self, entry_id: Uuid) -> LedgerResult<JournalEntry> {
        let mut entry = self.get_entry_required(entry_id).await?;
        if entry.is_posted {
            return Err(LedgerError::Validation(format!(
                "Entry {} is already posted",
                entry.entry_number
            )));
        }
        if !entry.is_balanced() {
            return Err(LedgerError::InvalidEntry(format!(
                "Cannot post unbalanced entry {}",
                entry.entry_number
            )));
        }
        self.fiscal.ensure_open(entry.date).await?;

        entry.is_posted = true;
        self.storage
            .commit(&self.tenant_id, Change::SaveEntry(entry.clone()).into())
            .await?;

        tracing::info!(tenant = %self.tenant_id, entry = %entry.entry_number, "journal entry posted");
        Ok(entry)
    }

    /// Delete a draft entry. Posted entries can only be reversed.
    pub async fn delete_entry(&mut self, entry_id: Uuid) -> LedgerResult<()> {
        let entry = self.get_entry_required(entry_id).await?;
        if entry.is_posted {
            return Err(LedgerError::Validation(format!(
                "Posted entry {} cannot be deleted; reverse it instead",
                entry.entry_number
            )));
        }

        self.storage
            .commit(&self.tenant_id, Change::DeleteEntry(entry_id).into())
            .await?;
        tracing::info!(tenant = %self.tenant_id, entry = %entry.entry_number, "draft entry deleted");
        Ok(())
    }

    /// Build (but do not store) the reversal of a posted entry
    pub async fn prepare_reversal(&mut self, entry_id: Uuid, date: NaiveDate) -> LedgerResult<JournalEntry> {
        let original = self.get_entry_required(entry_id).await?;
        if !original.is_posted {
            return Err(LedgerError::Validation(format!(
                "Only posted entries can be reversed; {} is a draft",
                original.entry_number
            )));
        }

        let reference = reversal_reference(&original.entry_number);
        let existing = self
            .list_entries(&EntryFilter {
                source: Some(EntrySource::Reversal),
                ..EntryFilter::default()
            })
            .await?;
        if existing
            .iter()
            .any(|e| e.reference.as_deref() == Some(reference.as_str()))
        {
            return Err(LedgerError::Validation(format!(
                "Entry {} has already been reversed",
                original.entry_number
            )));
        }

        self.fiscal.ensure_open(date).await?;
        self.prepare(crate::ledger::recipes::reversal(&original, date))
            .await
    }

    /// Post an offsetting entry for a posted entry
    pub async fn reverse_entry(&mut self, entry_id: Uuid, date: NaiveDate) -> LedgerResult<JournalEntry> {
        let reversal = self.prepare_reversal(entry_id, date).await?;
        self.storage
            .commit(&self.tenant_id, Change::SaveEntry(reversal.clone()).into())
            .await?;

        tracing::info!(
            tenant = %self.tenant_id,
            entry = %reversal.entry_number,
            reference = ?reversal.reference,
            "journal entry reversed"
        );
        Ok(reversal)
    }
}
