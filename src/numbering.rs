//! Human-facing document numbers
//!
//! Sequences are allocated per tenant and per kind by the storage backend;
//! this module only formats them.

use serde::{Deserialize, Serialize};

/// Kinds of numbered documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    JournalEntry,
    Invoice,
    Bill,
    PaymentReceived,
    PaymentMade,
    CreditNote,
    DebitNote,
    PettyCash,
    /// Stocked product SKU
    Product,
    /// Service SKU
    Service,
}

impl DocumentKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::JournalEntry => "JE",
            DocumentKind::Invoice => "INV",
            DocumentKind::Bill => "BILL",
            DocumentKind::PaymentReceived => "PR",
            DocumentKind::PaymentMade => "PM",
            DocumentKind::CreditNote => "CN",
            DocumentKind::DebitNote => "DN",
            DocumentKind::PettyCash => "PC",
            DocumentKind::Product => "PRD",
            DocumentKind::Service => "SVC",
        }
    }

    /// `PREFIX-00042`
    pub fn format(&self, sequence: u64) -> String {
        format!("{}-{:05}", self.prefix(), sequence)
    }
}

/// Reference of a year-end closing entry
pub fn year_end_reference(year: i32) -> String {
    format!("YE-{}", year)
}

/// Reference of an entry reversing `entry_number`
pub fn reversal_reference(entry_number: &str) -> String {
    format!("REV-{}", entry_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formats() {
        assert_eq!(DocumentKind::Invoice.format(1), "INV-00001");
        assert_eq!(DocumentKind::Bill.format(42), "BILL-00042");
        assert_eq!(DocumentKind::JournalEntry.format(7), "JE-00007");
        assert_eq!(DocumentKind::PaymentReceived.format(3), "PR-00003");
        assert_eq!(DocumentKind::PaymentMade.format(3), "PM-00003");
        assert_eq!(DocumentKind::CreditNote.format(10), "CN-00010");
        assert_eq!(DocumentKind::DebitNote.format(99999), "DN-99999");
        assert_eq!(DocumentKind::PettyCash.format(123456), "PC-123456");
        assert_eq!(year_end_reference(2024), "YE-2024");
        assert_eq!(reversal_reference("JE-00012"), "REV-JE-00012");
    }
}
