//! # Ledger Entry Types & Validation
//!
//! Double-entry records for care-home finance. Amounts are integer cents:
//! the balanced-entry gate needs exact comparison, so floats never appear
//! here. Validation runs before anything touches the queue — a malformed
//! entry is rejected synchronously and is never persisted or retried.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use haven_sync::{Result, SyncError};

/// Minimum number of lines for a balanced entry
pub const MIN_LINES: usize = 2;

/// One debit or credit against an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerLine {
    /// Chart-of-accounts reference
    pub account_id: String,
    /// Debit amount in cents; zero when this is a credit line
    #[serde(default)]
    pub debit_cents: i64,
    /// Credit amount in cents; zero when this is a debit line
    #[serde(default)]
    pub credit_cents: i64,
}

impl LedgerLine {
    /// A debit line against an account
    pub fn debit(account_id: impl Into<String>, cents: i64) -> Self {
        Self {
            account_id: account_id.into(),
            debit_cents: cents,
            credit_cents: 0,
        }
    }

    /// A credit line against an account
    pub fn credit(account_id: impl Into<String>, cents: i64) -> Self {
        Self {
            account_id: account_id.into(),
            debit_cents: 0,
            credit_cents: cents,
        }
    }
}

/// A double-entry ledger record for one care home
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Entity id, also the remote address of the record
    pub id: String,
    /// Care home this entry belongs to
    pub home_id: String,
    /// Free-form description
    #[serde(default)]
    pub memo: String,
    /// Business date of the entry
    pub posted_at: DateTime<Utc>,
    /// Balanced debit/credit lines
    pub lines: Vec<LedgerLine>,
}

/// Reject anything that must never enter the queue.
///
/// Checks: non-empty entity references, at least [`MIN_LINES`] lines, each
/// line carrying exactly one positive side, and total debits equal to
/// total credits.
pub fn validate_entry(entry: &LedgerEntry) -> Result<()> {
    if entry.id.trim().is_empty() {
        return Err(SyncError::Validation(
            "ledger entry id must not be empty".to_string(),
        ));
    }
    if entry.home_id.trim().is_empty() {
        return Err(SyncError::Validation(
            "ledger entry must reference a care home".to_string(),
        ));
    }
    if entry.lines.len() < MIN_LINES {
        return Err(SyncError::Validation(format!(
            "ledger entry requires at least {} lines, got {}",
            MIN_LINES,
            entry.lines.len()
        )));
    }

    let mut debits: i64 = 0;
    let mut credits: i64 = 0;
    for (index, line) in entry.lines.iter().enumerate() {
        if line.account_id.trim().is_empty() {
            return Err(SyncError::Validation(format!(
                "line {} must reference an account",
                index
            )));
        }
        if line.debit_cents < 0 || line.credit_cents < 0 {
            return Err(SyncError::Validation(format!(
                "line {} has a negative amount",
                index
            )));
        }
        if (line.debit_cents > 0) == (line.credit_cents > 0) {
            return Err(SyncError::Validation(format!(
                "line {} must carry exactly one of debit or credit",
                index
            )));
        }

        debits = debits.checked_add(line.debit_cents).ok_or_else(|| {
            SyncError::Validation("total debits overflow".to_string())
        })?;
        credits = credits.checked_add(line.credit_cents).ok_or_else(|| {
            SyncError::Validation("total credits overflow".to_string())
        })?;
    }

    if debits != credits {
        return Err(SyncError::Validation(format!(
            "unbalanced entry: debits {} != credits {}",
            debits, credits
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced_entry() -> LedgerEntry {
        LedgerEntry {
            id: "je-1".to_string(),
            home_id: "home-1".to_string(),
            memo: "March rent, room B12".to_string(),
            posted_at: Utc::now(),
            lines: vec![
                LedgerLine::debit("accounts-receivable", 120_00),
                LedgerLine::credit("rental-income", 120_00),
            ],
        }
    }

    #[test]
    fn test_balanced_entry_passes() {
        validate_entry(&balanced_entry()).unwrap();
    }

    #[test]
    fn test_unbalanced_entry_rejected() {
        let mut entry = balanced_entry();
        entry.lines[1].credit_cents = 119_99;

        let err = validate_entry(&entry).unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
        assert!(err.to_string().contains("unbalanced"));
    }

    #[test]
    fn test_single_line_rejected() {
        let mut entry = balanced_entry();
        entry.lines.truncate(1);
        assert!(validate_entry(&entry).is_err());
    }

    #[test]
    fn test_line_with_both_sides_rejected() {
        let mut entry = balanced_entry();
        entry.lines[0].credit_cents = 120_00;
        assert!(validate_entry(&entry).is_err());
    }

    #[test]
    fn test_line_with_neither_side_rejected() {
        let mut entry = balanced_entry();
        entry.lines[0].debit_cents = 0;
        assert!(validate_entry(&entry).is_err());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let mut entry = balanced_entry();
        entry.lines[0].debit_cents = -120_00;
        assert!(validate_entry(&entry).is_err());
    }

    #[test]
    fn test_missing_references_rejected() {
        let mut entry = balanced_entry();
        entry.home_id = "  ".to_string();
        assert!(validate_entry(&entry).is_err());

        let mut entry = balanced_entry();
        entry.lines[0].account_id = String::new();
        assert!(validate_entry(&entry).is_err());
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let value = serde_json::to_value(balanced_entry()).unwrap();
        assert_eq!(value["homeId"], "home-1");
        assert_eq!(value["lines"][0]["accountId"], "accounts-receivable");
        assert_eq!(value["lines"][0]["debitCents"], 12000);
    }
}
