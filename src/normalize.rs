use std::collections::HashSet;

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::models::{ParsedTransaction, TxnKind};
use crate::row::ProvisionalTxn;

/// Externally owned set of previously seen fingerprints, scoped per account.
/// The engine only flags collisions through it; accept/reject policy stays
/// with the caller. Concurrent imports for the same account must be
/// serialized by the caller.
pub trait DedupIndex {
    fn contains(&self, fingerprint: &str) -> bool;
    fn record(&mut self, fingerprint: &str);
}

/// HashSet-backed index for tests and single-process callers.
#[derive(Debug, Default)]
pub struct InMemoryDedupIndex {
    seen: HashSet<String>,
}

impl InMemoryDedupIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DedupIndex for InMemoryDedupIndex {
    fn contains(&self, fingerprint: &str) -> bool {
        self.seen.contains(fingerprint)
    }

    fn record(&mut self, fingerprint: &str) {
        self.seen.insert(fingerprint.to_string());
    }
}

/// Collapse runs of whitespace and strip the non-printable artifacts PDF and
/// spreadsheet extraction leave behind (control chars, BOM, zero-widths).
pub fn normalize_description(raw: &str) -> String {
    // Tabs and newlines are control chars but must survive until the
    // collapse below turns them into single spaces.
    let cleaned: String = raw
        .chars()
        .filter(|c| {
            !(c.is_control() && !c.is_whitespace())
                && !matches!(c, '\u{feff}' | '\u{200b}' | '\u{200e}')
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministic per-account transaction identity. Amounts are hashed as
/// whole cents so the value seen by the caller and the value hashed here
/// cannot drift through float formatting.
pub fn fingerprint(
    account_id: &str,
    date: NaiveDate,
    description: &str,
    amount: f64,
    kind: TxnKind,
) -> String {
    let cents = (amount * 100.0).round() as i64;
    let mut hasher = Sha256::new();
    hasher.update(account_id.as_bytes());
    hasher.update(b"|");
    hasher.update(date.format("%Y-%m-%d").to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(description.as_bytes());
    hasher.update(b"|");
    hasher.update(cents.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(kind.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// Finalize a provisionally parsed row: clean the description, compute the
/// fingerprint and, when a dedup handle is present, flag (never drop)
/// collisions with previously recorded transactions.
pub(crate) fn finalize<D: DedupIndex + ?Sized>(
    account_id: &str,
    provisional: ProvisionalTxn,
    dedup: Option<&mut D>,
) -> ParsedTransaction {
    let description = normalize_description(&provisional.description);
    let fp = fingerprint(
        account_id,
        provisional.date,
        &description,
        provisional.amount,
        provisional.kind,
    );
    let duplicate_of_existing = dedup.map(|index| {
        let dup = index.contains(&fp);
        if !dup {
            index.record(&fp);
        }
        dup
    });
    ParsedTransaction {
        date: provisional.date,
        description,
        amount: provisional.amount,
        kind: provisional.kind,
        balance_after: provisional.balance_after,
        source_row_index: provisional.source_row_index,
        fingerprint: fp,
        duplicate_of_existing,
    }
}
