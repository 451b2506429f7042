use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sentinel bank id returned when no profile (and no fallback) matched.
pub const UNKNOWN_BANK: &str = "UNKNOWN";

/// One un-interpreted row of an input file, as delivered by an extractor.
///
/// `index` is 0-based and stable for the lifetime of a parse. Extractors that
/// only produce whole lines (PDF text, plain TXT) leave `fields` as a single
/// element; the row parser re-splits `source_text` with the profile delimiter
/// in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub index: usize,
    pub fields: Vec<String>,
    pub source_text: String,
}

impl RawRow {
    pub fn from_line(index: usize, line: &str) -> Self {
        RawRow {
            index,
            fields: vec![line.to_string()],
            source_text: line.to_string(),
        }
    }

    pub fn from_fields(index: usize, fields: Vec<String>, source_text: String) -> Self {
        RawRow {
            index,
            fields,
            source_text,
        }
    }

    /// Cell view of the row. Pre-split fields win; single-field rows are
    /// split on the profile delimiter.
    pub(crate) fn cells(&self, delimiter: char) -> Vec<&str> {
        if self.fields.len() > 1 {
            self.fields.iter().map(|f| f.as_str()).collect()
        } else {
            self.source_text.split(delimiter).collect()
        }
    }

    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|f| f.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxnKind {
    Income,
    Expense,
}

impl TxnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnKind::Income => "INCOME",
            TxnKind::Expense => "EXPENSE",
        }
    }
}

/// Canonical transaction record. `amount` is always a non-negative magnitude;
/// the income/expense split lives in `kind`, never in the sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub kind: TxnKind,
    pub balance_after: Option<f64>,
    pub source_row_index: usize,
    pub fingerprint: String,
    /// Set only when a dedup index handle was supplied to the parse.
    pub duplicate_of_existing: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowErrorKind {
    BadDate,
    BadAmount,
    AmbiguousDebitCredit,
    MissingRequiredField,
}

impl RowErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowErrorKind::BadDate => "unparsable date",
            RowErrorKind::BadAmount => "unparsable amount",
            RowErrorKind::AmbiguousDebitCredit => "ambiguous debit/credit",
            RowErrorKind::MissingRequiredField => "missing required field",
        }
    }
}

/// A recoverable, row-scoped failure. The row is dropped and reported; the
/// rest of the file keeps parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    pub row_index: usize,
    pub reason: RowErrorKind,
    pub detail: String,
}

/// Everything that can land in `ParseResult::errors`: whole-file fatals and
/// per-row failures. Malformed input is always data, never a panic or an
/// `Err` return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ParseError {
    UnrecognizedFormat { detail: String },
    EmptyFile { attempted: usize, parsed: usize },
    Row(RowError),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnrecognizedFormat { detail } => {
                write!(f, "unrecognized statement format: {detail}")
            }
            ParseError::EmptyFile { attempted, parsed } => {
                write!(f, "no rows parsed ({parsed} of {attempted} data rows)")
            }
            ParseError::Row(e) => {
                write!(f, "row {}: {} ({})", e.row_index + 1, e.reason.as_str(), e.detail)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Summary {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
    pub count: usize,
}

/// Final outcome of one parse invocation. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub success: bool,
    pub bank_detected: String,
    pub transactions: Vec<ParsedTransaction>,
    pub errors: Vec<ParseError>,
    pub summary: Summary,
}

impl ParseResult {
    pub fn row_errors(&self) -> impl Iterator<Item = &RowError> {
        self.errors.iter().filter_map(|e| match e {
            ParseError::Row(r) => Some(r),
            _ => None,
        })
    }
}
