//! extrato: bank-statement ingestion and normalization engine.
//!
//! Given the raw rows of an exported statement (CSV, PDF text, spreadsheet
//! dump) from an unknown bank, the engine detects which layout produced it,
//! parses the locale-specific rows into canonical transactions, classifies
//! income vs. expense, reports per-row malformation without aborting the
//! file, and fingerprints every transaction for duplicate detection across
//! repeated imports. It is a pure in-process transformation: no database, no
//! network, no global state. Upload transport, extraction of rows from
//! bytes, and persistence all belong to the caller.

pub mod detect;
pub mod engine;
pub mod error;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod profile;
pub mod row;
pub mod summary;

pub use engine::{parse_statement, parse_statement_with, parse_with_profile};
pub use error::{ExtratoError, Result};
pub use models::{
    ParseError, ParseResult, ParsedTransaction, RawRow, RowError, RowErrorKind, Summary, TxnKind,
    UNKNOWN_BANK,
};
pub use normalize::{DedupIndex, InMemoryDedupIndex};
pub use profile::{BankProfile, ColumnMap, DateFormat, Matcher, ProfileRegistry, GENERIC_BANK};
