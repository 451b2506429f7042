use chrono::NaiveDate;

use crate::models::{RawRow, RowError, RowErrorKind, TxnKind};
use crate::profile::{BankProfile, DateFormat};

/// Row-parser output before normalization assigns the fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionalTxn {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub kind: TxnKind,
    pub balance_after: Option<f64>,
    pub source_row_index: usize,
}

pub fn parse_date(raw: &str, format: DateFormat) -> Option<NaiveDate> {
    let raw = raw.trim();
    let sep = if raw.contains('/') { '/' } else { '-' };
    let parts: Vec<&str> = raw.split(sep).collect();
    if parts.len() != 3 {
        return None;
    }
    let (y, m, d) = match format {
        DateFormat::Dmy => (parts[2], parts[1], parts[0]),
        DateFormat::Mdy => (parts[2], parts[0], parts[1]),
        DateFormat::Iso => (parts[0], parts[1], parts[2]),
    };
    let year: i32 = y.parse().ok()?;
    let month: u32 = m.parse().ok()?;
    let day: u32 = d.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Shape check only — "32/01/2025" is date-shaped but not a valid date.
/// Used to find where header furniture ends and data begins.
pub(crate) fn date_shaped(raw: &str, format: DateFormat) -> bool {
    let raw = raw.trim();
    let sep = if raw.contains('/') { '/' } else { '-' };
    let parts: Vec<&str> = raw.split(sep).collect();
    if parts.len() != 3 {
        return false;
    }
    if !parts
        .iter()
        .all(|p| !p.is_empty() && p.len() <= 4 && p.chars().all(|c| c.is_ascii_digit()))
    {
        return false;
    }
    match format {
        DateFormat::Iso => parts[0].len() == 4,
        DateFormat::Dmy | DateFormat::Mdy => parts[0].len() <= 2 && parts[2].len() >= 2,
    }
}

/// Signed decimal honoring the profile's separator. Strips currency noise
/// (`R$`, `$`, spaces, thousands separators) and accepts parenthesized
/// negatives the way card exports write them.
pub fn parse_amount(raw: &str, decimal_separator: char) -> Option<f64> {
    let mut s = raw.trim().replace("R$", "").replace('$', "");
    s.retain(|c| !c.is_whitespace() && c != '\u{a0}');
    if s.is_empty() {
        return None;
    }
    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        negative = true;
        s = inner.to_string();
    }
    let s = match decimal_separator {
        ',' => s.replace('.', "").replace(',', "."),
        _ => s.replace(',', ""),
    };
    // f64::parse accepts "nan"/"inf"; those are never money.
    let value: f64 = s.parse().ok().filter(|v: &f64| v.is_finite())?;
    Some(if negative { -value } else { value })
}

fn cell<'a>(cells: &[&'a str], index: usize) -> &'a str {
    cells.get(index).copied().unwrap_or("")
}

fn row_error(row: &RawRow, reason: RowErrorKind, detail: String) -> RowError {
    RowError {
        row_index: row.index,
        reason,
        detail,
    }
}

/// Turn one post-header row into exactly one of: a provisional transaction,
/// a row error, or `None` for blank end-of-data padding.
pub fn parse_row(
    row: &RawRow,
    profile: &BankProfile,
) -> Option<Result<ProvisionalTxn, RowError>> {
    let cells = row.cells(profile.delimiter);
    if cells.iter().all(|c| c.trim().is_empty()) {
        return None;
    }
    let columns = &profile.columns;

    let date_raw = cell(&cells, columns.date).trim();
    if date_raw.is_empty() {
        return Some(Err(row_error(
            row,
            RowErrorKind::MissingRequiredField,
            format!("empty date cell (column {})", columns.date),
        )));
    }
    let date = match parse_date(date_raw, profile.date_format) {
        Some(d) => d,
        None => {
            return Some(Err(row_error(
                row,
                RowErrorKind::BadDate,
                format!("got '{date_raw}'"),
            )))
        }
    };

    let (amount, kind) = if let Some(amount_col) = columns.amount {
        let amount_raw = cell(&cells, amount_col).trim();
        if amount_raw.is_empty() {
            return Some(Err(row_error(
                row,
                RowErrorKind::MissingRequiredField,
                format!("empty amount cell (column {amount_col})"),
            )));
        }
        match parse_amount(amount_raw, profile.decimal_separator) {
            Some(v) if v < 0.0 => (-v, TxnKind::Expense),
            Some(v) => (v, TxnKind::Income),
            None => {
                return Some(Err(row_error(
                    row,
                    RowErrorKind::BadAmount,
                    format!("got '{amount_raw}'"),
                )))
            }
        }
    } else {
        // Registry validation guarantees the pair is present here.
        let debit_raw = cell(&cells, columns.debit.unwrap_or(usize::MAX)).trim();
        let credit_raw = cell(&cells, columns.credit.unwrap_or(usize::MAX)).trim();
        let (raw, kind) = match (debit_raw.is_empty(), credit_raw.is_empty()) {
            (false, true) => (debit_raw, TxnKind::Expense),
            (true, false) => (credit_raw, TxnKind::Income),
            (false, false) => {
                return Some(Err(row_error(
                    row,
                    RowErrorKind::AmbiguousDebitCredit,
                    format!("both debit '{debit_raw}' and credit '{credit_raw}' populated"),
                )))
            }
            (true, true) => {
                return Some(Err(row_error(
                    row,
                    RowErrorKind::AmbiguousDebitCredit,
                    "neither debit nor credit populated".into(),
                )))
            }
        };
        match parse_amount(raw, profile.decimal_separator) {
            Some(v) => (v.abs(), kind),
            None => {
                return Some(Err(row_error(
                    row,
                    RowErrorKind::BadAmount,
                    format!("got '{raw}'"),
                )))
            }
        }
    };

    // Balance is informational; an unparsable cell never fails the row.
    let balance_after = columns
        .balance
        .and_then(|i| parse_amount(cell(&cells, i), profile.decimal_separator));

    Some(Ok(ProvisionalTxn {
        date,
        description: cell(&cells, columns.description).to_string(),
        amount,
        kind,
        balance_after,
        source_row_index: row.index,
    }))
}
