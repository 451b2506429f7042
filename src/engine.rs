use tracing::{debug, warn};

use crate::detect::{detect_profile, DEFAULT_HEADER_ROWS};
use crate::models::{ParseError, ParseResult, RawRow, Summary, UNKNOWN_BANK};
use crate::normalize::{finalize, DedupIndex};
use crate::profile::{BankProfile, ProfileRegistry};
use crate::row::{date_shaped, parse_row};
use crate::summary::summarize;

/// Parse one exported statement: Detecting → RowProcessing → Summarizing →
/// Done.
///
/// Detecting runs the format detector over the header region (first
/// `DEFAULT_HEADER_ROWS` rows) plus the filename; an unrecognized format
/// short-circuits to Done with a fatal `UnrecognizedFormat`. RowProcessing
/// feeds every data row through the row parser and routes each outcome to
/// the transaction list or the error list without ever stopping on a bad
/// row. Summarizing folds the surviving transactions, and Done assembles the
/// immutable `ParseResult`.
///
/// Malformed input never returns an `Err` or panics — fatal conditions come
/// back as `success = false` with the reason in `errors`. Callers running
/// concurrent imports for the same account must serialize them; the dedup
/// handle is not locked here.
pub fn parse_statement(
    account_id: &str,
    filename: &str,
    rows: &[RawRow],
    registry: &ProfileRegistry,
    dedup: Option<&mut dyn DedupIndex>,
) -> ParseResult {
    parse_statement_with(account_id, filename, rows, registry, dedup, DEFAULT_HEADER_ROWS)
}

/// Same as [`parse_statement`] with an explicit header-region size.
pub fn parse_statement_with(
    account_id: &str,
    filename: &str,
    rows: &[RawRow],
    registry: &ProfileRegistry,
    dedup: Option<&mut dyn DedupIndex>,
    header_rows: usize,
) -> ParseResult {
    let header = &rows[..rows.len().min(header_rows)];
    match detect_profile(registry, header, filename) {
        Some(profile) => {
            debug!(bank = %profile.id, file = filename, "format detected");
            process_rows(account_id, rows, &profile, dedup)
        }
        None => {
            debug!(file = filename, "unrecognized statement format");
            ParseResult {
                success: false,
                bank_detected: UNKNOWN_BANK.to_string(),
                transactions: Vec::new(),
                errors: vec![ParseError::UnrecognizedFormat {
                    detail: format!(
                        "no bank profile matched '{filename}' and no date/amount columns found"
                    ),
                }],
                summary: Summary::default(),
            }
        }
    }
}

/// Skip detection entirely and parse with a known profile (CLI `--bank`
/// override, or callers that store the layout per account).
pub fn parse_with_profile(
    account_id: &str,
    rows: &[RawRow],
    profile: &BankProfile,
    dedup: Option<&mut dyn DedupIndex>,
) -> ParseResult {
    process_rows(account_id, rows, profile, dedup)
}

/// First row whose date cell is date-shaped for this profile. Everything
/// above it is header furniture and is skipped without being counted as an
/// error.
fn data_start(rows: &[RawRow], profile: &BankProfile) -> Option<usize> {
    rows.iter().position(|row| {
        let cells = row.cells(profile.delimiter);
        cells
            .get(profile.columns.date)
            .map_or(false, |c| date_shaped(c, profile.date_format))
    })
}

fn process_rows(
    account_id: &str,
    rows: &[RawRow],
    profile: &BankProfile,
    mut dedup: Option<&mut dyn DedupIndex>,
) -> ParseResult {
    let mut transactions = Vec::new();
    let mut errors = Vec::new();
    let mut data_rows = 0usize;

    if let Some(start) = data_start(rows, profile) {
        for row in &rows[start..] {
            match parse_row(row, profile) {
                // Blank end-of-data padding.
                None => {}
                Some(Ok(provisional)) => {
                    data_rows += 1;
                    transactions.push(finalize(account_id, provisional, dedup.as_deref_mut()));
                }
                Some(Err(row_error)) => {
                    data_rows += 1;
                    warn!(
                        row = row_error.row_index,
                        reason = row_error.reason.as_str(),
                        detail = %row_error.detail,
                        "row dropped"
                    );
                    errors.push(ParseError::Row(row_error));
                }
            }
        }
    }

    let summary = summarize(&transactions);
    let success = data_rows == 0 || !transactions.is_empty();
    if !success {
        errors.push(ParseError::EmptyFile {
            attempted: data_rows,
            parsed: 0,
        });
    }

    ParseResult {
        success,
        bank_detected: profile.id.clone(),
        transactions,
        errors,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RowErrorKind, TxnKind};
    use crate::normalize::InMemoryDedupIndex;
    use chrono::NaiveDate;

    fn rows(lines: &[&str]) -> Vec<RawRow> {
        lines
            .iter()
            .enumerate()
            .map(|(i, l)| RawRow::from_line(i, l))
            .collect()
    }

    fn parse(lines: &[&str], filename: &str) -> ParseResult {
        parse_statement(
            "acct-1",
            filename,
            &rows(lines),
            &ProfileRegistry::builtin(),
            None,
        )
    }

    const BRADESCO_HEADER: &str = "Data;Histórico;Débito;Crédito;Saldo";

    #[test]
    fn test_debit_row_scenario() {
        let result = parse(
            &[
                BRADESCO_HEADER,
                "13/01/2025;DEVOLUCAO PIX JOAO AMEIXAS;1074,99;;314,99",
            ],
            "extrato.csv",
        );
        assert!(result.success);
        assert_eq!(result.bank_detected, "BRADESCO");
        assert_eq!(result.transactions.len(), 1);
        let txn = &result.transactions[0];
        assert_eq!(txn.date, NaiveDate::from_ymd_opt(2025, 1, 13).unwrap());
        assert_eq!(txn.kind, TxnKind::Expense);
        assert_eq!(txn.amount, 1074.99);
        assert_eq!(txn.balance_after, Some(314.99));
    }

    #[test]
    fn test_second_debit_row_scenario() {
        let result = parse(
            &[
                BRADESCO_HEADER,
                "08/02/2025;TRANSFERENCIA PIX ROGERIO;20,00;;294,99",
            ],
            "extrato.csv",
        );
        let txn = &result.transactions[0];
        assert_eq!(txn.date, NaiveDate::from_ymd_opt(2025, 2, 8).unwrap());
        assert_eq!(txn.kind, TxnKind::Expense);
        assert_eq!(txn.amount, 20.0);
    }

    #[test]
    fn test_ambiguous_row_does_not_stop_the_file() {
        let result = parse(
            &[
                BRADESCO_HEADER,
                "13/01/2025;OK UM;10,00;;100,00",
                "14/01/2025;ESTORNO;5,00;5,00;100,00",
                "15/01/2025;OK DOIS;;30,00;130,00",
            ],
            "extrato.csv",
        );
        assert!(result.success);
        assert_eq!(result.transactions.len(), 2);
        assert_eq!(result.row_errors().count(), 1);
        let err = result.row_errors().next().unwrap();
        assert_eq!(err.reason, RowErrorKind::AmbiguousDebitCredit);
        assert_eq!(err.row_index, 2);
        // Rows after the bad one still parsed, order preserved.
        assert_eq!(result.transactions[1].description, "OK DOIS");
        assert!(result.transactions[0].source_row_index < result.transactions[1].source_row_index);
    }

    #[test]
    fn test_unrecognized_format_is_fatal_but_returned() {
        let result = parse(
            &["Relatório de vendas", "produto quantidade total"],
            "vendas.txt",
        );
        assert!(!result.success);
        assert_eq!(result.bank_detected, "UNKNOWN");
        assert!(result.transactions.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(
            result.errors[0],
            ParseError::UnrecognizedFormat { .. }
        ));
    }

    #[test]
    fn test_header_only_file_is_valid_and_empty() {
        let result = parse(&[BRADESCO_HEADER], "extrato.csv");
        assert!(result.success);
        assert!(result.transactions.is_empty());
        assert!(result.errors.is_empty());
        assert_eq!(result.summary, Summary::default());
    }

    #[test]
    fn test_all_rows_failing_is_empty_file_error() {
        let result = parse(
            &[
                BRADESCO_HEADER,
                "13/01/2025;SO DEBITO ZOADO;abc;;100,00",
                "14/01/2025;DOIS LADOS;1,00;1,00;100,00",
            ],
            "extrato.csv",
        );
        assert!(!result.success);
        assert!(result.transactions.is_empty());
        // Row diagnostics stay visible next to the fatal error.
        assert_eq!(result.row_errors().count(), 2);
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, ParseError::EmptyFile { attempted: 2, parsed: 0 })));
    }

    #[test]
    fn test_trailing_blank_rows_are_padding() {
        let result = parse(
            &[BRADESCO_HEADER, "13/01/2025;PIX;10,00;;90,00", ";;;;", ""],
            "extrato.csv",
        );
        assert!(result.success);
        assert_eq!(result.transactions.len(), 1);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_summary_invariants() {
        let result = parse(
            &[
                BRADESCO_HEADER,
                "13/01/2025;GASTO;100,50;;0,00",
                "14/01/2025;RENDA;;250,00;249,50",
                "15/01/2025;GASTO DOIS;49,50;;200,00",
            ],
            "extrato.csv",
        );
        let s = result.summary;
        assert_eq!(s.count, 3);
        assert_eq!(s.balance, s.income - s.expense);
        let income: f64 = result
            .transactions
            .iter()
            .filter(|t| t.kind == TxnKind::Income)
            .map(|t| t.amount)
            .sum();
        let expense: f64 = result
            .transactions
            .iter()
            .filter(|t| t.kind == TxnKind::Expense)
            .map(|t| t.amount)
            .sum();
        assert_eq!(s.income, income);
        assert_eq!(s.expense, expense);
    }

    #[test]
    fn test_repeat_import_flags_duplicates() {
        let lines = [BRADESCO_HEADER, "13/01/2025;PIX JOAO;10,00;;90,00"];
        let registry = ProfileRegistry::builtin();
        let mut index = InMemoryDedupIndex::new();

        let first = parse_statement(
            "acct-1",
            "extrato.csv",
            &rows(&lines),
            &registry,
            Some(&mut index),
        );
        assert_eq!(first.transactions[0].duplicate_of_existing, Some(false));

        let second = parse_statement(
            "acct-1",
            "extrato.csv",
            &rows(&lines),
            &registry,
            Some(&mut index),
        );
        // Flagged, never dropped.
        assert_eq!(second.transactions.len(), 1);
        assert_eq!(second.transactions[0].duplicate_of_existing, Some(true));
    }

    #[test]
    fn test_dedup_handle_spans_all_rows_of_one_parse() {
        let lines = [
            BRADESCO_HEADER,
            "13/01/2025;PIX JOAO;10,00;;90,00",
            "14/01/2025;TED MARIA;;50,00;140,00",
            "13/01/2025;PIX JOAO;10,00;;90,00",
        ];
        let mut index = InMemoryDedupIndex::new();
        let result = parse_statement(
            "acct-1",
            "extrato.csv",
            &rows(&lines),
            &ProfileRegistry::builtin(),
            Some(&mut index),
        );
        assert_eq!(result.transactions.len(), 3);
        assert_eq!(result.transactions[0].duplicate_of_existing, Some(false));
        assert_eq!(result.transactions[1].duplicate_of_existing, Some(false));
        // Repeat within the same file is flagged too.
        assert_eq!(result.transactions[2].duplicate_of_existing, Some(true));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let lines = [
            BRADESCO_HEADER,
            "13/01/2025;PIX JOAO;10,00;;90,00",
            "garbage;;;;",
            "15/01/2025;TED;;50,00;140,00",
        ];
        let a = parse(&lines, "extrato.csv");
        let b = parse(&lines, "extrato.csv");
        assert_eq!(a, b);
    }

    #[test]
    fn test_generic_fallback_parses_unregistered_layout() {
        let result = parse(
            &[
                "data,descricao,valor",
                "15/03/2025,PAGAMENTO BOLETO,-80.00",
                "16/03/2025,DEPOSITO,120.00",
            ],
            "banco_desconhecido.csv",
        );
        assert!(result.success);
        assert_eq!(result.bank_detected, "GENERIC");
        assert_eq!(result.transactions.len(), 2);
        assert_eq!(result.transactions[0].kind, TxnKind::Expense);
        assert_eq!(result.transactions[0].amount, 80.0);
        assert_eq!(result.transactions[1].kind, TxnKind::Income);
    }

    #[test]
    fn test_forced_profile_skips_detection() {
        let registry = ProfileRegistry::builtin();
        let profile = registry.get("BRADESCO").unwrap();
        // No marker anywhere, detection alone would go generic/unknown.
        let result = parse_with_profile(
            "acct-1",
            &rows(&["13/01/2025;PIX;10,00;;90,00"]),
            profile,
            None,
        );
        assert!(result.success);
        assert_eq!(result.bank_detected, "BRADESCO");
        assert_eq!(result.transactions.len(), 1);
    }
}
