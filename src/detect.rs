use tracing::debug;

use crate::models::RawRow;
use crate::profile::{BankProfile, ColumnMap, DateFormat, ProfileRegistry, GENERIC_BANK};
use crate::row::{date_shaped, parse_amount};

/// How many leading rows make up the header region the detector looks at.
pub const DEFAULT_HEADER_ROWS: usize = 10;

/// Pick a profile for this file, or `None` for UNKNOWN. Pure function of
/// (header rows, filename, registry) — identical input always picks the same
/// profile. First match in registry order wins, which is why profile authors
/// put specific markers at higher priority than broad ones.
pub fn detect_profile(
    registry: &ProfileRegistry,
    header_rows: &[RawRow],
    filename: &str,
) -> Option<BankProfile> {
    let header_text = header_rows
        .iter()
        .map(|r| r.source_text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();
    let filename_lower = filename.to_lowercase();

    for profile in registry.all_profiles() {
        let hit = profile
            .matchers
            .iter()
            .any(|m| m.matches(&header_text) || m.matches(&filename_lower));
        if hit {
            debug!(bank = %profile.id, "profile matched");
            return Some(profile.clone());
        }
    }

    let fallback = synthesize_generic(header_rows);
    if fallback.is_some() {
        debug!("no profile matched, synthesized generic profile");
    } else {
        debug!("no profile matched and fallback failed");
    }
    fallback
}

/// Delimiter sniff: most frequent of `;`, `,`, tab in the first non-blank
/// row, ties broken in that order.
pub fn sniff_delimiter(header_rows: &[RawRow]) -> Option<char> {
    let line = header_rows
        .iter()
        .find(|r| !r.is_blank())
        .map(|r| r.source_text.as_str())?;
    let mut best: Option<(char, usize)> = None;
    for delimiter in [';', ',', '\t'] {
        let count = line.chars().filter(|&c| c == delimiter).count();
        // Strictly greater keeps the earlier candidate on ties.
        if count > 0 && best.map_or(true, |(_, n)| count > n) {
            best = Some((delimiter, count));
        }
    }
    best.map(|(d, _)| d)
}

/// Last-resort column guessing: find a date-shaped column and an
/// amount-shaped column and build an ad-hoc GENERIC profile from them.
fn synthesize_generic(header_rows: &[RawRow]) -> Option<BankProfile> {
    let delimiter = sniff_delimiter(header_rows)?;

    let mut date_col = None;
    let mut date_format = DateFormat::Dmy;
    let mut amount_col = None;
    let mut decimal_separator = '.';

    for row in header_rows {
        let cells = row.cells(delimiter);
        if cells.len() < 2 {
            continue;
        }
        if date_col.is_none() {
            for (i, cell) in cells.iter().enumerate() {
                if date_shaped(cell, DateFormat::Dmy) {
                    date_col = Some(i);
                    date_format = DateFormat::Dmy;
                    break;
                }
                if date_shaped(cell, DateFormat::Iso) {
                    date_col = Some(i);
                    date_format = DateFormat::Iso;
                    break;
                }
            }
        }
        if let Some(dc) = date_col {
            // Rightmost money-looking column; running balances sit to the
            // right of the amount, so prefer the first hit after the date.
            for (i, cell) in cells.iter().enumerate() {
                if i == dc || cell.trim().is_empty() {
                    continue;
                }
                let comma_decimal = cell.contains(',') && parse_amount(cell, ',').is_some();
                let dot_decimal = parse_amount(cell, '.').is_some();
                if comma_decimal || dot_decimal {
                    amount_col = Some(i);
                    decimal_separator = if comma_decimal { ',' } else { '.' };
                    break;
                }
            }
        }
        if date_col.is_some() && amount_col.is_some() {
            break;
        }
    }

    let (date, amount) = (date_col?, amount_col?);
    // Need a spare column to act as the description.
    let description = (0..=amount.max(date) + 1).find(|&i| i != date && i != amount)?;

    Some(BankProfile {
        id: GENERIC_BANK.into(),
        priority: 0,
        matchers: Vec::new(),
        delimiter,
        date_format,
        decimal_separator,
        columns: ColumnMap {
            date,
            description,
            amount: Some(amount),
            ..ColumnMap::default()
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(lines: &[&str]) -> Vec<RawRow> {
        lines
            .iter()
            .enumerate()
            .map(|(i, l)| RawRow::from_line(i, l))
            .collect()
    }

    #[test]
    fn test_detects_bradesco_from_header_markers() {
        let header = rows(&[
            "Extrato de Conta Corrente",
            "Data;Histórico;Débito;Crédito;Saldo",
        ]);
        let profile = detect_profile(&ProfileRegistry::builtin(), &header, "export.csv").unwrap();
        assert_eq!(profile.id, "BRADESCO");
    }

    #[test]
    fn test_detects_nubank_from_filename() {
        let header = rows(&["date,category,title,amount"]);
        let profile =
            detect_profile(&ProfileRegistry::builtin(), &header, "nubank_2025_02.csv").unwrap();
        assert_eq!(profile.id, "NUBANK");
    }

    #[test]
    fn test_specific_marker_beats_broad_inter_marker() {
        // "inter" appears inside the Santander header noise; the higher
        // priority profile must win.
        let header = rows(&["Santander Internet Banking", "Data;Descrição;Valor;Saldo"]);
        let profile = detect_profile(&ProfileRegistry::builtin(), &header, "extrato.csv").unwrap();
        assert_eq!(profile.id, "SANTANDER");
    }

    #[test]
    fn test_sniff_delimiter_by_frequency() {
        assert_eq!(sniff_delimiter(&rows(&["a;b;c;d"])), Some(';'));
        assert_eq!(sniff_delimiter(&rows(&["a,b,c"])), Some(','));
        assert_eq!(sniff_delimiter(&rows(&["a\tb"])), Some('\t'));
        assert_eq!(sniff_delimiter(&rows(&["a;b,c;d"])), Some(';'));
        assert_eq!(sniff_delimiter(&rows(&["plain text"])), None);
        assert_eq!(sniff_delimiter(&rows(&[])), None);
    }

    #[test]
    fn test_fallback_synthesizes_generic_profile() {
        let header = rows(&[
            "Lançamentos,Conta 1234",
            "15/03/2025,PAGAMENTO BOLETO,-80.00",
        ]);
        let profile = detect_profile(&ProfileRegistry::builtin(), &header, "misc.csv").unwrap();
        assert_eq!(profile.id, GENERIC_BANK);
        assert_eq!(profile.delimiter, ',');
        assert_eq!(profile.columns.date, 0);
        assert_eq!(profile.columns.amount, Some(2));
        assert_eq!(profile.columns.description, 1);
    }

    #[test]
    fn test_fallback_detects_comma_decimals() {
        let header = rows(&["15/03/2025;PAGAMENTO BOLETO;80,00;1.200,00"]);
        let profile = detect_profile(&ProfileRegistry::builtin(), &header, "misc.txt").unwrap();
        assert_eq!(profile.id, GENERIC_BANK);
        assert_eq!(profile.decimal_separator, ',');
        assert_eq!(profile.date_format, DateFormat::Dmy);
    }

    #[test]
    fn test_no_date_or_amount_columns_is_unknown() {
        let header = rows(&["nome;cidade;estado", "joao;recife;pe"]);
        assert!(detect_profile(&ProfileRegistry::builtin(), &header, "clientes.csv").is_none());
    }

    #[test]
    fn test_detection_is_deterministic() {
        let header = rows(&["Data;Histórico;Débito;Crédito;Saldo"]);
        let registry = ProfileRegistry::builtin();
        let a = detect_profile(&registry, &header, "f.csv").map(|p| p.id);
        let b = detect_profile(&registry, &header, "f.csv").map(|p| p.id);
        assert_eq!(a, b);
    }
}
