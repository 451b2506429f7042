use crate::error::Result;
use crate::models::RawRow;

/// Line-per-row extraction for plain text (PDF text dumps, TXT exports).
/// Each row keeps the whole line as its single field; the row parser
/// re-splits it with the detected profile's delimiter.
pub fn rows_from_text(text: &str) -> Vec<RawRow> {
    text.lines()
        .enumerate()
        .map(|(i, line)| RawRow::from_line(i, line))
        .collect()
}

/// Quote-aware CSV extraction. Unlike `rows_from_text` this honors quoted
/// cells containing the delimiter, so pre-split fields reach the row parser
/// intact.
pub fn rows_from_csv(text: &str, delimiter: char) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let fields: Vec<String> = record.iter().map(|f| f.to_string()).collect();
        let source_text = fields.join(&delimiter.to_string());
        rows.push(RawRow::from_fields(index, fields, source_text));
    }
    Ok(rows)
}
