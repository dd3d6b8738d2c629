use log::{info, warn};

use crate::config::JournalConfig;
use crate::error::JournalError;
use crate::model::{CellValue, Row, RowTable};

/// Every record of the CSV text in sheet order. Blank lines, which the CSV
/// reader skips, come back as empty records so that record `i` is always
/// sheet row `i + 1`.
pub fn read_records(csv_data: &str) -> Result<Vec<Vec<String>>, JournalError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let mut records: Vec<Vec<String>> = Vec::new();
    // Last physical line consumed so far (1-based).
    let mut last_line: u64 = 0;
    for record in reader.records() {
        let record = record.map_err(|e| JournalError::Io(e.to_string()))?;
        let start_line = record.position().map_or(last_line + 1, |p| p.line());
        for _ in last_line + 1..start_line {
            records.push(Vec::new());
        }
        let fields: Vec<String> = record.iter().map(str::to_string).collect();
        // Quoted fields may span lines.
        let inner_breaks = fields.iter().map(|f| f.matches('\n').count() as u64).sum::<u64>();
        last_line = start_line + inner_breaks;
        records.push(fields);
    }
    Ok(records)
}

/// Load CSV text into a `RowTable` over the configured schema.
///
/// Rows above `header_row` (titles, notes) are skipped. Every schema column
/// must appear in the header row; extra columns are ignored. Blank lines
/// inside the data are kept as empty rows so the structural checks can
/// report them. The table runs from the first to the last row with a filled
/// key cell: rows outside that span (notes, totals, padding) are dropped,
/// and every row keeps the origin of its sheet position.
pub fn load_csv_table(csv_data: &str, config: &JournalConfig) -> Result<RowTable, JournalError> {
    let mut records = read_records(csv_data)?.into_iter();

    for _ in 1..config.header_row {
        if records.next().is_none() {
            return Err(JournalError::Io("input ends before the header row".into()));
        }
    }

    let headers: Vec<String> = match records.next() {
        Some(record) => record.iter().map(|h| h.trim().to_string()).collect(),
        None => return Err(JournalError::Io("input has no header row".into())),
    };

    let mut positions = Vec::with_capacity(config.columns.len());
    for column in &config.columns {
        let idx = headers.iter().position(|h| h == column).ok_or_else(|| {
            JournalError::MissingColumn { column: column.clone() }
        })?;
        positions.push((column.as_str(), idx));
    }

    let mut rows = Vec::new();
    for (origin, record) in records.enumerate() {
        let mut row = Row::new(origin);
        for &(column, idx) in &positions {
            let raw = record.get(idx).map_or("", String::as_str);
            row.set(column, CellValue::parse(raw));
        }
        rows.push(row);
    }

    let keyed = |row: &Row| !row.get(&config.key_column).is_empty();
    let first = rows.iter().position(keyed).unwrap_or(rows.len());
    let last = rows.iter().rposition(keyed).map_or(first, |i| i + 1);
    let outside = rows[..first]
        .iter()
        .chain(&rows[last..])
        .filter(|row| !row.cells.values().all(CellValue::is_empty))
        .count();
    if outside > 0 {
        warn!(
            "ignoring {} rows outside the data area: no '{}' value",
            outside, config.key_column
        );
    }
    rows.truncate(last);
    rows.drain(..first);

    info!("loaded {} data rows ({} columns)", rows.len(), config.columns.len());
    Ok(RowTable::new(config.columns.clone(), rows))
}
