use log::warn;
use serde_json::{Map, Value};

use crate::config::JournalConfig;
use crate::model::{CellValue, Group, JournalEntryInput, LineRecord, Row};

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// Project one row into a journal line. `header` is the group's first row.
pub fn project_line(row: &Row, header: &Row, config: &JournalConfig) -> LineRecord {
    let cols = &config.lines;

    let line_description = match row.get(&cols.description) {
        cell if !cell.is_empty() => cell.as_text(),
        _ => header.get(&config.description_column).as_text(),
    };

    let mut line = LineRecord {
        account: account_code(row.get(&config.key_column)),
        line_description,
        quantity: None,
        debit: None,
        credit: None,
        business_partner: optional_text(row, &cols.business_partner, true),
        free_reference: optional_text(row, &cols.free_reference, false),
        tax_code: optional_text(row, &cols.tax_code, true),
        dimensions: None,
    };

    match nonzero_amount(row, &cols.quantity) {
        Some(quantity) => line.quantity = Some(quantity),
        None => {
            line.debit = nonzero_amount(row, &cols.debit).map(round2);
            line.credit = nonzero_amount(row, &cols.credit).map(round2);
        }
    }

    let mut dimensions = Map::new();
    for dim in &config.dimensions {
        let cell = row.get(&dim.column);
        if !cell.is_empty() {
            dimensions.insert(dim.key.clone(), Value::String(cell.as_text()));
        }
    }
    if !dimensions.is_empty() {
        line.dimensions = Some(dimensions);
    }

    line
}

/// Numeric account codes are sent as integer text (`4000.0` → `4000`).
fn account_code(cell: &CellValue) -> String {
    match cell.as_number() {
        Some(n) => format!("{}", n.trunc() as i64),
        None => cell.as_text().trim().to_string(),
    }
}

fn optional_text(row: &Row, column: &str, upper: bool) -> Option<String> {
    let cell = row.get(column);
    if cell.is_empty() {
        return None;
    }
    let text = cell.as_text().trim().to_string();
    Some(if upper { text.to_uppercase() } else { text })
}

/// A present, non-zero number. Non-numeric text is logged and skipped.
fn nonzero_amount(row: &Row, column: &str) -> Option<f64> {
    let cell = row.get(column);
    if cell.is_empty() {
        return None;
    }
    match cell.as_number() {
        Some(n) if n != 0.0 => Some(n),
        Some(_) => None,
        None => {
            warn!(
                "row origin {}: '{}' value '{}' is not a number, skipped",
                row.origin, column, cell
            );
            None
        }
    }
}

/// Two decimals, ties to even (`0.125` → `0.12`).
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// Build the create-entry input for a group: header fields from its first
/// row, one line per row in table order.
pub fn build_entry_input(group: &Group, config: &JournalConfig) -> JournalEntryInput {
    let header = group.header();
    let cols = &config.header;
    let upper = |column: &str| header.get(column).as_text().to_uppercase();

    let reference = match header.get(&cols.reference) {
        cell if cell.is_empty() => None,
        cell => Some(cell.as_text()),
    };

    JournalEntryInput {
        site: upper(cols.site.as_str()),
        document_type: upper(cols.document_type.as_str()),
        accounting_date: header.get(&cols.accounting_date).as_text(),
        description_by_default: header.get(&config.description_column).as_text(),
        source_currency: upper(cols.currency.as_str()),
        reference,
        lines: group.rows.iter().map(|row| project_line(row, header, config)).collect(),
    }
}
