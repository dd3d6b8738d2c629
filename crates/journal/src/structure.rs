//! Structural checks on the raw table. These run before any normalization
//! or grouping decision is made.

use crate::error::JournalError;
use crate::model::RowTable;

pub fn check_row_limit(table: &RowTable, max_lines: usize) -> Result<(), JournalError> {
    if table.len() > max_lines {
        return Err(JournalError::RowLimitExceeded { total: table.len(), max: max_lines });
    }
    Ok(())
}

/// Between the first and last rows with a filled key cell, no key cell may
/// be blank. `row` in the error is the 1-based physical row.
pub fn check_contiguity(
    table: &RowTable,
    key_column: &str,
    first_data_row: usize,
) -> Result<(), JournalError> {
    let filled = |i: &usize| !table.rows[*i].get(key_column).is_empty();

    let Some(first) = (0..table.len()).find(filled) else {
        return Ok(());
    };
    let last = (0..table.len()).rev().find(filled).unwrap_or(first);

    for row in &table.rows[first..=last] {
        if row.get(key_column).is_empty() {
            return Err(JournalError::ContiguityViolation {
                column: key_column.to_string(),
                row: row.origin + first_data_row,
            });
        }
    }
    Ok(())
}

/// Origins must be strictly increasing: rows arrive in sheet order.
pub fn check_row_order(table: &RowTable) -> Result<(), JournalError> {
    for (position, pair) in table.rows.windows(2).enumerate() {
        if pair[1].origin <= pair[0].origin {
            return Err(JournalError::RowOrder {
                position: position + 1,
                origin: pair[1].origin,
                previous: pair[0].origin,
            });
        }
    }
    Ok(())
}
