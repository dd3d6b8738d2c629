//! `glpost status` - refresh the Status column from the accounting API.

use std::path::PathBuf;
use std::time::Duration;

use glpost_journal::feedback::ERROR_MARKER;
use glpost_journal::{JournalConfig, RowTable};
use tracing::info;

use crate::settings::Settings;
use crate::submit::ApiClient;
use crate::writeback::{apply_statuses, default_output_path, write_output};
use crate::CliError;

pub fn cmd_status(settings: &Settings, input: PathBuf, out: Option<PathBuf>) -> Result<(), CliError> {
    let config = &settings.journal;
    let (csv_data, table) = crate::read_table(&input, config)?;

    let numbers = document_numbers(&table, config);
    if numbers.is_empty() {
        println!("No document numbers to check.");
        return Ok(());
    }

    let credentials = settings.credentials()?;
    let timeout = Duration::from_secs(settings.timeout_secs);
    let client = ApiClient::new(&settings.server_base_address, credentials, timeout)?;
    let statuses = client.journal_statuses(&numbers)?;
    info!("{} of {} documents found", statuses.len(), numbers.len());

    let (updated_csv, updated) = apply_statuses(&csv_data, config, &statuses)?;
    let out_path = out.unwrap_or_else(|| default_output_path(&input));
    write_output(&out_path, &updated_csv)?;

    println!(
        "Status updated for {} rows ({} documents). Written to {}",
        updated,
        statuses.len(),
        out_path.display()
    );
    Ok(())
}

/// Distinct non-empty document numbers in sheet order, without the error marker.
fn document_numbers(table: &RowTable, config: &JournalConfig) -> Vec<String> {
    let mut numbers: Vec<String> = Vec::new();
    for row in &table.rows {
        let number = row.get(&config.feedback.document).as_text();
        let number = number.trim();
        if number.is_empty() || number == ERROR_MARKER {
            continue;
        }
        if !numbers.iter().any(|n| n == number) {
            numbers.push(number.to_string());
        }
    }
    numbers
}

#[cfg(test)]
mod tests {
    use super::*;
    use glpost_journal::{CellValue, Row};

    #[test]
    fn document_numbers_distinct_in_order() {
        let config = JournalConfig::default();
        let docs = ["JE2", "JE2", "", "ERROR", "JE1", "JE2"];
        let rows = docs
            .iter()
            .enumerate()
            .map(|(i, d)| Row::new(i).with("Document", CellValue::parse(d)))
            .collect();
        let table = RowTable::new(vec!["Document".into()], rows);

        assert_eq!(document_numbers(&table, &config), vec!["JE2", "JE1"]);
    }

    #[test]
    fn numeric_document_numbers_keep_leading_zeros() {
        let config = JournalConfig::default();
        let rows = vec![Row::new(0).with("Document", CellValue::parse("000123"))];
        let table = RowTable::new(vec!["Document".into()], rows);

        assert_eq!(document_numbers(&table, &config), vec!["000123"]);
    }
}
