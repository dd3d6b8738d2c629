//! Write submission feedback back into a copy of the input sheet.
//!
//! The input CSV is re-read as raw records, so every cell outside the
//! feedback columns keeps its text; only quoting may be normalized. Title
//! rows above the header row and trailing blank rows are kept.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glpost_journal::config::FeedbackColumns;
use glpost_journal::load::read_records;
use glpost_journal::{FeedbackRow, JournalConfig};

use crate::CliError;

/// Raw sheet records plus the positions of the feedback columns.
struct Sheet {
    records: Vec<Vec<String>>,
    header_index: usize,
    document: usize,
    status: usize,
    warning: usize,
}

impl Sheet {
    fn parse(csv_data: &str, config: &JournalConfig) -> Result<Self, CliError> {
        let records = read_records(csv_data)
            .map_err(|e| CliError::input(format!("CSV read error: {}", e)))?;

        let header_index = config.header_row - 1;
        let header = records
            .get(header_index)
            .ok_or_else(|| CliError::input("input has no header row"))?;
        let find = |name: &str| {
            header.iter().position(|h| h.trim() == name).ok_or_else(|| {
                CliError::input(format!("missing column '{}' in table header", name))
            })
        };
        let FeedbackColumns { document, status, warning } = &config.feedback;
        let (document, status, warning) = (find(document)?, find(status)?, find(warning)?);

        Ok(Self { records, header_index, document, status, warning })
    }

    /// Record holding the data row with this origin, padded so the feedback
    /// columns exist.
    fn data_record(&mut self, origin: usize) -> Option<&mut Vec<String>> {
        let width = self.document.max(self.status).max(self.warning) + 1;
        let record = self.records.get_mut(self.header_index + 1 + origin)?;
        if record.len() < width {
            record.resize(width, String::new());
        }
        Some(record)
    }

    fn data_len(&self) -> usize {
        self.records.len().saturating_sub(self.header_index + 1)
    }

    fn to_csv(&self) -> Result<String, CliError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        // Blank sheet lines are written back as a row of empty cells.
        let blank = vec![String::new(); self.records[self.header_index].len().max(1)];
        for record in &self.records {
            let record = if record.is_empty() { &blank } else { record };
            writer
                .write_record(record)
                .map_err(|e| CliError::io(format!("CSV write error: {}", e)))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| CliError::io(format!("CSV flush error: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| CliError::io(format!("CSV encoding error: {}", e)))
    }
}

/// Clear the feedback area, then paint one feedback row per data row.
pub fn apply_feedback(
    csv_data: &str,
    config: &JournalConfig,
    feedback: &[FeedbackRow],
) -> Result<String, CliError> {
    let mut sheet = Sheet::parse(csv_data, config)?;
    let (document, status, warning) = (sheet.document, sheet.status, sheet.warning);
    let empty = FeedbackRow::default();

    for origin in 0..sheet.data_len() {
        let values = feedback.get(origin).unwrap_or(&empty);
        if let Some(record) = sheet.data_record(origin) {
            record[document] = values.document.clone();
            record[status] = values.status.clone();
            record[warning] = values.warning.clone();
        }
    }
    sheet.to_csv()
}

/// Rewrite the status cell of every data row whose document number has a
/// fresh status. Returns the new CSV and the number of rows updated.
pub fn apply_statuses(
    csv_data: &str,
    config: &JournalConfig,
    statuses: &HashMap<String, String>,
) -> Result<(String, usize), CliError> {
    let mut sheet = Sheet::parse(csv_data, config)?;
    let (document, status) = (sheet.document, sheet.status);
    let mut updated = 0;

    for origin in 0..sheet.data_len() {
        if let Some(record) = sheet.data_record(origin) {
            if let Some(fresh) = statuses.get(record[document].trim()) {
                record[status] = fresh.clone();
                updated += 1;
            }
        }
    }
    Ok((sheet.to_csv()?, updated))
}

/// `<dir>/<stem>.posted.csv` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "journal".to_string());
    input.with_file_name(format!("{}.posted.csv", stem))
}

pub fn write_output(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents)
        .map_err(|e| CliError::io(format!("cannot write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;

    fn small_config() -> JournalConfig {
        let mut config = JournalConfig::default();
        config.header_row = 2;
        config
    }

    const SHEET: &str = "\
Upload,,,,
Group By,Document,Status,Warning,Nominal Code
G1,OLD,Stale,old warning,4000
,,,,2100
G2,,,,5000
";

    #[test]
    fn test_feedback_clears_then_paints() {
        let feedback = vec![
            FeedbackRow { document: "JE1".into(), status: "Draft".into(), warning: String::new() },
            FeedbackRow { document: "JE1".into(), status: "Draft".into(), warning: String::new() },
            FeedbackRow {
                document: "ERROR".into(),
                status: "FAILURE".into(),
                warning: "Invalid account, 5000".into(),
            },
        ];
        let out = apply_feedback(SHEET, &small_config(), &feedback).unwrap();
        assert_eq!(
            out,
            "\
Upload,,,,
Group By,Document,Status,Warning,Nominal Code
G1,JE1,Draft,,4000
,JE1,Draft,,2100
G2,ERROR,FAILURE,\"Invalid account, 5000\",5000
"
        );
    }

    #[test]
    fn test_rows_without_feedback_are_blanked() {
        let out = apply_feedback(SHEET, &small_config(), &[]).unwrap();
        assert!(out.contains("G1,,,,4000"));
        assert!(!out.contains("Stale"));
    }

    #[test]
    fn test_statuses_update_matching_rows() {
        let statuses = HashMap::from([("OLD".to_string(), "Posted".to_string())]);
        let (out, updated) = apply_statuses(SHEET, &small_config(), &statuses).unwrap();
        assert_eq!(updated, 1);
        assert!(out.contains("G1,OLD,Posted,old warning,4000"));
    }

    #[test]
    fn test_short_records_are_padded() {
        let sheet = "Group By,Document,Status,Warning\nG1\n";
        let feedback = vec![FeedbackRow {
            document: "JE9".into(),
            status: "Draft".into(),
            warning: String::new(),
        }];
        let out = apply_feedback(sheet, &JournalConfig::default(), &feedback).unwrap();
        assert_eq!(out, "Group By,Document,Status,Warning\nG1,JE9,Draft,\n");
    }

    #[test]
    fn test_blank_line_keeps_row_mapping() {
        let sheet = "Group By,Document,Status,Warning\nG1,,,\n\nG2,,,\n";
        let feedback = vec![
            FeedbackRow { document: "JE1".into(), status: "Draft".into(), warning: String::new() },
            FeedbackRow::default(),
            FeedbackRow { document: "JE2".into(), status: "Draft".into(), warning: String::new() },
        ];
        let out = apply_feedback(sheet, &JournalConfig::default(), &feedback).unwrap();
        assert_eq!(out, "Group By,Document,Status,Warning\nG1,JE1,Draft,\n,,,\nG2,JE2,Draft,\n");
    }

    #[test]
    fn test_numeric_document_matches_as_typed() {
        let sheet = "Group By,Document,Status,Warning\nG1,000123,Draft,\n";
        let statuses = HashMap::from([("000123".to_string(), "Posted".to_string())]);
        let (out, updated) =
            apply_statuses(sheet, &JournalConfig::default(), &statuses).unwrap();
        assert_eq!(updated, 1);
        assert!(out.contains("G1,000123,Posted,"));
    }

    #[test]
    fn test_missing_feedback_column() {
        let err = apply_feedback("Group By,Document\nG1,\n", &JournalConfig::default(), &[])
            .unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_INPUT);
        assert!(err.message.contains("'Status'"));
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/data/jan.csv")),
            PathBuf::from("/data/jan.posted.csv")
        );
    }
}
