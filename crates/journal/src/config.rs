use std::collections::HashSet;

use serde::Deserialize;

use crate::error::JournalError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Schema and rule configuration for one sheet layout.
///
/// `Default` reproduces the standard journal upload sheet. Every column
/// referenced by a rule must be part of `columns`; `validate` enforces it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Exact names of the expected columns, in sheet order.
    pub columns: Vec<String>,
    /// Column whose non-empty cells mark a row as data (account code).
    pub key_column: String,
    /// User-supplied group discriminator.
    pub primary_group_column: String,
    /// Header columns that must hold one value per group.
    pub secondary_group_columns: Vec<String>,
    pub uppercase_columns: Vec<String>,
    pub date_columns: Vec<String>,
    /// Reversal flag in the {1 = no, 2 = yes} encoding.
    pub reversal_column: Option<String>,
    pub reversal_default: f64,
    /// Group-level description, read from each group's first row.
    pub description_column: String,
    pub header: HeaderColumns,
    pub lines: LineColumns,
    pub dimensions: Vec<DimensionMapping>,
    pub feedback: FeedbackColumns,
    /// Maximum number of data rows accepted in one run.
    pub max_lines: usize,
    /// 1-based row holding the column headers; data starts on the next row.
    pub header_row: usize,
}

// ---------------------------------------------------------------------------
// Column groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeaderColumns {
    pub site: String,
    pub document_type: String,
    pub accounting_date: String,
    pub currency: String,
    pub reference: String,
}

impl Default for HeaderColumns {
    fn default() -> Self {
        Self {
            site: "Site".into(),
            document_type: "Entry Type".into(),
            accounting_date: "AccountingDate".into(),
            currency: "Curr".into(),
            reference: "Reference".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LineColumns {
    pub description: String,
    pub quantity: String,
    pub debit: String,
    pub credit: String,
    pub business_partner: String,
    pub free_reference: String,
    pub tax_code: String,
}

impl Default for LineColumns {
    fn default() -> Self {
        Self {
            description: "Line Description".into(),
            quantity: "Quantity".into(),
            debit: "Debit".into(),
            credit: "Credit".into(),
            business_partner: "BP".into(),
            free_reference: "Free Reference".into(),
            tax_code: "Tax".into(),
        }
    }
}

/// One analytical dimension: API key on the wire, column in the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DimensionMapping {
    pub key: String,
    pub column: String,
}

impl DimensionMapping {
    fn new(key: &str, column: &str) -> Self {
        Self { key: key.into(), column: column.into() }
    }
}

/// Columns the write-back layer paints with submission results.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedbackColumns {
    pub document: String,
    pub status: String,
    pub warning: String,
}

impl Default for FeedbackColumns {
    fn default() -> Self {
        Self {
            document: "Document".into(),
            status: "Status".into(),
            warning: "Warning".into(),
        }
    }
}

const DEFAULT_COLUMNS: &[&str] = &[
    "Group By",
    "Document",
    "Status",
    "Warning",
    "Site",
    "Entry Type",
    "AccountingDate",
    "VAT date",
    "Reversing Y/N (1=No 2=Yes)",
    "Reversing Date",
    "Header Description",
    "Curr",
    "Reference",
    "Nominal Code",
    "Line Description",
    "Collective",
    "BP",
    "Tax",
    "FIX",
    "BRK",
    "DEP",
    "LOC",
    "TYP",
    "PDT",
    "ANA",
    "Quantity",
    "Debit",
    "Credit",
    "Free Reference",
    "_isLocked",
];

pub const DEFAULT_MAX_LINES: usize = 1000;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            columns: strings(DEFAULT_COLUMNS),
            key_column: "Nominal Code".into(),
            primary_group_column: "Group By".into(),
            secondary_group_columns: strings(&["Site", "Entry Type", "AccountingDate", "Curr"]),
            uppercase_columns: strings(&["Site", "Entry Type", "Curr", "BP", "Tax"]),
            date_columns: strings(&["AccountingDate", "VAT date", "Reversing Date"]),
            reversal_column: Some("Reversing Y/N (1=No 2=Yes)".into()),
            reversal_default: 1.0,
            description_column: "Header Description".into(),
            header: HeaderColumns::default(),
            lines: LineColumns::default(),
            dimensions: vec![
                DimensionMapping::new("fixture", "FIX"),
                DimensionMapping::new("broker", "BRK"),
                DimensionMapping::new("department", "DEP"),
                DimensionMapping::new("location", "LOC"),
                DimensionMapping::new("type", "TYP"),
                DimensionMapping::new("product", "PDT"),
                DimensionMapping::new("analysis", "ANA"),
            ],
            feedback: FeedbackColumns::default(),
            max_lines: DEFAULT_MAX_LINES,
            header_row: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Derived accessors
// ---------------------------------------------------------------------------

impl JournalConfig {
    /// Primary discriminator followed by the secondary header columns.
    pub fn grouping_columns(&self) -> Vec<&str> {
        std::iter::once(self.primary_group_column.as_str())
            .chain(self.secondary_group_columns.iter().map(String::as_str))
            .collect()
    }

    /// 1-based physical row of the first data row.
    pub fn first_data_row(&self) -> usize {
        self.header_row + 1
    }

    /// 1-based physical row of the data row with the given origin index.
    pub fn physical_row(&self, origin: usize) -> usize {
        origin + self.first_data_row()
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl JournalConfig {
    pub fn from_toml(input: &str) -> Result<Self, JournalError> {
        let config: JournalConfig =
            toml::from_str(input).map_err(|e| JournalError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), JournalError> {
        if self.max_lines == 0 {
            return Err(JournalError::ConfigValidation("max_lines must be at least 1".into()));
        }
        if self.header_row == 0 {
            return Err(JournalError::ConfigValidation(
                "header_row is 1-based and must be at least 1".into(),
            ));
        }
        if self.secondary_group_columns.is_empty() {
            return Err(JournalError::ConfigValidation(
                "at least one secondary group column is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.as_str()) {
                return Err(JournalError::ConfigValidation(format!("duplicate column '{col}'")));
            }
        }

        let mut referenced: Vec<(&str, &str)> = vec![
            ("key_column", self.key_column.as_str()),
            ("primary_group_column", self.primary_group_column.as_str()),
            ("description_column", self.description_column.as_str()),
            ("header.site", self.header.site.as_str()),
            ("header.document_type", self.header.document_type.as_str()),
            ("header.accounting_date", self.header.accounting_date.as_str()),
            ("header.currency", self.header.currency.as_str()),
            ("header.reference", self.header.reference.as_str()),
            ("lines.description", self.lines.description.as_str()),
            ("lines.quantity", self.lines.quantity.as_str()),
            ("lines.debit", self.lines.debit.as_str()),
            ("lines.credit", self.lines.credit.as_str()),
            ("lines.business_partner", self.lines.business_partner.as_str()),
            ("lines.free_reference", self.lines.free_reference.as_str()),
            ("lines.tax_code", self.lines.tax_code.as_str()),
            ("feedback.document", self.feedback.document.as_str()),
            ("feedback.status", self.feedback.status.as_str()),
            ("feedback.warning", self.feedback.warning.as_str()),
        ];
        if let Some(ref col) = self.reversal_column {
            referenced.push(("reversal_column", col.as_str()));
        }
        for col in &self.secondary_group_columns {
            referenced.push(("secondary_group_columns", col.as_str()));
        }
        for col in &self.uppercase_columns {
            referenced.push(("uppercase_columns", col.as_str()));
        }
        for col in &self.date_columns {
            referenced.push(("date_columns", col.as_str()));
        }
        for dim in &self.dimensions {
            referenced.push(("dimensions", dim.column.as_str()));
        }

        for (field, col) in referenced {
            if !seen.contains(col) {
                return Err(JournalError::ConfigValidation(format!(
                    "{field}: column '{col}' is not in the schema"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
