use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Cells and rows
// ---------------------------------------------------------------------------

/// A single scalar cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

static EMPTY: CellValue = CellValue::Empty;

impl CellValue {
    /// Read a raw sheet cell: blank → `Empty`, anything else → trimmed
    /// `Text`. The text is kept as typed (`00123` stays `00123`); columns
    /// that hold numbers are read through `as_number`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::Empty
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    /// Empty cells and whitespace-only text.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric view: numbers as-is, text only when it is a plain decimal.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => parse_plain_number(s.trim()),
            _ => None,
        }
    }

    /// Text view used for keys, wire strings and CSV output.
    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Decimal literal without exponent or words ("inf", "NaN" stay text).
pub(crate) fn parse_plain_number(s: &str) -> Option<f64> {
    let body = s.strip_prefix(['-', '+']).unwrap_or(s);
    if body.is_empty()
        || !body.bytes().any(|b| b.is_ascii_digit())
        || !body.bytes().all(|b| b.is_ascii_digit() || b == b'.')
    {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Integral values print without a fractional part (`4000`, not `4000.0`).
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One table row. `origin` is its 0-based position in the data area of the
/// sheet it was read from and drives write-back.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub origin: usize,
    pub cells: HashMap<String, CellValue>,
}

impl Row {
    pub fn new(origin: usize) -> Self {
        Self { origin, cells: HashMap::new() }
    }

    /// Builder used by loaders and tests.
    pub fn with(mut self, column: &str, value: CellValue) -> Self {
        self.set(column, value);
        self
    }

    /// Missing columns read as `Empty`.
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&EMPTY)
    }

    pub fn set(&mut self, column: &str, value: CellValue) {
        self.cells.insert(column.to_string(), value);
    }
}

/// Ordered rows over a fixed column schema.
#[derive(Debug, Clone, PartialEq)]
pub struct RowTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowTable {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of sheet data rows up to and including the last loaded row.
    /// Larger than `len()` when leading rows were dropped by the loader.
    pub fn span(&self) -> usize {
        self.rows.last().map_or(0, |row| row.origin + 1)
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// Value of the user's group discriminator column.
    User(String),
    /// 1-based sequence number assigned in automatic mode.
    Auto(usize),
}

impl GroupKey {
    /// Name shown to the user: the user key, or `Group #n` for synthetic or
    /// blank keys (`position` is 0-based).
    pub fn label(&self, position: usize) -> String {
        match self {
            Self::User(key) if !key.trim().is_empty() => key.clone(),
            _ => format!("Group #{}", position + 1),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(key) => write!(f, "{key}"),
            Self::Auto(n) => write!(f, "{n}"),
        }
    }
}

/// Rows submitted together as one journal entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: GroupKey,
    pub rows: Vec<Row>,
}

impl Group {
    /// The first row carries the header values for the whole group.
    pub fn header(&self) -> &Row {
        &self.rows[0]
    }

    pub fn origins(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.origin).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    UserDefined,
    Automatic,
}

impl fmt::Display for GroupingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserDefined => write!(f, "user-defined groups"),
            Self::Automatic => write!(f, "automatic groups"),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

/// One journal line as the accounting API expects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRecord {
    pub account: String,
    pub line_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_partner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<serde_json::Map<String, serde_json::Value>>,
}

/// `CreateJournalEntryInput` for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntryInput {
    pub site: String,
    pub document_type: String,
    pub accounting_date: String,
    pub description_by_default: String,
    pub source_currency: String,
    pub reference: Option<String>,
    pub lines: Vec<LineRecord>,
}

// ---------------------------------------------------------------------------
// Submission results
// ---------------------------------------------------------------------------

/// Result of submitting one group: `{success, document, status}` or
/// `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmissionOutcome {
    pub fn created(document: Option<String>, status: Option<String>) -> Self {
        Self { success: true, document, status, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, document: None, status: None, error: Some(error.into()) }
    }
}

/// Outcome for one group plus the origin indices it covered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupResult {
    pub indices: Vec<usize>,
    pub outcome: SubmissionOutcome,
}
