use std::fmt;

/// Every condition that stops a run. All of them are terminal: the table
/// must be corrected and the run started again.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalError {
    /// The table had no data rows at all.
    EmptyInput,
    /// More data rows than the accounting system accepts in one run.
    RowLimitExceeded { total: usize, max: usize },
    /// A blank key cell between the first and last filled key cells.
    ContiguityViolation { column: String, row: usize },
    /// Rows were handed over out of their original order.
    RowOrder { position: usize, origin: usize, previous: usize },
    /// A non-empty cell in a date column is not a calendar date.
    InvalidDateFormat { column: String, row: usize, value: String },
    /// The first data row carries no grouping information.
    EmptyFirstRow { row: usize, columns: Vec<String> },
    /// A header column holds more than one value inside one group.
    GroupInconsistency { group: String, column: String, values: Vec<String> },
    /// A group has no description.
    MissingGroupDescription { group: String },
    /// A schema column is absent from the input headers.
    MissingColumn { column: String },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (unknown column reference, bad limit, etc.).
    ConfigValidation(String),
    /// CSV read error.
    Io(String),
}

impl fmt::Display for JournalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "the data table is empty"),
            Self::RowLimitExceeded { total, max } => write!(
                f,
                "the total number of rows ({total}) exceeds the maximum allowed limit of {max}"
            ),
            Self::ContiguityViolation { column, row } => write!(
                f,
                "blank rows were found in the middle of the data: the '{column}' column \
                 cannot be empty between rows with data, check row {row}"
            ),
            Self::RowOrder { position, origin, previous } => write!(
                f,
                "rows are out of order at position {position}: origin {origin} follows {previous}"
            ),
            Self::InvalidDateFormat { column, row, value } => write!(
                f,
                "invalid date format in column '{column}' at row {row}: '{value}'"
            ),
            Self::EmptyFirstRow { row, columns } => write!(
                f,
                "the first data row (row {row}) cannot have all grouping columns empty, \
                 fill at least one of: {}",
                columns.join(", ")
            ),
            Self::GroupInconsistency { group, column, values } => {
                let quoted: Vec<String> = values.iter().map(|v| format!("'{v}'")).collect();
                write!(
                    f,
                    "data consistency error in group '{group}': the column '{column}' has \
                     multiple values ({}) within the same group, correct the data or start \
                     a new group",
                    quoted.join(", ")
                )
            }
            Self::MissingGroupDescription { group } => write!(
                f,
                "group '{group}' has no header description: the description column cannot \
                 be empty for a group"
            ),
            Self::MissingColumn { column } => write!(f, "missing column '{column}' in table header"),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for JournalError {}

impl JournalError {
    /// True for conditions caused by the table contents rather than by
    /// configuration or I/O.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::ConfigParse(_) | Self::ConfigValidation(_) | Self::Io(_) | Self::MissingColumn { .. }
        )
    }
}
