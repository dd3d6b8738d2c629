use log::{error, info};

use crate::config::JournalConfig;
use crate::error::JournalError;
use crate::grouping::{group_rows, validate_group_headers};
use crate::model::{Group, GroupingMode, JournalEntryInput, RowTable};
use crate::normalize::normalize;
use crate::project::build_entry_input;
use crate::structure::{check_contiguity, check_row_limit, check_row_order};

/// A validated, normalized and grouped table, ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBatch {
    pub table: RowTable,
    pub mode: GroupingMode,
    pub groups: Vec<Group>,
}

impl PreparedBatch {
    /// One create-entry input per group, in partition order.
    pub fn entries(&self, config: &JournalConfig) -> Vec<JournalEntryInput> {
        self.groups.iter().map(|g| build_entry_input(g, config)).collect()
    }

    /// Origin indices per group, in partition order.
    pub fn group_origins(&self) -> Vec<Vec<usize>> {
        self.groups.iter().map(|g| g.origins()).collect()
    }
}

/// Run every validation and transformation stage over a loaded table.
/// The first failing stage aborts the run; `table` itself is never modified.
pub fn prepare(table: &RowTable, config: &JournalConfig) -> Result<PreparedBatch, JournalError> {
    let result = run_stages(table, config);
    if let Err(ref e) = result {
        error!("validation failed: {e}");
    }
    result
}

fn run_stages(table: &RowTable, config: &JournalConfig) -> Result<PreparedBatch, JournalError> {
    if table.is_empty() {
        return Err(JournalError::EmptyInput);
    }

    info!("checking structure of {} rows", table.len());
    check_row_order(table)?;
    check_row_limit(table, config.max_lines)?;
    check_contiguity(table, &config.key_column, config.first_data_row())?;

    info!("normalizing");
    let normalized = normalize(table, config)?;

    info!("grouping");
    let grouping = group_rows(&normalized, config)?;

    validate_group_headers(&grouping.groups, config)?;
    info!("{} groups ready ({})", grouping.groups.len(), grouping.mode);

    Ok(PreparedBatch { table: normalized, mode: grouping.mode, groups: grouping.groups })
}
