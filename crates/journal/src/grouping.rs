use std::collections::HashMap;

use log::{info, warn};

use crate::config::JournalConfig;
use crate::error::JournalError;
use crate::model::{Group, GroupKey, GroupingMode, Row, RowTable};

/// Partition of a normalized table into journal-entry groups.
#[derive(Debug, Clone, PartialEq)]
pub struct Grouping {
    pub mode: GroupingMode,
    pub groups: Vec<Group>,
}

/// Split the normalized table into groups.
///
/// When any row carries a value in the primary group column the user's keys
/// decide (rows sharing a key form one group, in first-occurrence order) and
/// every secondary column must hold a single value per group. Otherwise a new
/// group starts wherever a secondary column changes from the previous row.
pub fn group_rows(table: &RowTable, config: &JournalConfig) -> Result<Grouping, JournalError> {
    check_first_row(table, config)?;

    let primary = config.primary_group_column.as_str();
    let user_defined = table.rows.iter().any(|r| !r.get(primary).is_empty());

    let grouping = if user_defined {
        let groups = group_by_key(table, primary);
        check_consistency(&groups, &config.secondary_group_columns)?;
        Grouping { mode: GroupingMode::UserDefined, groups }
    } else {
        Grouping {
            mode: GroupingMode::Automatic,
            groups: group_by_change(table, &config.secondary_group_columns),
        }
    };

    info!("{} rows split into {} ({})", table.len(), grouping.groups.len(), grouping.mode);
    Ok(grouping)
}

/// The first data row must say something about grouping; nothing can be
/// filled down into it.
fn check_first_row(table: &RowTable, config: &JournalConfig) -> Result<(), JournalError> {
    let Some(first) = table.rows.first() else {
        return Ok(());
    };
    let columns = config.grouping_columns();
    if columns.iter().all(|c| first.get(c).is_empty()) {
        return Err(JournalError::EmptyFirstRow {
            row: config.physical_row(first.origin),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// User-defined groups
// ---------------------------------------------------------------------------

fn group_by_key(table: &RowTable, primary: &str) -> Vec<Group> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for row in &table.rows {
        let key = row.get(primary).as_text();
        match index.get(&key) {
            Some(&i) => {
                let group = &mut groups[i];
                if group.rows.last().is_some_and(|last| last.origin + 1 != row.origin) {
                    warn!(
                        "group '{}' resumes at origin {} after other rows; rows are merged",
                        key, row.origin
                    );
                }
                group.rows.push(row.clone());
            }
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group { key: GroupKey::User(key), rows: vec![row.clone()] });
            }
        }
    }
    groups
}

/// Column by column, group by group: the first column found holding more
/// than one distinct value inside a group is reported.
fn check_consistency(groups: &[Group], secondary: &[String]) -> Result<(), JournalError> {
    for column in secondary {
        for (position, group) in groups.iter().enumerate() {
            let values = distinct_values(&group.rows, column);
            if values.len() > 1 {
                return Err(JournalError::GroupInconsistency {
                    group: group.key.label(position),
                    column: column.clone(),
                    values,
                });
            }
        }
    }
    Ok(())
}

/// Distinct text values of `column`, in first-seen order.
fn distinct_values(rows: &[Row], column: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for row in rows {
        let value = row.get(column).as_text();
        if !values.contains(&value) {
            values.push(value);
        }
    }
    values
}

// ---------------------------------------------------------------------------
// Automatic groups
// ---------------------------------------------------------------------------

fn group_by_change(table: &RowTable, secondary: &[String]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut previous: Option<&Row> = None;

    for row in &table.rows {
        let changed = match previous {
            None => true,
            Some(prev) => secondary
                .iter()
                .any(|c| prev.get(c).as_text() != row.get(c).as_text()),
        };
        if changed {
            groups.push(Group { key: GroupKey::Auto(groups.len() + 1), rows: Vec::new() });
        }
        if let Some(group) = groups.last_mut() {
            group.rows.push(row.clone());
        }
        previous = Some(row);
    }
    groups
}

// ---------------------------------------------------------------------------
// Group headers
// ---------------------------------------------------------------------------

/// Every group needs a description on its first row.
pub fn validate_group_headers(groups: &[Group], config: &JournalConfig) -> Result<(), JournalError> {
    for (position, group) in groups.iter().enumerate() {
        if group.header().get(&config.description_column).is_empty() {
            return Err(JournalError::MissingGroupDescription { group: group.key.label(position) });
        }
    }
    Ok(())
}
