use log::warn;
use serde::Serialize;

use crate::model::GroupResult;

/// Marker written to the document cell of rows whose group failed.
pub const ERROR_MARKER: &str = "ERROR";
pub const FAILURE_STATUS: &str = "FAILURE";

/// Contents of the document / status / warning cells for one data row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackRow {
    pub document: String,
    pub status: String,
    pub warning: String,
}

/// Expand per-group results into one feedback row per data row. Rows no
/// result covers stay blank; indices past `n_rows` are ignored.
pub fn feedback_rows(results: &[GroupResult], n_rows: usize) -> Vec<FeedbackRow> {
    let mut rows = vec![FeedbackRow::default(); n_rows];

    for result in results {
        let outcome = &result.outcome;
        let values = if outcome.success {
            FeedbackRow {
                document: outcome.document.clone().unwrap_or_default(),
                status: outcome.status.clone().unwrap_or_default(),
                warning: String::new(),
            }
        } else {
            FeedbackRow {
                document: ERROR_MARKER.to_string(),
                status: FAILURE_STATUS.to_string(),
                warning: outcome.error.clone().unwrap_or_default(),
            }
        };

        for &idx in &result.indices {
            match rows.get_mut(idx) {
                Some(slot) => *slot = values.clone(),
                None => warn!("result index {idx} is outside the {n_rows} data rows"),
            }
        }
    }
    rows
}
