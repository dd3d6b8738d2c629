//! `glpost-journal`: journal-entry preparation engine.
//!
//! Pure engine crate: receives a loaded row table, returns validated groups
//! and the wire-shaped entry inputs built from them. No network or CLI
//! dependencies; the only I/O is parsing CSV text handed in by the caller.

pub mod config;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod grouping;
pub mod load;
pub mod model;
pub mod normalize;
pub mod project;
pub mod structure;

pub use config::JournalConfig;
pub use engine::{prepare, PreparedBatch};
pub use error::JournalError;
pub use feedback::{feedback_rows, FeedbackRow};
pub use load::load_csv_table;
pub use model::{
    CellValue, Group, GroupKey, GroupResult, GroupingMode, JournalEntryInput, LineRecord, Row,
    RowTable, SubmissionOutcome,
};
