//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | journal          | Sheet reading, validation, submission    |
//! | 50-59   | api              | Accounting API transport                 |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use glpost_journal::JournalError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Journal (3-9)
// =============================================================================

/// The input sheet could not be read (missing file, bad CSV, missing column).
pub const EXIT_INPUT: u8 = 3;

/// The sheet failed validation; nothing was sent.
pub const EXIT_VALIDATION: u8 = 4;

/// Settings file or journal layout is invalid.
pub const EXIT_CONFIG: u8 = 5;

/// At least one group was rejected by the API. Feedback was still written.
pub const EXIT_PARTIAL: u8 = 6;

// =============================================================================
// API (50-59)
// =============================================================================

/// Credentials missing (api key, secret or client id).
pub const EXIT_API_NOT_AUTH: u8 = 50;

/// Auth rejected by the API (401/403).
pub const EXIT_API_AUTH: u8 = 51;

/// Request rejected by the API (400 or GraphQL errors).
pub const EXIT_API_VALIDATION: u8 = 52;

/// Upstream error (5xx, 429) or network failure after retries.
pub const EXIT_API_UPSTREAM: u8 = 54;

/// Map an engine error to its exit code.
pub fn journal_exit_code(err: &JournalError) -> u8 {
    match err {
        JournalError::Io(_) | JournalError::MissingColumn { .. } => EXIT_INPUT,
        JournalError::ConfigParse(_) | JournalError::ConfigValidation(_) => EXIT_CONFIG,
        _ => EXIT_VALIDATION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_errors_map_to_codes() {
        assert_eq!(journal_exit_code(&JournalError::EmptyInput), EXIT_VALIDATION);
        assert_eq!(
            journal_exit_code(&JournalError::MissingColumn { column: "Site".into() }),
            EXIT_INPUT
        );
        assert_eq!(journal_exit_code(&JournalError::ConfigParse("x".into())), EXIT_CONFIG);
    }
}
