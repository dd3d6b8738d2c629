//! Accounting API transport: signed GraphQL requests over blocking HTTP.

pub mod auth;
pub mod client;

use std::fmt;

use crate::exit_codes;
use crate::CliError;

pub use client::ApiClient;

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Connection, DNS, TLS or timeout failure.
    Network(String),
    /// Non-success HTTP status other than 401/403.
    Http { status: u16, body: String },
    /// Response body was not the JSON shape expected.
    Parse(String),
    /// 401/403.
    Auth { status: u16, body: String },
    /// The server answered with a GraphQL `errors` array.
    GraphQl(Vec<String>),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Http { status, body } => write!(f, "HTTP {status}: {}", snippet(body)),
            Self::Parse(msg) => write!(f, "unexpected API response: {msg}"),
            Self::Auth { status, body } => {
                write!(f, "authentication rejected ({status}): {}", snippet(body))
            }
            Self::GraphQl(messages) => write!(f, "{}", messages.join("; ")),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Worth another attempt: network failures, 429 and 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Auth { .. } => exit_codes::EXIT_API_AUTH,
            Self::Http { status, .. } if (400..500).contains(status) && *status != 429 => {
                exit_codes::EXIT_API_VALIDATION
            }
            Self::GraphQl(_) => exit_codes::EXIT_API_VALIDATION,
            _ => exit_codes::EXIT_API_UPSTREAM,
        }
    }
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        let hint = match &err {
            ApiError::Auth { .. } => Some("check api_key, api_secret and client_id".to_string()),
            ApiError::Network(_) => Some("is server_base_address reachable?".to_string()),
            _ => None,
        };
        CliError { code: err.exit_code(), message: err.to_string(), hint }
    }
}

fn snippet(body: &str) -> &str {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(200) {
        Some((idx, _)) => &trimmed[..idx],
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(ApiError::Network("timeout".into()).is_retryable());
        assert!(ApiError::Http { status: 503, body: String::new() }.is_retryable());
        assert!(ApiError::Http { status: 429, body: String::new() }.is_retryable());
        assert!(!ApiError::Http { status: 400, body: String::new() }.is_retryable());
        assert!(!ApiError::GraphQl(vec!["bad".into()]).is_retryable());
    }

    #[test]
    fn test_exit_codes() {
        let auth = ApiError::Auth { status: 401, body: String::new() };
        assert_eq!(auth.exit_code(), exit_codes::EXIT_API_AUTH);
        let bad = ApiError::Http { status: 422, body: String::new() };
        assert_eq!(bad.exit_code(), exit_codes::EXIT_API_VALIDATION);
        let down = ApiError::Http { status: 502, body: String::new() };
        assert_eq!(down.exit_code(), exit_codes::EXIT_API_UPSTREAM);
    }

    #[test]
    fn test_graphql_message_joined() {
        let err = ApiError::GraphQl(vec!["Invalid account".into(), "Period closed".into()]);
        assert_eq!(err.to_string(), "Invalid account; Period closed");
    }
}
