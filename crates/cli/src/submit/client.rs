use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use glpost_journal::{JournalEntryInput, SubmissionOutcome};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::settings::Credentials;

use super::auth::signed_headers;
use super::ApiError;

// ── Constants ───────────────────────────────────────────────────────

pub const MAX_RETRIES: u32 = 3;
const USER_AGENT: &str = concat!("glpost/", env!("CARGO_PKG_VERSION"));

pub const CREATE_JOURNAL_ENTRY: &str = "\
mutation CreateJournalEntry($input: CreateJournalEntryInput!) {
  createJournalEntry(input: $input) {
    journalEntryNumber
    journalEntryStatus
  }
}";

pub const GET_JOURNAL_STATUSES: &str = "\
query GetJournalStatuses($numbers: [String!]!) {
  journalEntries(filter: { numbers: $numbers }) {
    number
    status
  }
}";

// ── Client ──────────────────────────────────────────────────────────

/// GraphQL client for the accounting API. Every request is signed afresh.
pub struct ApiClient {
    http: reqwest::blocking::Client,
    url: String,
    credentials: Credentials,
    retry_delay: Duration,
}

impl ApiClient {
    pub fn new(url: &str, credentials: Credentials, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            url: url.to_string(),
            credentials,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Initial wait between retries of read-only queries; doubles per attempt.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// POST one operation and return its `data` object.
    fn execute(&self, operation: &str, query: &str, variables: Value) -> Result<Value, ApiError> {
        let payload = json!({
            "operationName": operation,
            "query": query,
            "variables": variables,
        });
        debug!(operation, payload = %payload, "graphql request");

        let timestamp = chrono::Utc::now().timestamp();
        let mut request = self.http.post(&self.url);
        for (name, value) in signed_headers(&self.credentials, timestamp) {
            request = request.header(name, value);
        }

        let resp = request
            .body(payload.to_string())
            .send()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = resp.status().as_u16();
        let text = resp
            .text()
            .map_err(|e| ApiError::Network(format!("failed to read response body: {e}")))?;

        if status == 401 || status == 403 {
            return Err(ApiError::Auth { status, body: text });
        }
        if !(200..300).contains(&status) {
            return Err(ApiError::Http { status, body: text });
        }

        let body: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))
            .map_err(|e| {
                let head: String = text.chars().take(200).collect();
                ApiError::Parse(format!("{e} (body: {head})"))
            })?;
        debug!(operation, response = %body, "graphql response");

        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let messages = errors
                    .iter()
                    .map(|e| {
                        e.get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown error")
                            .to_string()
                    })
                    .collect();
                return Err(ApiError::GraphQl(messages));
            }
        }

        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }

    /// `execute` with retry + exponential backoff on network errors, 429
    /// and 5xx. Only used for read-only operations.
    fn execute_with_retry(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<Value, ApiError> {
        let mut delay = self.retry_delay;
        let mut attempt = 0;
        loop {
            match self.execute(operation, query, variables.clone()) {
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    warn!("retry {}/{} in {:?} ({})", attempt, MAX_RETRIES, delay, e);
                    thread::sleep(delay);
                    delay *= 2;
                }
                other => return other,
            }
        }
    }

    /// Create one journal entry. Never retried; any failure comes back as a
    /// failed outcome and the caller moves on to the next group.
    pub fn create_journal_entry(&self, input: &JournalEntryInput, group: &str) -> SubmissionOutcome {
        info!(group, "creating journal entry");

        let result = serde_json::to_value(input)
            .map_err(|e| ApiError::Parse(e.to_string()))
            .and_then(|input| {
                self.execute("CreateJournalEntry", CREATE_JOURNAL_ENTRY, json!({ "input": input }))
            });

        match result {
            Ok(data) => {
                let created = &data["createJournalEntry"];
                let document = value_text(&created["journalEntryNumber"]);
                let status = value_text(&created["journalEntryStatus"]);
                info!(group, document = document.as_deref().unwrap_or(""), "journal entry created");
                SubmissionOutcome::created(document, status)
            }
            Err(e) => {
                error!(group, error = %e, "journal entry rejected");
                SubmissionOutcome::failed(e.to_string())
            }
        }
    }

    /// Current status per document number.
    pub fn journal_statuses(&self, numbers: &[String]) -> Result<HashMap<String, String>, ApiError> {
        if numbers.is_empty() {
            return Ok(HashMap::new());
        }
        info!("checking status of {} documents", numbers.len());

        let variables = json!({ "numbers": numbers });
        let data = self.execute_with_retry("GetJournalStatuses", GET_JOURNAL_STATUSES, variables)?;
        let entries = data
            .get("journalEntries")
            .and_then(Value::as_array)
            .ok_or_else(|| ApiError::Parse("response has no journalEntries list".to_string()))?;

        let mut statuses = HashMap::new();
        for entry in entries {
            if let (Some(number), Some(status)) =
                (value_text(&entry["number"]), value_text(&entry["status"]))
            {
                statuses.insert(number, status);
            }
        }
        Ok(statuses)
    }
}

/// Strings as-is, numbers rendered, null/absent as `None`.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn creds() -> Credentials {
        Credentials {
            api_key: "key123".into(),
            api_secret: "s3cret".into(),
            client_id: "client9".into(),
        }
    }

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.url("/graphql"), creds(), Duration::from_secs(5))
            .unwrap()
            .with_retry_delay(Duration::ZERO)
    }

    fn entry() -> JournalEntryInput {
        JournalEntryInput {
            site: "UK01".into(),
            document_type: "GEN".into(),
            accounting_date: "2024-01-31".into(),
            description_by_default: "January accruals".into(),
            source_currency: "GBP".into(),
            reference: None,
            lines: vec![],
        }
    }

    #[test]
    fn test_create_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/graphql")
                .header("X-App-Key", "key123")
                .header("X-Client-Id", "client9")
                .header("Accept", "*/*");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "data": {
                        "createJournalEntry": {
                            "journalEntryNumber": "JE0001",
                            "journalEntryStatus": "Draft"
                        }
                    }
                }));
        });

        let outcome = client(&server).create_journal_entry(&entry(), "G1");

        mock.assert();
        assert_eq!(
            outcome,
            SubmissionOutcome::created(Some("JE0001".into()), Some("Draft".into()))
        );
    }

    #[test]
    fn test_create_graphql_errors_joined() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(200).json_body(serde_json::json!({
                "errors": [
                    {"message": "Invalid account 9999"},
                    {"message": "Period closed"}
                ]
            }));
        });

        let outcome = client(&server).create_journal_entry(&entry(), "G1");
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Invalid account 9999; Period closed"));
    }

    #[test]
    fn test_create_http_error_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(500).body("boom");
        });

        let outcome = client(&server).create_journal_entry(&entry(), "G1");

        mock.assert_calls(1);
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("HTTP 500: boom"));
    }

    #[test]
    fn test_statuses_map() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(200).json_body(serde_json::json!({
                "data": {
                    "journalEntries": [
                        {"number": "JE0001", "status": "Posted"},
                        {"number": "JE0002", "status": "Draft"}
                    ]
                }
            }));
        });

        let statuses = client(&server)
            .journal_statuses(&["JE0001".into(), "JE0002".into()])
            .unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses["JE0001"], "Posted");
    }

    #[test]
    fn test_statuses_retry_exhausted() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(503).body("unavailable");
        });

        let err = client(&server).journal_statuses(&["JE0001".into()]).unwrap_err();

        mock.assert_calls(4);
        assert_eq!(err, ApiError::Http { status: 503, body: "unavailable".into() });
    }

    #[test]
    fn test_statuses_auth_rejected_immediately() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(401).body("bad signature");
        });

        let err = client(&server).journal_statuses(&["JE0001".into()]).unwrap_err();

        mock.assert_calls(1);
        assert!(matches!(err, ApiError::Auth { status: 401, .. }));
    }

    #[test]
    fn test_statuses_empty_input_skips_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(200);
        });

        let statuses = client(&server).journal_statuses(&[]).unwrap();
        assert!(statuses.is_empty());
        mock.assert_calls(0);
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&Value::Null), None);
        assert_eq!(value_text(&serde_json::json!("JE1")), Some("JE1".into()));
        assert_eq!(value_text(&serde_json::json!(42)), Some("42".into()));
    }
}
