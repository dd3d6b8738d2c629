//! Runtime settings: API endpoint, credentials and the journal sheet layout.
//!
//! Resolution order, later wins:
//! 1. built-in defaults
//! 2. TOML file (`--config <path>`, else `<config dir>/glpost/config.toml`)
//! 3. `GLPOST_SERVER`, `GLPOST_API_KEY`, `GLPOST_API_SECRET`, `GLPOST_CLIENT_ID`

use std::path::{Path, PathBuf};

use glpost_journal::JournalConfig;
use serde::Deserialize;

use crate::exit_codes;
use crate::CliError;

pub const FALLBACK_SERVER_ADDRESS: &str = "http://localhost:3000/graphql";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_base_address: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub client_id: Option<String>,
    pub production: bool,
    pub debug: bool,
    pub timeout_secs: u64,
    pub journal: JournalConfig,
    /// File the settings were read from; `None` when running on defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_base_address: FALLBACK_SERVER_ADDRESS.to_string(),
            api_key: None,
            api_secret: None,
            client_id: None,
            production: false,
            debug: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            journal: JournalConfig::default(),
            source: None,
        }
    }
}

/// Signing material for the API, all three parts present and non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub client_id: String,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("glpost").join("config.toml"))
}

impl Settings {
    /// Load settings from `explicit` (must exist) or the default location
    /// (optional), then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CliError> {
        let mut settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        settings.apply_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|e| CliError {
            code: exit_codes::EXIT_CONFIG,
            message: format!("cannot read settings {}: {}", path.display(), e),
            hint: None,
        })?;
        let mut settings = Self::from_toml(&text).map_err(|e| CliError {
            code: exit_codes::EXIT_CONFIG,
            message: format!("{}: {}", path.display(), e.message),
            hint: e.hint,
        })?;
        settings.source = Some(path.to_path_buf());
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self, CliError> {
        let settings: Settings = toml::from_str(text).map_err(|e| CliError {
            code: exit_codes::EXIT_CONFIG,
            message: format!("invalid settings: {}", e),
            hint: None,
        })?;
        if settings.timeout_secs == 0 {
            return Err(CliError {
                code: exit_codes::EXIT_CONFIG,
                message: "timeout_secs must be at least 1".to_string(),
                hint: None,
            });
        }
        settings.journal.validate().map_err(|e| CliError {
            code: exit_codes::EXIT_CONFIG,
            message: e.to_string(),
            hint: Some("every column named in [journal] must appear in journal.columns".into()),
        })?;
        Ok(settings)
    }

    /// Overlay `GLPOST_*` variables. Blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(server) = get("GLPOST_SERVER") {
            self.server_base_address = server;
        }
        if let Some(key) = get("GLPOST_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(secret) = get("GLPOST_API_SECRET") {
            self.api_secret = Some(secret);
        }
        if let Some(client) = get("GLPOST_CLIENT_ID") {
            self.client_id = Some(client);
        }
    }

    pub fn credentials(&self) -> Result<Credentials, CliError> {
        let missing: Vec<&str> = [
            ("api_key", &self.api_key),
            ("api_secret", &self.api_secret),
            ("client_id", &self.client_id),
        ]
        .iter()
        .filter(|(_, v)| v.as_deref().map_or(true, |s| s.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(CliError {
                code: exit_codes::EXIT_API_NOT_AUTH,
                message: format!("missing API credentials: {}", missing.join(", ")),
                hint: Some(
                    "set them in the settings file or via GLPOST_API_KEY, GLPOST_API_SECRET \
                     and GLPOST_CLIENT_ID"
                        .to_string(),
                ),
            });
        }

        Ok(Credentials {
            api_key: self.api_key.clone().unwrap_or_default(),
            api_secret: self.api_secret.clone().unwrap_or_default(),
            client_id: self.client_id.clone().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server_base_address, "http://localhost:3000/graphql");
        assert_eq!(settings.timeout_secs, 60);
        assert!(!settings.production);
        assert_eq!(settings.journal.max_lines, 1000);
    }

    #[test]
    fn parse_with_journal_table() {
        let settings = Settings::from_toml(
            r#"
server_base_address = "https://erp.example.com/graphql"
api_key = "key"
production = true
timeout_secs = 15

[journal]
header_row = 2
max_lines = 200
"#,
        )
        .unwrap();
        assert_eq!(settings.server_base_address, "https://erp.example.com/graphql");
        assert_eq!(settings.api_key.as_deref(), Some("key"));
        assert!(settings.production);
        assert_eq!(settings.timeout_secs, 15);
        assert_eq!(settings.journal.header_row, 2);
        assert_eq!(settings.journal.max_lines, 200);
        assert_eq!(settings.journal.key_column, "Nominal Code");
    }

    #[test]
    fn invalid_journal_layout_is_config_error() {
        let err = Settings::from_toml(
            r#"
[journal]
key_column = "Account"
"#,
        )
        .unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_CONFIG);
        assert!(err.message.contains("Account"));
    }

    #[test]
    fn env_overrides_file() {
        let mut settings = Settings::from_toml(r#"api_key = "from-file""#).unwrap();
        settings.apply_env(|name| match name {
            "GLPOST_API_KEY" => Some("from-env".to_string()),
            "GLPOST_SERVER" => Some("   ".to_string()),
            "GLPOST_CLIENT_ID" => Some("client".to_string()),
            _ => None,
        });
        assert_eq!(settings.api_key.as_deref(), Some("from-env"));
        assert_eq!(settings.client_id.as_deref(), Some("client"));
        assert_eq!(settings.server_base_address, FALLBACK_SERVER_ADDRESS);
    }

    #[test]
    fn credentials_report_every_missing_part() {
        let mut settings = Settings::default();
        settings.api_key = Some("key".into());
        settings.client_id = Some(" ".into());
        let err = settings.credentials().unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_API_NOT_AUTH);
        assert_eq!(err.message, "missing API credentials: api_secret, client_id");

        settings.api_secret = Some("secret".into());
        settings.client_id = Some("client".into());
        let creds = settings.credentials().unwrap();
        assert_eq!(creds.client_id, "client");
    }

    #[test]
    fn explicit_missing_file_is_config_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/glpost.toml"))).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_CONFIG);
    }
}
