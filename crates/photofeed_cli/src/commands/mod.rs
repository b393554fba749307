//! CLI command implementations.

pub mod auth;
pub mod feed;
pub mod profile;

use photofeed_engine::{FeedConfig, FileCredentialStore, ReqwestClient, Services};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Result type shared by the commands.
pub type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format '{other}', expected text or json")),
        }
    }
}

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Session {
    /// File holding the access token.
    pub token_file: PathBuf,
    /// OAuth client id.
    pub access_key: String,
    /// OAuth client secret.
    pub secret_key: String,
    /// API base URL override.
    pub api_base: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Session {
    /// Builds the engine configuration.
    pub fn config(&self) -> FeedConfig {
        let config = FeedConfig::new(&self.access_key, &self.secret_key)
            .with_request_timeout(Duration::from_secs(self.timeout_secs));
        match &self.api_base {
            Some(base) => config.with_api_base_url(base),
            None => config,
        }
    }

    /// Returns the token file store.
    pub fn credentials(&self) -> FileCredentialStore {
        FileCredentialStore::new(&self.token_file)
    }

    /// Starts the services against the real API.
    pub fn services(&self) -> CommandResult<Services> {
        let client = ReqwestClient::new()?;
        let services = Services::new(&self.config(), Arc::new(client), Arc::new(self.credentials()))?;
        Ok(services)
    }
}
