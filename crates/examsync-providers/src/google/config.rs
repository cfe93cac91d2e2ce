//! Google Calendar adapter configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::oauth::{GOOGLE_TOKEN_URL, OAuthEndpoint};

/// Base URL for Google Calendar API v3.
pub const GOOGLE_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// OAuth client credentials used to refresh Google tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret, if the client has one.
    pub client_secret: Option<String>,
}

/// Structure of Google's OAuth credentials JSON file.
///
/// Supports the Cloud Console download (`installed` / `web` section) and
/// the flat format written by gcloud.
#[derive(Debug, Deserialize)]
struct GoogleCredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    #[serde(default)]
    client_secret: Option<String>,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
        }
    }

    /// Loads OAuth credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("failed to read credentials file: {}", e))?;
        Self::from_json(&content)
    }

    /// Parses OAuth credentials from a Google credentials JSON string.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let file: GoogleCredentialsFile = serde_json::from_str(json)
            .map_err(|e| format!("failed to parse credentials JSON: {}", e))?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        match file.client_id {
            Some(client_id) => Ok(Self::new(client_id, file.client_secret)),
            None => Err(
                "credentials file must contain an 'installed'/'web' section or a root 'client_id'"
                    .to_string(),
            ),
        }
    }

    /// Checks that the client id looks like a Google OAuth client id.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        Ok(())
    }
}

/// Configuration for the Google Calendar adapter.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Client credentials; refresh is unavailable without them.
    pub credentials: Option<OAuthCredentials>,

    /// Path of the token file.
    ///
    /// Defaults to `$XDG_DATA_HOME/examsync/google-token.json`.
    pub token_path: PathBuf,

    /// Calendar API base URL.
    pub base_url: String,

    /// Token endpoint used for refresh.
    pub token_url: String,

    /// Request timeout.
    pub timeout: Duration,

    /// IANA zone name sent as `timeZone` on created events.
    pub time_zone: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration with default endpoints and token path.
    pub fn new() -> Self {
        Self {
            credentials: None,
            token_path: Self::default_token_path(),
            base_url: GOOGLE_API_BASE.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            time_zone: "UTC".to_string(),
        }
    }

    /// Returns the default token storage path.
    pub fn default_token_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("examsync")
            .join("google-token.json")
    }

    /// Sets the client credentials.
    pub fn with_credentials(mut self, credentials: OAuthCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the token storage path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Overrides the API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the event time zone.
    pub fn with_time_zone(mut self, zone: impl Into<String>) -> Self {
        self.time_zone = zone.into();
        self
    }

    /// Returns the refresh endpoint, if credentials are configured.
    pub fn oauth_endpoint(&self) -> Option<OAuthEndpoint> {
        self.credentials.as_ref().map(|c| {
            OAuthEndpoint::google(&c.client_id, c.client_secret.clone())
                .with_token_url(&self.token_url)
        })
    }
}
