//! Outlook (Microsoft Graph) adapter configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::oauth::{MICROSOFT_TOKEN_URL, OAuthEndpoint};

/// Base URL for Microsoft Graph v1.0.
pub const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Configuration for the Outlook adapter.
#[derive(Debug, Clone)]
pub struct OutlookConfig {
    /// Azure application (client) id; refresh is unavailable without it.
    pub client_id: Option<String>,

    /// Redirect URI registered for the application, sent on refresh.
    pub redirect_uri: Option<String>,

    /// Path of the token file.
    ///
    /// Defaults to `$XDG_DATA_HOME/examsync/outlook-token.json`.
    pub token_path: PathBuf,

    /// Graph API base URL.
    pub base_url: String,

    /// Token endpoint used for refresh.
    pub token_url: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl Default for OutlookConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OutlookConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration with default endpoints and token path.
    pub fn new() -> Self {
        Self {
            client_id: None,
            redirect_uri: None,
            token_path: Self::default_token_path(),
            base_url: GRAPH_API_BASE.to_string(),
            token_url: MICROSOFT_TOKEN_URL.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Returns the default token storage path.
    pub fn default_token_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("examsync")
            .join("outlook-token.json")
    }

    /// Sets the application client id.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the redirect URI.
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
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

    /// Returns the refresh endpoint, if a client id is configured.
    pub fn oauth_endpoint(&self) -> Option<OAuthEndpoint> {
        let client_id = self.client_id.as_deref().filter(|id| !id.trim().is_empty())?;
        let mut endpoint = OAuthEndpoint::microsoft(client_id).with_token_url(&self.token_url);
        if let Some(uri) = &self.redirect_uri {
            endpoint = endpoint.with_redirect_uri(uri);
        }
        Some(endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::MICROSOFT_SCOPE;

    #[test]
    fn defaults() {
        let config = OutlookConfig::new();
        assert_eq!(config.base_url, GRAPH_API_BASE);
        assert_eq!(config.token_url, MICROSOFT_TOKEN_URL);
        assert!(config.token_path.ends_with("examsync/outlook-token.json"));
        assert!(config.oauth_endpoint().is_none());
    }

    #[test]
    fn blank_client_id_disables_refresh() {
        let config = OutlookConfig::new().with_client_id("  ");
        assert!(config.oauth_endpoint().is_none());
    }

    #[test]
    fn endpoint_carries_redirect_and_scope() {
        let config = OutlookConfig::new()
            .with_client_id("app-id")
            .with_redirect_uri("https://example.invalid/callback")
            .with_base_url("http://127.0.0.1:9000/v1.0/");
        assert_eq!(config.base_url, "http://127.0.0.1:9000/v1.0");

        let endpoint = config.oauth_endpoint().unwrap();
        assert_eq!(endpoint.client_id, "app-id");
        assert_eq!(endpoint.scope.as_deref(), Some(MICROSOFT_SCOPE));
        assert_eq!(
            endpoint.redirect_uri.as_deref(),
            Some("https://example.invalid/callback")
        );
    }
}
