//! Access-token refresh with a stored refresh token.
//!
//! Only the `refresh_token` grant is implemented; obtaining the initial
//! tokens happens outside examsync and the result is imported with
//! `examsync auth import`.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::http;
use crate::tokens::TokenInfo;

/// Microsoft identity platform token endpoint.
pub const MICROSOFT_TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";

/// Scopes requested when refreshing a Microsoft token.
pub const MICROSOFT_SCOPE: &str = "https://graph.microsoft.com/Calendars.ReadWrite offline_access";

/// Google token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Where and how to refresh a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoint {
    /// Token endpoint URL.
    pub token_url: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret (confidential clients only).
    pub client_secret: Option<String>,
    /// Space-separated scopes to request.
    pub scope: Option<String>,
    /// Redirect URI registered with the client.
    pub redirect_uri: Option<String>,
}

impl OAuthEndpoint {
    /// Microsoft endpoint for a public client.
    pub fn microsoft(client_id: impl Into<String>) -> Self {
        Self {
            token_url: MICROSOFT_TOKEN_URL.to_string(),
            client_id: client_id.into(),
            client_secret: None,
            scope: Some(MICROSOFT_SCOPE.to_string()),
            redirect_uri: None,
        }
    }

    /// Google endpoint for an installed-app client.
    pub fn google(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self {
            token_url: GOOGLE_TOKEN_URL.to_string(),
            client_id: client_id.into(),
            client_secret,
            scope: None,
            redirect_uri: None,
        }
    }

    /// Overrides the token URL.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets the redirect URI sent with the refresh request.
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }
}

/// Response from a token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

/// Performs the `refresh_token` grant.
#[derive(Debug, Clone)]
pub struct TokenRefresher {
    http_client: reqwest::Client,
    provider: String,
}

impl TokenRefresher {
    /// Creates a refresher for the named provider.
    pub fn new(provider: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            http_client: http::build_client(timeout)?,
            provider: provider.into(),
        })
    }

    /// Exchanges the refresh token in `current` for a new access token.
    ///
    /// # Errors
    ///
    /// Fails with an authentication error when `current` has no refresh
    /// token or the endpoint rejects it.
    pub async fn refresh(
        &self,
        endpoint: &OAuthEndpoint,
        current: &TokenInfo,
    ) -> ProviderResult<TokenInfo> {
        let refresh_token = current.refresh_token().ok_or_else(|| {
            ProviderError::authentication("no refresh token stored").with_provider(&self.provider)
        })?;

        let mut params = vec![
            ("client_id", endpoint.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        if let Some(secret) = endpoint.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }
        if let Some(redirect_uri) = endpoint.redirect_uri.as_deref() {
            params.push(("redirect_uri", redirect_uri));
        }
        if let Some(scope) = endpoint.scope.as_deref() {
            params.push(("scope", scope));
        }

        debug!(provider = %self.provider, url = %endpoint.token_url, "refreshing access token");

        let response = self
            .http_client
            .post(&endpoint.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| http::request_error(e, &self.provider))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::authentication(format!(
                "token refresh failed ({}): {}",
                status, body
            ))
            .with_provider(&self.provider));
        }

        let token: TokenResponse = http::read_json(response, &self.provider).await?;

        info!(provider = %self.provider, "refreshed access token");
        Ok(current.refreshed(
            token.access_token,
            token.refresh_token,
            token.expires_in,
            token.scope.as_deref(),
        ))
    }
}
