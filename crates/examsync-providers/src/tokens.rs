//! OAuth token persistence.
//!
//! Each provider keeps its token in its own JSON file. The file is read
//! fresh on every access so that tokens imported or refreshed by another
//! process are picked up by the next sync.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Seconds subtracted from `expires_in` so tokens are refreshed early.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A stored OAuth token set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Bearer token for API requests. May be empty in a damaged file.
    #[serde(default)]
    pub access_token: String,

    /// Refresh token, when the authorization granted offline access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// When the access token expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Granted scopes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,

    /// When the token was last refreshed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<DateTime<Utc>>,
}

impl TokenInfo {
    /// Creates a token from an OAuth token response.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(expiry_from_now),
            scopes,
            last_refresh: Some(Utc::now()),
        }
    }

    /// Creates a token holding only an access token.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Self::default()
        }
    }

    /// Returns the access token if it is non-empty.
    pub fn access_token(&self) -> Option<&str> {
        let token = self.access_token.trim();
        (!token.is_empty()).then_some(token)
    }

    /// Returns the refresh token if it is non-empty.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Returns true if the access token is known to be expired.
    ///
    /// Tokens without an expiry are assumed valid.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    /// Applies a refresh response, keeping the old refresh token when the
    /// provider did not rotate it.
    pub fn refreshed(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scope: Option<&str>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.or_else(|| self.refresh_token.clone()),
            expires_at: expires_in_secs.map(expiry_from_now),
            scopes: scope
                .map(|s| s.split_whitespace().map(String::from).collect())
                .unwrap_or_else(|| self.scopes.clone()),
            last_refresh: Some(Utc::now()),
        }
    }
}

fn expiry_from_now(secs: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_MARGIN_SECS)
}

/// On-disk shapes accepted when reading a token file.
///
/// Older installs stored the bare access token as a JSON string.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredToken {
    Bare(String),
    Full(TokenInfo),
}

impl From<StoredToken> for TokenInfo {
    fn from(stored: StoredToken) -> Self {
        match stored {
            StoredToken::Bare(token) => TokenInfo::bearer(token),
            StoredToken::Full(info) => info,
        }
    }
}

/// Parses a token file's content.
///
/// Accepts a bare JSON string or a token object.
pub fn parse_token(content: &str) -> ProviderResult<TokenInfo> {
    let stored: StoredToken = serde_json::from_str(content).map_err(|e| {
        ProviderError::configuration(format!("failed to parse token file: {}", e))
    })?;
    Ok(stored.into())
}

/// File-backed token storage for one provider.
#[derive(Debug, Clone)]
pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    /// Creates a storage at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the token from disk.
    ///
    /// Returns `Ok(None)` if no token file exists.
    pub fn load(&self) -> ProviderResult<Option<TokenInfo>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no token file");
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to read token file: {}", e))
                .with_source(e)
        })?;

        parse_token(&content).map(Some)
    }

    /// Returns the stored access token, or an authentication error when
    /// there is none.
    pub fn access_token(&self) -> ProviderResult<String> {
        self.load()?
            .as_ref()
            .and_then(TokenInfo::access_token)
            .map(String::from)
            .ok_or_else(|| ProviderError::authentication("no token"))
    }

    /// Writes the token to disk atomically with owner-only permissions.
    pub fn save(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!("failed to create token directory: {}", e))
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {}", e)))?;

        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600));
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename token file: {}", e))
        })?;

        debug!(path = %self.path.display(), "saved tokens");
        Ok(())
    }

    /// Removes the token file.
    pub fn clear(&self) -> ProviderResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::configuration(format!("failed to remove token file: {}", e))
            })?;
            info!(path = %self.path.display(), "cleared tokens");
        }
        Ok(())
    }

    /// Returns the token file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;

    fn storage() -> (tempfile::TempDir, TokenStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("outlook-token.json"));
        (dir, storage)
    }

    #[test]
    fn accepts_bare_string_and_object() {
        let bare = parse_token(r#""ya29.abc""#).unwrap();
        assert_eq!(bare.access_token(), Some("ya29.abc"));
        assert!(bare.refresh_token().is_none());

        let full = parse_token(
            r#"{"access_token": "eyJ0", "refresh_token": "r1", "token_type": "Bearer",
                "scope": "Calendars.ReadWrite", "expires_in": 3599}"#,
        )
        .unwrap();
        assert_eq!(full.access_token(), Some("eyJ0"));
        assert_eq!(full.refresh_token(), Some("r1"));
    }

    #[test]
    fn object_without_access_token_has_none() {
        let info = parse_token(r#"{"refresh_token": "r1"}"#).unwrap();
        assert!(info.access_token().is_none());
        assert_eq!(info.refresh_token(), Some("r1"));

        let blank = parse_token(r#"{"access_token": "  "}"#).unwrap();
        assert!(blank.access_token().is_none());
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_token("[1, 2]").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[test]
    fn save_then_load() {
        let (_dir, storage) = storage();
        assert!(storage.load().unwrap().is_none());

        let token = TokenInfo::new("access", Some("refresh".into()), Some(3600), vec![]);
        storage.save(&token).unwrap();

        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded, token);
        assert!(!loaded.is_expired());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn missing_token_is_auth_failure() {
        let (_dir, storage) = storage();
        let err = storage.access_token().unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(err.message(), "no token");

        fs::write(storage.path(), r#"{"refresh_token": "r"}"#).unwrap();
        assert!(storage.access_token().unwrap_err().is_auth_failure());

        fs::write(storage.path(), r#""bare-token""#).unwrap();
        assert_eq!(storage.access_token().unwrap(), "bare-token");
    }

    #[test]
    fn refresh_keeps_unrotated_refresh_token() {
        let token = TokenInfo::new("old", Some("r1".into()), Some(10), vec!["a".into()]);
        let refreshed = token.refreshed("new", None, Some(3600), None);
        assert_eq!(refreshed.access_token(), Some("new"));
        assert_eq!(refreshed.refresh_token(), Some("r1"));
        assert_eq!(refreshed.scopes, vec!["a".to_string()]);

        let rotated = token.refreshed("new", Some("r2".into()), None, Some("x y"));
        assert_eq!(rotated.refresh_token(), Some("r2"));
        assert_eq!(rotated.scopes, vec!["x".to_string(), "y".to_string()]);
        assert!(rotated.expires_at.is_none());
    }

    #[test]
    fn expiry() {
        let mut token = TokenInfo::bearer("a");
        assert!(!token.is_expired());
        token.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(token.is_expired());
    }

    #[test]
    fn clear_removes_file() {
        let (_dir, storage) = storage();
        storage.save(&TokenInfo::bearer("a")).unwrap();
        storage.clear().unwrap();
        assert!(!storage.path().exists());
        storage.clear().unwrap();
    }
}
