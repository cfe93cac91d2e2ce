//! Client configuration.
//!
//! Everything lives in one `config.toml`, by default at
//! `~/.config/examsync/config.toml`:
//!
//! ```toml
//! [sync]
//! preferred_provider = "outlook"
//! calendar_name = "Exams"
//!
//! [outlook]
//! client_id = "env::EXAMSYNC_OUTLOOK_CLIENT_ID"
//!
//! [google]
//! client_id = "123.apps.googleusercontent.com"
//! client_secret = "pass::google/examsync"
//! ```
//!
//! The daemon re-reads the `[sync]` table before every sync; the other
//! tables are read when the daemon starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use examsync_server::Preferences;

use crate::error::{ClientError, ClientResult};
use crate::secret;

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Sync preferences.
    pub sync: Preferences,

    /// Outlook adapter settings.
    #[cfg(feature = "outlook")]
    pub outlook: OutlookSettings,

    /// Google adapter settings.
    #[cfg(feature = "google")]
    pub google: GoogleSettings,

    /// Socket and state settings.
    pub server: ServerSettings,
}

/// Daemon connection and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Path to the daemon socket.
    pub socket_path: Option<PathBuf>,

    /// Path to the daemon state file.
    pub state_path: Option<PathBuf>,

    /// Seconds the client waits for a response. Syncs can be slow.
    pub timeout: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            socket_path: None,
            state_path: None,
            timeout: 120,
        }
    }
}

impl ServerSettings {
    /// Returns the response timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl ClientConfig {
    /// Loads the configuration.
    ///
    /// With an explicit path the file must exist. The default file may be
    /// absent, which yields defaults. A file that does not parse is always
    /// an error.
    pub fn load(path: Option<&Path>) -> ClientResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific file.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parses configuration text.
    pub fn parse(content: &str) -> ClientResult<Self> {
        toml::from_str(content).map_err(|e| ClientError::config(format!("failed to parse config: {}", e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("examsync")
            .join("config.toml")
    }

    /// Returns the configuration path in effect.
    pub fn path_or_default(path: Option<&Path>) -> PathBuf {
        path.map(Path::to_path_buf).unwrap_or_else(Self::default_path)
    }

    /// Checks every section, resolving secret references.
    pub fn validate(&self) -> ClientResult<()> {
        self.sync.validate().map_err(ClientError::Config)?;
        #[cfg(feature = "outlook")]
        self.outlook.to_provider_config()?;
        #[cfg(feature = "google")]
        self.google.to_provider_config(self.sync.timezone.as_deref())?;
        Ok(())
    }
}

/// `[outlook]` table.
#[cfg(feature = "outlook")]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlookSettings {
    /// Azure application id used to refresh tokens (supports `pass::` and
    /// `env::`).
    pub client_id: Option<String>,

    /// Redirect URI registered for the application.
    pub redirect_uri: Option<String>,

    /// Token file location.
    pub token_path: Option<PathBuf>,

    /// Graph API base URL override.
    pub base_url: Option<String>,

    /// Token endpoint override.
    pub token_url: Option<String>,
}

#[cfg(feature = "outlook")]
impl OutlookSettings {
    /// Builds the adapter configuration, resolving secret references.
    pub fn to_provider_config(&self) -> ClientResult<examsync_providers::outlook::OutlookConfig> {
        use examsync_providers::outlook::OutlookConfig;

        let mut config = OutlookConfig::new();
        if let Some(client_id) = secret::resolve_optional(self.client_id.as_deref())? {
            config = config.with_client_id(client_id);
        }
        if let Some(uri) = &self.redirect_uri {
            config = config.with_redirect_uri(uri);
        }
        if let Some(path) = &self.token_path {
            config = config.with_token_path(path);
        }
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url);
        }
        if let Some(url) = &self.token_url {
            config = config.with_token_url(url);
        }
        Ok(config)
    }
}

/// `[google]` table.
#[cfg(feature = "google")]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client id (supports `pass::` and `env::`).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::`).
    pub client_secret: Option<String>,

    /// Cloud Console credentials JSON, used when `client_id` is unset.
    pub credentials_file: Option<PathBuf>,

    /// Token file location.
    pub token_path: Option<PathBuf>,

    /// Calendar API base URL override.
    pub base_url: Option<String>,

    /// Token endpoint override.
    pub token_url: Option<String>,

    /// Zone attached to created events; falls back to `sync.timezone`.
    pub time_zone: Option<String>,
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Builds the adapter configuration, resolving secret references.
    pub fn to_provider_config(
        &self,
        fallback_zone: Option<&str>,
    ) -> ClientResult<examsync_providers::google::GoogleConfig> {
        use examsync_providers::google::GoogleConfig;

        let mut config = GoogleConfig::new();
        if let Some(credentials) = self.resolve_credentials()? {
            credentials
                .validate()
                .map_err(|e| ClientError::config(format!("invalid Google credentials: {}", e)))?;
            config = config.with_credentials(credentials);
        }
        if let Some(path) = &self.token_path {
            config = config.with_token_path(path);
        }
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url);
        }
        if let Some(url) = &self.token_url {
            config = config.with_token_url(url);
        }
        if let Some(zone) = self
            .time_zone
            .as_deref()
            .or(fallback_zone)
            .map(str::trim)
            .filter(|z| !z.is_empty())
        {
            config = config.with_time_zone(zone);
        }
        Ok(config)
    }

    /// Resolves client credentials: inline values first, then the
    /// credentials file. `None` means refresh is unavailable.
    pub(crate) fn resolve_credentials(
        &self,
    ) -> ClientResult<Option<examsync_providers::google::OAuthCredentials>> {
        use examsync_providers::google::OAuthCredentials;

        if let Some(client_id) = secret::resolve_optional(self.client_id.as_deref())? {
            let client_secret = secret::resolve_optional(self.client_secret.as_deref())?;
            return Ok(Some(OAuthCredentials::new(client_id, client_secret)));
        }

        match &self.credentials_file {
            Some(path) => OAuthCredentials::from_file(path).map(Some).map_err(|e| {
                ClientError::config(format!("failed to load {}: {}", path.display(), e))
            }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
#[cfg(all(feature = "outlook", feature = "google"))]
mod tests {
    use super::*;
    use examsync_server::ProviderKind;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ClientConfig::parse("").unwrap();
        assert_eq!(config.sync, Preferences::default());
        assert_eq!(config.server.timeout(), Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn full_file() {
        let config = ClientConfig::parse(
            r#"
[sync]
preferred_provider = "google"
calendar_name = "CBTF"
timezone = "America/Chicago"

[outlook]
client_id = "app-id"
base_url = "http://localhost:9000/v1.0/"

[google]
client_id = "id.apps.googleusercontent.com"
client_secret = "s3cret"
token_path = "/tmp/google.json"

[server]
socket_path = "/tmp/examsync.sock"
timeout = 30
"#,
        )
        .unwrap();

        assert_eq!(config.sync.preferred_provider, ProviderKind::Google);
        assert_eq!(config.server.socket_path, Some(PathBuf::from("/tmp/examsync.sock")));

        let outlook = config.outlook.to_provider_config().unwrap();
        assert_eq!(outlook.client_id.as_deref(), Some("app-id"));
        assert_eq!(outlook.base_url, "http://localhost:9000/v1.0");

        let google = config
            .google
            .to_provider_config(config.sync.timezone.as_deref())
            .unwrap();
        let credentials = google.credentials.unwrap();
        assert_eq!(credentials.client_secret.as_deref(), Some("s3cret"));
        assert_eq!(google.token_path, PathBuf::from("/tmp/google.json"));
        assert_eq!(google.time_zone, "America/Chicago");
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(ClientConfig::parse("[sync\n").is_err());
        assert!(ClientConfig::parse("[sync]\npreferred_provider = 3\n").is_err());
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ClientConfig::load(Some(dir.path().join("absent.toml").as_path())).is_err());
    }

    #[test]
    fn env_reference_for_outlook_client_id() {
        unsafe {
            std::env::set_var("_EXAMSYNC_TEST_OUTLOOK_ID", "from-env");
        }
        let settings = OutlookSettings {
            client_id: Some("env::_EXAMSYNC_TEST_OUTLOOK_ID".into()),
            ..Default::default()
        };
        let config = settings.to_provider_config().unwrap();
        assert_eq!(config.client_id.as_deref(), Some("from-env"));
        unsafe {
            std::env::remove_var("_EXAMSYNC_TEST_OUTLOOK_ID");
        }
    }

    #[test]
    fn google_credentials_file_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(
            &path,
            r#"{"installed":{"client_id":"file.apps.googleusercontent.com","client_secret":"x"}}"#,
        )
        .unwrap();

        let settings = GoogleSettings {
            credentials_file: Some(path),
            ..Default::default()
        };
        let credentials = settings.resolve_credentials().unwrap().unwrap();
        assert_eq!(credentials.client_id, "file.apps.googleusercontent.com");

        assert!(GoogleSettings::default().resolve_credentials().unwrap().is_none());
    }

    #[test]
    fn invalid_google_client_id_fails_validation() {
        let config = ClientConfig::parse("[google]\nclient_id = \"not-a-google-id\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn dump_roundtrips_through_toml() {
        let config = ClientConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back = ClientConfig::parse(&text).unwrap();
        assert_eq!(back.sync, config.sync);
    }
}
