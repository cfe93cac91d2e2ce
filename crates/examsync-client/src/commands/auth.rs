//! Token commands.
//!
//! examsync never runs an interactive OAuth flow. Tokens are obtained
//! elsewhere and imported here; the daemon refreshes them afterwards.

use std::path::{Path, PathBuf};

use tracing::info;

use examsync_providers::{TokenStorage, parse_token};
use examsync_server::ProviderKind;

use crate::commands::read_input;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Returns the token file location for a provider.
pub fn token_path(kind: ProviderKind, config: &ClientConfig) -> ClientResult<PathBuf> {
    match kind {
        #[cfg(feature = "outlook")]
        ProviderKind::Outlook => Ok(config
            .outlook
            .token_path
            .clone()
            .unwrap_or_else(examsync_providers::outlook::OutlookConfig::default_token_path)),
        #[cfg(feature = "google")]
        ProviderKind::Google => Ok(config
            .google
            .token_path
            .clone()
            .unwrap_or_else(examsync_providers::google::GoogleConfig::default_token_path)),
        #[allow(unreachable_patterns)]
        other => Err(ClientError::config(format!(
            "{} support is not compiled in",
            other
        ))),
    }
}

/// Stores a token read from `file` (or stdin).
pub fn import(kind: ProviderKind, file: Option<&Path>, config: &ClientConfig) -> ClientResult<()> {
    let content = read_input(file)?;
    let path = token_path(kind, config)?;
    let token = import_into(&TokenStorage::new(&path), &content)?;

    info!(provider = %kind, path = %path.display(), "token imported");
    println!("Saved {} token to {}", kind, path.display());
    if token.refresh_token().is_none() {
        println!("The token has no refresh token; import a new one when it expires.");
    }
    Ok(())
}

fn import_into(
    storage: &TokenStorage,
    content: &str,
) -> ClientResult<examsync_providers::TokenInfo> {
    let token = parse_token(content)?;
    if token.access_token().is_none() {
        return Err(ClientError::config("token has no access_token"));
    }
    storage.save(&token)?;
    Ok(token)
}

/// Prints where each token lives and whether it is usable.
pub fn show(config: &ClientConfig) -> ClientResult<()> {
    for kind in ProviderKind::ALL {
        let Ok(path) = token_path(kind, config) else {
            continue;
        };
        println!("{}: {}", kind, describe(&TokenStorage::new(&path)));
    }
    Ok(())
}

fn describe(storage: &TokenStorage) -> String {
    let path = storage.path().display();
    match storage.load() {
        Ok(None) => format!("no token ({})", path),
        Ok(Some(token)) => {
            let mut state = vec![if token.is_expired() { "expired" } else { "valid" }];
            if token.refresh_token().is_some() {
                state.push("refreshable");
            }
            format!("{} ({})", state.join(", "), path)
        }
        Err(e) => format!("unreadable: {} ({})", e, path),
    }
}

/// Removes a stored token.
pub fn clear(kind: ProviderKind, config: &ClientConfig) -> ClientResult<()> {
    let path = token_path(kind, config)?;
    TokenStorage::new(&path).clear()?;
    println!("Removed {} token", kind);
    Ok(())
}
