//! Configuration commands.

use std::path::Path;

use tracing::info;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// `[sync]` keys accepted by `config set`.
const SYNC_KEYS: &[&str] = &[
    "preferred_provider",
    "calendar_name",
    "event_notes",
    "event_tag",
    "debug_mode",
    "timezone",
    "min_sync_interval_secs",
];

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Validate the configuration, resolving secret references.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate()?;
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}

/// Set one `[sync]` preference in the file, keeping comments and the other
/// tables as they are.
pub fn set(path: &Path, key: &str, value: &str) -> ClientResult<()> {
    let content = if path.exists() {
        std::fs::read_to_string(path)?
    } else {
        String::new()
    };

    let updated = set_in_document(&content, key, value)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, updated)?;

    info!(key, path = %path.display(), "preference updated");
    println!("Set sync.{} in {}", key, path.display());
    Ok(())
}

fn set_in_document(content: &str, key: &str, value: &str) -> ClientResult<String> {
    if !SYNC_KEYS.contains(&key) {
        return Err(ClientError::config(format!(
            "unknown preference `{}` (expected one of: {})",
            key,
            SYNC_KEYS.join(", ")
        )));
    }

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| ClientError::config(format!("failed to parse config: {}", e)))?;

    if !doc.contains_key("sync") {
        doc["sync"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let sync = doc["sync"]
        .as_table_mut()
        .ok_or_else(|| ClientError::config("`sync` is not a table"))?;

    sync[key] = match key {
        "debug_mode" => toml_edit::value(
            value
                .trim()
                .parse::<bool>()
                .map_err(|_| ClientError::config(format!("{} expects true or false", key)))?,
        ),
        "min_sync_interval_secs" => toml_edit::value(
            value
                .trim()
                .parse::<u32>()
                .map_err(|_| ClientError::config(format!("{} expects seconds", key)))?
                as i64,
        ),
        _ => toml_edit::value(value),
    };

    let updated = doc.to_string();
    let parsed = ClientConfig::parse(&updated)?;
    parsed.sync.validate().map_err(ClientError::Config)?;
    Ok(updated)
}
