//! Secret references in `config.toml`.
//!
//! Credential values may point outside the file:
//!
//! - `pass::path/in/store`: first line of `pass show path/in/store`
//! - `env::VAR_NAME`: the environment variable
//! - anything else is taken literally

use std::process::Command;

use crate::error::{ClientError, ClientResult};

/// Resolves a possibly-referenced secret value.
pub fn resolve(value: &str) -> ClientResult<String> {
    let value = value.trim();
    if let Some(path) = value.strip_prefix("pass::") {
        from_pass(path)
    } else if let Some(var) = value.strip_prefix("env::") {
        std::env::var(var)
            .map_err(|_| ClientError::Secret(format!("environment variable `{}` is not set", var)))
    } else {
        Ok(value.to_string())
    }
}

/// Resolves an optional value; blank values count as unset.
pub fn resolve_optional(value: Option<&str>) -> ClientResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => resolve(v).map(Some),
        None => Ok(None),
    }
}

fn from_pass(path: &str) -> ClientResult<String> {
    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| ClientError::Secret(format!("failed to run `pass show {}`: {}", path, e)))?;

    if !output.status.success() {
        return Err(ClientError::Secret(format!(
            "`pass show {}` failed ({}): {}",
            path,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| ClientError::Secret(format!("`pass show {}` produced no output", path)))
}
