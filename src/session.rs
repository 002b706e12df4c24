//! Session store: one opaque bearer token persisted in the platform data directory.
//!
//! Presence of a token means requests carry `Authorization: Bearer <token>`.
//! Expiry is never tracked locally; the backend reports it with a 401.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::constants;

#[derive(Serialize, Deserialize, Default)]
struct SessionFile {
  access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
  path: Option<PathBuf>,
}

impl SessionStore {
  /// Store backed by `session.toml` under the platform data directory.
  /// Without a resolvable home directory the store behaves as permanently signed out.
  pub fn open() -> Self {
    let path = ProjectDirs::from("", "", "yc").map(|dirs| dirs.data_dir().join(&constants().session_file));
    Self { path }
  }

  pub fn at(path: impl Into<PathBuf>) -> Self {
    Self { path: Some(path.into()) }
  }

  pub fn path(&self) -> Option<&Path> {
    self.path.as_deref()
  }

  pub fn get(&self) -> Option<String> {
    let path = self.path.as_ref()?;
    let content = std::fs::read_to_string(path).ok()?;
    let file: SessionFile = toml::from_str(&content).ok()?;
    file.access_token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
  }

  pub fn set(&self, token: &str) -> Result<()> {
    let path = self.path.as_ref().context("No data directory available for the session file")?;
    if let Some(dir) = path.parent() {
      std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let file = SessionFile { access_token: Some(token.trim().to_string()) };
    let content = toml::to_string(&file).context("Failed to serialize session")?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "session: token stored");
    Ok(())
  }

  pub fn clear(&self) -> Result<()> {
    let Some(path) = self.path.as_ref() else { return Ok(()) };
    match std::fs::remove_file(path) {
      Ok(()) => {
        info!(path = %path.display(), "session: token cleared");
        Ok(())
      }
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(anyhow::Error::new(e).context(format!("Failed to remove {}", path.display()))),
    }
  }
}

/// Pull the access token out of what the user pasted after signing in.
///
/// Accepts either the full redirect URL (`…/auth/success?token=abc`) or the bare token.
pub fn token_from_redirect(input: &str) -> Option<String> {
  let trimmed = input.trim();
  if trimmed.is_empty() {
    return None;
  }
  if let Ok(url) = Url::parse(trimmed)
    && url.has_host()
  {
    return url.query_pairs().find(|(k, _)| k == "token").map(|(_, v)| v.into_owned()).filter(|t| !t.is_empty());
  }
  if trimmed.chars().any(char::is_whitespace) {
    return None;
  }
  Some(trimmed.to_string())
}
