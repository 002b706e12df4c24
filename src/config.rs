use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::constants;
use crate::matcher::MatchScope;

/// Environment variable that overrides the configured backend URL.
pub const BACKEND_URL_ENV: &str = "YC_BACKEND_URL";

/// User preferences persisted as `prefs.toml` in the platform config directory.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub backend_url: Option<String>,
  pub theme_name: Option<String>,
  /// Include replies when matching keywords locally.
  #[serde(default)]
  pub search_replies: bool,
  /// Seconds before a hung AI search gives up. `0` disables the timeout.
  pub remote_timeout_secs: Option<u64>,
}

fn config_path() -> Option<PathBuf> {
  ProjectDirs::from("", "", "yc").map(|dirs| dirs.config_dir().join("prefs.toml"))
}

impl Config {
  pub fn load() -> Self {
    config_path().map(|path| Self::load_from(&path)).unwrap_or_default()
  }

  /// Read preferences from `path`, falling back to defaults when the file is missing or unreadable.
  pub fn load_from(path: &Path) -> Self {
    if let Ok(content) = std::fs::read_to_string(path)
      && let Ok(config) = toml::from_str(&content)
    {
      return config;
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(path) = config_path()
      && let Err(e) = self.save_to(&path)
    {
      tracing::warn!(err = %e, "config: failed to save preferences");
    }
  }

  pub fn save_to(&self, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
      std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let content = toml::to_string(self).context("Failed to serialize preferences")?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
  }

  /// Resolve the backend base URL: CLI flag, then `YC_BACKEND_URL`, then config, then the built-in default.
  /// Trailing slashes are removed so endpoint paths can be appended directly.
  pub fn backend_url(&self, cli_override: Option<&str>) -> String {
    let env_value = std::env::var(BACKEND_URL_ENV).ok();
    let url = [cli_override, env_value.as_deref(), self.backend_url.as_deref()]
      .into_iter()
      .flatten()
      .map(str::trim)
      .find(|s| !s.is_empty())
      .unwrap_or(&constants().default_backend_url);
    url.trim_end_matches('/').to_string()
  }

  pub fn match_scope(&self) -> MatchScope {
    if self.search_replies { MatchScope::WithReplies } else { MatchScope::TopLevel }
  }

  pub fn remote_timeout(&self) -> Option<Duration> {
    match self.remote_timeout_secs.unwrap_or(constants().remote_timeout_secs) {
      0 => None,
      secs => Some(Duration::from_secs(secs)),
    }
  }
}
