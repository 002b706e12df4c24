//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available —
//! no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  pub default_backend_url: String,

  // Backend endpoints
  pub comments_path: String,
  pub search_path: String,
  pub checkout_path: String,
  pub user_status_path: String,
  pub login_path: String,

  // Persisted client state
  pub session_file: String,
  pub log_file_prefix: String,

  // AI search
  pub remote_timeout_secs: u64,

  // TUI
  pub load_more_threshold: usize,
  pub error_display_secs: u64,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedded_constants_parse() {
    let c = constants();
    assert!(c.default_backend_url.starts_with("http"));
    assert!(c.comments_path.starts_with('/'));
    assert!(c.search_path.starts_with('/'));
    assert!(c.load_more_threshold > 0);
  }
}
