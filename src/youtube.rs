use regex::Regex;
use std::sync::LazyLock;

/// Length of a YouTube video identifier.
pub const VIDEO_ID_LEN: usize = 11;

/// Id embedded in the common URL shapes: `watch?v=`, `&v=`, `youtu.be/`, `embed/`, `v/`, `shorts/`.
/// The id must be followed by a delimiter or the end of input, so 12-character ids never match.
static URL_ID: LazyLock<Regex> = LazyLock::new(|| {
  // Safety: the pattern is a literal; a typo here fails every test in this module.
  Regex::new(r"(?:youtu\.be/|/embed/|/v/|/shorts/|[?&]v=)([A-Za-z0-9_-]{11})(?:[#&?/]|$)")
    .expect("video id pattern must compile")
});

fn is_id_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Extract an 11-character video identifier from a YouTube URL or a bare id.
/// Returns None for anything else; callers report a validation error and skip the fetch.
pub fn extract_video_id(input: &str) -> Option<String> {
  let trimmed = input.trim();
  if trimmed.is_empty() {
    return None;
  }

  if let Some(caps) = URL_ID.captures(trimmed) {
    return caps.get(1).map(|m| m.as_str().to_string());
  }

  // Bare id: exactly 11 characters from the id alphabet `[A-Za-z0-9_-]`.
  // Any other 11-character string (punctuation, non-ASCII) is rejected rather than sent to the backend.
  if trimmed.chars().count() == VIDEO_ID_LEN && trimmed.chars().all(is_id_char) {
    return Some(trimmed.to_string());
  }

  None
}

/// Canonical watch URL for a video id.
pub fn watch_url(video_id: &str) -> String {
  format!("https://www.youtube.com/watch?v={}", video_id)
}
