use serde::{Deserialize, Deserializer, Serialize};

/// Decode `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One comment or reply as returned by the backend.
///
/// `text` may carry markup from the platform (line breaks, links); it is only ever displayed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Comment {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub author: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub text: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub likes: Option<u64>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub replies: Vec<Comment>,
}

impl Comment {
  pub fn author_label(&self) -> &str {
    self.author.as_deref().filter(|a| !a.trim().is_empty()).unwrap_or("unknown")
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
  Success,
  Error,
}

/// Body of the comment listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPage {
  pub status: PageStatus,
  #[serde(default, deserialize_with = "null_as_default")]
  pub video_id: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub comments: Vec<Comment>,
  #[serde(default)]
  pub next_page_token: Option<String>,
  /// Server-reported comment count for the whole video, when known.
  #[serde(default)]
  pub total_results: Option<u64>,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub detail: Option<String>,
}

impl CommentPage {
  pub fn empty(video_id: &str) -> Self {
    Self {
      status: PageStatus::Success,
      video_id: video_id.to_string(),
      comments: Vec::new(),
      next_page_token: None,
      total_results: None,
      message: None,
      detail: None,
    }
  }

  /// More pages exist iff the cursor is present and non-empty.
  pub fn has_more(&self) -> bool {
    self.next_page_token.as_deref().is_some_and(|t| !t.is_empty())
  }
}

/// Which stage of a search cycle produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
  /// Instant client-side substring matches.
  Local,
  /// Local matches followed by deduplicated AI matches.
  Merged,
}

/// How a comment ended up in a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
  /// The keyword occurs literally in the comment.
  Literal,
  /// Surfaced only by the AI search; the keyword does not occur literally.
  Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
  pub comment: Comment,
  pub kind: MatchKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
  pub keyword: String,
  pub matches: Vec<SearchMatch>,
  pub source: ResultSource,
}

impl SearchResult {
  #[cfg(test)]
  pub fn texts(&self) -> Vec<&str> {
    self.matches.iter().map(|m| m.comment.text.as_str()).collect()
  }

  pub fn context_count(&self) -> usize {
    self.matches.iter().filter(|m| m.kind == MatchKind::Context).count()
  }
}
