use tracing::{debug, info};

use crate::models::{Comment, CommentPage};

/// Concatenate `incoming` after `existing`, adopting the incoming cursor.
pub fn append(existing: CommentPage, incoming: CommentPage) -> CommentPage {
  let mut merged = existing;
  merged.comments.extend(incoming.comments);
  merged.next_page_token = incoming.next_page_token;
  if incoming.total_results.is_some() {
    merged.total_results = incoming.total_results;
  }
  merged
}

/// Which fetch, if any, is in flight for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
  Idle,
  FirstPage,
  MorePages,
}

/// Accumulated comments for one video.
///
/// Switching videos means building a new session; nothing carries over.
#[derive(Debug, Clone)]
pub struct FetchSession {
  page: CommentPage,
  load: LoadState,
}

impl FetchSession {
  /// New session for `video_id` with its first page in flight.
  pub fn start(video_id: &str) -> Self {
    info!(video_id, "pagination: new session");
    Self { page: CommentPage::empty(video_id), load: LoadState::FirstPage }
  }

  pub fn video_id(&self) -> &str {
    &self.page.video_id
  }

  pub fn comments(&self) -> &[Comment] {
    &self.page.comments
  }

  pub fn total_results(&self) -> Option<u64> {
    self.page.total_results
  }

  pub fn has_more(&self) -> bool {
    self.page.has_more()
  }

  pub fn load_state(&self) -> LoadState {
    self.load
  }

  pub fn is_loading(&self) -> bool {
    self.load != LoadState::Idle
  }

  /// Claim the next page: returns the cursor and marks the load in flight.
  /// Returns None while any fetch is in flight or once the last page has arrived.
  pub fn begin_load_more(&mut self) -> Option<String> {
    if self.is_loading() || !self.has_more() {
      return None;
    }
    let cursor = self.page.next_page_token.clone()?;
    self.load = LoadState::MorePages;
    debug!(video_id = %self.page.video_id, "pagination: load more claimed");
    Some(cursor)
  }

  /// Append a fetched page. Pages for another video are ignored and leave the session untouched.
  pub fn apply_page(&mut self, page: CommentPage) -> bool {
    if page.video_id != self.page.video_id {
      debug!(expected = %self.page.video_id, got = %page.video_id, "pagination: ignoring page for other video");
      return false;
    }
    let existing = std::mem::replace(&mut self.page, CommentPage::empty(&page.video_id));
    self.page = append(existing, page);
    self.load = LoadState::Idle;
    info!(
      video_id = %self.page.video_id,
      total = self.page.comments.len(),
      more = self.has_more(),
      "pagination: page applied"
    );
    true
  }

  /// Release the in-flight claim after a failed fetch.
  pub fn abort_load(&mut self) {
    self.load = LoadState::Idle;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn page(video_id: &str, texts: &[&str], cursor: Option<&str>) -> CommentPage {
    CommentPage {
      comments: texts.iter().map(|t| Comment { text: t.to_string(), ..Comment::default() }).collect(),
      next_page_token: cursor.map(str::to_string),
      ..CommentPage::empty(video_id)
    }
  }

  fn texts(session: &FetchSession) -> Vec<&str> {
    session.comments().iter().map(|c| c.text.as_str()).collect()
  }

  #[test]
  fn append_preserves_order_and_adopts_cursor() {
    let p1 = page("v", &["a", "b"], Some("next"));
    let p2 = page("v", &["c", "a"], None);
    let merged = append(p1, p2);
    let got: Vec<&str> = merged.comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(got, vec!["a", "b", "c", "a"]);
    assert_eq!(merged.next_page_token, None);
    assert!(!merged.has_more());
  }

  #[test]
  fn first_page_then_more() {
    let mut session = FetchSession::start("v");
    assert_eq!(session.load_state(), LoadState::FirstPage);
    assert!(session.apply_page(page("v", &["a", "b"], Some("c2"))));
    assert!(session.has_more());
    assert_eq!(session.begin_load_more().as_deref(), Some("c2"));
    assert!(session.apply_page(page("v", &["c"], None)));
    assert_eq!(texts(&session), vec!["a", "b", "c"]);
    assert!(!session.has_more());
    assert_eq!(session.begin_load_more(), None);
  }

  #[test]
  fn double_load_more_claims_once() {
    let mut session = FetchSession::start("v");
    session.apply_page(page("v", &["a"], Some("c2")));
    assert!(session.begin_load_more().is_some());
    assert_eq!(session.begin_load_more(), None);
    assert_eq!(session.load_state(), LoadState::MorePages);
  }

  #[test]
  fn no_load_more_during_first_page() {
    let mut session = FetchSession::start("v");
    assert_eq!(session.begin_load_more(), None);
  }

  #[test]
  fn abort_releases_claim() {
    let mut session = FetchSession::start("v");
    session.apply_page(page("v", &["a"], Some("c2")));
    session.begin_load_more();
    session.abort_load();
    assert!(!session.is_loading());
    assert_eq!(session.begin_load_more().as_deref(), Some("c2"));
    assert_eq!(texts(&session), vec!["a"]);
  }

  #[test]
  fn page_for_other_video_is_ignored() {
    let mut session = FetchSession::start("v");
    assert!(!session.apply_page(page("other", &["x"], None)));
    assert!(session.comments().is_empty());
    assert!(session.is_loading());
  }

  #[test]
  fn new_session_discards_everything() {
    let mut session = FetchSession::start("a");
    session.apply_page(page("a", &["old"], Some("cursor-a")));
    session = FetchSession::start("b");
    assert_eq!(session.video_id(), "b");
    assert!(session.comments().is_empty());
    assert!(!session.has_more());
  }

  #[test]
  fn empty_cursor_ends_pagination() {
    let mut session = FetchSession::start("v");
    session.apply_page(page("v", &["a"], Some("")));
    assert!(!session.has_more());
    assert_eq!(session.begin_load_more(), None);
  }
}
