use anyhow::{Context, Result};
use ratatui::widgets::ListState;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::access::{self, FetchResolution, GENERIC_ERROR_MESSAGE, Prompt};
use crate::backend::{AccountStatus, BackendClient, CheckoutOutcome, FetchOutcome, RemoteSearch};
use crate::config::Config;
use crate::constants::constants;
use crate::models::{Comment, MatchKind, SearchResult};
use crate::pagination::{FetchSession, LoadState};
use crate::search::{SearchOrchestrator, SearchUpdate};
use crate::session::{SessionStore, token_from_redirect};
use crate::theme::{THEMES, theme_index};
use crate::youtube::{extract_video_id, watch_url};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  /// Editing the video URL.
  Input,
  /// Browsing fetched comments or search results.
  Comments,
  /// Editing the search keyword.
  Search,
  /// A purchase or sign-in prompt is up.
  Prompt,
}

/// In-flight async task receivers and handles.
#[derive(Default)]
pub(crate) struct AsyncTasks {
  pub(crate) fetch_rx: Option<oneshot::Receiver<FetchOutcome>>,
  pub(crate) fetch_handle: Option<JoinHandle<()>>,
  pub(crate) checkout_rx: Option<oneshot::Receiver<Result<CheckoutOutcome>>>,
  pub(crate) status_rx: Option<oneshot::Receiver<Result<AccountStatus>>>,
}

/// Backend-reported failure shown inline above the comment list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineError {
  pub message: String,
  pub detail: Option<String>,
}

/// A single row in the comment pane.
pub struct Row<'a> {
  pub comment: &'a Comment,
  pub kind: MatchKind,
}

pub struct App {
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  /// Keyword being edited in search mode.
  pub keyword: String,
  pub keyword_cursor: usize,
  pub keyword_scroll: usize,
  pub mode: AppMode,
  pub theme_index: usize,
  pub list_state: ListState,
  pub session: Option<FetchSession>,
  pub search: SearchOrchestrator,
  pub prompt: Option<Prompt>,
  pub inline_error: Option<InlineError>,
  pub account: Option<AccountStatus>,
  pub last_error: Option<String>,
  pub status_message: Option<String>,
  /// Informational message, lower priority than status and errors.
  pub info_message: Option<String>,
  pub should_quit: bool,
  pub started_at: Instant,
  pub(crate) tasks: AsyncTasks,
  config: Config,
  backend: Arc<BackendClient>,
  store: SessionStore,
  /// Whether a token was stored; read once at startup and updated on sign-in.
  signed_in: bool,
  error_time: Option<Instant>,
}

impl App {
  pub fn new(config: Config, backend: Arc<BackendClient>, store: SessionStore) -> Self {
    let remote: Arc<dyn RemoteSearch> = backend.clone();
    let signed_in = store.get().is_some();
    Self {
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      keyword: String::new(),
      keyword_cursor: 0,
      keyword_scroll: 0,
      mode: AppMode::Input,
      theme_index: theme_index(config.theme_name.as_deref()),
      list_state: ListState::default(),
      session: None,
      search: SearchOrchestrator::new(remote, config.match_scope()),
      prompt: None,
      inline_error: None,
      account: None,
      last_error: None,
      status_message: None,
      info_message: None,
      should_quit: false,
      started_at: Instant::now(),
      tasks: AsyncTasks::default(),
      config,
      backend,
      store,
      signed_in,
      error_time: None,
    }
  }

  pub fn theme(&self) -> &'static crate::theme::Theme {
    // Safety: theme_index comes from theme_index() or modular arithmetic in next_theme().
    &THEMES[self.theme_index]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.config.theme_name = Some(self.theme().name.to_string());
    self.config.save();
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().error_display_secs)
    {
      self.last_error = None;
      self.error_time = None;
    }
  }

  pub fn is_signed_in(&self) -> bool {
    self.signed_in
  }

  pub fn comments(&self) -> &[Comment] {
    self.session.as_ref().map(|s| s.comments()).unwrap_or(&[])
  }

  pub fn search_result(&self) -> Option<&SearchResult> {
    self.search.current()
  }

  /// What the comment pane shows: search matches while a search is active, otherwise every fetched comment.
  pub fn rows(&self) -> Vec<Row<'_>> {
    match self.search.current() {
      Some(result) => result.matches.iter().map(|m| Row { comment: &m.comment, kind: m.kind }).collect(),
      None => self.comments().iter().map(|c| Row { comment: c, kind: MatchKind::Literal }).collect(),
    }
  }

  pub fn row_count(&self) -> usize {
    match self.search.current() {
      Some(result) => result.matches.len(),
      None => self.comments().len(),
    }
  }

  fn clamp_selection(&mut self) {
    let count = self.row_count();
    match self.list_state.selected() {
      _ if count == 0 => self.list_state.select(None),
      Some(i) if i >= count => self.list_state.select(Some(count - 1)),
      None => self.list_state.select(Some(0)),
      Some(_) => {}
    }
  }

  // --- Comment fetching ---

  /// Validate the URL input and start a fresh session for its video.
  pub fn trigger_fetch(&mut self) {
    let raw = self.input.trim().to_string();
    if raw.is_empty() {
      self.set_error("Enter a YouTube URL or video id.".to_string());
      return;
    }
    match extract_video_id(&raw) {
      Some(video_id) => self.begin_video_session(&video_id),
      None if raw.contains("token=") => self.accept_token(&raw),
      None => {
        warn!(input = %raw, "fetch: could not extract a video id");
        self.set_error("Not a valid YouTube URL or video id.".to_string());
      }
    }
  }

  /// Discard everything tied to the previous video and fetch the first page of `video_id`.
  pub fn begin_video_session(&mut self, video_id: &str) {
    info!(video_id, "fetch: new video");
    self.cancel_fetch();
    self.clear_search();
    self.prompt = None;
    self.inline_error = None;
    self.info_message = None;
    self.clear_error();
    self.session = Some(FetchSession::start(video_id));
    self.list_state.select(None);
    self.mode = AppMode::Comments;
    self.status_message = Some("Fetching comments…".to_string());
    self.spawn_fetch(video_id.to_string(), None);
  }

  /// Fetch the next page when the session has one and nothing is in flight.
  pub fn trigger_load_more(&mut self) {
    let Some(session) = self.session.as_mut() else { return };
    let Some(cursor) = session.begin_load_more() else { return };
    let video_id = session.video_id().to_string();
    debug!(video_id = %video_id, "fetch: loading more");
    self.status_message = Some("Loading more comments…".to_string());
    self.spawn_fetch(video_id, Some(cursor));
  }

  fn spawn_fetch(&mut self, video_id: String, cursor: Option<String>) {
    let backend = Arc::clone(&self.backend);
    let token = self.store.get();
    let (tx, rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
      let outcome = backend.fetch_comments(&video_id, cursor.as_deref(), token.as_deref()).await;
      let _ = tx.send(outcome);
    });
    self.tasks.fetch_rx = Some(rx);
    self.tasks.fetch_handle = Some(handle);
  }

  fn cancel_fetch(&mut self) {
    if let Some(handle) = self.tasks.fetch_handle.take() {
      handle.abort();
    }
    self.tasks.fetch_rx = None;
  }

  pub(crate) fn apply_fetch_outcome(&mut self, outcome: FetchOutcome) {
    self.status_message = None;
    self.tasks.fetch_handle = None;
    let first_page = self.session.as_ref().is_some_and(|s| s.load_state() == LoadState::FirstPage);

    match access::resolve(outcome) {
      FetchResolution::Loaded(page) => {
        let Some(session) = self.session.as_mut() else { return };
        if !session.apply_page(page) {
          return;
        }
        if first_page && session.comments().is_empty() {
          self.info_message = Some("This video has no comments yet.".to_string());
        }
        if self.search.current().is_none() {
          self.clamp_selection();
        }
      }
      FetchResolution::Prompt(prompt) => {
        self.abort_load();
        info!(?prompt, "fetch: access prompt");
        self.prompt = Some(prompt);
        self.mode = AppMode::Prompt;
      }
      FetchResolution::InlineError { message, detail } => {
        self.abort_load();
        self.inline_error = Some(InlineError { message, detail });
      }
      FetchResolution::GenericError => {
        self.abort_load();
        self.set_error(GENERIC_ERROR_MESSAGE.to_string());
      }
    }
  }

  fn abort_load(&mut self) {
    if let Some(session) = self.session.as_mut() {
      session.abort_load();
    }
  }

  // --- Keyword search ---

  /// Submit the keyword being edited. Returns false when validation rejected it.
  pub fn trigger_search(&mut self) -> bool {
    let keyword = self.keyword.trim().to_string();
    if keyword.is_empty() {
      self.set_error("Enter a keyword to search.".to_string());
      return false;
    }
    if self.session.is_none() {
      self.set_error("Load a video's comments before searching.".to_string());
      return false;
    }
    self.clear_error();
    self.info_message = None;

    let comments = self.session.as_ref().map(|s| s.comments()).unwrap_or(&[]);
    let result = self.search.submit(&keyword, comments);
    if result.matches.is_empty() && !self.search.is_analyzing() {
      self.info_message = Some(format!("No comments mention '{}'.", keyword));
    }
    self.list_state.select(None);
    self.clamp_selection();
    self.mode = AppMode::Comments;
    true
  }

  pub fn clear_search(&mut self) {
    self.search.clear();
    self.keyword.clear();
    self.keyword_cursor = 0;
    self.keyword_scroll = 0;
    self.list_state.select(None);
    self.clamp_selection();
  }

  fn apply_search_update(&mut self, update: SearchUpdate) {
    match update {
      SearchUpdate::Published(result) => {
        if result.matches.is_empty() {
          self.info_message = Some(format!("No comments mention '{}'.", result.keyword));
        } else {
          self.info_message = None;
        }
        self.clamp_selection();
      }
      SearchUpdate::Warning(msg) => {
        self.info_message = Some(msg);
      }
    }
  }

  // --- Account ---

  /// Open the sign-in page; the redirect URL (or token) is then pasted into the URL input.
  pub fn trigger_sign_in(&mut self) {
    let url = self.backend.login_url();
    info!(url = %url, "account: opening sign-in page");
    match open_in_browser(&url) {
      Ok(()) => {
        self.info_message = Some("Finish signing in, then paste the redirect URL here and press Enter.".to_string());
      }
      Err(e) => self.set_error(format!("{:#}", e)),
    }
    self.dismiss_prompt();
    self.mode = AppMode::Input;
  }

  fn accept_token(&mut self, raw: &str) {
    let Some(token) = token_from_redirect(raw) else {
      self.set_error("The pasted sign-in URL has no token.".to_string());
      return;
    };
    match self.store.set(&token) {
      Ok(()) => {
        self.signed_in = true;
        self.input.clear();
        self.cursor_position = 0;
        self.input_scroll = 0;
        self.info_message = Some("Signed in.".to_string());
        self.refresh_account();
      }
      Err(e) => self.set_error(format!("Failed to save sign-in: {:#}", e)),
    }
  }

  pub fn trigger_checkout(&mut self) {
    if self.tasks.checkout_rx.is_some() {
      return;
    }
    self.dismiss_prompt();
    self.status_message = Some("Opening checkout…".to_string());
    let backend = Arc::clone(&self.backend);
    let token = self.store.get();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(backend.create_checkout_session(token.as_deref()).await);
    });
    self.tasks.checkout_rx = Some(rx);
  }

  pub fn refresh_account(&mut self) {
    let backend = Arc::clone(&self.backend);
    let token = self.store.get();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(backend.user_status(token.as_deref()).await);
    });
    self.tasks.status_rx = Some(rx);
  }

  /// Run the action offered by the open prompt.
  pub fn accept_prompt(&mut self) {
    match self.prompt {
      Some(Prompt::Purchase) => self.trigger_checkout(),
      Some(Prompt::SignIn) => self.trigger_sign_in(),
      None => {}
    }
  }

  pub fn dismiss_prompt(&mut self) {
    if self.prompt.take().is_some() {
      self.mode = if self.session.is_some() { AppMode::Comments } else { AppMode::Input };
    }
  }

  pub fn open_current_video(&mut self) {
    let Some(session) = self.session.as_ref() else { return };
    let url = watch_url(session.video_id());
    if let Err(e) = open_in_browser(&url) {
      self.set_error(format!("{:#}", e));
    }
  }

  // --- Polling ---

  pub fn check_pending(&mut self) {
    if let Some(mut rx) = self.tasks.fetch_rx.take() {
      match rx.try_recv() {
        Ok(outcome) => self.apply_fetch_outcome(outcome),
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.fetch_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          error!("fetch: task ended without a result");
          self.status_message = None;
          self.abort_load();
          self.set_error("Comment fetch task failed.".to_string());
        }
      }
    }

    for update in self.search.poll() {
      self.apply_search_update(update);
    }

    if let Some(mut rx) = self.tasks.checkout_rx.take() {
      match rx.try_recv() {
        Ok(result) => {
          self.status_message = None;
          match result {
            Ok(CheckoutOutcome::Redirect(url)) => match open_in_browser(&url) {
              Ok(()) => self.info_message = Some("Complete the purchase in your browser.".to_string()),
              Err(e) => self.set_error(format!("{:#}", e)),
            },
            Ok(CheckoutOutcome::AuthRequired) => {
              self.prompt = Some(Prompt::SignIn);
              self.mode = AppMode::Prompt;
            }
            Err(e) => {
              warn!(err = %e, "checkout: failed");
              self.set_error(format!("{:#}", e));
            }
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.checkout_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.status_message = None;
          self.set_error("Checkout task failed.".to_string());
        }
      }
    }

    if let Some(mut rx) = self.tasks.status_rx.take() {
      match rx.try_recv() {
        Ok(Ok(status)) => self.account = Some(status),
        Ok(Err(e)) => {
          // Header badge only; not worth an error line.
          debug!(err = %e, "account: status unavailable");
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.status_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {}
      }
    }
  }
}

/// Open `url` in the default browser.
pub fn open_in_browser(url: &str) -> Result<()> {
  #[cfg(target_os = "macos")]
  let cmd = "open";
  #[cfg(not(target_os = "macos"))]
  let cmd = "xdg-open";
  let mut child = std::process::Command::new(cmd)
    .arg(url)
    .stdin(std::process::Stdio::null())
    .stdout(std::process::Stdio::null())
    .stderr(std::process::Stdio::null())
    .spawn()
    .context("Failed to open browser")?;
  // Reap in the background so no zombie is left behind.
  std::thread::spawn(move || {
    let _ = child.wait();
  });
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::CommentPage;

  fn app(dir: &tempfile::TempDir) -> App {
    // Nothing listens on the discard port; spawned fetches fail fast and are never polled.
    let backend = Arc::new(BackendClient::new("http://127.0.0.1:9"));
    App::new(Config::default(), backend, SessionStore::at(dir.path().join("session.toml")))
  }

  fn page(video_id: &str, texts: &[&str], cursor: Option<&str>) -> CommentPage {
    CommentPage {
      comments: texts.iter().map(|t| Comment { text: t.to_string(), ..Comment::default() }).collect(),
      next_page_token: cursor.map(str::to_string),
      ..CommentPage::empty(video_id)
    }
  }

  #[tokio::test]
  async fn video_switch_resets_comments_cursor_and_search() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app(&dir);
    app.input = "https://youtu.be/aaaaaaaaaaa".to_string();
    app.trigger_fetch();
    app.apply_fetch_outcome(FetchOutcome::Page(page("aaaaaaaaaaa", &["great riff", "meh"], Some("next"))));
    assert_eq!(app.comments().len(), 2);

    app.keyword = "riff".to_string();
    assert!(app.trigger_search());
    assert_eq!(app.row_count(), 1);

    app.input = "bbbbbbbbbbb".to_string();
    app.trigger_fetch();
    let session = app.session.as_ref().unwrap();
    assert_eq!(session.video_id(), "bbbbbbbbbbb");
    assert!(session.comments().is_empty());
    assert!(!session.has_more());
    assert!(app.search_result().is_none());
    assert!(!app.search.is_analyzing());
    assert!(app.keyword.is_empty());
    assert_eq!(app.list_state.selected(), None);
  }

  #[tokio::test]
  async fn late_page_for_previous_video_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app(&dir);
    app.begin_video_session("aaaaaaaaaaa");
    app.begin_video_session("bbbbbbbbbbb");
    app.apply_fetch_outcome(FetchOutcome::Page(page("aaaaaaaaaaa", &["stale"], None)));
    assert!(app.comments().is_empty());
  }

  #[test]
  fn invalid_url_is_rejected_without_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app(&dir);
    app.input = "not a url".to_string();
    app.trigger_fetch();
    assert!(app.session.is_none());
    assert!(app.tasks.fetch_rx.is_none());
    assert!(app.last_error.is_some());
  }

  #[tokio::test]
  async fn blank_keyword_is_not_submitted() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app(&dir);
    app.begin_video_session("aaaaaaaaaaa");
    app.keyword = "   ".to_string();
    assert!(!app.trigger_search());
    assert!(app.search_result().is_none());
    assert!(app.last_error.is_some());
  }

  #[tokio::test]
  async fn quota_opens_purchase_prompt_and_releases_load_claim() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app(&dir);
    app.begin_video_session("aaaaaaaaaaa");
    app.apply_fetch_outcome(FetchOutcome::Page(page("aaaaaaaaaaa", &["one"], Some("c2"))));
    app.trigger_load_more();
    assert!(app.session.as_ref().unwrap().is_loading());

    app.apply_fetch_outcome(FetchOutcome::QuotaExceeded);
    assert_eq!(app.prompt, Some(Prompt::Purchase));
    assert_eq!(app.mode, AppMode::Prompt);
    assert!(!app.session.as_ref().unwrap().is_loading());
    assert_eq!(app.comments().len(), 1);

    app.dismiss_prompt();
    assert_eq!(app.mode, AppMode::Comments);
  }

  #[tokio::test]
  async fn repeated_load_more_spawns_one_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app(&dir);
    app.begin_video_session("aaaaaaaaaaa");
    app.apply_fetch_outcome(FetchOutcome::Page(page("aaaaaaaaaaa", &["one"], Some("c2"))));
    assert!(app.tasks.fetch_handle.is_none());

    app.trigger_load_more();
    let first = app.tasks.fetch_handle.as_ref().map(|h| h.id());
    assert!(first.is_some());
    app.trigger_load_more();
    assert_eq!(app.tasks.fetch_handle.as_ref().map(|h| h.id()), first);
    assert!(app.tasks.fetch_rx.is_some());
  }

  #[tokio::test]
  async fn backend_error_is_shown_inline_and_transport_error_generically() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app(&dir);
    app.begin_video_session("aaaaaaaaaaa");
    app.apply_fetch_outcome(FetchOutcome::ApplicationError {
      message: "Comments are disabled for this video.".into(),
      detail: None,
    });
    assert_eq!(app.inline_error.as_ref().map(|e| e.message.as_str()), Some("Comments are disabled for this video."));
    assert!(app.last_error.is_none());

    app.begin_video_session("aaaaaaaaaaa");
    app.apply_fetch_outcome(FetchOutcome::TransportError("HTTP 500".into()));
    assert!(app.inline_error.is_none());
    assert_eq!(app.last_error.as_deref(), Some(GENERIC_ERROR_MESSAGE));
  }

  #[tokio::test]
  async fn pasted_redirect_url_signs_in() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app(&dir);
    assert!(!app.is_signed_in());
    app.input = "https://example.com/auth/success?token=tok-42".to_string();
    app.trigger_fetch();
    assert!(app.is_signed_in());
    assert!(app.session.is_none());
    assert!(app.input.is_empty());
  }

  #[test]
  fn stored_token_counts_as_signed_in_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    SessionStore::at(dir.path().join("session.toml")).set("tok-7").unwrap();
    let app = app(&dir);
    assert!(app.is_signed_in());
  }
}
