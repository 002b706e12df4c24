use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{RemoteOutcome, RemoteSearch};
use crate::matcher::{MatchScope, match_comments, merge_matches};
use crate::models::{Comment, ResultSource, SearchResult};

/// Where the current keyword submission stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
  /// Nothing submitted.
  Idle,
  /// Local matches published; remote call not yet issued.
  LocalDone,
  /// Remote call in flight.
  Merging,
  /// Remote call resolved (merged, failed, or skipped).
  Settled,
}

/// Something the UI should react to after polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchUpdate {
  Published(SearchResult),
  /// The AI search failed; local results stay on screen.
  Warning(String),
}

/// A remote completion tagged with the submission that issued it.
struct Completion {
  generation: u64,
  outcome: RemoteOutcome,
}

/// Hybrid keyword search: local substring matches immediately, AI matches merged in when they arrive.
///
/// Each submission bumps a generation counter and cancels the previous remote call. A completion is
/// applied only when its generation is still current, so stale responses never reach the UI.
pub struct SearchOrchestrator {
  remote: Arc<dyn RemoteSearch>,
  scope: MatchScope,
  generation: u64,
  phase: SearchPhase,
  /// Cancel handle of the one live remote call, if any.
  live: Option<CancellationToken>,
  local: Vec<Comment>,
  current: Option<SearchResult>,
  tx: mpsc::UnboundedSender<Completion>,
  rx: mpsc::UnboundedReceiver<Completion>,
}

impl SearchOrchestrator {
  pub fn new(remote: Arc<dyn RemoteSearch>, scope: MatchScope) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      remote,
      scope,
      generation: 0,
      phase: SearchPhase::Idle,
      live: None,
      local: Vec::new(),
      current: None,
      tx,
      rx,
    }
  }

  pub fn phase(&self) -> SearchPhase {
    self.phase
  }

  pub fn current(&self) -> Option<&SearchResult> {
    self.current.as_ref()
  }

  /// True while the current submission's remote call is in flight.
  pub fn is_analyzing(&self) -> bool {
    self.live.is_some()
  }

  fn cancel_live(&mut self) {
    if let Some(token) = self.live.take() {
      debug!(generation = self.generation, "search: cancelling previous AI search");
      token.cancel();
    }
  }

  /// Start a search for `keyword` over `comments` and return the local result right away.
  ///
  /// The AI search is spawned in the background; its result arrives through `poll`.
  /// Must be called from within a tokio runtime.
  pub fn submit(&mut self, keyword: &str, comments: &[Comment]) -> SearchResult {
    self.cancel_live();
    self.generation += 1;
    let generation = self.generation;
    let keyword = keyword.trim().to_string();

    let local = match_comments(comments, &keyword, self.scope);
    let matches = merge_matches(&local, Vec::new(), &keyword);
    let result = SearchResult { keyword: keyword.clone(), matches, source: ResultSource::Local };
    info!(generation, keyword = %keyword, local = result.matches.len(), "search: local matches published");
    self.local = local;
    self.current = Some(result.clone());
    self.phase = SearchPhase::LocalDone;

    if keyword.is_empty() || comments.is_empty() {
      self.phase = SearchPhase::Settled;
      return result;
    }

    let cancel = CancellationToken::new();
    self.live = Some(cancel.clone());
    self.phase = SearchPhase::Merging;

    let remote = Arc::clone(&self.remote);
    let tx = self.tx.clone();
    let snapshot = comments.to_vec();
    tokio::spawn(async move {
      let outcome = remote.search(&keyword, &snapshot, cancel).await;
      let _ = tx.send(Completion { generation, outcome });
    });

    result
  }

  /// Cancel any live call and forget the current result.
  pub fn clear(&mut self) {
    self.cancel_live();
    self.generation += 1;
    self.phase = SearchPhase::Idle;
    self.local.clear();
    self.current = None;
  }

  /// Apply every completion that has arrived, returning what the UI should show.
  pub fn poll(&mut self) -> Vec<SearchUpdate> {
    let mut updates = Vec::new();
    while let Ok(completion) = self.rx.try_recv() {
      if let Some(update) = self.apply(completion) {
        updates.push(update);
      }
    }
    updates
  }

  fn apply(&mut self, completion: Completion) -> Option<SearchUpdate> {
    if completion.generation != self.generation {
      debug!(stale = completion.generation, current = self.generation, "search: dropping superseded completion");
      return None;
    }
    self.live = None;
    self.phase = SearchPhase::Settled;

    match completion.outcome {
      RemoteOutcome::Matches(remote) => {
        let keyword = self.current.as_ref().map(|r| r.keyword.clone()).unwrap_or_default();
        let matches = merge_matches(&self.local, remote, &keyword);
        let result = SearchResult { keyword, matches, source: ResultSource::Merged };
        info!(
          generation = self.generation,
          total = result.matches.len(),
          context = result.context_count(),
          "search: merged AI matches"
        );
        self.current = Some(result.clone());
        Some(SearchUpdate::Published(result))
      }
      RemoteOutcome::RemoteError(msg) => {
        warn!(generation = self.generation, err = %msg, "search: AI search failed, keeping local matches");
        Some(SearchUpdate::Warning(format!("AI search unavailable ({}). Showing keyword matches only.", msg)))
      }
      RemoteOutcome::Canceled => None,
    }
  }
}
