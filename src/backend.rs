//! HTTP client for the comment-analysis backend.
//!
//! Every call resolves to a typed outcome the UI can branch on; network and decoding
//! failures are folded into those outcomes instead of surfacing as errors.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::models::{Comment, CommentPage, PageStatus};

/// Result of one comment listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  Page(CommentPage),
  /// The backend answered but reported a problem (e.g. comments disabled).
  ApplicationError { message: String, detail: Option<String> },
  /// HTTP 402: free-tier allotment used up.
  QuotaExceeded,
  /// HTTP 401: sign-in required or token expired.
  AuthRequired,
  /// Network failure, unexpected status, or an unreadable body.
  TransportError(String),
}

/// Result of one AI search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
  Matches(Vec<Comment>),
  RemoteError(String),
  /// The caller cancelled the call; carries no information.
  Canceled,
}

/// Remote keyword search over a comment set.
#[async_trait]
pub trait RemoteSearch: Send + Sync {
  async fn search(&self, keyword: &str, comments: &[Comment], cancel: CancellationToken) -> RemoteOutcome;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
  /// Checkout page to open in the browser.
  Redirect(String),
  AuthRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
  Pro,
  Free,
  SignedOut,
}

impl AccountStatus {
  pub fn label(self) -> &'static str {
    match self {
      AccountStatus::Pro => "Pro",
      AccountStatus::Free => "Free",
      AccountStatus::SignedOut => "signed out",
    }
  }
}

// ── Wire shapes ──

#[derive(Serialize)]
struct SearchRequest<'a> {
  keyword: &'a str,
  comments: &'a [Comment],
}

#[derive(Deserialize)]
struct SearchEnvelope {
  #[serde(default)]
  success: bool,
  #[serde(default)]
  data: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
  detail: Option<Value>,
}

#[derive(Deserialize)]
struct CheckoutBody {
  url: Option<String>,
}

#[derive(Deserialize)]
struct UserStatusBody {
  #[serde(default)]
  is_pro: bool,
}

/// Decode the AI search payload, which is itself a JSON document carried in a string.
///
/// An array yields its decodable elements, a single object yields one comment, and anything
/// else yields nothing. Stray markdown code fences around the document are tolerated.
pub fn decode_context_matches(data: &str) -> Vec<Comment> {
  let trimmed = data.trim();
  let unfenced = trimmed
    .strip_prefix("```json")
    .or_else(|| trimmed.strip_prefix("```"))
    .map(|s| s.trim_end().trim_end_matches("```"))
    .unwrap_or(trimmed)
    .trim();

  match serde_json::from_str::<Value>(unfenced) {
    Ok(Value::Array(items)) => items.into_iter().filter_map(|v| serde_json::from_value(v).ok()).collect(),
    Ok(obj @ Value::Object(_)) => serde_json::from_value(obj).ok().into_iter().collect(),
    Ok(_) => Vec::new(),
    Err(e) => {
      debug!(err = %e, "search: AI payload is not JSON, treating as no matches");
      Vec::new()
    }
  }
}

/// Pull a human-readable message from an error response body (`{"detail": ...}`).
async fn error_detail(response: reqwest::Response) -> String {
  let status = response.status();
  match response.json::<ErrorBody>().await {
    Ok(ErrorBody { detail: Some(Value::String(s)) }) => s,
    Ok(ErrorBody { detail: Some(other) }) => other.to_string(),
    _ => format!("HTTP {}", status),
  }
}

pub struct BackendClient {
  http: Client,
  base_url: String,
  remote_timeout: Option<Duration>,
}

impl BackendClient {
  pub fn new(base_url: &str) -> Self {
    Self {
      http: Client::new(),
      base_url: base_url.trim_end_matches('/').to_string(),
      remote_timeout: Some(Duration::from_secs(constants().remote_timeout_secs)),
    }
  }

  pub fn with_remote_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.remote_timeout = timeout;
    self
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  fn endpoint(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  /// Where the browser goes to start the OAuth sign-in flow.
  pub fn login_url(&self) -> String {
    self.endpoint(&constants().login_path)
  }

  /// Fetch one page of comments for `video_id`, continuing from `page_token` when given.
  pub async fn fetch_comments(&self, video_id: &str, page_token: Option<&str>, token: Option<&str>) -> FetchOutcome {
    let mut params = vec![("video_id", video_id)];
    if let Some(cursor) = page_token {
      params.push(("page_token", cursor));
    }
    let url = match Url::parse_with_params(&self.endpoint(&constants().comments_path), &params) {
      Ok(url) => url,
      Err(e) => return FetchOutcome::TransportError(format!("Invalid backend URL: {}", e)),
    };

    info!(video_id, paged = page_token.is_some(), authed = token.is_some(), "fetch: requesting comments");
    let mut request = self.http.get(url);
    if let Some(t) = token {
      request = request.bearer_auth(t);
    }

    let response = match request.send().await {
      Ok(r) => r,
      Err(e) => {
        warn!(err = %e, video_id, "fetch: request failed");
        return FetchOutcome::TransportError(e.to_string());
      }
    };

    match response.status() {
      StatusCode::PAYMENT_REQUIRED => {
        info!(video_id, "fetch: quota exceeded");
        FetchOutcome::QuotaExceeded
      }
      StatusCode::UNAUTHORIZED => {
        info!(video_id, "fetch: authentication required");
        FetchOutcome::AuthRequired
      }
      status if !status.is_success() => {
        warn!(%status, video_id, "fetch: unexpected status");
        FetchOutcome::TransportError(format!("HTTP {}", status))
      }
      _ => match response.json::<CommentPage>().await {
        Ok(mut page) if page.status == PageStatus::Success => {
          if page.video_id.is_empty() {
            page.video_id = video_id.to_string();
          }
          info!(video_id, count = page.comments.len(), more = page.has_more(), "fetch: page received");
          FetchOutcome::Page(page)
        }
        Ok(page) => {
          info!(video_id, message = ?page.message, "fetch: backend reported an error");
          FetchOutcome::ApplicationError {
            message: page.message.unwrap_or_else(|| "The backend could not fetch comments.".to_string()),
            detail: page.detail,
          }
        }
        Err(e) => {
          warn!(err = %e, video_id, "fetch: malformed response body");
          FetchOutcome::TransportError(format!("Malformed response: {}", e))
        }
      },
    }
  }

  async fn run_search(&self, keyword: &str, comments: &[Comment]) -> RemoteOutcome {
    info!(keyword, comments = comments.len(), "search: requesting AI matches");
    let request = self.http.post(self.endpoint(&constants().search_path)).json(&SearchRequest { keyword, comments });
    let response = match request.send().await {
      Ok(r) => r,
      Err(e) => {
        warn!(err = %e, "search: request failed");
        return RemoteOutcome::RemoteError(e.to_string());
      }
    };

    if !response.status().is_success() {
      let status = response.status();
      let detail = error_detail(response).await;
      warn!(%status, detail = %detail, "search: backend rejected request");
      return RemoteOutcome::RemoteError(detail);
    }

    match response.json::<SearchEnvelope>().await {
      Ok(SearchEnvelope { success: true, data: Some(data) }) if !data.trim().is_empty() => {
        let matches = decode_context_matches(&data);
        info!(keyword, matches = matches.len(), "search: AI matches received");
        RemoteOutcome::Matches(matches)
      }
      Ok(SearchEnvelope { success: true, .. }) => {
        warn!(keyword, "search: success without data");
        RemoteOutcome::RemoteError("The AI search returned an invalid response.".to_string())
      }
      Ok(SearchEnvelope { success: false, .. }) => {
        RemoteOutcome::RemoteError("The AI search reported a failure.".to_string())
      }
      Err(e) => {
        warn!(err = %e, "search: malformed response body");
        RemoteOutcome::RemoteError(format!("Malformed response: {}", e))
      }
    }
  }

  /// Create a Stripe checkout session for the signed-in user.
  pub async fn create_checkout_session(&self, token: Option<&str>) -> Result<CheckoutOutcome> {
    let mut request = self.http.post(self.endpoint(&constants().checkout_path));
    if let Some(t) = token {
      request = request.bearer_auth(t);
    }
    let response = request.send().await.context("Failed to reach the checkout endpoint")?;
    if response.status() == StatusCode::UNAUTHORIZED {
      return Ok(CheckoutOutcome::AuthRequired);
    }
    if !response.status().is_success() {
      let detail = error_detail(response).await;
      return Err(anyhow!("Checkout failed: {}", detail));
    }
    let body: CheckoutBody = response.json().await.context("Malformed checkout response")?;
    match body.url.filter(|u| !u.is_empty()) {
      Some(url) => {
        info!("checkout: session created");
        Ok(CheckoutOutcome::Redirect(url))
      }
      None => Err(anyhow!("Checkout response did not include a payment page URL")),
    }
  }

  /// Subscription tier of the current token holder.
  pub async fn user_status(&self, token: Option<&str>) -> Result<AccountStatus> {
    let Some(t) = token else { return Ok(AccountStatus::SignedOut) };
    let response = self
      .http
      .get(self.endpoint(&constants().user_status_path))
      .bearer_auth(t)
      .send()
      .await
      .context("Failed to reach the account status endpoint")?;
    if response.status() == StatusCode::UNAUTHORIZED {
      return Ok(AccountStatus::SignedOut);
    }
    if !response.status().is_success() {
      return Err(anyhow!("Account status failed: HTTP {}", response.status()));
    }
    let body: UserStatusBody = response.json().await.context("Malformed account status response")?;
    Ok(if body.is_pro { AccountStatus::Pro } else { AccountStatus::Free })
  }
}

#[async_trait]
impl RemoteSearch for BackendClient {
  async fn search(&self, keyword: &str, comments: &[Comment], cancel: CancellationToken) -> RemoteOutcome {
    let request = async {
      match self.remote_timeout {
        Some(limit) => tokio::time::timeout(limit, self.run_search(keyword, comments)).await.unwrap_or_else(|_| {
          warn!(keyword, secs = limit.as_secs(), "search: AI search timed out");
          RemoteOutcome::RemoteError("The AI search timed out.".to_string())
        }),
        None => self.run_search(keyword, comments).await,
      }
    };

    // Dropping the request future aborts the underlying HTTP call.
    tokio::select! {
      biased;
      _ = cancel.cancelled() => {
        debug!(keyword, "search: cancelled");
        RemoteOutcome::Canceled
      }
      outcome = request => outcome,
    }
  }
}
