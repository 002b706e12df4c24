//! Routes comment-fetch outcomes to the affordance the user needs next.
//!
//! Quota, sign-in, backend-reported and connectivity failures each get their own state;
//! they are never collapsed into one generic error.

use tracing::warn;

use crate::backend::FetchOutcome;
use crate::models::CommentPage;

/// Modal prompts that interrupt browsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
  /// Free-tier limit reached; offer checkout.
  Purchase,
  /// Authentication missing or expired; offer sign-in.
  SignIn,
}

impl Prompt {
  pub fn title(self) -> &'static str {
    match self {
      Prompt::Purchase => "Usage limit reached",
      Prompt::SignIn => "Sign in required",
    }
  }

  pub fn body(self) -> &'static str {
    match self {
      Prompt::Purchase => "The free plan's comment fetches are used up. Upgrade to Pro for unlimited use.",
      Prompt::SignIn => "Sign in to fetch comments. Your browser will open the sign-in page.",
    }
  }

  pub fn action(self) -> &'static str {
    match self {
      Prompt::Purchase => "Upgrade",
      Prompt::SignIn => "Sign in",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResolution {
  Loaded(CommentPage),
  Prompt(Prompt),
  /// Shown inline, verbatim.
  InlineError { message: String, detail: Option<String> },
  /// Connectivity problem; the user may try again.
  GenericError,
}

pub const GENERIC_ERROR_MESSAGE: &str = "Network error or backend unreachable. Please try again.";

pub fn resolve(outcome: FetchOutcome) -> FetchResolution {
  match outcome {
    FetchOutcome::Page(page) => FetchResolution::Loaded(page),
    FetchOutcome::QuotaExceeded => FetchResolution::Prompt(Prompt::Purchase),
    FetchOutcome::AuthRequired => FetchResolution::Prompt(Prompt::SignIn),
    FetchOutcome::ApplicationError { message, detail } => FetchResolution::InlineError { message, detail },
    FetchOutcome::TransportError(reason) => {
      warn!(reason = %reason, "access: transport failure");
      FetchResolution::GenericError
    }
  }
}
