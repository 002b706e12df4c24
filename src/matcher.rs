//! Local keyword matching and merging with AI results.
//!
//! Matching runs on the raw comment text, markup included.

use std::collections::HashSet;
use std::ops::Range;

use crate::models::{Comment, MatchKind, SearchMatch};

/// Which comments local matching looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchScope {
  /// Top-level comments only.
  #[default]
  TopLevel,
  /// A thread matches when the top-level comment or any reply matches.
  WithReplies,
}

/// Case-insensitive substring test.
pub fn contains_keyword(text: &str, keyword: &str) -> bool {
  text.to_lowercase().contains(&keyword.to_lowercase())
}

/// Filter `comments` down to those containing `keyword`, preserving order.
pub fn match_comments(comments: &[Comment], keyword: &str, scope: MatchScope) -> Vec<Comment> {
  let needle = keyword.to_lowercase();
  let hit = |c: &Comment| c.text.to_lowercase().contains(&needle);
  comments
    .iter()
    .filter(|c| match scope {
      MatchScope::TopLevel => hit(c),
      MatchScope::WithReplies => hit(c) || c.replies.iter().any(hit),
    })
    .cloned()
    .collect()
}

/// Local matches first, then remote matches whose text is not already present.
///
/// Deduplication is by exact `text` equality across the whole result; the first occurrence wins.
pub fn merge_matches(local: &[Comment], remote: Vec<Comment>, keyword: &str) -> Vec<SearchMatch> {
  let mut seen: HashSet<String> = HashSet::new();
  let mut merged: Vec<SearchMatch> = local
    .iter()
    .filter(|c| seen.insert(c.text.clone()))
    .map(|c| SearchMatch { comment: c.clone(), kind: MatchKind::Literal })
    .collect();
  for comment in remote {
    if !seen.insert(comment.text.clone()) {
      continue;
    }
    let kind = if contains_keyword(&comment.text, keyword) { MatchKind::Literal } else { MatchKind::Context };
    merged.push(SearchMatch { comment, kind });
  }
  merged
}

/// Byte ranges of every non-overlapping occurrence of `keyword` in `text`, for highlighting.
///
/// Folding is ASCII-only so the ranges stay valid offsets into the original string.
pub fn highlight_ranges(text: &str, keyword: &str) -> Vec<Range<usize>> {
  if keyword.is_empty() {
    return Vec::new();
  }
  let haystack = text.to_ascii_lowercase();
  let needle = keyword.to_ascii_lowercase();
  haystack.match_indices(&needle).map(|(start, m)| start..start + m.len()).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn comment(text: &str) -> Comment {
    Comment { text: text.to_string(), ..Comment::default() }
  }

  fn texts(comments: &[Comment]) -> Vec<&str> {
    comments.iter().map(|c| c.text.as_str()).collect()
  }

  // --- match_comments ---

  #[test]
  fn matches_case_insensitively_in_order() {
    let all = vec![comment("Great SONG"), comment("meh"), comment("song of the year"), comment("Songbird")];
    let got = match_comments(&all, "song", MatchScope::TopLevel);
    assert_eq!(texts(&got), vec!["Great SONG", "song of the year", "Songbird"]);
  }

  #[test]
  fn zero_matches_is_empty_not_error() {
    let all = vec![comment("abc")];
    assert!(match_comments(&all, "xyz", MatchScope::TopLevel).is_empty());
    assert!(match_comments(&[], "xyz", MatchScope::TopLevel).is_empty());
  }

  #[test]
  fn markup_is_part_of_the_text() {
    let all = vec![comment("line one<br>line two")];
    assert_eq!(match_comments(&all, "<br>", MatchScope::TopLevel).len(), 1);
    assert!(match_comments(&all, "one line", MatchScope::TopLevel).is_empty());
  }

  #[test]
  fn replies_ignored_at_top_level_scope() {
    let mut parent = comment("nothing here");
    parent.replies = vec![comment("the drummer is great")];
    let all = vec![parent];
    assert!(match_comments(&all, "drummer", MatchScope::TopLevel).is_empty());
    let got = match_comments(&all, "drummer", MatchScope::WithReplies);
    assert_eq!(texts(&got), vec!["nothing here"]);
    assert_eq!(got[0].replies.len(), 1);
  }

  #[test]
  fn non_ascii_keyword_matches() {
    let all = vec![comment("この曲が大好き"), comment("最高")];
    assert_eq!(texts(&match_comments(&all, "大好き", MatchScope::TopLevel)), vec!["この曲が大好き"]);
  }

  // --- merge_matches ---

  #[test]
  fn merge_appends_remote_minus_local_texts() {
    let local = vec![comment("love the bass"), comment("BASS solo")];
    let remote = vec![comment("BASS solo"), comment("low end is huge"), comment("love the bass")];
    let merged = merge_matches(&local, remote, "bass");
    let got: Vec<&str> = merged.iter().map(|m| m.comment.text.as_str()).collect();
    assert_eq!(got, vec!["love the bass", "BASS solo", "low end is huge"]);
    assert_eq!(merged[2].kind, MatchKind::Context);
    assert!(merged[..2].iter().all(|m| m.kind == MatchKind::Literal));
  }

  #[test]
  fn merge_drops_duplicates_within_remote() {
    let merged = merge_matches(&[], vec![comment("a"), comment("b"), comment("a")], "zzz");
    let got: Vec<&str> = merged.iter().map(|m| m.comment.text.as_str()).collect();
    assert_eq!(got, vec!["a", "b"]);
  }

  #[test]
  fn merge_collapses_identical_local_texts() {
    let all = vec![comment("First!"), comment("first try"), comment("First!")];
    let local = match_comments(&all, "first", MatchScope::TopLevel);
    let merged = merge_matches(&local, vec![comment("First!")], "first");
    let got: Vec<&str> = merged.iter().map(|m| m.comment.text.as_str()).collect();
    assert_eq!(got, vec!["First!", "first try"]);
  }

  #[test]
  fn remote_literal_hit_is_not_badged_as_context() {
    let merged = merge_matches(&[], vec![comment("Bass drop at 2:10")], "bass");
    assert_eq!(merged[0].kind, MatchKind::Literal);
  }

  // --- highlight_ranges ---

  #[test]
  fn highlight_finds_all_occurrences() {
    assert_eq!(highlight_ranges("Cat cat CAT", "cat"), vec![0..3, 4..7, 8..11]);
  }

  #[test]
  fn highlight_ranges_are_valid_after_multibyte_text() {
    let text = "日本 rock 日本 Rock";
    let ranges = highlight_ranges(text, "rock");
    assert_eq!(ranges.len(), 2);
    for r in ranges {
      assert!(text[r].eq_ignore_ascii_case("rock"));
    }
  }

  #[test]
  fn highlight_empty_keyword() {
    assert!(highlight_ranges("anything", "").is_empty());
  }
}
