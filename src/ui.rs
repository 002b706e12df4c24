use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Flex, Layout, Rect},
  style::{Color, Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, Clear, List, ListItem, Padding, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthChar;

use crate::access::Prompt;
use crate::app::{App, AppMode, Row};
use crate::matcher::highlight_ranges;
use crate::models::MatchKind;
use crate::search::SearchPhase;
use crate::theme::Theme;

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];
/// Wrapped lines shown per comment before eliding the rest.
const MAX_BODY_LINES: usize = 4;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Split `s` into pieces no wider than `width` columns.
fn wrap_width(s: &str, width: usize) -> Vec<&str> {
  let width = width.max(1);
  let mut pieces = Vec::new();
  let mut start = 0;
  let mut col = 0;
  for (i, c) in s.char_indices() {
    let w = c.width().unwrap_or(0);
    if col + w > width && i > start {
      pieces.push(&s[start..i]);
      start = i;
      col = 0;
    }
    col += w;
  }
  if start < s.len() || pieces.is_empty() {
    pieces.push(&s[start..]);
  }
  pieces
}

/// Comment text as shown: platform line breaks become real ones.
fn display_text(text: &str) -> String {
  text.replace("<br>", "\n").replace("<br/>", "\n").replace("<br />", "\n")
}

/// Style every keyword occurrence in `line`.
fn highlighted<'a>(line: &'a str, keyword: Option<&str>, base: Style, theme: &Theme) -> Line<'a> {
  let Some(keyword) = keyword.filter(|k| !k.is_empty()) else {
    return Line::from(Span::styled(line, base));
  };
  let mark = Style::default().fg(theme.mark_fg).bg(theme.mark_bg).add_modifier(Modifier::BOLD);
  let mut spans = Vec::new();
  let mut pos = 0;
  for range in highlight_ranges(line, keyword) {
    if range.start > pos {
      spans.push(Span::styled(&line[pos..range.start], base));
    }
    spans.push(Span::styled(&line[range.clone()], mark));
    pos = range.end;
  }
  if pos < line.len() {
    spans.push(Span::styled(&line[pos..], base));
  }
  Line::from(spans)
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
  let [area] = Layout::horizontal([Constraint::Length(width.min(area.width))]).flex(Flex::Center).areas(area);
  let [area] = Layout::vertical([Constraint::Length(height.min(area.height))]).flex(Flex::Center).areas(area);
  area
}

fn rounded(theme: &Theme) -> Block<'static> {
  Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border))
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  render_main(frame, app, main_area);
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);

  if let Some(prompt) = app.prompt {
    render_prompt(frame, theme, prompt);
  }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let mut left = vec![Span::styled(" ▶ yc ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))];
  if let Some(session) = &app.session {
    left.push(Span::styled(session.video_id().to_string(), Style::default().fg(theme.fg)));
  }
  frame.render_widget(Line::from(left), area);

  let account = app.account.map_or("", |a| a.label());
  let right_text = if account.is_empty() {
    format!("v{} ", env!("CARGO_PKG_VERSION"))
  } else {
    format!("{}  v{} ", account, env!("CARGO_PKG_VERSION"))
  };
  let width = right_text.chars().count() as u16;
  let right = Line::from(Span::styled(right_text, Style::default().fg(theme.muted)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(width), width: width.min(area.width), ..area };
  frame.render_widget(right, right_area);
}

fn render_main(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let area = if let Some(err) = &app.inline_error {
    let [err_area, rest] = Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(area);
    let mut text =
      vec![Span::styled(err.message.clone(), Style::default().fg(theme.error).add_modifier(Modifier::BOLD))];
    if let Some(detail) = &err.detail {
      text.push(Span::styled(format!("  ({})", detail), Style::default().fg(theme.muted)));
    }
    let block = rounded(theme).border_style(Style::default().fg(theme.error)).padding(Padding::horizontal(1));
    frame.render_widget(Paragraph::new(Line::from(text)).block(block), err_area);
    rest
  } else {
    area
  };

  if app.session.is_some() {
    render_comments(frame, app, area);
  } else {
    render_welcome(frame, theme, area);
  }
}

fn render_welcome(frame: &mut Frame, theme: &Theme, area: Rect) {
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("▶  Welcome to yc", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Read and search YouTube comments. In the terminal.", Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled("Paste a video URL below and press Enter.", Style::default().fg(theme.muted))),
  ];
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(rounded(theme));
  frame.render_widget(paragraph, area);
}

fn comment_item(row: &Row, keyword: Option<&str>, inner_w: usize, theme: &Theme, bg: Color) -> ListItem<'static> {
  let comment = row.comment;
  let mut meta = vec![Span::styled(
    comment.author_label().to_string(),
    Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
  )];
  if let Some(date) = &comment.date {
    meta.push(Span::styled(format!("  {}", date), Style::default().fg(theme.muted)));
  }
  if let Some(likes) = comment.likes {
    meta.push(Span::styled(format!("  ♥ {}", likes), Style::default().fg(theme.muted)));
  }
  if !comment.replies.is_empty() {
    meta.push(Span::styled(format!("  ↳ {}", comment.replies.len()), Style::default().fg(theme.muted)));
  }
  if row.kind == MatchKind::Context {
    meta.push(Span::raw("  "));
    meta.push(Span::styled(" AI context ", Style::default().fg(theme.bg).bg(theme.context)));
  }

  let mut lines = vec![Line::from(meta)];
  let body = Style::default().fg(theme.fg);
  let text = display_text(&comment.text);
  let mut wrapped: Vec<String> = Vec::new();
  for logical in text.lines() {
    wrapped.extend(wrap_width(logical, inner_w).into_iter().map(str::to_string));
  }
  let elided = wrapped.len() > MAX_BODY_LINES;
  wrapped.truncate(MAX_BODY_LINES);
  for piece in wrapped {
    let spans: Vec<Span<'static>> = highlighted(&piece, keyword, body, theme)
      .spans
      .into_iter()
      .map(|s| Span::styled(s.content.into_owned(), s.style))
      .collect();
    lines.push(Line::from(spans));
  }
  if elided {
    lines.push(Line::from(Span::styled("…", Style::default().fg(theme.muted))));
  }
  lines.push(Line::from(""));
  ListItem::new(lines).bg(bg)
}

fn render_comments(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;
  let keyword = app.search_result().map(|r| r.keyword.clone());

  let items: Vec<ListItem> = app
    .rows()
    .iter()
    .enumerate()
    .map(|(i, row)| {
      let bg = if i % 2 == 1 { theme.stripe_bg } else { theme.bg };
      comment_item(row, keyword.as_deref(), inner_w, theme, bg)
    })
    .collect();

  let title = match app.search_result() {
    Some(result) => {
      let context = result.context_count();
      let suffix = if context > 0 { format!(", {} from AI", context) } else { String::new() };
      format!(" '{}': {} matches{} ", result.keyword, result.matches.len(), suffix)
    }
    None => {
      let loaded = app.comments().len();
      let total = app.session.as_ref().and_then(|s| s.total_results());
      let loading = app.session.as_ref().is_some_and(|s| s.is_loading());
      let mut title = match total {
        Some(total) => format!(" Comments {} of {} ", loaded, total),
        None => format!(" Comments {} ", loaded),
      };
      if loading && loaded > 0 {
        title.push_str("(loading more…) ");
      } else if app.session.as_ref().is_some_and(|s| s.has_more()) {
        title.push_str("(more: m) ");
      }
      title
    }
  };

  let border = if app.mode == AppMode::Comments { theme.accent } else { theme.border };
  let list = List::new(items)
    .block(
      rounded(theme)
        .title(title)
        .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
        .border_style(Style::default().fg(border)),
    )
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg));

  frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if app.search.phase() == SearchPhase::Merging {
    let tick = (app.started_at.elapsed().as_millis() / 150) as usize % SPINNER.len();
    (format!(" {} AI analyzing comments…", SPINNER[tick]), Style::default().fg(theme.context))
  } else if let Some(info) = &app.info_message {
    (format!(" ℹ  {}", info), Style::default().fg(theme.muted))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let searching = app.mode == AppMode::Search;
  let focused = matches!(app.mode, AppMode::Input | AppMode::Search);
  let border_color = if focused { theme.accent } else { theme.border };
  let title = if searching { " Search comments " } else { " YouTube URL " };
  let input_block = rounded(theme)
    .title(title)
    .title_style(Style::default().fg(border_color))
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let (text, cursor, scroll) = if searching {
    (&app.keyword, app.keyword_cursor, &mut app.keyword_scroll)
  } else {
    (&app.input, app.cursor_position, &mut app.input_scroll)
  };
  let cursor_col = display_width(text, cursor);

  if cursor_col < *scroll {
    *scroll = cursor_col;
  } else if cursor_col >= *scroll + inner_w {
    *scroll = cursor_col.saturating_sub(inner_w) + 1;
  }
  let offset = *scroll;

  let visible: String = text
    .chars()
    .scan(0usize, |col, c| {
      let w = c.width().unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= offset)
    .take_while(|(start, _, _)| *start < offset + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if focused {
    let cursor_x = area.x + 2 + (cursor_col - offset) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let has_session = app.session.is_some();
  let keys: Vec<(&str, &str)> = match app.mode {
    AppMode::Input => {
      let mut k = vec![("Enter", "Fetch"), ("^t", "Theme")];
      if !app.is_signed_in() {
        k.push(("^l", "Sign in"));
      }
      if has_session {
        k.push(("Tab", "Comments"));
        k.push(("Esc", "Comments"));
      } else {
        k.push(("Esc", "Quit"));
      }
      k
    }
    AppMode::Comments => {
      let mut k = vec![("j/k", "Scroll"), ("/", "Search")];
      if app.session.as_ref().is_some_and(|s| s.has_more()) {
        k.push(("m", "More"));
      }
      k.push(("^o", "Open video"));
      k.push(("^u", "Upgrade"));
      k.push(("Esc", if app.search_result().is_some() { "Clear search" } else { "Back" }));
      k
    }
    AppMode::Search => vec![("Enter", "Search"), ("Esc", "Cancel")],
    AppMode::Prompt => vec![("Enter", "Continue"), ("Esc", "Dismiss")],
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_prompt(frame: &mut Frame, theme: &Theme, prompt: Prompt) {
  let area = centered(frame.area(), 56, 9);
  frame.render_widget(Clear, area);
  let text = vec![
    Line::from(""),
    Line::from(Span::styled(prompt.body(), Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(vec![
      Span::styled(" Enter ", Style::default().fg(theme.key_fg).bg(theme.key_bg)),
      Span::styled(format!(" {}   ", prompt.action()), Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
      Span::styled(" Esc ", Style::default().fg(theme.key_fg).bg(theme.key_bg)),
      Span::styled(" Not now", Style::default().fg(theme.muted)),
    ]),
  ];
  let block = rounded(theme)
    .title(format!(" {} ", prompt.title()))
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .border_style(Style::default().fg(theme.accent))
    .style(Style::default().bg(theme.bg))
    .padding(Padding::horizontal(2));
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).wrap(Wrap { trim: true }).block(block);
  frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_width_counts_wide_chars() {
    assert_eq!(display_width("ab", 2), 2);
    assert_eq!(display_width("日本", 2), 4);
    assert_eq!(display_width("日本", 1), 2);
  }

  #[test]
  fn wrap_width_splits_on_columns() {
    assert_eq!(wrap_width("abcdef", 4), vec!["abcd", "ef"]);
    assert_eq!(wrap_width("日本語", 4), vec!["日本", "語"]);
    assert_eq!(wrap_width("", 4), vec![""]);
  }

  #[test]
  fn line_breaks_in_markup_are_displayed() {
    assert_eq!(display_text("one<br>two<br />three"), "one\ntwo\nthree");
  }

  #[test]
  fn highlighted_marks_each_occurrence() {
    let theme = &crate::theme::THEMES[0];
    let line = highlighted("Rock and rock", Some("rock"), Style::default(), theme);
    let marked: Vec<&str> =
      line.spans.iter().filter(|s| s.style.bg == Some(theme.mark_bg)).map(|s| s.content.as_ref()).collect();
    assert_eq!(marked, vec!["Rock", "rock"]);
  }
}
