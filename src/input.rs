use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

use crate::app::{App, AppMode};
use crate::constants::constants;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Single-line text field editing shared by the URL and keyword inputs.
/// Returns false when the key is not an editing key.
fn edit_line(text: &mut String, cursor: &mut usize, code: KeyCode) -> bool {
  match code {
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(text, *cursor);
      text.insert(byte_idx, c);
      *cursor += 1;
    }
    KeyCode::Backspace => {
      if *cursor > 0 {
        *cursor -= 1;
        let byte_idx = char_to_byte_index(text, *cursor);
        text.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if *cursor < text.chars().count() {
        let byte_idx = char_to_byte_index(text, *cursor);
        text.remove(byte_idx);
      }
    }
    KeyCode::Left => *cursor = cursor.saturating_sub(1),
    KeyCode::Right => {
      if *cursor < text.chars().count() {
        *cursor += 1;
      }
    }
    KeyCode::Home => *cursor = 0,
    KeyCode::End => *cursor = text.chars().count(),
    _ => return false,
  }
  true
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: event::KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) {
    match key.code {
      KeyCode::Char('c') => {
        app.should_quit = true;
        return;
      }
      KeyCode::Char('t') => {
        app.next_theme();
        return;
      }
      KeyCode::Char('l') => {
        app.trigger_sign_in();
        return;
      }
      KeyCode::Char('u') => {
        app.trigger_checkout();
        return;
      }
      KeyCode::Char('o') => {
        app.open_current_video();
        return;
      }
      _ => {}
    }
  }

  match app.mode {
    AppMode::Input => handle_input_key(app, key),
    AppMode::Comments => handle_comments_key(app, key),
    AppMode::Search => handle_search_key(app, key),
    AppMode::Prompt => handle_prompt_key(app, key),
  }
}

fn handle_input_key(app: &mut App, key: event::KeyEvent) {
  app.clear_error();
  if edit_line(&mut app.input, &mut app.cursor_position, key.code) {
    return;
  }
  match key.code {
    KeyCode::Enter => app.trigger_fetch(),
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.input.clear();
        app.cursor_position = 0;
        app.input_scroll = 0;
      } else if app.session.is_some() {
        app.mode = AppMode::Comments;
      } else {
        app.should_quit = true;
      }
    }
    KeyCode::Down | KeyCode::Tab => {
      if app.session.is_some() {
        app.mode = AppMode::Comments;
      }
    }
    _ => {}
  }
}

fn select_next(app: &mut App) {
  let count = app.row_count();
  if count == 0 {
    return;
  }
  let i = app.list_state.selected().map_or(0, |i| (i + 1).min(count - 1));
  app.list_state.select(Some(i));
  // Near the end of the unfiltered list: fetch the next page in the background.
  if app.search_result().is_none() && i + constants().load_more_threshold >= count {
    app.trigger_load_more();
  }
}

fn select_prev(app: &mut App) {
  if app.row_count() > 0 {
    let i = app.list_state.selected().map_or(0, |i| i.saturating_sub(1));
    app.list_state.select(Some(i));
  }
}

fn handle_comments_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => select_next(app),
    KeyCode::Up | KeyCode::Char('k') => select_prev(app),
    KeyCode::PageDown => {
      for _ in 0..10 {
        select_next(app);
      }
    }
    KeyCode::PageUp => {
      for _ in 0..10 {
        select_prev(app);
      }
    }
    KeyCode::Char('g') => {
      if app.row_count() > 0 {
        app.list_state.select(Some(0));
      }
    }
    KeyCode::Char('/') => {
      app.keyword_cursor = app.keyword.chars().count();
      app.mode = AppMode::Search;
    }
    KeyCode::Char('m') => app.trigger_load_more(),
    KeyCode::Char('i') | KeyCode::Tab => app.mode = AppMode::Input,
    KeyCode::Esc => {
      if app.search_result().is_some() {
        app.clear_search();
        app.info_message = None;
      } else {
        app.mode = AppMode::Input;
      }
    }
    _ => {}
  }
}

fn handle_search_key(app: &mut App, key: event::KeyEvent) {
  if edit_line(&mut app.keyword, &mut app.keyword_cursor, key.code) {
    return;
  }
  match key.code {
    KeyCode::Enter => {
      app.trigger_search();
    }
    KeyCode::Esc => app.mode = AppMode::Comments,
    _ => {}
  }
}

fn handle_prompt_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter | KeyCode::Char('y') => app.accept_prompt(),
    KeyCode::Esc | KeyCode::Char('n') => app.dismiss_prompt(),
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("hello", 0), 0);
    assert_eq!(char_to_byte_index("hello", 3), 3);
    assert_eq!(char_to_byte_index("hello", 5), 5);
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "aé日";
    assert_eq!(char_to_byte_index(s, 1), 1);
    assert_eq!(char_to_byte_index(s, 2), 3);
    assert_eq!(char_to_byte_index(s, 3), 6);
  }

  // --- edit_line ---

  #[test]
  fn edit_line_inserts_at_cursor() {
    let mut text = "ac".to_string();
    let mut cursor = 1;
    assert!(edit_line(&mut text, &mut cursor, KeyCode::Char('b')));
    assert_eq!(text, "abc");
    assert_eq!(cursor, 2);
  }

  #[test]
  fn edit_line_backspace_handles_multibyte() {
    let mut text = "日本".to_string();
    let mut cursor = 2;
    edit_line(&mut text, &mut cursor, KeyCode::Backspace);
    assert_eq!(text, "日");
    assert_eq!(cursor, 1);
  }

  #[test]
  fn edit_line_ignores_non_editing_keys() {
    let mut text = String::new();
    let mut cursor = 0;
    assert!(!edit_line(&mut text, &mut cursor, KeyCode::Enter));
    assert!(!edit_line(&mut text, &mut cursor, KeyCode::Esc));
  }
}
