use anyhow::Result;
use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

use crate::app::App;
use crate::keymap::Focus;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub async fn handle_key_event(app: &mut App, key: event::KeyEvent) -> Result<()> {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return Ok(());
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('t') {
    app.next_theme();
    return Ok(());
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
    app.stop_viewer().await;
    return Ok(());
  }

  if let Some(command) = app.key_listeners().dispatch(&key, app.focus) {
    app.navigate(command);
    return Ok(());
  }

  match app.focus {
    Focus::Search => handle_search_key(app, key),
    Focus::List => handle_list_key(app, key),
  }
  Ok(())
}

fn handle_list_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => app.activate_cursor(),
    KeyCode::Char(' ') => app.toggle_group_at_cursor(),
    KeyCode::Tab => app.move_cursor(1),
    KeyCode::BackTab => app.move_cursor(-1),
    KeyCode::Char('/') => {
      app.clear_error();
      app.focus = Focus::Search;
    }
    KeyCode::Char('c') => app.toggle_completed(),
    KeyCode::Char('m') => app.toggle_disclosure_mode(),
    KeyCode::Char('o') => app.open_in_browser(),
    KeyCode::Char('q') => app.should_quit = true,
    KeyCode::Esc => {
      if app.input.is_empty() {
        app.should_quit = true;
      } else {
        app.clear_search();
      }
    }
    _ => {}
  }
}

fn handle_search_key(app: &mut App, key: event::KeyEvent) {
  app.clear_error();
  match key.code {
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
      app.recompute_filter();
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
        app.recompute_filter();
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
        app.recompute_filter();
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    KeyCode::Enter | KeyCode::Down | KeyCode::Tab => {
      app.focus = Focus::List;
    }
    KeyCode::Esc => {
      if app.input.is_empty() {
        app.focus = Focus::List;
      } else {
        app.clear_search();
      }
    }
    _ => {}
  }
}
