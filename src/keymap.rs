//! Global navigation key bindings behind a scoped subscription.
//!
//! The bindings only fire while at least one [`KeySubscription`] is alive and
//! never while the search field has focus.

use std::cell::Cell;
use std::rc::Rc;

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

/// Where keyboard input currently goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
  List,
  /// Text entry; navigation bindings are suppressed.
  Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
  Previous,
  Next,
  First,
  Last,
}

/// Registry of live navigation listeners.
#[derive(Debug, Default)]
pub struct KeyListeners {
  active: Rc<Cell<usize>>,
}

impl KeyListeners {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start listening. Bindings stay live until the returned guard is dropped.
  pub fn subscribe(&self) -> KeySubscription {
    self.active.set(self.active.get() + 1);
    debug!(listeners = self.active.get(), "keys: navigation bindings acquired");
    KeySubscription { active: Rc::clone(&self.active) }
  }

  pub fn active(&self) -> usize {
    self.active.get()
  }

  pub fn dispatch(&self, key: &KeyEvent, focus: Focus) -> Option<NavCommand> {
    if self.active.get() == 0 || focus == Focus::Search {
      return None;
    }
    if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
      return None;
    }
    match key.code {
      KeyCode::Up | KeyCode::Char('k') => Some(NavCommand::Previous),
      KeyCode::Down | KeyCode::Char('j') => Some(NavCommand::Next),
      KeyCode::Home => Some(NavCommand::First),
      KeyCode::End => Some(NavCommand::Last),
      _ => None,
    }
  }
}

/// Releases its listener on drop.
#[derive(Debug)]
#[must_use = "navigation bindings are released as soon as the subscription is dropped"]
pub struct KeySubscription {
  active: Rc<Cell<usize>>,
}

impl Drop for KeySubscription {
  fn drop(&mut self) {
    self.active.set(self.active.get().saturating_sub(1));
    debug!(listeners = self.active.get(), "keys: navigation bindings released");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn bindings_map_to_commands() {
    let listeners = KeyListeners::new();
    let _sub = listeners.subscribe();
    assert_eq!(listeners.dispatch(&key(KeyCode::Up), Focus::List), Some(NavCommand::Previous));
    assert_eq!(listeners.dispatch(&key(KeyCode::Char('k')), Focus::List), Some(NavCommand::Previous));
    assert_eq!(listeners.dispatch(&key(KeyCode::Down), Focus::List), Some(NavCommand::Next));
    assert_eq!(listeners.dispatch(&key(KeyCode::Char('j')), Focus::List), Some(NavCommand::Next));
    assert_eq!(listeners.dispatch(&key(KeyCode::Home), Focus::List), Some(NavCommand::First));
    assert_eq!(listeners.dispatch(&key(KeyCode::End), Focus::List), Some(NavCommand::Last));
    assert_eq!(listeners.dispatch(&key(KeyCode::Char('x')), Focus::List), None);
  }

  #[test]
  fn suppressed_in_search_field() {
    let listeners = KeyListeners::new();
    let _sub = listeners.subscribe();
    assert_eq!(listeners.dispatch(&key(KeyCode::Char('j')), Focus::Search), None);
    assert_eq!(listeners.dispatch(&key(KeyCode::Down), Focus::Search), None);
  }

  #[test]
  fn modified_keys_are_ignored() {
    let listeners = KeyListeners::new();
    let _sub = listeners.subscribe();
    let ctrl_j = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::CONTROL);
    assert_eq!(listeners.dispatch(&ctrl_j, Focus::List), None);
  }

  #[test]
  fn inactive_without_subscription() {
    let listeners = KeyListeners::new();
    assert_eq!(listeners.dispatch(&key(KeyCode::Down), Focus::List), None);
  }

  #[test]
  fn repeated_activation_does_not_leak() {
    let listeners = KeyListeners::new();
    for _ in 0..10 {
      let sub = listeners.subscribe();
      assert_eq!(listeners.active(), 1);
      drop(sub);
    }
    assert_eq!(listeners.active(), 0);
    assert_eq!(listeners.dispatch(&key(KeyCode::End), Focus::List), None);
  }
}
