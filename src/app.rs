use ratatui::widgets::ListState;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, GroupKey, ItemId};
use crate::config::Config;
use crate::constants::constants;
use crate::disclosure::{DisclosureMode, DisclosureState};
use crate::filter::{FilterQuery, filter};
use crate::keymap::{Focus, KeyListeners, KeySubscription, NavCommand};
use crate::navigation::NavigationController;
use crate::progress::{ProgressStorage, ProgressStore};
use crate::theme::{THEMES, theme_index};
use crate::viewer::{self, Viewer, ViewerEvent};

pub type Navigator = NavigationController<Box<dyn ProgressStorage>>;

/// One line of the sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
  Group(GroupKey),
  /// `index` is the item's position inside the displayed (filtered) group.
  Item { group: GroupKey, index: usize, id: ItemId },
}

/// Startup options that are not user preferences.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
  pub single_open: bool,
  pub viewer_enabled: bool,
}

pub struct App {
  pub catalog: Catalog,
  pub nav: Navigator,
  /// Raw text of the search box.
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub query: FilterQuery,
  /// Catalog narrowed by `query`; group keys index into this.
  pub filtered: Catalog,
  pub disclosure: DisclosureState,
  pub focus: Focus,
  /// Browse cursor over `rows()`.
  pub list_state: ListState,
  pub theme_index: usize,
  pub viewer: Viewer,
  pub viewer_enabled: bool,
  pub last_error: Option<String>,
  pub status_message: Option<String>,
  pub should_quit: bool,
  keys: KeyListeners,
  key_subscription: Option<KeySubscription>,
  /// The selection changed and the viewer has not been pointed at it yet.
  viewer_stale: bool,
  error_time: Option<Instant>,
}

impl App {
  pub fn new(catalog: Catalog, storage: Box<dyn ProgressStorage>, config: &Config, options: Options) -> Self {
    let mode = if options.single_open {
      DisclosureMode::Single
    } else {
      config.disclosure_mode.as_deref().map(DisclosureMode::from_config).unwrap_or_default()
    };

    let default_item = &constants().default_item;
    let initial = if catalog.group_of(default_item).is_some() {
      default_item.clone()
    } else {
      catalog.first_item().cloned().unwrap_or_else(|| default_item.clone())
    };

    let progress = ProgressStore::open(storage);
    let nav = NavigationController::new(&catalog, initial, progress);
    let query = FilterQuery::default();
    let filtered = filter(&catalog, &query);
    let disclosure = DisclosureState::default_open(&filtered, &query, mode);

    let mut app = Self {
      catalog,
      nav,
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      query,
      filtered,
      disclosure,
      focus: Focus::List,
      list_state: ListState::default(),
      theme_index: theme_index(config.theme_name.as_deref()),
      viewer: Viewer::new(),
      viewer_enabled: options.viewer_enabled,
      last_error: None,
      status_message: None,
      should_quit: false,
      keys: KeyListeners::new(),
      key_subscription: None,
      viewer_stale: false,
      error_time: None,
    };
    app.cursor_to_current();
    app
  }

  pub fn theme(&self) -> &'static crate::theme::Theme {
    // Safety: theme_index comes from theme_index() or modular arithmetic in next_theme().
    &THEMES[self.theme_index]
  }

  // --- Session lifecycle ---

  /// Acquire the navigation key bindings for the lifetime of the session.
  pub fn start_session(&mut self) {
    if self.key_subscription.is_none() {
      self.key_subscription = Some(self.keys.subscribe());
    }
  }

  /// Release key bindings and stop the viewer.
  pub async fn end_session(&mut self) {
    self.key_subscription = None;
    debug!(listeners = self.keys.active(), "session ended");
    if let Err(e) = self.viewer.stop().await {
      warn!(err = %e, "viewer: failed to stop on exit");
    }
  }

  pub fn key_listeners(&self) -> &KeyListeners {
    &self.keys
  }

  // --- Messages ---

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages after the dismiss delay.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().error_dismiss_secs)
    {
      self.clear_error();
    }
  }

  // --- Preferences ---

  fn save_config(&self) {
    let config = Config {
      theme_name: Some(self.theme().name.to_string()),
      disclosure_mode: Some(self.disclosure.mode().label().to_string()),
    };
    config.save();
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.save_config();
  }

  pub fn toggle_disclosure_mode(&mut self) {
    let mode = self.disclosure.mode().toggled();
    self.disclosure.set_mode(mode);
    info!(mode = mode.label(), "disclosure mode changed");
    self.clamp_cursor();
    self.save_config();
  }

  // --- Search ---

  /// Re-run the filter after the search text changed. Disclosure is rebuilt
  /// from its defaults whenever the effective query differs.
  pub fn recompute_filter(&mut self) {
    let query = FilterQuery::new(&self.input);
    if query == self.query {
      return;
    }
    debug!(query = query.as_str(), "search query changed");
    self.query = query;
    self.filtered = filter(&self.catalog, &self.query);
    self.disclosure.reset(&self.filtered, &self.query);
    debug!(open = ?self.disclosure.open_keys().collect::<Vec<_>>(), "disclosure reset");
    self.list_state.select(if self.filtered.is_empty() { None } else { Some(0) });
  }

  pub fn clear_search(&mut self) {
    self.input.clear();
    self.cursor_position = 0;
    self.input_scroll = 0;
    self.recompute_filter();
  }

  // --- Sidebar ---

  /// Sidebar lines for the filtered catalog under the current disclosure state.
  pub fn rows(&self) -> Vec<Row> {
    let mut rows = Vec::new();
    for (key, group) in self.filtered.groups.iter().enumerate() {
      rows.push(Row::Group(key));
      if self.disclosure.is_open(key) {
        rows.extend(group.items.iter().enumerate().map(|(index, id)| Row::Item { group: key, index, id: id.clone() }));
      }
    }
    rows
  }

  /// "Part N" label, numbered within the item's original group.
  pub fn item_label(&self, index: usize, id: &str) -> String {
    let part = self.nav.index().part_number(id).unwrap_or(index + 1);
    crate::filter::part_label(part - 1)
  }

  pub fn move_cursor(&mut self, delta: isize) {
    let count = self.rows().len();
    if count == 0 {
      self.list_state.select(None);
      return;
    }
    let current = self.list_state.selected().unwrap_or(0) as isize;
    let next = (current + delta).rem_euclid(count as isize) as usize;
    self.list_state.select(Some(next));
  }

  fn clamp_cursor(&mut self) {
    let count = self.rows().len();
    match self.list_state.selected() {
      _ if count == 0 => self.list_state.select(None),
      Some(i) if i >= count => self.list_state.select(Some(count - 1)),
      None => self.list_state.select(Some(0)),
      _ => {}
    }
  }

  pub fn toggle_group(&mut self, key: GroupKey) {
    self.disclosure.toggle(key);
    self.clamp_cursor();
  }

  /// Toggle the group the cursor is in.
  pub fn toggle_group_at_cursor(&mut self) {
    let rows = self.rows();
    let Some(row) = self.list_state.selected().and_then(|i| rows.get(i)) else { return };
    let key = match row {
      Row::Group(key) | Row::Item { group: key, .. } => *key,
    };
    self.toggle_group(key);
    if let Some(pos) = self.rows().iter().position(|r| *r == Row::Group(key)) {
      self.list_state.select(Some(pos));
    }
  }

  /// Enter on the cursor row: toggle a group or select an item.
  pub fn activate_cursor(&mut self) {
    let rows = self.rows();
    match self.list_state.selected().and_then(|i| rows.get(i)).cloned() {
      Some(Row::Group(key)) => self.toggle_group(key),
      Some(Row::Item { id, .. }) => self.select(&id),
      None => {}
    }
  }

  /// Reveal the current item's group and put the cursor on it.
  fn focus_current(&mut self) {
    if let Some(key) = self.filtered.group_of(self.nav.current()) {
      self.disclosure.reveal(key);
    }
    self.cursor_to_current();
  }

  /// Put the cursor on the current item if its row is visible.
  fn cursor_to_current(&mut self) {
    let current = self.nav.current().to_string();
    let rows = self.rows();
    let pos = rows.iter().position(|r| matches!(r, Row::Item { id, .. } if *id == current));
    match pos {
      Some(pos) => self.list_state.select(Some(pos)),
      None => self.clamp_cursor(),
    }
  }

  // --- Selection ---

  pub fn select(&mut self, id: &str) {
    match self.nav.select(id) {
      Ok(()) => self.after_selection(),
      Err(e) => self.set_error(e.to_string()),
    }
  }

  pub fn navigate(&mut self, command: NavCommand) {
    let moved = match command {
      NavCommand::Previous => self.nav.previous(),
      NavCommand::Next => self.nav.next(),
      NavCommand::First => self.nav.first(),
      NavCommand::Last => self.nav.last(),
    };
    if moved {
      self.after_selection();
    }
  }

  fn after_selection(&mut self) {
    self.clear_error();
    self.viewer_stale = true;
    self.focus_current();
  }

  pub fn toggle_completed(&mut self) {
    let id = self.nav.current().to_string();
    let completed = !self.nav.progress().is_completed(&id);
    self.nav.progress_mut().mark_completed(&id, completed);
    info!(id = %id, completed, "completion toggled");
  }

  // --- Viewer ---

  /// Point the viewer at the current selection if it changed.
  pub async fn sync_viewer(&mut self) {
    if !std::mem::take(&mut self.viewer_stale) || !self.viewer_enabled {
      return;
    }
    let selection = self.nav.selection().clone();
    let resume_at = self.nav.progress().last_position(&selection.current_item_id);
    self.status_message = Some("Opening player…".to_string());
    if let Err(e) = self.viewer.open(&selection.current_item_id, selection.autoplay, resume_at).await {
      self.set_error(format!("Playback error: {:#}", e));
    }
    self.status_message = None;
  }

  /// Apply viewer position and end-of-playback reports to the ledger.
  pub fn poll_viewer(&mut self) {
    for event in self.viewer.poll() {
      self.apply_viewer_event(event);
    }
  }

  fn apply_viewer_event(&mut self, event: ViewerEvent) {
    match event {
      ViewerEvent::Position { id, position } => {
        let progress = self.nav.progress_mut();
        if let Some(last) = progress.last_position(&id)
          && (position - last).abs() < constants().position_save_step_secs
        {
          return;
        }
        if let Err(e) = progress.update_position(&id, position) {
          debug!(err = %e, "viewer: ignoring position report");
        }
      }
      ViewerEvent::Finished { id, completed } => {
        info!(id = %id, completed, "viewer: playback finished");
        if completed {
          self.nav.progress_mut().mark_completed(&id, true);
        }
      }
    }
  }

  pub async fn stop_viewer(&mut self) {
    if let Err(e) = self.viewer.stop().await {
      self.set_error(format!("Failed to stop player: {:#}", e));
    }
  }

  pub fn open_in_browser(&mut self) {
    let selection = self.nav.selection().clone();
    if let Err(e) = viewer::open_in_browser(&selection.current_item_id, selection.autoplay) {
      self.set_error(format!("{:#}", e));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::CatalogGroup;
  use crate::progress::MemoryStorage;

  fn sample() -> Catalog {
    Catalog::new(vec![CatalogGroup::new("Intro", ["A", "B"]), CatalogGroup::new("Cache", ["C", "D", "E"])])
  }

  fn app() -> App {
    App::new(sample(), Box::new(MemoryStorage::default()), &Config::default(), Options::default())
  }

  fn item(group: GroupKey, index: usize, id: &str) -> Row {
    Row::Item { group, index, id: id.to_string() }
  }

  #[test]
  fn starts_on_first_item_with_first_group_open() {
    let app = app();
    assert_eq!(app.nav.current(), "A");
    assert!(!app.nav.selection().autoplay);
    assert_eq!(app.rows(), vec![Row::Group(0), item(0, 0, "A"), item(0, 1, "B"), Row::Group(1)]);
    assert_eq!(app.list_state.selected(), Some(1));
  }

  #[test]
  fn default_item_outside_first_group_keeps_only_first_group_open() {
    let default_item = constants().default_item.clone();
    let catalog =
      Catalog::new(vec![CatalogGroup::new("Intro", ["A", "B"]), CatalogGroup::new("Cache", [default_item.as_str(), "D"])]);
    for single_open in [false, true] {
      let options = Options { single_open, viewer_enabled: false };
      let app = App::new(catalog.clone(), Box::new(MemoryStorage::default()), &Config::default(), options);
      assert_eq!(app.nav.current(), default_item);
      assert_eq!(app.disclosure.open_keys().collect::<Vec<_>>(), vec![0]);
      assert_eq!(app.list_state.selected(), Some(0));
    }
  }

  #[test]
  fn cli_single_open_overrides_config() {
    let config = Config { theme_name: None, disclosure_mode: Some("multiple".into()) };
    let options = Options { single_open: true, viewer_enabled: false };
    let app = App::new(sample(), Box::new(MemoryStorage::default()), &config, options);
    assert_eq!(app.disclosure.mode(), DisclosureMode::Single);
  }

  #[test]
  fn navigation_reveals_and_follows_selection() {
    let mut app = app();
    app.navigate(NavCommand::Last);
    assert_eq!(app.nav.current(), "E");
    assert!(app.disclosure.is_open(1));
    let rows = app.rows();
    assert_eq!(rows[app.list_state.selected().unwrap()], item(1, 2, "E"));
    assert!(app.nav.progress().is_watched("E"));
  }

  #[test]
  fn activate_cursor_toggles_group_or_selects_item() {
    let mut app = app();
    app.list_state.select(Some(3));
    app.activate_cursor();
    assert!(app.disclosure.is_open(1));

    app.list_state.select(Some(5));
    app.activate_cursor();
    assert_eq!(app.nav.current(), "D");
    assert!(app.nav.selection().autoplay);
  }

  #[test]
  fn invalid_select_sets_error() {
    let mut app = app();
    app.select("nope");
    assert_eq!(app.nav.current(), "A");
    assert!(app.last_error.as_deref().unwrap().contains("invalid item"));
  }

  #[test]
  fn search_resets_disclosure_and_labels_keep_original_parts() {
    let mut app = app();
    app.toggle_group(1);
    app.input = "part 2".into();
    app.recompute_filter();
    assert_eq!(app.filtered.groups.len(), 2);
    assert_eq!(app.rows(), vec![Row::Group(0), item(0, 0, "B"), Row::Group(1), item(1, 0, "D")]);
    assert_eq!(app.item_label(0, "D"), "Part 2");

    app.clear_search();
    assert_eq!(app.rows().len(), 4);
    assert!(!app.disclosure.is_open(1));
  }

  #[test]
  fn whitespace_only_edit_keeps_manual_toggles() {
    let mut app = app();
    app.toggle_group(1);
    app.input = "   ".into();
    app.recompute_filter();
    assert!(app.disclosure.is_open(1));
  }

  #[test]
  fn empty_search_result_clears_cursor() {
    let mut app = app();
    app.input = "kubernetes".into();
    app.recompute_filter();
    assert!(app.rows().is_empty());
    assert_eq!(app.list_state.selected(), None);
    app.move_cursor(1);
    assert_eq!(app.list_state.selected(), None);
  }

  #[test]
  fn cursor_wraps() {
    let mut app = app();
    app.list_state.select(Some(0));
    app.move_cursor(-1);
    assert_eq!(app.list_state.selected(), Some(3));
    app.move_cursor(1);
    assert_eq!(app.list_state.selected(), Some(0));
  }

  #[test]
  fn toggle_group_at_cursor_lands_on_header() {
    let mut app = app();
    app.list_state.select(Some(2));
    app.toggle_group_at_cursor();
    assert!(!app.disclosure.is_open(0));
    assert_eq!(app.list_state.selected(), Some(0));
  }

  #[test]
  fn toggle_completed_flips_current() {
    let mut app = app();
    app.select("C");
    app.toggle_completed();
    assert!(app.nav.progress().is_completed("C"));
    app.toggle_completed();
    assert!(!app.nav.progress().is_completed("C"));
    assert!(app.nav.progress().is_watched("C"));
  }

  #[test]
  fn session_holds_one_key_subscription() {
    let mut app = app();
    app.start_session();
    app.start_session();
    assert_eq!(app.key_listeners().active(), 1);
  }

  #[tokio::test]
  async fn end_session_releases_bindings() {
    let mut app = app();
    app.start_session();
    app.end_session().await;
    assert_eq!(app.key_listeners().active(), 0);
  }

  #[tokio::test]
  async fn disabled_viewer_is_never_started() {
    let mut app = app();
    app.select("B");
    app.sync_viewer().await;
    assert!(!app.viewer.is_playing());
    assert_eq!(app.last_error, None);
  }

  #[test]
  fn small_position_moves_are_not_written() {
    let mut app = app();
    let position = |position: f64| ViewerEvent::Position { id: "B".into(), position };
    app.apply_viewer_event(position(10.0));
    app.apply_viewer_event(position(10.4));
    assert_eq!(app.nav.progress().last_position("B"), Some(10.0));
    app.apply_viewer_event(position(11.5));
    assert_eq!(app.nav.progress().last_position("B"), Some(11.5));
    app.apply_viewer_event(position(2.0));
    assert_eq!(app.nav.progress().last_position("B"), Some(2.0));
    assert!(app.nav.progress().is_watched("B"));

    app.apply_viewer_event(ViewerEvent::Finished { id: "B".into(), completed: true });
    assert!(app.nav.progress().is_completed("B"));
  }
}
