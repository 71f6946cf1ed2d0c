//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! with no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  /// Name used for the platform config/data directories.
  pub app_name: String,
  /// Key under which the progress ledger is persisted.
  pub progress_namespace: String,
  /// Item selected at startup when the catalog does not provide one.
  pub default_item: String,

  // Viewer
  pub player_command: String,
  pub player_status_format: String,
  pub completion_threshold_pct: f64,
  pub embed_base_url: String,
  pub embed_params: String,
  pub watch_base_url: String,
  /// Minimum playback movement before a new position is written to the ledger.
  pub position_save_step_secs: f64,

  // UI
  pub error_dismiss_secs: u64,
  pub tick_millis: u64,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
