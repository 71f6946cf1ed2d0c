use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::constants;

/// User preferences persisted in `prefs.toml`.
#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq)]
pub struct Config {
  pub theme_name: Option<String>,
  /// "single" or "multiple".
  pub disclosure_mode: Option<String>,
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = ProjectDirs::from("", "", &constants().app_name) {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = std::fs::read_to_string(config_file) {
        return Self::parse(&content);
      }
    }
    Self::default()
  }

  /// Lenient parse: a broken file falls back to defaults.
  pub fn parse(content: &str) -> Self {
    toml::from_str(content).unwrap_or_else(|e| {
      warn!(err = %e, "config: prefs.toml unreadable, using defaults");
      Self::default()
    })
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = ProjectDirs::from("", "", &constants().app_name) {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join("prefs.toml");
        match toml::to_string(self) {
          Ok(content) => {
            if let Err(e) = std::fs::write(config_file, content) {
              warn!(err = %e, "config: failed to write prefs.toml");
            }
          }
          Err(e) => warn!(err = %e, "config: failed to serialize prefs"),
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_through_toml() {
    let config = Config { theme_name: Some("Light".into()), disclosure_mode: Some("single".into()) };
    let text = toml::to_string(&config).unwrap();
    assert_eq!(Config::parse(&text), config);
  }

  #[test]
  fn missing_fields_default_to_none() {
    assert_eq!(Config::parse("theme_name = \"Dark\""), Config { theme_name: Some("Dark".into()), disclosure_mode: None });
  }

  #[test]
  fn garbage_falls_back_to_default() {
    assert_eq!(Config::parse("theme_name = ["), Config::default());
  }
}
