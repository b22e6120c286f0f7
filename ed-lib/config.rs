use ed_core::{
  arena::DEFAULT_BLOCK_SIZE,
  delimiter::{
    Delimiter,
    Mode,
  },
};
use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

use crate::history::DEFAULT_HISTORY_LIMIT;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to parse engine config: {0}")]
  Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct EngineConfig {
  /// Bound of each document's undo stack. 0 keeps everything.
  pub history_limit:    usize,
  pub arena_block_size: usize,
  /// Line ending of new lines in documents that are not in DOS mode.
  pub default_mode:     Mode,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      history_limit:    DEFAULT_HISTORY_LIMIT,
      arena_block_size: DEFAULT_BLOCK_SIZE,
      default_mode:     Mode::Unix,
    }
  }
}

impl EngineConfig {
  pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(text)?)
  }

  /// Delimiter for new lines when the document's mode does not decide it.
  pub fn default_delimiter(&self) -> Delimiter {
    match self.default_mode {
      Mode::Dos => Delimiter::DOS,
      _ => Delimiter::UNIX,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_toml_is_default() {
    assert_eq!(EngineConfig::from_toml("").unwrap(), EngineConfig::default());
  }

  #[test]
  fn kebab_case_fields() {
    let config = EngineConfig::from_toml(
      r#"
        history-limit = 8
        default-mode = "dos"
      "#,
    )
    .unwrap();
    assert_eq!(config.history_limit, 8);
    assert_eq!(config.arena_block_size, DEFAULT_BLOCK_SIZE);
    assert_eq!(config.default_delimiter(), Delimiter::DOS);
  }

  #[test]
  fn unknown_fields_are_rejected() {
    assert!(matches!(
      EngineConfig::from_toml("undo-depth = 3"),
      Err(ConfigError::Parse(_))
    ));
  }
}
