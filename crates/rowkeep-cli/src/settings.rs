//! Runtime settings: an optional TOML file overlaid with `ROWKEEP_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

/// Shape of `rowkeep.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// SQLite database file. A leading `~/` is expanded against `$HOME`.
  pub database:                PathBuf,
  /// Year used as the end of a band's career when it has not split.
  /// Defaults to the current year.
  #[serde(default)]
  pub lifespan_reference_year: Option<i32>,
}

impl Settings {
  /// Load settings from `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .set_default("database", "rowkeep.db")?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ROWKEEP"))
      .build()
      .context("failed to read config file")?;

    let mut settings: Settings = settings
      .try_deserialize()
      .context("failed to deserialise Settings")?;
    settings.database = expand_tilde(&settings.database);
    Ok(settings)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let settings = Settings::load(Path::new("/nonexistent/rowkeep.toml")).unwrap();
    assert!(!settings.database.as_os_str().is_empty());
  }

  #[test]
  fn paths_without_tilde_are_untouched() {
    assert_eq!(expand_tilde(Path::new("/var/db/x.db")), PathBuf::from("/var/db/x.db"));
    assert_eq!(expand_tilde(Path::new("~user/x.db")), PathBuf::from("~user/x.db"));
  }
}
