//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/notetree/notetree.toml`
//! 3. Explicit config file passed with `--config`
//! 4. Environment variables: `NOTETREE_*` prefix, `__` between sections

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::DEFAULT_RETENTION_DAYS;
use crate::application::{ApplicationError, SessionOptions};
use crate::domain::DEFAULT_HISTORY_DEPTH;

/// Undo history and edit journal settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HistoryConfig {
    /// Record undo snapshots and journal entries on save
    pub enabled: bool,
    /// Snapshots kept per node
    pub depth: usize,
    /// Journal entries older than this many days are pruned
    pub retention_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            depth: DEFAULT_HISTORY_DEPTH,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before content is written
    pub quiet_period_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: 800,
        }
    }
}

/// Raw settings for intermediate parsing: `None` means "not specified, inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub db_path: Option<PathBuf>,
    pub history: RawHistoryConfig,
    pub autosave: RawAutosaveConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawHistoryConfig {
    pub enabled: Option<bool>,
    pub depth: Option<usize>,
    pub retention_days: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawAutosaveConfig {
    pub quiet_period_ms: Option<u64>,
}

/// Unified configuration for notetree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// SQLite database file
    pub db_path: PathBuf,
    pub history: HistoryConfig,
    pub autosave: AutosaveConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            history: HistoryConfig::default(),
            autosave: AutosaveConfig::default(),
        }
    }
}

/// `<data_dir>/notetree.db`, falling back to `~/.notetree/notetree.db`.
fn default_db_path() -> PathBuf {
    ProjectDirs::from("", "", "notetree")
        .map(|dirs| dirs.data_dir().join("notetree.db"))
        .unwrap_or_else(|| PathBuf::from("~/.notetree/notetree.db"))
}

/// Get the XDG config directory for notetree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "notetree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("notetree.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables leave the input as is.
fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// `config_file`, when given, must exist; it is applied on top of the
    /// global file.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(path) = config_file {
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.validate()?;
        Ok(current)
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            db_path: overlay
                .db_path
                .clone()
                .unwrap_or_else(|| self.db_path.clone()),
            history: HistoryConfig {
                enabled: overlay.history.enabled.unwrap_or(self.history.enabled),
                depth: overlay.history.depth.unwrap_or(self.history.depth),
                retention_days: overlay
                    .history
                    .retention_days
                    .unwrap_or(self.history.retention_days),
            },
            autosave: AutosaveConfig {
                quiet_period_ms: overlay
                    .autosave
                    .quiet_period_ms
                    .unwrap_or(self.autosave.quiet_period_ms),
            },
        }
    }

    /// Apply NOTETREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("NOTETREE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("db_path") {
            settings.db_path = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("history.enabled") {
            settings.history.enabled = val;
        }
        if let Ok(val) = config.get::<usize>("history.depth") {
            settings.history.depth = val;
        }
        if let Ok(val) = config.get::<u32>("history.retention_days") {
            settings.history.retention_days = val;
        }
        if let Ok(val) = config.get::<u64>("autosave.quiet_period_ms") {
            settings.autosave.quiet_period_ms = val;
        }
        Ok(settings)
    }

    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.db_path.to_string_lossy().as_ref());
        self.db_path = PathBuf::from(expanded);
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.history.depth == 0 {
            return Err(ApplicationError::Config {
                message: "history.depth must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.autosave.quiet_period_ms)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            history_enabled: self.history.enabled,
            history_depth: self.history.depth,
            quiet_period: self.quiet_period(),
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# notetree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/notetree/notetree.toml
#   File:   --config <path>
#   Env:    NOTETREE_* environment variables, e.g. NOTETREE_HISTORY__DEPTH=100

# SQLite database holding all notes
# db_path = "~/.local/share/notetree/notetree.db"

[history]
# Record undo snapshots and journal entries when content is saved
# enabled = true

# Undo snapshots kept per note
# depth = 50

# Journal entries older than this are pruned
# retention_days = 4

[autosave]
# Quiet period after the last edit before content is written
# quiet_period_ms = 800
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_created_then_match_documented_values() {
        let settings = Settings::default();
        assert!(settings.db_path.ends_with("notetree.db"));
        assert!(settings.history.enabled);
        assert_eq!(settings.history.depth, 50);
        assert_eq!(settings.history.retention_days, 4);
        assert_eq!(settings.quiet_period(), Duration::from_millis(800));
    }

    #[test]
    fn given_tilde_in_db_path_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            db_path: PathBuf::from("~/notes/notetree.db"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let db = settings.db_path.to_string_lossy();
        assert!(db.starts_with(&home), "db_path should start with home dir: {}", db);
        assert!(!db.contains('~'));
    }

    #[test]
    fn given_partial_overlay_when_merged_then_unspecified_fields_inherit() {
        let base = Settings::default();
        let overlay = RawSettings {
            db_path: None,
            history: RawHistoryConfig {
                enabled: Some(false),
                depth: None,
                retention_days: Some(7),
            },
            autosave: RawAutosaveConfig::default(),
        };

        let result = base.merge_with(&overlay);

        assert_eq!(result.db_path, base.db_path);
        assert!(!result.history.enabled);
        assert_eq!(result.history.depth, 50);
        assert_eq!(result.history.retention_days, 7);
        assert_eq!(result.autosave.quiet_period_ms, 800);
    }

    #[test]
    fn given_zero_depth_when_validated_then_config_error() {
        let mut settings = Settings::default();
        settings.history.depth = 0;
        assert!(matches!(
            settings.validate(),
            Err(ApplicationError::Config { .. })
        ));
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("template parses");
        assert!(raw.db_path.is_none());
    }
}
