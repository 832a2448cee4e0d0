//! Typed module and daemon configuration.
//!
//! Configuration is TOML deserialized into explicit structs and validated at
//! load time; nothing downstream ever touches a dynamically-keyed map. A
//! module file may omit tick interval and throttle, in which case the
//! daemon-wide [`Preferences`] supply the defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timectl::{THROTTLE_MAX, THROTTLE_MIN};
use crate::view::LayoutCell;

/// Shortest accepted tick interval.
pub const MIN_TICK_INTERVAL_MS: u64 = 100;
/// Longest accepted tick interval.
pub const MAX_TICK_INTERVAL_MS: u64 = 60_000;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn default_layout() -> Vec<String> {
    vec!["map:0:2:0:1".to_string(), "list:0:2:1:2".to_string()]
}

/// Per-module configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Display name of the module.
    pub name: String,

    /// Tick interval override in milliseconds; preferences apply when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_interval_ms: Option<u64>,

    /// Default throttle override; preferences apply when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttle: Option<i32>,

    /// Layout grid tokens, `kind:left:right:top:bottom` each.
    #[serde(default = "default_layout")]
    pub layout: Vec<String>,

    /// Ground-station file, resolved relative to the module config file.
    pub qth_file: PathBuf,
}

impl ModuleConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = read_toml(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "name",
                reason: "module name must not be empty".to_string(),
            });
        }
        if let Some(ms) = self.tick_interval_ms {
            if !(MIN_TICK_INTERVAL_MS..=MAX_TICK_INTERVAL_MS).contains(&ms) {
                return Err(ConfigError::Invalid {
                    key: "tick_interval_ms",
                    reason: format!(
                        "{ms} is outside {MIN_TICK_INTERVAL_MS}..={MAX_TICK_INTERVAL_MS}"
                    ),
                });
            }
        }
        if let Some(t) = self.throttle {
            if !(THROTTLE_MIN..=THROTTLE_MAX).contains(&t) {
                return Err(ConfigError::Invalid {
                    key: "throttle",
                    reason: format!("{t} is outside {THROTTLE_MIN}..={THROTTLE_MAX}"),
                });
            }
        }
        if self.layout.is_empty() {
            return Err(ConfigError::Invalid {
                key: "layout",
                reason: "at least one view cell is required".to_string(),
            });
        }
        self.layout_cells()?;
        Ok(())
    }

    /// Parsed layout grid, in configuration order.
    pub fn layout_cells(&self) -> Result<Vec<LayoutCell>, ConfigError> {
        self.layout.iter().map(|t| LayoutCell::parse(t)).collect()
    }

    /// Ground-station file path, resolved against the module config file.
    pub fn resolve_qth_path(&self, cfg_path: &Path) -> PathBuf {
        if self.qth_file.is_absolute() {
            self.qth_file.clone()
        } else {
            cfg_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(&self.qth_file)
        }
    }

    pub fn effective_tick_interval(&self, prefs: &Preferences) -> u64 {
        self.tick_interval_ms.unwrap_or(prefs.tick_interval_ms)
    }

    pub fn effective_throttle(&self, prefs: &Preferences) -> i32 {
        self.throttle.unwrap_or(prefs.throttle)
    }
}

fn default_tick_interval_ms() -> u64 {
    300
}

fn default_throttle() -> i32 {
    1
}

/// Daemon-wide preferences shared by all modules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_throttle")]
    pub throttle: i32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            throttle: default_throttle(),
        }
    }
}

impl Preferences {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let prefs: Self = read_toml(path.as_ref())?;
        prefs.validate()?;
        Ok(prefs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TICK_INTERVAL_MS..=MAX_TICK_INTERVAL_MS).contains(&self.tick_interval_ms) {
            return Err(ConfigError::Invalid {
                key: "tick_interval_ms",
                reason: format!(
                    "{} is outside {MIN_TICK_INTERVAL_MS}..={MAX_TICK_INTERVAL_MS}",
                    self.tick_interval_ms
                ),
            });
        }
        if !(THROTTLE_MIN..=THROTTLE_MAX).contains(&self.throttle) {
            return Err(ConfigError::Invalid {
                key: "throttle",
                reason: format!("{} is outside {THROTTLE_MIN}..={THROTTLE_MAX}", self.throttle),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ViewKind;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("sattrack_config_tests").join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_full_module_config_parses() {
        let dir = scratch_dir("full");
        let path = dir.join("leo.toml");
        fs::write(
            &path,
            r#"
name = "LEO birds"
tick_interval_ms = 500
throttle = 2
layout = ["map:0:2:0:1", "polar:0:1:1:2", "single:1:2:1:2"]
qth_file = "home.qth.toml"
"#,
        )
        .unwrap();

        let config = ModuleConfig::from_file(&path).unwrap();
        assert_eq!(config.name, "LEO birds");
        assert_eq!(config.tick_interval_ms, Some(500));
        let cells = config.layout_cells().unwrap();
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[1].kind, ViewKind::Polar);
        assert_eq!(config.resolve_qth_path(&path), dir.join("home.qth.toml"));
    }

    #[test]
    fn test_omitted_fields_fall_back_to_preferences() {
        let dir = scratch_dir("defaults");
        let path = dir.join("min.toml");
        fs::write(&path, "name = \"minimal\"\nqth_file = \"q.toml\"\n").unwrap();

        let config = ModuleConfig::from_file(&path).unwrap();
        assert_eq!(config.tick_interval_ms, None);

        let prefs = Preferences {
            tick_interval_ms: 750,
            throttle: 3,
        };
        assert_eq!(config.effective_tick_interval(&prefs), 750);
        assert_eq!(config.effective_throttle(&prefs), 3);
        assert!(!config.layout.is_empty());
    }

    #[test]
    fn test_missing_name_is_a_parse_error() {
        let dir = scratch_dir("noname");
        let path = dir.join("bad.toml");
        fs::write(&path, "qth_file = \"q.toml\"\n").unwrap();
        assert!(matches!(
            ModuleConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_interval_out_of_range_is_rejected() {
        let dir = scratch_dir("range");
        let path = dir.join("bad.toml");
        fs::write(
            &path,
            "name = \"m\"\ntick_interval_ms = 5\nqth_file = \"q.toml\"\n",
        )
        .unwrap();
        match ModuleConfig::from_file(&path) {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "tick_interval_ms"),
            other => panic!("expected invalid interval, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_layout_token_is_rejected() {
        let dir = scratch_dir("layout");
        let path = dir.join("bad.toml");
        fs::write(
            &path,
            "name = \"m\"\nlayout = [\"cube:0:1:0:1\"]\nqth_file = \"q.toml\"\n",
        )
        .unwrap();
        assert!(matches!(
            ModuleConfig::from_file(&path),
            Err(ConfigError::Invalid { key: "layout", .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            ModuleConfig::from_file("/nonexistent/sattrack/mod.toml"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_preferences_defaults_and_validation() {
        let prefs = Preferences::default();
        assert_eq!(prefs.tick_interval_ms, 300);
        assert_eq!(prefs.throttle, 1);

        let bad = Preferences {
            tick_interval_ms: 300,
            throttle: 42,
        };
        assert!(bad.validate().is_err());
    }
}
