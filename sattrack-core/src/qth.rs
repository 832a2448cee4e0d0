//! Ground-station ("QTH") records.
//!
//! The observer location lives in its own TOML file referenced from the
//! module configuration, so several modules can share one station.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qth {
    pub name: String,
    pub lat_deg: f64,
    pub lon_deg: f64,
    /// Altitude above sea level in meters.
    #[serde(default)]
    pub alt_m: f64,
    /// Maidenhead locator, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
}

impl Default for Qth {
    fn default() -> Self {
        Self {
            name: "sample".to_string(),
            lat_deg: 0.0,
            lon_deg: 0.0,
            alt_m: 0.0,
            locator: None,
        }
    }
}

impl Qth {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let qth: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        qth.validate()?;
        Ok(qth)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-90.0..=90.0).contains(&self.lat_deg) {
            return Err(ConfigError::Invalid {
                key: "lat_deg",
                reason: format!("{} is outside -90..=90", self.lat_deg),
            });
        }
        if !(-180.0..=180.0).contains(&self.lon_deg) {
            return Err(ConfigError::Invalid {
                key: "lon_deg",
                reason: format!("{} is outside -180..=180", self.lon_deg),
            });
        }
        Ok(())
    }
}
