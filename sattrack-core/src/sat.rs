//! Satellite records and the satellite-data collaborator.
//!
//! The module keeps a mapping from catalog number to [`SatelliteRecord`];
//! the records themselves come from an external [`SatDataSource`], which is
//! also the only party that understands the orbital elements. Position
//! computation happens behind that trait — this crate never interprets the
//! element set.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// NORAD catalog number, the satellite identifier.
pub type CatNum = u32;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("satellite store unavailable: {0}")]
    Unavailable(String),
    #[error("unknown satellite {0}")]
    NotFound(CatNum),
    #[error("bad satellite data for {catnum}: {reason}")]
    Corrupt { catnum: CatNum, reason: String },
}

/// Geodetic position at some instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPos {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_km: f64,
}

/// Raw orbital-element state as supplied by the data store.
///
/// Opaque here; only the store interprets it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrbitalElements {
    /// Element-set epoch as a Julian day number.
    #[serde(default)]
    pub epoch_daynum: f64,
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteRecord {
    pub catnum: CatNum,
    pub name: String,
    pub elements: OrbitalElements,
    /// Position from the most recent tick, if any.
    #[serde(default)]
    pub position: Option<GeoPos>,
    /// Simulated day number of the most recent position update.
    #[serde(default)]
    pub last_computed: Option<f64>,
}

impl SatelliteRecord {
    pub fn new(catnum: CatNum, name: impl Into<String>) -> Self {
        Self {
            catnum,
            name: name.into(),
            elements: OrbitalElements::default(),
            position: None,
            last_computed: None,
        }
    }
}

/// The external satellite-data collaborator.
///
/// Called once per `reload` for the id list and record loads, and once per
/// tick per satellite for positions.
#[async_trait]
pub trait SatDataSource: Send + Sync {
    /// Catalog numbers configured for the named module.
    async fn satellite_ids(&self, module: &str) -> Result<Vec<CatNum>, StoreError>;

    /// Load the full record for one satellite.
    async fn load(&self, catnum: CatNum) -> Result<SatelliteRecord, StoreError>;

    /// Position of `record` at the given simulated day number, or `None`
    /// when the store has no answer for that time.
    fn position_at(&self, record: &SatelliteRecord, daynum: f64) -> Option<GeoPos>;
}

/// Convenience alias for the module's satellite mapping.
pub type SatMap = HashMap<CatNum, SatelliteRecord>;
