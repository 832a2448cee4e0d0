//! Ephemeris-file satellite store.
//!
//! One JSON file per satellite under the data directory, named
//! `<catnum>.json`, holding identity plus a time-sorted list of position
//! samples. An optional `modules.json` index assigns satellites to modules;
//! without an entry a module gets every satellite in the directory.
//!
//! Position queries interpolate linearly between the bracketing samples
//! (shortest arc for longitude) and refuse to extrapolate outside the
//! sampled span. The samples come from an external prediction tool; this
//! store only serves them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use sattrack_core::sat::{
    CatNum, GeoPos, OrbitalElements, SatDataSource, SatelliteRecord, StoreError,
};
use serde::{Deserialize, Serialize};
use tokio::fs;

const MODULE_INDEX_FILE: &str = "modules.json";

/// One sample on a satellite's precomputed track.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EphemerisSample {
    pub daynum: f64,
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_km: f64,
}

/// On-disk satellite file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EphemerisFile {
    pub catnum: CatNum,
    pub name: String,
    #[serde(default)]
    pub elements: OrbitalElements,
    #[serde(default)]
    pub samples: Vec<EphemerisSample>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ModuleIndex {
    #[serde(default)]
    modules: HashMap<String, Vec<CatNum>>,
}

pub struct EphemerisStore {
    dir: PathBuf,
    /// Tracks cached by `load`, consulted by `position_at`.
    tracks: RwLock<HashMap<CatNum, Vec<EphemerisSample>>>,
}

impl EphemerisStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            tracks: RwLock::new(HashMap::new()),
        }
    }

    fn unavailable(&self, err: impl std::fmt::Display) -> StoreError {
        StoreError::Unavailable(format!("{}: {}", self.dir.display(), err))
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Shortest-arc interpolation between two longitudes, in degrees.
fn lerp_lon(a: f64, b: f64, t: f64) -> f64 {
    let delta = (b - a + 540.0).rem_euclid(360.0) - 180.0;
    (a + delta * t + 180.0).rem_euclid(360.0) - 180.0
}

fn sample_pos(s: &EphemerisSample) -> GeoPos {
    GeoPos {
        lat_deg: s.lat_deg,
        lon_deg: s.lon_deg,
        alt_km: s.alt_km,
    }
}

#[async_trait]
impl SatDataSource for EphemerisStore {
    async fn satellite_ids(&self, module: &str) -> Result<Vec<CatNum>, StoreError> {
        let index_path = self.dir.join(MODULE_INDEX_FILE);
        if let Ok(content) = fs::read_to_string(&index_path).await {
            let index: ModuleIndex = serde_json::from_str(&content)
                .map_err(|e| self.unavailable(format!("bad module index: {e}")))?;
            if let Some(ids) = index.modules.get(module) {
                return Ok(ids.clone());
            }
        }

        // No index entry: every satellite file in the directory.
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await.map_err(|e| self.unavailable(e))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| self.unavailable(e))? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            if let Some(catnum) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse().ok())
            {
                ids.push(catnum);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    async fn load(&self, catnum: CatNum) -> Result<SatelliteRecord, StoreError> {
        let path = self.dir.join(format!("{catnum}.json"));
        let content = fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(catnum)
            } else {
                self.unavailable(e)
            }
        })?;
        let mut file: EphemerisFile = serde_json::from_str(&content).map_err(|e| {
            StoreError::Corrupt {
                catnum,
                reason: e.to_string(),
            }
        })?;
        if file.catnum != catnum {
            return Err(StoreError::Corrupt {
                catnum,
                reason: format!("file claims catalog number {}", file.catnum),
            });
        }

        file.samples
            .sort_by(|a, b| a.daynum.total_cmp(&b.daynum));
        self.tracks
            .write()
            .expect("track cache poisoned")
            .insert(catnum, file.samples);

        Ok(SatelliteRecord {
            catnum,
            name: file.name,
            elements: file.elements,
            position: None,
            last_computed: None,
        })
    }

    fn position_at(&self, record: &SatelliteRecord, daynum: f64) -> Option<GeoPos> {
        let tracks = self.tracks.read().expect("track cache poisoned");
        let track = tracks.get(&record.catnum)?;
        let (first, last) = (track.first()?, track.last()?);
        if daynum < first.daynum || daynum > last.daynum {
            return None;
        }

        let i = track.partition_point(|s| s.daynum <= daynum);
        if i == track.len() {
            return Some(sample_pos(last));
        }
        let (a, b) = (&track[i - 1], &track[i]);
        let span = b.daynum - a.daynum;
        if span <= 0.0 {
            return Some(sample_pos(a));
        }
        let t = (daynum - a.daynum) / span;
        Some(GeoPos {
            lat_deg: lerp(a.lat_deg, b.lat_deg, t),
            lon_deg: lerp_lon(a.lon_deg, b.lon_deg, t),
            alt_km: lerp(a.alt_km, b.alt_km, t),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("sattrack_store_tests").join(tag);
        if dir.exists() {
            std_fs::remove_dir_all(&dir).unwrap();
        }
        std_fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_sat(dir: &Path, catnum: CatNum, name: &str, samples: &[(f64, f64, f64, f64)]) {
        let file = EphemerisFile {
            catnum,
            name: name.to_string(),
            elements: OrbitalElements::default(),
            samples: samples
                .iter()
                .map(|&(daynum, lat_deg, lon_deg, alt_km)| EphemerisSample {
                    daynum,
                    lat_deg,
                    lon_deg,
                    alt_km,
                })
                .collect(),
        };
        std_fs::write(
            dir.join(format!("{catnum}.json")),
            serde_json::to_string_pretty(&file).unwrap(),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_ids_scanned_from_directory() {
        let dir = scratch_dir("scan");
        write_sat(&dir, 25544, "ISS", &[]);
        write_sat(&dir, 7530, "AO-7", &[]);
        std_fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let store = EphemerisStore::new(&dir);
        assert_eq!(store.satellite_ids("any").await.unwrap(), vec![7530, 25544]);
    }

    #[tokio::test]
    async fn test_ids_from_module_index() {
        let dir = scratch_dir("index");
        write_sat(&dir, 25544, "ISS", &[]);
        write_sat(&dir, 7530, "AO-7", &[]);
        std_fs::write(
            dir.join(MODULE_INDEX_FILE),
            r#"{"modules": {"leo": [25544]}}"#,
        )
        .unwrap();

        let store = EphemerisStore::new(&dir);
        assert_eq!(store.satellite_ids("leo").await.unwrap(), vec![25544]);
        // A module without an index entry falls back to the full directory.
        assert_eq!(
            store.satellite_ids("other").await.unwrap(),
            vec![7530, 25544]
        );
    }

    #[tokio::test]
    async fn test_missing_directory_is_unavailable() {
        let store = EphemerisStore::new("/nonexistent/sattrack/data");
        assert!(matches!(
            store.satellite_ids("any").await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_load_missing_and_corrupt_files() {
        let dir = scratch_dir("load_err");
        std_fs::write(dir.join("99999.json"), "{ not json").unwrap();

        let store = EphemerisStore::new(&dir);
        assert!(matches!(
            store.load(11111).await,
            Err(StoreError::NotFound(11111))
        ));
        assert!(matches!(
            store.load(99999).await,
            Err(StoreError::Corrupt { catnum: 99999, .. })
        ));
    }

    #[tokio::test]
    async fn test_position_interpolates_between_samples() {
        let dir = scratch_dir("interp");
        write_sat(
            &dir,
            25544,
            "ISS",
            &[(100.0, 0.0, 10.0, 400.0), (100.1, 10.0, 20.0, 420.0)],
        );

        let store = EphemerisStore::new(&dir);
        let record = store.load(25544).await.unwrap();

        let mid = store.position_at(&record, 100.05).unwrap();
        assert!((mid.lat_deg - 5.0).abs() < 1e-9);
        assert!((mid.lon_deg - 15.0).abs() < 1e-9);
        assert!((mid.alt_km - 410.0).abs() < 1e-9);

        // Sample points are returned exactly.
        let at_start = store.position_at(&record, 100.0).unwrap();
        assert_eq!(at_start.lat_deg, 0.0);
        let at_end = store.position_at(&record, 100.1).unwrap();
        assert_eq!(at_end.lat_deg, 10.0);
    }

    #[tokio::test]
    async fn test_longitude_interpolates_across_dateline() {
        let dir = scratch_dir("dateline");
        write_sat(
            &dir,
            25544,
            "ISS",
            &[(100.0, 0.0, 170.0, 400.0), (100.1, 0.0, -170.0, 400.0)],
        );

        let store = EphemerisStore::new(&dir);
        let record = store.load(25544).await.unwrap();
        let mid = store.position_at(&record, 100.05).unwrap();
        assert!((mid.lon_deg.abs() - 180.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_no_extrapolation_outside_span() {
        let dir = scratch_dir("span");
        write_sat(&dir, 25544, "ISS", &[(100.0, 0.0, 0.0, 400.0)]);

        let store = EphemerisStore::new(&dir);
        let record = store.load(25544).await.unwrap();
        assert!(store.position_at(&record, 99.9).is_none());
        assert!(store.position_at(&record, 100.1).is_none());
        assert!(store.position_at(&record, 100.0).is_some());
    }

    #[tokio::test]
    async fn test_position_unknown_before_load() {
        let dir = scratch_dir("unloaded");
        let store = EphemerisStore::new(&dir);
        let record = SatelliteRecord::new(25544, "ISS");
        assert!(store.position_at(&record, 100.0).is_none());
    }
}
