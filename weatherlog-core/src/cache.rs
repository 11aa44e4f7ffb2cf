//! Temporal record of locations, daily and hourly occurrences, and codes.
//!
//! [`TemporalCache`] is the read side the orchestrator queries; [`RecordWriter`]
//! is the write side gateways persist into. [`RecordStore`] implements both
//! over an in-memory snapshot that can be saved to and loaded from JSON.

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

use crate::{
    code_chain::CodeBook,
    error::{CodeChainError, StoreError},
    model::{
        Code, CodeId, DailyId, DailyOccurrence, HourlyId, HourlyOccurrence, Location, LocationId,
        NewDaily, NewHourly, RecordKind,
    },
};

pub trait TemporalCache: Send + Sync {
    fn find_daily(
        &self,
        location: LocationId,
        date: NaiveDate,
        kind: RecordKind,
    ) -> Option<DailyOccurrence>;

    /// Samples of one day, ascending by time.
    fn find_hourlies_by_daily(&self, daily: DailyId) -> Vec<HourlyOccurrence>;

    fn location(&self, id: LocationId) -> Option<Location>;

    /// Resolves `code` through its associated chain.
    fn resolve_code(&self, code: Option<CodeId>) -> Result<Option<Code>, CodeChainError>;
}

pub trait RecordWriter: Send + Sync {
    /// Returns the existing code with this value, or creates a default one.
    fn ensure_code(&self, value: i32, description: &str, icon_url: &str) -> CodeId;

    fn insert_daily(&self, daily: NewDaily) -> Result<DailyId, StoreError>;

    fn insert_hourly(&self, daily: DailyId, hourly: NewHourly) -> Result<HourlyId, StoreError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Records {
    #[serde(default)]
    locations: Vec<Location>,
    #[serde(default)]
    codes: CodeBook,
    #[serde(default)]
    dailies: Vec<DailyOccurrence>,
    #[serde(default)]
    hourlies: Vec<HourlyOccurrence>,
    #[serde(default)]
    next_daily: u64,
    #[serde(default)]
    next_hourly: u64,
}

impl Records {
    fn daily(&self, id: DailyId) -> Option<&DailyOccurrence> {
        self.dailies.iter().find(|d| d.id == id)
    }
}

/// File-backed record store.
#[derive(Debug, Default)]
pub struct RecordStore {
    path: Option<PathBuf>,
    records: RwLock<Records>,
}

impl RecordStore {
    /// Store that lives only in memory; [`RecordStore::save`] is a no-op.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the store at `path`, starting empty when the file doesn't exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let records: Records = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&contents).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?
        } else {
            Records::default()
        };

        debug!(path = %path.display(), "opened record store");

        Ok(Self {
            path: Some(path),
            records: RwLock::new(records),
        })
    }

    /// Writes the snapshot to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(&*self.records.read()).map_err(|source| {
            StoreError::Json {
                path: path.clone(),
                source,
            }
        })?;

        fs::write(path, json).map_err(io_err)?;
        debug!(path = %path.display(), "saved record store");
        Ok(())
    }

    pub fn add_location(&self, name: &str, latitude: f64, longitude: f64) -> Location {
        let mut records = self.records.write();
        let location = Location {
            id: LocationId(records.locations.len() as u32),
            name: name.to_string(),
            latitude,
            longitude,
        };
        records.locations.push(location.clone());
        location
    }

    /// Case-insensitive lookup by name.
    pub fn find_location_by_name(&self, name: &str) -> Option<Location> {
        self.records
            .read()
            .locations
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn locations(&self) -> Vec<Location> {
        self.records.read().locations.clone()
    }

    pub fn codes(&self) -> Vec<Code> {
        self.records.read().codes.iter().cloned().collect()
    }

    pub fn find_code_by_value(&self, value: i32) -> Option<Code> {
        self.records.read().codes.find_by_value(value).cloned()
    }

    pub fn link_code(&self, from: CodeId, to: Option<CodeId>) -> Result<(), StoreError> {
        self.records.write().codes.link(from, to)
    }

    pub fn add_code(
        &self,
        value: i32,
        description: &str,
        icon_url: &str,
        is_default: bool,
    ) -> CodeId {
        self.records
            .write()
            .codes
            .insert(value, description, icon_url, is_default)
    }
}

impl TemporalCache for RecordStore {
    fn find_daily(
        &self,
        location: LocationId,
        date: NaiveDate,
        kind: RecordKind,
    ) -> Option<DailyOccurrence> {
        self.records
            .read()
            .dailies
            .iter()
            .find(|d| d.location == location && d.date == date && d.kind == kind)
            .cloned()
    }

    fn find_hourlies_by_daily(&self, daily: DailyId) -> Vec<HourlyOccurrence> {
        let mut hourlies: Vec<HourlyOccurrence> = self
            .records
            .read()
            .hourlies
            .iter()
            .filter(|h| h.daily == daily)
            .cloned()
            .collect();
        hourlies.sort_by_key(|h| h.time);
        hourlies
    }

    fn location(&self, id: LocationId) -> Option<Location> {
        self.records
            .read()
            .locations
            .iter()
            .find(|l| l.id == id)
            .cloned()
    }

    fn resolve_code(&self, code: Option<CodeId>) -> Result<Option<Code>, CodeChainError> {
        let records = self.records.read();
        records.codes.resolve(code).map(|resolved| resolved.cloned())
    }
}

impl RecordWriter for RecordStore {
    fn ensure_code(&self, value: i32, description: &str, icon_url: &str) -> CodeId {
        let mut records = self.records.write();
        if let Some(code) = records.codes.find_by_value(value) {
            return code.id;
        }
        records.codes.insert(value, description, icon_url, true)
    }

    fn insert_daily(&self, daily: NewDaily) -> Result<DailyId, StoreError> {
        let mut records = self.records.write();

        if !records.locations.iter().any(|l| l.id == daily.location) {
            return Err(StoreError::UnknownLocation(daily.location));
        }
        if let Some(code) = daily.code {
            if records.codes.get(code).is_none() {
                return Err(StoreError::UnknownCode(code));
            }
        }

        let duplicate = records
            .dailies
            .iter()
            .any(|d| d.location == daily.location && d.date == daily.date && d.kind == daily.kind);
        if duplicate {
            return Err(StoreError::DuplicateDaily {
                location: daily.location,
                date: daily.date,
                kind: daily.kind,
            });
        }

        let id = DailyId(records.next_daily);
        records.next_daily += 1;
        records.dailies.push(DailyOccurrence {
            id,
            location: daily.location,
            date: daily.date,
            kind: daily.kind,
            min_temperature: daily.min_temperature,
            max_temperature: daily.max_temperature,
            code: daily.code,
        });
        Ok(id)
    }

    fn insert_hourly(&self, daily: DailyId, hourly: NewHourly) -> Result<HourlyId, StoreError> {
        let mut records = self.records.write();

        if records.daily(daily).is_none() {
            return Err(StoreError::UnknownDaily(daily));
        }
        if let Some(code) = hourly.code {
            if records.codes.get(code).is_none() {
                return Err(StoreError::UnknownCode(code));
            }
        }
        if records
            .hourlies
            .iter()
            .any(|h| h.daily == daily && h.time == hourly.time)
        {
            return Err(StoreError::DuplicateHourly {
                daily,
                time: hourly.time,
            });
        }

        let id = HourlyId(records.next_hourly);
        records.next_hourly += 1;
        records.hourlies.push(HourlyOccurrence {
            id,
            daily,
            time: hourly.time,
            temperature: hourly.temperature,
            code: hourly.code,
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn at(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn new_daily(location: LocationId, d: u32, kind: RecordKind) -> NewDaily {
        NewDaily {
            location,
            date: date(d),
            kind,
            min_temperature: 8.0,
            max_temperature: 17.5,
            code: None,
        }
    }

    fn hourly(h: u32) -> NewHourly {
        NewHourly {
            time: at(h),
            temperature: h as f64,
            code: None,
        }
    }

    #[test]
    fn forecast_and_observed_coexist_for_same_date() {
        let store = RecordStore::in_memory();
        let paris = store.add_location("Paris", 48.85, 2.35);

        let forecast = store.insert_daily(new_daily(paris.id, 1, RecordKind::Forecast)).unwrap();
        let observed = store.insert_daily(new_daily(paris.id, 1, RecordKind::Observed)).unwrap();

        assert_ne!(forecast, observed);
        assert_eq!(store.find_daily(paris.id, date(1), RecordKind::Forecast).unwrap().id, forecast);
        assert_eq!(store.find_daily(paris.id, date(1), RecordKind::Observed).unwrap().id, observed);
        assert!(store.find_daily(paris.id, date(2), RecordKind::Observed).is_none());
    }

    #[test]
    fn duplicate_daily_is_rejected() {
        let store = RecordStore::in_memory();
        let paris = store.add_location("Paris", 48.85, 2.35);

        store.insert_daily(new_daily(paris.id, 1, RecordKind::Forecast)).unwrap();
        let err = store.insert_daily(new_daily(paris.id, 1, RecordKind::Forecast)).unwrap_err();

        assert!(matches!(err, StoreError::DuplicateDaily { .. }));
    }

    #[test]
    fn daily_for_unknown_location_is_rejected() {
        let store = RecordStore::in_memory();
        let err = store
            .insert_daily(new_daily(LocationId(7), 1, RecordKind::Forecast))
            .unwrap_err();

        assert!(matches!(err, StoreError::UnknownLocation(LocationId(7))));
    }

    #[test]
    fn hourlies_come_back_sorted_and_unique() {
        let store = RecordStore::in_memory();
        let paris = store.add_location("Paris", 48.85, 2.35);
        let day = store.insert_daily(new_daily(paris.id, 1, RecordKind::Observed)).unwrap();

        for h in [18, 0, 12, 6] {
            store.insert_hourly(day, hourly(h)).unwrap();
        }
        let err = store.insert_hourly(day, hourly(12)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateHourly { .. }));

        let times: Vec<NaiveTime> = store
            .find_hourlies_by_daily(day)
            .iter()
            .map(|h| h.time)
            .collect();
        assert_eq!(times, vec![at(0), at(6), at(12), at(18)]);
    }

    #[test]
    fn hourly_for_unknown_daily_is_rejected() {
        let store = RecordStore::in_memory();
        let err = store.insert_hourly(DailyId(3), hourly(1)).unwrap_err();

        assert!(matches!(err, StoreError::UnknownDaily(DailyId(3))));
    }

    #[test]
    fn ensure_code_reuses_existing_value() {
        let store = RecordStore::in_memory();

        let first = store.ensure_code(113, "Sunny", "media/weather/sunny.png");
        let second = store.ensure_code(113, "Clear", "media/weather/clear.png");

        assert_eq!(first, second);
        let codes = store.codes();
        assert_eq!(codes.len(), 1);
        assert!(codes[0].is_default);
        assert_eq!(codes[0].description, "Sunny");
    }

    #[test]
    fn resolve_code_follows_links() {
        let store = RecordStore::in_memory();
        let raw = store.ensure_code(116, "Partly cloudy", "media/weather/116.png");
        let shown = store.add_code(1116, "Some clouds", "media/weather/clouds.png", false);
        store.link_code(raw, Some(shown)).unwrap();

        let resolved = store.resolve_code(Some(raw)).unwrap().unwrap();
        assert_eq!(resolved.id, shown);
    }

    #[test]
    fn location_lookup_by_name_ignores_case() {
        let store = RecordStore::in_memory();
        let lyon = store.add_location("Lyon", 45.76, 4.84);

        assert_eq!(store.find_location_by_name("LYON"), Some(lyon.clone()));
        assert_eq!(store.location(lyon.id), Some(lyon));
        assert!(store.find_location_by_name("Nice").is_none());
    }

    #[test]
    fn snapshot_survives_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("records.json");

        let store = RecordStore::open(&path).unwrap();
        let paris = store.add_location("Paris", 48.85, 2.35);
        let code = store.ensure_code(113, "Sunny", "media/weather/sunny.png");
        let day = store
            .insert_daily(NewDaily {
                code: Some(code),
                ..new_daily(paris.id, 4, RecordKind::Forecast)
            })
            .unwrap();
        store.insert_hourly(day, hourly(9)).unwrap();
        store.save().unwrap();

        let reopened = RecordStore::open(&path).unwrap();
        let daily = reopened.find_daily(paris.id, date(4), RecordKind::Forecast).unwrap();
        assert_eq!(daily.code, Some(code));
        assert_eq!(reopened.find_hourlies_by_daily(day).len(), 1);

        let next = reopened.insert_daily(new_daily(paris.id, 5, RecordKind::Forecast)).unwrap();
        assert_ne!(next, day);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        fs::write(&path, "{ not json").unwrap();

        let err = RecordStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
    }
}
