//! SQLite-backed cache of the last-seen record per city.
//!
//! Entries are JSON text keyed by a typed `(kind, city)` pair, so listing the
//! known cities is a column filter rather than key-prefix surgery.

use crate::error::WeatherError;
use crate::models::{CurrentWeather, Forecast};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Address of one cached blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Current(String),
    Forecast(String),
    Settings,
}

impl StoreKey {
    fn kind(&self) -> &'static str {
        match self {
            StoreKey::Current(_) => "current",
            StoreKey::Forecast(_) => "forecast",
            StoreKey::Settings => "settings",
        }
    }

    fn city(&self) -> &str {
        match self {
            StoreKey::Current(city) | StoreKey::Forecast(city) => city,
            StoreKey::Settings => "",
        }
    }
}

// Matches the flat key names the mobile app used, handy in logs.
impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKey::Current(city) => write!(f, "currentWeatherData/{}", city),
            StoreKey::Forecast(city) => write!(f, "forecastData/{}", city),
            StoreKey::Settings => write!(f, "settings"),
        }
    }
}

pub struct WeatherStore {
    conn: Connection,
}

impl WeatherStore {
    /// Opens (or creates) the cache database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WeatherError> {
        let store = Self {
            conn: Connection::open(path)?,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Creates a throwaway in-memory cache.
    pub fn open_in_memory() -> Result<Self, WeatherError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), WeatherError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS entries (
                kind TEXT NOT NULL,
                city TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (kind, city)
            )",
            [],
        )?;
        Ok(())
    }

    pub fn get(&self, key: &StoreKey) -> Result<Option<String>, WeatherError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM entries WHERE kind = ?1 AND city = ?2",
                params![key.kind(), key.city()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Writes `value` under `key`, replacing any previous value. An existing
    /// row keeps its position in [`list_known_cities`](Self::list_known_cities).
    pub fn set(&self, key: &StoreKey, value: &str) -> Result<(), WeatherError> {
        self.conn.execute(
            "INSERT INTO entries (kind, city, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(kind, city) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key.kind(), key.city(), value, Utc::now().timestamp()],
        )?;
        debug!("Cached {}", key);
        Ok(())
    }

    /// Removes `key`. Removing a key that does not exist is not an error.
    pub fn remove(&self, key: &StoreKey) -> Result<(), WeatherError> {
        self.conn.execute(
            "DELETE FROM entries WHERE kind = ?1 AND city = ?2",
            params![key.kind(), key.city()],
        )?;
        Ok(())
    }

    /// Stores a fetched record under the city name the resolver returned.
    pub fn persist_current(&self, current: &CurrentWeather) -> Result<(), WeatherError> {
        let json = serde_json::to_string(current)?;
        self.set(&StoreKey::Current(current.city.clone()), &json)
    }

    pub fn persist_forecast(&self, forecast: &Forecast) -> Result<(), WeatherError> {
        let json = serde_json::to_string(forecast)?;
        self.set(&StoreKey::Forecast(forecast.city.clone()), &json)
    }

    pub fn read_current(&self, city: &str) -> Option<CurrentWeather> {
        self.read_json(&StoreKey::Current(city.to_string()))
    }

    pub fn read_forecast(&self, city: &str) -> Option<Forecast> {
        self.read_json::<Forecast>(&StoreKey::Forecast(city.to_string()))
            .filter(|f| {
                let ok = f.is_consistent();
                if !ok {
                    warn!("Discarding cached forecast for {} with uneven sequences", city);
                }
                ok
            })
    }

    // Any failure on the read path is treated as a cache miss.
    pub(crate) fn read_json<T: DeserializeOwned>(&self, key: &StoreKey) -> Option<T> {
        let raw = match self.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read for {} failed: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring corrupt cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Cities with a cached current-conditions record, oldest first.
    pub fn list_known_cities(&self) -> Result<Vec<String>, WeatherError> {
        let mut stmt = self
            .conn
            .prepare("SELECT city FROM entries WHERE kind = 'current' ORDER BY rowid")?;
        let cities = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cities)
    }

    /// Drops both cached records for `city` together.
    pub fn delete_city(&self, city: &str) -> Result<(), WeatherError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM entries WHERE kind IN ('current', 'forecast') AND city = ?1",
            params![city],
        )?;
        tx.commit()?;
        debug!("Deleted cached data for {}", city);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> Result<usize, WeatherError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ForecastStep, Units};

    fn current(city: &str, temp: f64) -> CurrentWeather {
        CurrentWeather {
            kind: Some("Clouds".into()),
            description: Some("overcast clouds".into()),
            code: Some(804),
            icon: Some("04d".into()),
            city: city.into(),
            temp: Some(temp),
            feels_like: Some(temp - 1.0),
            humidity: Some(70.0),
            wind_speed: Some(3.2),
            wind_direction: Some(180.0),
            clouds: Some(100.0),
            rain_probability: None,
            sea_pressure: Some(1012.0),
            ground_pressure: None,
            visibility: Some(10_000.0),
            sunrise: Some("06:12".into()),
            sunset: Some("18:40".into()),
            timezone: Some("+0:00".into()),
            is_metric: true,
            error_code: Some(200),
        }
    }

    fn forecast(city: &str) -> Forecast {
        let mut f = Forecast::new(city.into(), 2, Units::Metric);
        for time in ["12:00", "15:00"] {
            f.push(ForecastStep {
                time: time.into(),
                date: "01.03".into(),
                temp: Some(5.0),
                description: None,
                kind: None,
                clouds: None,
                wind_speed: None,
                rain_probability: Some(10),
            });
        }
        f
    }

    #[test]
    fn test_missing_key_reads_as_none() {
        let store = WeatherStore::open_in_memory().unwrap();
        assert!(store.read_current("Nowhere").is_none());
        assert!(store.read_forecast("Nowhere").is_none());
        assert_eq!(store.get(&StoreKey::Settings).unwrap(), None);
    }

    #[test]
    fn test_persist_current_overwrites_in_place() {
        let store = WeatherStore::open_in_memory().unwrap();
        store.persist_current(&current("London", 10.0)).unwrap();
        store.persist_current(&current("London", 10.0)).unwrap();
        assert_eq!(store.entry_count().unwrap(), 1);

        store.persist_current(&current("London", 12.5)).unwrap();
        assert_eq!(store.entry_count().unwrap(), 1);
        assert_eq!(store.read_current("London").unwrap().temp, Some(12.5));
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let store = WeatherStore::open_in_memory().unwrap();
        store
            .set(&StoreKey::Current("Oslo".into()), "{not json")
            .unwrap();
        assert!(store.read_current("Oslo").is_none());
    }

    #[test]
    fn test_list_known_cities_ignores_other_kinds() {
        let store = WeatherStore::open_in_memory().unwrap();
        store.persist_current(&current("London", 10.0)).unwrap();
        store.persist_current(&current("Kyiv", 3.0)).unwrap();
        store.persist_forecast(&forecast("Rome")).unwrap();
        store.set(&StoreKey::Settings, "{}").unwrap();

        assert_eq!(store.list_known_cities().unwrap(), vec!["London", "Kyiv"]);
    }

    #[test]
    fn test_overwrite_keeps_city_order() {
        let store = WeatherStore::open_in_memory().unwrap();
        store.persist_current(&current("London", 10.0)).unwrap();
        store.persist_current(&current("Kyiv", 3.0)).unwrap();
        store.persist_current(&current("London", 11.0)).unwrap();

        assert_eq!(store.list_known_cities().unwrap(), vec!["London", "Kyiv"]);
    }

    #[test]
    fn test_delete_city_removes_both_kinds() {
        let store = WeatherStore::open_in_memory().unwrap();
        store.persist_current(&current("London", 10.0)).unwrap();
        store.persist_forecast(&forecast("London")).unwrap();
        store.persist_current(&current("Kyiv", 3.0)).unwrap();

        store.delete_city("London").unwrap();
        assert!(store.read_current("London").is_none());
        assert!(store.read_forecast("London").is_none());
        assert_eq!(store.list_known_cities().unwrap(), vec!["Kyiv"]);

        // Idempotent
        store.delete_city("London").unwrap();
        store.delete_city("Atlantis").unwrap();
    }

    #[test]
    fn test_forecast_round_trips_through_cache() {
        let store = WeatherStore::open_in_memory().unwrap();
        let f = forecast("Rome");
        store.persist_forecast(&f).unwrap();
        assert_eq!(store.read_forecast("Rome"), Some(f));
    }

    #[test]
    fn test_display_uses_flat_key_names() {
        assert_eq!(
            StoreKey::Current("London".into()).to_string(),
            "currentWeatherData/London"
        );
        assert_eq!(StoreKey::Forecast("Rome".into()).to_string(), "forecastData/Rome");
        assert_eq!(StoreKey::Settings.to_string(), "settings");
    }
}
