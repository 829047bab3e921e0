//! User preferences: unit system, language and forecast length.
//!
//! Stored as a single JSON blob in the cache database. There is no ambient
//! copy here; the caller keeps the value returned by [`load`] or [`save`] and
//! passes it to every fetch.

use crate::error::WeatherError;
use crate::models::Units;
use crate::store::{StoreKey, WeatherStore};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, info, warn};

pub const DEFAULT_LANG: &str = "en";
pub const DEFAULT_STEPS: u32 = 7;
/// The provider serves at most 40 three-hour steps.
pub const MAX_STEPS: u32 = 40;

/// Languages offered in the settings view, as `(code, label)`.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("de", "Deutsch"),
    ("fr", "Français"),
    ("es", "Español"),
    ("it", "Italiano"),
    ("pl", "Polski"),
    ("uk", "Українська"),
    ("ja", "日本語"),
];

/// Forecast lengths offered in the settings view.
pub const STEP_CHOICES: &[u32] = &[6, 7, 8, 12, 16, 24, 40];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, deserialize_with = "lenient")]
    pub units: Units,
    #[serde(default = "default_lang", deserialize_with = "lenient")]
    pub lang: String,
    #[serde(
        rename = "numberOfTimestamps",
        default = "default_steps",
        deserialize_with = "deserialize_steps",
        serialize_with = "serialize_steps"
    )]
    pub number_of_timestamps: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            units: Units::Metric,
            lang: DEFAULT_LANG.to_string(),
            number_of_timestamps: DEFAULT_STEPS,
        }
    }
}

impl Settings {
    /// Replaces blank or out-of-range fields with their defaults.
    pub fn normalized(mut self) -> Self {
        let lang = self.lang.trim();
        self.lang = if lang.is_empty() {
            DEFAULT_LANG.to_string()
        } else {
            lang.to_string()
        };
        if !(1..=MAX_STEPS).contains(&self.number_of_timestamps) {
            self.number_of_timestamps = DEFAULT_STEPS;
        }
        self
    }

    pub fn step_count(&self) -> usize {
        self.number_of_timestamps as usize
    }

    pub fn with_next_units(&self) -> Self {
        Self {
            units: self.units.toggled(),
            ..self.clone()
        }
    }

    pub fn with_next_lang(&self) -> Self {
        let codes: Vec<&str> = LANGUAGES.iter().map(|(code, _)| *code).collect();
        Self {
            lang: cycle(codes.as_slice(), &self.lang.as_str()).to_string(),
            ..self.clone()
        }
    }

    pub fn with_next_step_count(&self) -> Self {
        Self {
            number_of_timestamps: cycle(STEP_CHOICES, &self.number_of_timestamps),
            ..self.clone()
        }
    }

    /// Display label for the current language code.
    pub fn lang_label(&self) -> &str {
        LANGUAGES
            .iter()
            .find(|(code, _)| *code == self.lang)
            .map(|(_, label)| *label)
            .unwrap_or(self.lang.as_str())
    }
}

// Next entry after `current`, wrapping; the first entry when `current` is not listed.
fn cycle<T: PartialEq + Copy>(choices: &[T], current: &T) -> T {
    let next = choices
        .iter()
        .position(|c| c == current)
        .map_or(0, |i| (i + 1) % choices.len());
    choices[next]
}

fn default_lang() -> String {
    DEFAULT_LANG.to_string()
}

fn default_steps() -> u32 {
    DEFAULT_STEPS
}

// A field of the wrong type falls back on its own; the other fields keep
// their stored values. Blank results are filled in by `normalized`.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

// Older blobs store the count as a string ("7"); accept both.
fn deserialize_steps<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let steps = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(steps.unwrap_or(DEFAULT_STEPS))
}

fn serialize_steps<S: Serializer>(steps: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&steps.to_string())
}

/// Loads the stored settings. On first run, or when the stored blob is
/// unreadable, the defaults are written back and returned. A readable blob
/// with missing or invalid fields is repaired field by field and written back.
pub fn load(store: &WeatherStore) -> Settings {
    match store.get(&StoreKey::Settings) {
        Ok(Some(raw)) => match serde_json::from_str::<Settings>(&raw) {
            Ok(parsed) => {
                let settings = parsed.normalized();
                if serde_json::to_string(&settings).ok().as_deref() != Some(raw.as_str()) {
                    debug!("Rewriting stored settings as {:?}", settings);
                    if let Err(e) = persist(store, &settings) {
                        warn!("Could not persist repaired settings: {}", e);
                    }
                }
                return settings;
            }
            Err(e) => warn!("Stored settings are unreadable: {}. Using defaults.", e),
        },
        Ok(None) => info!("No stored settings, writing defaults."),
        Err(e) => warn!("Failed to read settings: {}. Using defaults.", e),
    }

    let defaults = Settings::default();
    if let Err(e) = persist(store, &defaults) {
        warn!("Could not persist default settings: {}", e);
    }
    defaults
}

/// Normalizes and stores `settings`, returning the value that was written.
pub fn save(store: &WeatherStore, settings: Settings) -> Result<Settings, WeatherError> {
    let settings = settings.normalized();
    persist(store, &settings)?;
    info!(
        "Settings saved: units={}, lang={}, steps={}",
        settings.units.as_str(),
        settings.lang,
        settings.number_of_timestamps
    );
    Ok(settings)
}

/// Deletes the stored blob; the next [`load`] re-creates the defaults.
pub fn reset(store: &WeatherStore) -> Result<(), WeatherError> {
    store.remove(&StoreKey::Settings)?;
    info!("Settings reset.");
    Ok(())
}

fn persist(store: &WeatherStore, settings: &Settings) -> Result<(), WeatherError> {
    let json = serde_json::to_string(settings)?;
    store.set(&StoreKey::Settings, &json)
}
