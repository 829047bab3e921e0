use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub const CONFIG_PATH: &str = "config.toml";
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub api: ApiConfig,
    pub location: LocationConfig,
    pub storage: StorageConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub key: String,
    pub geo_base_url: String,  // Forward/reverse geocoding
    pub data_base_url: String, // Current weather and forecast
    pub location_limit: u32,   // Max geocoding candidates requested
    #[serde(default = "default_ip_api_url")]
    pub ip_api_url: String, // IP geolocation for "current location"
}

fn default_ip_api_url() -> String {
    "http://ip-api.com/json/".to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LocationConfig {
    pub auto_detect: bool, // Use IP geolocation for "current location" if true
    pub manual_lat: f64,   // Latitude used if auto_detect is false
    pub manual_lon: f64,   // Longitude used if auto_detect is false
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub path: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig {
                key: String::new(),
                geo_base_url: "http://api.openweathermap.org/geo/1.0".to_string(),
                data_base_url: "https://api.openweathermap.org/data/2.5".to_string(),
                location_limit: 1,
                ip_api_url: default_ip_api_url(),
            },
            location: LocationConfig {
                auto_detect: true,
                manual_lat: 51.5074,
                manual_lon: -0.1278,
            },
            storage: StorageConfig {
                path: "weather_cache.db".to_string(),
            },
        }
    }
}

impl Config {
    /// Loads config.toml from the working directory.
    /// If it doesn't exist, creates a default one.
    pub fn load() -> Self {
        let mut config = Self::load_from(CONFIG_PATH);
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.api.key = key.trim().to_string();
            }
        }
        if config.api.key.is_empty() {
            warn!("No API key configured; set api.key in {} or {}.", CONFIG_PATH, API_KEY_ENV);
        }
        config
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if let Ok(content) = fs::read_to_string(path) {
            match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    return Config::default();
                }
            }
        }

        let default_config = Config::default();

        // Save default config to disk for the user to edit later
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(path, toml_string).is_err() {
                    warn!("Could not write default {} to disk.", path.display());
                }
            }
            Err(e) => warn!("Could not serialize default config: {}", e),
        }

        info!("Loaded default configuration.");
        default_config
    }
}
