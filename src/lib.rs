//! Nimbus: a terminal weather viewer.
//!
//! Current conditions and short-term forecasts from OpenWeatherMap for a few
//! saved cities, cached in SQLite so the last-seen data survives going offline.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod location;
pub mod logging;
pub mod models;
pub mod settings;
pub mod store;
pub mod ui;

pub use api::WeatherProvider;
pub use error::WeatherError;
pub use models::{CurrentWeather, Forecast, Location, Units};
pub use settings::Settings;
pub use store::{StoreKey, WeatherStore};
