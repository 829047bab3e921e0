//! Cache behaviour across restarts, using a real database file.

use nimbus_tui::models::ForecastStep;
use nimbus_tui::settings::{self, Settings};
use nimbus_tui::{CurrentWeather, Forecast, StoreKey, Units, WeatherStore};

fn sample_current(city: &str) -> CurrentWeather {
    serde_json::from_value(serde_json::json!({
        "type": "Snow",
        "description": "light snow",
        "code": 600,
        "icon": "13n",
        "city": city,
        "temp": -3.5,
        "feelsLike": -8.0,
        "humidity": 90,
        "windSpeed": 5.0,
        "windDirection": 10,
        "clouds": 100,
        "rainProbability": null,
        "seaPressure": 1020,
        "groundPressure": null,
        "visibility": 2000,
        "sunrise": "07:41",
        "sunset": "16:02",
        "timezone": "+2:00",
        "isMetric": true,
        "errorCode": 200
    }))
    .unwrap()
}

fn sample_forecast(city: &str) -> Forecast {
    let mut forecast = Forecast::new(city.to_string(), 3, Units::Metric);
    for (i, time) in ["00:00", "03:00", "06:00"].iter().enumerate() {
        forecast.push(ForecastStep {
            time: time.to_string(),
            date: "15.01".to_string(),
            temp: Some(-4.0 - i as f64),
            description: Some("snow".to_string()),
            kind: Some("Snow".to_string()),
            clouds: Some(100.0),
            wind_speed: Some(4.0),
            rain_probability: Some(80),
        });
    }
    forecast
}

#[test]
fn test_cached_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weather_cache.db");

    {
        let store = WeatherStore::open(&path).unwrap();
        store.persist_current(&sample_current("Helsinki")).unwrap();
        store.persist_forecast(&sample_forecast("Helsinki")).unwrap();
        settings::save(
            &store,
            Settings {
                units: Units::Imperial,
                lang: "fr".into(),
                number_of_timestamps: 16,
            },
        )
        .unwrap();
    }

    let store = WeatherStore::open(&path).unwrap();
    assert_eq!(store.list_known_cities().unwrap(), vec!["Helsinki"]);
    assert_eq!(store.read_current("Helsinki"), Some(sample_current("Helsinki")));
    assert_eq!(store.read_forecast("Helsinki"), Some(sample_forecast("Helsinki")));

    let loaded = settings::load(&store);
    assert_eq!(loaded.units, Units::Imperial);
    assert_eq!(loaded.lang, "fr");
    assert_eq!(loaded.number_of_timestamps, 16);
}

#[test]
fn test_forecast_only_city_is_not_listed() {
    let store = WeatherStore::open_in_memory().unwrap();
    store.persist_forecast(&sample_forecast("Tromsø")).unwrap();

    assert!(store.list_known_cities().unwrap().is_empty());
    assert!(store.read_current("Tromsø").is_none());
    assert!(store.read_forecast("Tromsø").is_some());
}

#[test]
fn test_legacy_settings_blob_is_understood() {
    let store = WeatherStore::open_in_memory().unwrap();
    store
        .set(
            &StoreKey::Settings,
            r#"{"units":"imperial","lang":"uk","numberOfTimestamps":"24"}"#,
        )
        .unwrap();

    let loaded = settings::load(&store);
    assert_eq!(loaded.units, Units::Imperial);
    assert_eq!(loaded.lang, "uk");
    assert_eq!(loaded.lang_label(), "Українська");
    assert_eq!(loaded.step_count(), 24);
}
