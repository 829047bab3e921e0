use crate::config::Config;
use crate::error::WeatherError;
use crate::location::{self, CoordinateSource};
use crate::models::{
    ApiErrorBody, CurrentResponse, CurrentWeather, Forecast, ForecastResponse, GeoCandidate,
    Location,
};
use crate::settings::Settings;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info};

/// OpenWeatherMap client: geocoding, current conditions and forecast.
///
/// Cheap to clone; clones share the underlying connection pool, so every
/// fetch task gets its own copy.
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Client,
    api_key: String,
    geo_base_url: String,
    data_base_url: String,
    location_limit: u32,
    ip_api_url: String,
    coordinates: CoordinateSource,
}

impl WeatherProvider {
    pub fn new(config: &Config) -> Result<Self, WeatherError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(10)).build()?,
            api_key: config.api.key.clone(),
            geo_base_url: config.api.geo_base_url.trim_end_matches('/').to_string(),
            data_base_url: config.api.data_base_url.trim_end_matches('/').to_string(),
            location_limit: config.api.location_limit.max(1),
            ip_api_url: config.api.ip_api_url.clone(),
            coordinates: CoordinateSource::from(&config.location),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, WeatherError> {
        // The key goes in separately so it never reaches the log.
        debug!("GET {} {:?}", url, query);

        let res = self
            .client
            .get(url)
            .query(&[("appid", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(WeatherError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| WeatherError::Malformed(e.to_string()))
    }

    /// Resolves a city name to a place; an empty name means "where I am".
    ///
    /// The last of the returned candidates is taken. With the default limit
    /// of one candidate that is also the best-ranked one.
    pub async fn resolve_location(&self, city: &str) -> Result<Location, WeatherError> {
        let city = city.trim();
        let limit = self.location_limit.to_string();

        let candidates: Vec<GeoCandidate> = if city.is_empty() {
            let (lat, lon) =
                location::current_coordinates(&self.client, &self.ip_api_url, &self.coordinates)
                    .await?;
            self.get_json(
                &format!("{}/reverse", self.geo_base_url),
                &[
                    ("lat", lat.to_string()),
                    ("lon", lon.to_string()),
                    ("limit", limit),
                ],
            )
            .await?
        } else {
            self.get_json(
                &format!("{}/direct", self.geo_base_url),
                &[("q", city.to_string()), ("limit", limit)],
            )
            .await?
        };

        let candidate = candidates.into_iter().last().ok_or_else(|| {
            WeatherError::LocationNotFound(if city.is_empty() {
                "current location".to_string()
            } else {
                city.to_string()
            })
        })?;

        let location = Location::try_from(candidate)?;
        info!(
            "Resolved '{}' to {} ({}, {})",
            city, location.city, location.lat, location.lon
        );
        Ok(location)
    }

    /// Current conditions for `city`, keyed by the resolved city name.
    pub async fn fetch_current_weather(
        &self,
        city: &str,
        settings: &Settings,
    ) -> Result<CurrentWeather, WeatherError> {
        let result = self.try_fetch_current_weather(city, settings).await;
        if let Err(e) = &result {
            error!("Current weather fetch for '{}' failed: {}", city, e);
        }
        result
    }

    async fn try_fetch_current_weather(
        &self,
        city: &str,
        settings: &Settings,
    ) -> Result<CurrentWeather, WeatherError> {
        let location = self.resolve_location(city).await?;
        let res: CurrentResponse = self
            .get_json(
                &format!("{}/weather", self.data_base_url),
                &[
                    ("lat", location.lat.to_string()),
                    ("lon", location.lon.to_string()),
                    ("lang", settings.lang.clone()),
                    ("units", settings.units.as_str().to_string()),
                ],
            )
            .await?;
        Ok(CurrentWeather::from_response(res, location.city, settings.units))
    }

    /// Forecast for `city` with `settings.number_of_timestamps` steps.
    pub async fn fetch_forecast(
        &self,
        city: &str,
        settings: &Settings,
    ) -> Result<Forecast, WeatherError> {
        let result = self.try_fetch_forecast(city, settings).await;
        if let Err(e) = &result {
            error!("Forecast fetch for '{}' failed: {}", city, e);
        }
        result
    }

    async fn try_fetch_forecast(
        &self,
        city: &str,
        settings: &Settings,
    ) -> Result<Forecast, WeatherError> {
        let steps = settings.step_count();
        let location = self.resolve_location(city).await?;
        let res: ForecastResponse = self
            .get_json(
                &format!("{}/forecast", self.data_base_url),
                &[
                    ("lat", location.lat.to_string()),
                    ("lon", location.lon.to_string()),
                    ("cnt", steps.to_string()),
                    ("units", settings.units.as_str().to_string()),
                    ("lang", settings.lang.clone()),
                ],
            )
            .await?;
        Forecast::from_response(res, location.city, steps, settings.units)
    }
}
