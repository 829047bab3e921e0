//! Coordinates for the "current location" page.
//!
//! When the user asks for weather without naming a city, the resolver needs a
//! starting point to reverse-geocode. That comes from IP geolocation
//! ([ip-api.com](https://ip-api.com/)) or, when auto-detection is turned off in
//! the config, from the manual coordinates stored there.

use crate::config::LocationConfig;
use crate::error::WeatherError;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Where the current-location coordinates come from.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateSource {
    /// Geolocate the caller's public IP.
    IpApi,
    /// Fixed coordinates in decimal degrees.
    Fixed { lat: f64, lon: f64 },
}

impl From<&LocationConfig> for CoordinateSource {
    fn from(config: &LocationConfig) -> Self {
        if config.auto_detect {
            CoordinateSource::IpApi
        } else {
            CoordinateSource::Fixed {
                lat: config.manual_lat,
                lon: config.manual_lon,
            }
        }
    }
}

/// ip-api.com answer; `status` is `"success"` or `"fail"`.
#[derive(Debug, Deserialize)]
struct IpApiAnswer {
    status: Option<String>,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Returns `(latitude, longitude)` for the current location.
///
/// The lookup goes through the caller's `client`, so it shares its timeout and
/// a dead connection surfaces as [`WeatherError::Network`].
///
/// # Errors
///
/// [`WeatherError::LocationNotFound`] when the service declines the address,
/// [`WeatherError::Malformed`] when the answer carries no usable coordinates.
/// There is no fallback position: a page for a made-up location would be
/// worse than an error message.
pub async fn current_coordinates(
    client: &Client,
    ip_api_url: &str,
    source: &CoordinateSource,
) -> Result<(f64, f64), WeatherError> {
    let CoordinateSource::Fixed { lat, lon } = source else {
        return lookup_ip(client, ip_api_url).await;
    };
    Ok((*lat, *lon))
}

async fn lookup_ip(client: &Client, url: &str) -> Result<(f64, f64), WeatherError> {
    // No address in the path: the service answers for the caller's own IP.
    debug!("GET {}", url);
    let res = client.get(url).send().await?;
    let status = res.status();
    let body = res.text().await?;

    if !status.is_success() {
        return Err(WeatherError::Api {
            status: status.as_u16(),
            message: format!(
                "IP geolocation: {}",
                status.canonical_reason().unwrap_or("unknown")
            ),
        });
    }

    let answer: IpApiAnswer = serde_json::from_str(&body)
        .map_err(|e| WeatherError::Malformed(format!("geolocation answer: {}", e)))?;

    if answer.status.as_deref() == Some("fail") {
        let reason = answer.message.unwrap_or_else(|| "no reason given".to_string());
        warn!("IP geolocation declined: {}", reason);
        return Err(WeatherError::LocationNotFound(format!(
            "IP geolocation failed: {}",
            reason
        )));
    }

    match (answer.lat, answer.lon) {
        (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
            info!("Geolocation successful - ({}, {})", lat, lon);
            Ok((lat, lon))
        }
        _ => Err(WeatherError::Malformed(
            "geolocation answer has no coordinates".into(),
        )),
    }
}
