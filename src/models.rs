use crate::error::WeatherError;
use crate::format;
use serde::{Deserialize, Serialize};

/// Measurement system requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    /// Value of the `units` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub fn is_metric(&self) -> bool {
        matches!(self, Units::Metric)
    }

    pub fn toggled(&self) -> Self {
        match self {
            Units::Metric => Units::Imperial,
            Units::Imperial => Units::Metric,
        }
    }
}

/// Placeholder for a forecast time or date the provider did not supply.
pub const MISSING_SLOT: &str = "--";

/// Suffix for temperatures recorded under the given unit flag.
pub fn temp_suffix(is_metric: bool) -> &'static str {
    if is_metric { "°C" } else { "°F" }
}

/// Suffix for wind speeds recorded under the given unit flag.
pub fn speed_suffix(is_metric: bool) -> &'static str {
    if is_metric { " m/s" } else { " mph" }
}

/// A resolved place. Only produced when the provider gave us a usable name and
/// finite coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
}

impl TryFrom<GeoCandidate> for Location {
    type Error = WeatherError;

    fn try_from(candidate: GeoCandidate) -> Result<Self, Self::Error> {
        let city = candidate
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| WeatherError::Malformed("geocoding candidate has no name".into()))?;

        match (candidate.lat, candidate.lon) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                Ok(Location { city, lat, lon })
            }
            _ => Err(WeatherError::Malformed(format!(
                "geocoding candidate '{}' has no usable coordinates",
                city
            ))),
        }
    }
}

/// Latest conditions for one city. Overwritten on every successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeather {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
    pub code: Option<i64>,
    pub icon: Option<String>,
    pub city: String,
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub clouds: Option<f64>,
    pub rain_probability: Option<u8>,
    pub sea_pressure: Option<f64>,
    pub ground_pressure: Option<f64>,
    pub visibility: Option<f64>,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub timezone: Option<String>,
    pub is_metric: bool,
    pub error_code: Option<i64>,
}

impl CurrentWeather {
    /// Maps a provider response field by field. Missing pieces become `None`
    /// without failing the rest of the record.
    pub fn from_response(res: CurrentResponse, city: String, units: Units) -> Self {
        let condition = res.weather.and_then(|w| w.into_iter().next()).unwrap_or_default();
        let main = res.main.unwrap_or_default();
        let wind = res.wind.unwrap_or_default();
        let sys = res.sys.unwrap_or_default();
        let offset = res.timezone;

        Self {
            kind: condition.main,
            description: condition.description,
            code: condition.id,
            icon: condition.icon,
            city,
            temp: main.temp,
            feels_like: main.feels_like,
            humidity: main.humidity,
            wind_speed: wind.speed,
            wind_direction: wind.deg,
            clouds: res.clouds.and_then(|c| c.all),
            rain_probability: None,
            sea_pressure: main.pressure,
            ground_pressure: main.grnd_level,
            visibility: res.visibility,
            sunrise: sys.sunrise.and_then(|t| format::clock_time(t, offset)),
            sunset: sys.sunset.and_then(|t| format::clock_time(t, offset)),
            timezone: offset.map(format::utc_offset),
            is_metric: units.is_metric(),
            error_code: res.cod.as_ref().and_then(status_code),
        }
    }
}

// `cod` is a number on success and a string on error responses.
fn status_code(cod: &serde_json::Value) -> Option<i64> {
    cod.as_i64()
        .or_else(|| cod.as_str().and_then(|s| s.parse().ok()))
}

/// One forecast time step, as handed to the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastStep {
    pub time: String,
    pub date: String,
    pub temp: Option<f64>,
    pub description: Option<String>,
    pub kind: Option<String>,
    pub clouds: Option<f64>,
    pub wind_speed: Option<f64>,
    pub rain_probability: Option<u8>,
}

/// Short-term forecast for one city, stored as parallel sequences indexed by
/// time step. All sequences always have the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub city: String,
    pub timestamps: usize,
    pub is_metric: bool,
    time: Vec<String>,
    date: Vec<String>,
    temp: Vec<Option<f64>>,
    description: Vec<Option<String>>,
    #[serde(rename = "type")]
    kind: Vec<Option<String>>,
    clouds: Vec<Option<f64>>,
    wind_speed: Vec<Option<f64>>,
    rain_probability: Vec<Option<u8>>,
}

impl Forecast {
    pub fn new(city: String, timestamps: usize, units: Units) -> Self {
        Self {
            city,
            timestamps,
            is_metric: units.is_metric(),
            time: Vec::new(),
            date: Vec::new(),
            temp: Vec::new(),
            description: Vec::new(),
            kind: Vec::new(),
            clouds: Vec::new(),
            wind_speed: Vec::new(),
            rain_probability: Vec::new(),
        }
    }

    /// Builds a forecast from the first `step_count` provider items.
    ///
    /// The provider is asked for exactly `step_count` items already, but the
    /// list is cut again here and also bounded by the reported `cnt`.
    pub fn from_response(
        res: ForecastResponse,
        city: String,
        step_count: usize,
        units: Units,
    ) -> Result<Self, WeatherError> {
        let items = res
            .list
            .ok_or_else(|| WeatherError::Malformed("forecast response has no list".into()))?;
        let offset = res.city.and_then(|c| c.timezone);
        let limit = res.cnt.map_or(step_count, |cnt| cnt.min(step_count));

        let mut forecast = Forecast::new(city, step_count, units);
        for item in items.into_iter().take(limit) {
            forecast.push(ForecastStep::from_item(item, offset));
        }
        Ok(forecast)
    }

    pub fn push(&mut self, step: ForecastStep) {
        self.time.push(step.time);
        self.date.push(step.date);
        self.temp.push(step.temp);
        self.description.push(step.description);
        self.kind.push(step.kind);
        self.clouds.push(step.clouds);
        self.wind_speed.push(step.wind_speed);
        self.rain_probability.push(step.rain_probability);
    }

    /// Number of steps actually held.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// True when every sequence has the same length. Records read back from
    /// the cache are checked with this before use.
    pub fn is_consistent(&self) -> bool {
        let n = self.time.len();
        [
            self.date.len(),
            self.temp.len(),
            self.description.len(),
            self.kind.len(),
            self.clouds.len(),
            self.wind_speed.len(),
            self.rain_probability.len(),
        ]
        .iter()
        .all(|&len| len == n)
    }

    pub fn step(&self, i: usize) -> Option<ForecastStep> {
        Some(ForecastStep {
            time: self.time.get(i)?.clone(),
            date: self.date.get(i)?.clone(),
            temp: *self.temp.get(i)?,
            description: self.description.get(i)?.clone(),
            kind: self.kind.get(i)?.clone(),
            clouds: *self.clouds.get(i)?,
            wind_speed: *self.wind_speed.get(i)?,
            rain_probability: *self.rain_probability.get(i)?,
        })
    }

    pub fn steps(&self) -> impl Iterator<Item = ForecastStep> + '_ {
        (0..self.len()).filter_map(|i| self.step(i))
    }

    pub fn rain_probability(&self) -> &[Option<u8>] {
        &self.rain_probability
    }

    pub fn times(&self) -> &[String] {
        &self.time
    }
}

impl ForecastStep {
    fn from_item(item: ForecastItem, offset: Option<i32>) -> Self {
        // A step without a usable timestamp keeps its other values.
        let time = item.dt.and_then(|dt| format::clock_time(dt, offset));
        let date = item.dt.and_then(|dt| format::day_month(dt, offset));
        let condition = item.weather.and_then(|w| w.into_iter().next()).unwrap_or_default();

        Self {
            time: time.unwrap_or_else(|| MISSING_SLOT.to_string()),
            date: date.unwrap_or_else(|| MISSING_SLOT.to_string()),
            temp: item.main.and_then(|m| m.temp),
            description: condition.description,
            kind: condition.main,
            clouds: item.clouds.and_then(|c| c.all),
            wind_speed: item.wind.and_then(|w| w.speed),
            rain_probability: item.pop.map(format::percent),
        }
    }
}

// Provider wire shapes. Everything is optional so a missing field only
// blanks its own slot in the mapped record.

#[derive(Debug, Deserialize)]
pub struct GeoCandidate {
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConditionDto {
    pub id: Option<i64>,
    pub main: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MainDto {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub grnd_level: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WindDto {
    pub speed: Option<f64>,
    pub deg: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CloudsDto {
    pub all: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SysDto {
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CurrentResponse {
    pub weather: Option<Vec<ConditionDto>>,
    pub main: Option<MainDto>,
    pub visibility: Option<f64>,
    pub wind: Option<WindDto>,
    pub clouds: Option<CloudsDto>,
    pub sys: Option<SysDto>,
    pub timezone: Option<i32>,
    pub cod: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastItem {
    pub dt: Option<i64>,
    pub main: Option<MainDto>,
    pub weather: Option<Vec<ConditionDto>>,
    pub clouds: Option<CloudsDto>,
    pub wind: Option<WindDto>,
    pub pop: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastCity {
    pub name: Option<String>,
    pub timezone: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub cnt: Option<usize>,
    pub list: Option<Vec<ForecastItem>>,
    pub city: Option<ForecastCity>,
}

/// Error body returned by the provider alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn forecast_item(dt: i64, pop: f64) -> serde_json::Value {
        json!({
            "dt": dt,
            "main": {"temp": 11.5},
            "weather": [{"id": 500, "main": "Rain", "description": "light rain"}],
            "clouds": {"all": 90},
            "wind": {"speed": 4.1},
            "pop": pop
        })
    }

    #[test]
    fn test_candidate_without_coordinates_is_rejected() {
        let candidate = GeoCandidate {
            name: Some("Nowhere".into()),
            lat: None,
            lon: Some(1.0),
            country: None,
        };
        assert!(matches!(
            Location::try_from(candidate),
            Err(WeatherError::Malformed(_))
        ));
    }

    #[test]
    fn test_candidate_with_blank_name_is_rejected() {
        let candidate = GeoCandidate {
            name: Some("   ".into()),
            lat: Some(1.0),
            lon: Some(1.0),
            country: None,
        };
        assert!(Location::try_from(candidate).is_err());
    }

    #[test]
    fn test_current_mapping_tolerates_missing_sections() {
        let res: CurrentResponse = serde_json::from_value(json!({
            "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
            "main": {"temp": 21.3, "humidity": 40},
            "timezone": 3600,
            "sys": {"sunrise": 1_709_272_800},
            "cod": 200
        }))
        .unwrap();

        let current = CurrentWeather::from_response(res, "Paris".into(), Units::Metric);
        assert_eq!(current.kind.as_deref(), Some("Clear"));
        assert_eq!(current.code, Some(800));
        assert_eq!(current.temp, Some(21.3));
        assert_eq!(current.feels_like, None);
        assert_eq!(current.wind_speed, None);
        assert_eq!(current.clouds, None);
        assert_eq!(current.sunrise.as_deref(), Some("07:00"));
        assert_eq!(current.sunset, None);
        assert_eq!(current.timezone.as_deref(), Some("+1:00"));
        assert_eq!(current.error_code, Some(200));
        assert!(current.is_metric);
    }

    #[test]
    fn test_string_status_code_is_parsed() {
        let res: CurrentResponse = serde_json::from_value(json!({"cod": "404"})).unwrap();
        let current = CurrentWeather::from_response(res, "X".into(), Units::Imperial);
        assert_eq!(current.error_code, Some(404));
        assert!(!current.is_metric);
    }

    #[test]
    fn test_forecast_truncates_to_step_count() {
        let items: Vec<_> = (0..10).map(|i| forecast_item(1_709_296_440 + i * 10_800, 0.1)).collect();
        let res: ForecastResponse = serde_json::from_value(json!({
            "cnt": 10,
            "list": items,
            "city": {"name": "Oslo", "timezone": 0}
        }))
        .unwrap();

        let forecast = Forecast::from_response(res, "Oslo".into(), 7, Units::Metric).unwrap();
        assert_eq!(forecast.len(), 7);
        assert_eq!(forecast.timestamps, 7);
        assert!(forecast.is_consistent());
        assert_eq!(forecast.times()[0], "12:34");
        assert_eq!(forecast.times()[1], "15:34");
    }

    #[test]
    fn test_forecast_bounded_by_cnt() {
        let items: Vec<_> = (0..5).map(|i| forecast_item(1_709_296_440 + i * 10_800, 0.0)).collect();
        let res: ForecastResponse =
            serde_json::from_value(json!({"cnt": 3, "list": items})).unwrap();

        let forecast = Forecast::from_response(res, "Oslo".into(), 7, Units::Metric).unwrap();
        assert_eq!(forecast.len(), 3);
    }

    #[test]
    fn test_forecast_rain_probability_percent() {
        let res: ForecastResponse = serde_json::from_value(json!({
            "cnt": 1,
            "list": [forecast_item(1_709_296_440, 0.42)],
            "city": {"timezone": 0}
        }))
        .unwrap();

        let forecast = Forecast::from_response(res, "Oslo".into(), 7, Units::Metric).unwrap();
        assert_eq!(forecast.rain_probability(), &[Some(42)]);
        let step = forecast.step(0).unwrap();
        assert_eq!(step.date, "01.03");
        assert_eq!(step.kind.as_deref(), Some("Rain"));
        assert_eq!(step.clouds, Some(90.0));
    }

    #[test]
    fn test_forecast_without_list_is_malformed() {
        let res: ForecastResponse = serde_json::from_value(json!({"cnt": 0})).unwrap();
        assert!(matches!(
            Forecast::from_response(res, "Oslo".into(), 7, Units::Metric),
            Err(WeatherError::Malformed(_))
        ));
    }

    #[test]
    fn test_step_without_timestamp_blanks_only_its_clock() {
        let mut undated = forecast_item(1_709_296_440, 0.3);
        undated.as_object_mut().unwrap().remove("dt");
        let res: ForecastResponse = serde_json::from_value(json!({
            "cnt": 2,
            "list": [forecast_item(1_709_296_440, 0.1), undated],
            "city": {"timezone": 0}
        }))
        .unwrap();

        let forecast = Forecast::from_response(res, "Oslo".into(), 7, Units::Metric).unwrap();
        assert_eq!(forecast.len(), 2);
        assert!(forecast.is_consistent());
        let step = forecast.step(1).unwrap();
        assert_eq!(step.time, "--");
        assert_eq!(step.date, "--");
        assert_eq!(step.rain_probability, Some(30));
        assert_eq!(step.kind.as_deref(), Some("Rain"));
        assert_eq!(forecast.step(0).unwrap().time, "12:34");
    }

    #[test]
    fn test_inconsistent_cached_forecast_is_detected() {
        let raw = json!({
            "city": "Oslo", "timestamps": 2, "isMetric": true,
            "time": ["12:00", "15:00"], "date": ["01.03"],
            "temp": [1.0, 2.0], "description": [null, null], "type": [null, null],
            "clouds": [null, null], "windSpeed": [null, null], "rainProbability": [null, null]
        });
        let forecast: Forecast = serde_json::from_value(raw).unwrap();
        assert!(!forecast.is_consistent());
    }
}
