//! Error type shared by the resolver, fetchers and cache.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Cache error: {0}")]
    Cache(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl WeatherError {
    /// User-friendly error message for the status bar.
    pub fn user_message(&self) -> String {
        match self {
            Self::LocationNotFound(_) | Self::Network(_) => {
                "City not found or no connection.".to_string()
            }
            Self::Api { status: 401, .. } => "Invalid API key. Check config.toml.".to_string(),
            Self::Api { message, .. } => format!("Weather service error: {}", message),
            Self::Malformed(_) => "Unexpected response from the weather service.".to_string(),
            Self::Cache(_) | Self::Serialize(_) => "Local cache error.".to_string(),
        }
    }

    /// Whether the failure came from the transport rather than the data.
    ///
    /// The UI keeps showing cached records when this is true.
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_connect() || e.is_timeout() || e.is_request())
    }
}
