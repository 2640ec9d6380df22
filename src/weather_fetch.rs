use std::env;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{FetchError, FetchResult};
use crate::http_client::{http_client, send_for_body};

const DEFAULT_WEATHER_BASE: &str = "https://api.open-meteo.com";
const WEATHER_TIMEOUT_SECS: u64 = 10;

// Placeholder coordinate (Sydney CBD). Not tied to any venue.
const PLACEHOLDER_LAT: f64 = -33.87;
const PLACEHOLDER_LON: f64 = 151.21;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Maps a match search to the place whose weather should be looked up.
pub trait VenueResolver {
    fn resolve(&self, match_keyword: &str) -> Coordinates;
}

/// Ignores the match and always answers with one coordinate.
#[derive(Debug, Clone, Copy)]
pub struct FixedVenue(pub Coordinates);

impl Default for FixedVenue {
    fn default() -> Self {
        Self(Coordinates {
            lat: PLACEHOLDER_LAT,
            lon: PLACEHOLDER_LON,
        })
    }
}

impl VenueResolver for FixedVenue {
    fn resolve(&self, _match_keyword: &str) -> Coordinates {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct WeatherFetchConfig {
    pub api_base: String,
    pub timeout: Duration,
}

impl WeatherFetchConfig {
    pub fn from_env() -> Self {
        let api_base = env::var("WEATHER_API_BASE")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_WEATHER_BASE.to_string());
        Self {
            api_base,
            timeout: Duration::from_secs(WEATHER_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    precipitation: Option<f64>,
}

pub fn fetch_rain_mm(
    match_keyword: &str,
    venues: &dyn VenueResolver,
    cfg: &WeatherFetchConfig,
) -> FetchResult<f64> {
    let at = venues.resolve(match_keyword);
    let client = http_client().map_err(|e| FetchError::Network(format!("{e:#}")))?;
    let url = format!("{}/v1/forecast", cfg.api_base);
    let req = client.get(&url).query(&[
        ("latitude", at.lat.to_string()),
        ("longitude", at.lon.to_string()),
        ("current_weather", "true".to_string()),
    ]);

    debug!(lat = at.lat, lon = at.lon, "requesting weather");
    let body = send_for_body(req, cfg.timeout)?;
    let rain = parse_rain_json(&body)?;
    info!(rain_mm = rain, "weather loaded");
    Ok(rain)
}

/// Missing precipitation reads as a dry day; negative readings are floored at 0.
pub fn parse_rain_json(raw: &str) -> FetchResult<f64> {
    let parsed: ForecastResponse = serde_json::from_str(raw)?;
    let rain = parsed
        .current_weather
        .precipitation
        .filter(|v| v.is_finite())
        .unwrap_or(0.0);
    Ok(rain.max(0.0))
}
