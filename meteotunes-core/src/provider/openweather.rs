use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::{
    error::ProviderError,
    model::{Condition, Coordinate, WeatherSnapshot},
};

use super::{Provider, ProviderId, fetch_json, trim_base_url};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Current conditions from the OpenWeather One Call 3.0 API.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = trim_base_url(base_url);
        self
    }

    /// Bound the whole weather call; it has no deadline of its own otherwise.
    pub fn with_timeout(mut self, timeout: Duration) -> reqwest::Result<Self> {
        self.http = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrent {
    dt: Option<i64>,
    temp: f64,
    pressure: f64,
    humidity: f64,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwOneCallResponse {
    timezone: String,
    current: OwCurrent,
}

impl TryFrom<OwOneCallResponse> for WeatherSnapshot {
    type Error = ProviderError;

    fn try_from(parsed: OwOneCallResponse) -> Result<Self, Self::Error> {
        if parsed.current.weather.is_empty() {
            return Err(ProviderError::DecodeFailure {
                provider: ProviderId::OpenWeather,
                message: "response contained no weather conditions".to_string(),
            });
        }

        let conditions = parsed
            .current
            .weather
            .into_iter()
            .map(|w| Condition { main: w.main, description: w.description })
            .collect();

        Ok(WeatherSnapshot {
            temperature: parsed.current.temp,
            pressure: parsed.current.pressure,
            humidity: parsed.current.humidity,
            conditions,
            timezone_region: parsed.timezone,
            observed_at: parsed.current.dt.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
        })
    }
}

#[async_trait]
impl Provider for OpenWeatherProvider {
    type Input = Coordinate;
    type Output = WeatherSnapshot;

    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }

    #[instrument(skip(self), fields(provider = "openweather"))]
    async fn call(&self, input: &Coordinate) -> Result<WeatherSnapshot, ProviderError> {
        let url = format!("{}/data/3.0/onecall", self.base_url);

        let request = self.http.get(url).query(&[
            ("lat", input.latitude().to_string()),
            ("lon", input.longitude().to_string()),
            ("appid", self.api_key.clone()),
            ("units", "metric".to_string()),
        ]);

        let parsed: OwOneCallResponse = fetch_json(self.id(), request).await?;
        let snapshot = WeatherSnapshot::try_from(parsed)?;

        debug!(timezone = %snapshot.timezone_region, temperature = snapshot.temperature, "weather loaded");
        Ok(snapshot)
    }
}
