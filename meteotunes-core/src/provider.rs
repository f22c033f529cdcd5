use crate::{
    Config,
    error::ProviderError,
    model::{Coordinate, GeneratedImage, Prompt, SongSuggestion, WeatherSnapshot},
    provider::{gemini::GeminiProvider, limewire::LimeWireProvider, openweather::OpenWeatherProvider},
};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod gemini;
pub mod limewire;
pub mod openweather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    LimeWire,
    Gemini,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::LimeWire => "limewire",
            ProviderId::Gemini => "gemini",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::LimeWire, ProviderId::Gemini]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "limewire" => Ok(ProviderId::LimeWire),
            "gemini" => Ok(ProviderId::Gemini),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, limewire, gemini."
            )),
        }
    }
}

/// One external HTTP API. Each call issues exactly one outbound request and
/// never retries.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    type Input: Send + Sync;
    type Output: Send;

    fn id(&self) -> ProviderId;

    async fn call(&self, input: &Self::Input) -> Result<Self::Output, ProviderError>;
}

pub type WeatherClient = Arc<dyn Provider<Input = Coordinate, Output = WeatherSnapshot>>;
pub type ImageClient = Arc<dyn Provider<Input = Prompt, Output = Vec<GeneratedImage>>>;
pub type SongClient = Arc<dyn Provider<Input = Prompt, Output = SongSuggestion>>;

/// The three clients a load request needs.
#[derive(Debug, Clone)]
pub struct ProviderSet {
    pub weather: WeatherClient,
    pub image: ImageClient,
    pub song: SongClient,
}

impl ProviderSet {
    /// Construct all providers from config. Every provider needs an API key.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let weather_cfg = config.require_provider(ProviderId::OpenWeather)?;
        let image_cfg = config.require_provider(ProviderId::LimeWire)?;
        let song_cfg = config.require_provider(ProviderId::Gemini)?;

        let mut weather = OpenWeatherProvider::new(weather_cfg.api_key.clone())
            .with_timeout(config.timeouts.weather())
            .context("Failed to build OpenWeather HTTP client")?;
        let mut image = LimeWireProvider::new(image_cfg.api_key.clone());
        let mut song = GeminiProvider::new(song_cfg.api_key.clone());

        if let Some(url) = &weather_cfg.base_url {
            weather = weather.with_base_url(url);
        }
        if let Some(url) = &image_cfg.base_url {
            image = image.with_base_url(url);
        }
        if let Some(url) = &song_cfg.base_url {
            song = song.with_base_url(url);
        }
        if let Some(model) = &song_cfg.model {
            song = song.with_model(model);
        }

        Ok(Self { weather: Arc::new(weather), image: Arc::new(image), song: Arc::new(song) })
    }
}

/// Send a prepared request and decode a successful JSON body.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    provider: ProviderId,
    request: RequestBuilder,
) -> Result<T, ProviderError> {
    let res = request.send().await.map_err(|e| ProviderError::from_reqwest(provider, e))?;

    let status = res.status();
    let body = res.text().await.map_err(|e| ProviderError::NetworkFailure {
        provider,
        message: format!("failed to read response body: {}", e.without_url()),
    })?;

    if !status.is_success() {
        tracing::warn!(%provider, status = status.as_u16(), "provider returned non-success status");
        return Err(ProviderError::NonSuccessStatus {
            provider,
            status: status.as_u16(),
            message: truncate_body(&body),
        });
    }

    serde_json::from_str(&body)
        .map_err(|e| ProviderError::DecodeFailure { provider, message: e.to_string() })
}

pub(crate) fn trim_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
