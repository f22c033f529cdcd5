//! Mapping of coordinator results onto HTTP status codes and JSON bodies.

use reqwest::StatusCode;
use serde::Serialize;

use crate::{
    coordinator::{AggregateResult, BranchOutcome},
    error::{LoadError, ProviderError},
    model::{GeneratedImage, SongSuggestion, WeatherSnapshot},
};

pub const MSG_LOADED: &str = "data loaded successfully";
pub const MSG_PARTIAL: &str = "data loaded with partial results";
pub const MSG_WEATHER_READY: &str = "weather loaded";

/// A status code and the body to write with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assembled {
    #[serde(serialize_with = "serialize_status")]
    pub status: StatusCode,
    #[serde(flatten)]
    pub body: ResponseBody,
}

fn serialize_status<S: serde::Serializer>(status: &StatusCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(status.as_u16())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Loaded(LoadResponse),
    WeatherReady(WeatherReady),
    Error(ErrorResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadResponse {
    pub message: String,
    pub weather: WeatherSnapshot,
    #[serde(flatten)]
    pub image: ImageField,
    #[serde(flatten)]
    pub song: SongField,
}

/// Serialised as either `"image": [...]` or `"image_error": {...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ImageField {
    #[serde(rename = "image")]
    Images(Vec<GeneratedImage>),
    #[serde(rename = "image_error")]
    Error(BranchError),
}

/// Serialised as either `"song": {...}` or `"song_error": {...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SongField {
    #[serde(rename = "song")]
    Song(SongSuggestion),
    #[serde(rename = "song_error")]
    Error(BranchError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReady {
    pub message: String,
    pub weather: WeatherSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Error marker embedded in place of a failed branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchError {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl<T> BranchOutcome<T> {
    /// Split into the success value or the marker that replaces it.
    fn into_field(self) -> Result<T, BranchError> {
        match self {
            BranchOutcome::Success(value) => Ok(value),
            BranchOutcome::Failure(err) => Err(BranchError::from(&err)),
            BranchOutcome::TimedOut { after } => Err(BranchError {
                kind: "timed_out".to_string(),
                message: format!("no response within {} ms", after.as_millis()),
                status: None,
            }),
        }
    }
}

impl From<&ProviderError> for BranchError {
    fn from(err: &ProviderError) -> Self {
        Self { kind: err.code().to_string(), message: err.to_string(), status: err.status() }
    }
}

impl From<AggregateResult> for LoadResponse {
    fn from(result: AggregateResult) -> Self {
        let image = match result.image.into_field() {
            Ok(images) => ImageField::Images(images),
            Err(e) => ImageField::Error(e),
        };
        let song = match result.song.into_field() {
            Ok(song) => SongField::Song(song),
            Err(e) => SongField::Error(e),
        };

        let complete = matches!(image, ImageField::Images(_)) && matches!(song, SongField::Song(_));
        let message = if complete { MSG_LOADED } else { MSG_PARTIAL };

        Self { message: message.to_string(), weather: result.weather, image, song }
    }
}

pub fn status_for(err: &LoadError) -> StatusCode {
    match err {
        LoadError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LoadError::UpstreamUnavailable(ProviderError::RequestBuildFailed { .. }) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        LoadError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Final response for a request. Once weather is known the status is always
/// 200; branch problems only show up as `*_error` fields.
pub fn assemble(result: Result<AggregateResult, LoadError>) -> Assembled {
    match result {
        Ok(aggregate) => Assembled {
            status: StatusCode::OK,
            body: ResponseBody::Loaded(aggregate.into()),
        },
        Err(err) => Assembled {
            status: status_for(&err),
            body: ResponseBody::Error(ErrorResponse {
                error: err.code().to_string(),
                message: err.to_string(),
            }),
        },
    }
}

/// Intermediate 206 response announcing that weather is available.
pub fn weather_ready(weather: &WeatherSnapshot) -> Assembled {
    Assembled {
        status: StatusCode::PARTIAL_CONTENT,
        body: ResponseBody::WeatherReady(WeatherReady {
            message: MSG_WEATHER_READY.to_string(),
            weather: weather.clone(),
        }),
    }
}
