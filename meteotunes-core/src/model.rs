use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Raw inbound body of a load request, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LoadRequest {
    /// Parse a JSON body. Malformed JSON is reported as a validation error.
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(body).map_err(|e| ValidationError::MalformedBody(e.to_string()))
    }
}

/// A validated geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        check_range("latitude", latitude, 90.0)?;
        check_range("longitude", longitude, 180.0)?;
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl TryFrom<LoadRequest> for Coordinate {
    type Error = ValidationError;

    fn try_from(request: LoadRequest) -> Result<Self, Self::Error> {
        let latitude = request.latitude.ok_or(ValidationError::MissingField("latitude"))?;
        let longitude = request.longitude.ok_or(ValidationError::MissingField("longitude"))?;
        Coordinate::new(latitude, longitude)
    }
}

fn check_range(field: &'static str, value: f64, bound: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (-bound..=bound).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { field, value, min: -bound, max: bound })
    }
}

/// One entry of the provider's condition list, e.g. `Clear` / `clear sky`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub main: String,
    pub description: String,
}

/// Current weather at the requested coordinate.
///
/// `conditions` is never empty: the weather client rejects responses without
/// at least one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub temperature: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub conditions: Vec<Condition>,
    /// IANA zone name as returned by the provider, e.g. `America/New_York`.
    pub timezone_region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

impl WeatherSnapshot {
    /// The leading condition entry.
    pub fn primary_condition(&self) -> Option<&Condition> {
        self.conditions.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub asset_id: String,
    pub asset_url: String,
    pub media_type: String,
    pub width: u32,
    pub height: u32,
}

/// Free text from the language model; expected to hold a title and artist
/// but not parsed any further.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongSuggestion {
    pub raw_text: String,
}

/// Non-empty prompt text handed to the generative providers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Prompt(String);

impl Prompt {
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() { None } else { Some(Self(text)) }
    }

    /// Templates always carry literal text, so they skip the emptiness check.
    pub(crate) fn from_template(text: String) -> Self {
        debug_assert!(!text.trim().is_empty());
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
