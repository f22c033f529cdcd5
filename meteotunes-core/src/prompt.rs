//! Natural-language prompts derived from a weather snapshot.
//!
//! Both templates are pure functions of their input: the same snapshot and
//! purpose always produce the same text.

use crate::model::{Prompt, WeatherSnapshot};

pub const UNKNOWN_REGION: &str = "unknown region";
pub const UNKNOWN_CITY: &str = "unknown city";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Image,
    Song,
}

/// `(region, city)` from a `Continent/City` zone name, with underscores
/// turned into spaces. Missing parts become placeholders.
pub fn split_timezone(timezone: &str) -> (String, String) {
    let mut parts = timezone.split('/').map(str::trim).filter(|s| !s.is_empty());

    match (parts.next(), parts.next()) {
        (Some(region), Some(city)) => (region.replace('_', " "), city.replace('_', " ")),
        _ => (UNKNOWN_REGION.to_string(), UNKNOWN_CITY.to_string()),
    }
}

pub fn build_prompt(weather: &WeatherSnapshot, purpose: Purpose) -> Prompt {
    let (region, city) = split_timezone(&weather.timezone_region);
    let (main, description) = weather
        .primary_condition()
        .map(|c| (c.main.as_str(), c.description.as_str()))
        .unwrap_or(("calm", "no notable conditions"));

    let scene = format!(
        "The temperature is {}°C with {}% humidity and a pressure of {} hPa. \
         The sky shows {} ({}) in {}, {}.",
        weather.temperature, weather.humidity, weather.pressure, main, description, city, region
    );

    let text = match purpose {
        Purpose::Image => format!("A picture of the current weather in {city}. {scene}"),
        Purpose::Song => format!(
            "Suggest one song that fits this weather. {scene} \
             Respond with only the song title and the artist, nothing else."
        ),
    };

    Prompt::from_template(text)
}
