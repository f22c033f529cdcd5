//! End-to-end load requests against mocked weather, image and song APIs.

use std::time::Duration;

use meteotunes_core::{Config, LoadService, NoopObserver, ProviderConfig, ProviderId};
use reqwest::StatusCode;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WEATHER_PATH: &str = "/data/3.0/onecall";
const IMAGE_PATH: &str = "/api/image/generation";
const SONG_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

fn weather_body() -> Value {
    json!({
        "lat": 40.7,
        "lon": -74.0,
        "timezone": "America/New_York",
        "current": {
            "temp": 20,
            "pressure": 1012,
            "humidity": 50,
            "weather": [{ "main": "Clear", "description": "clear sky" }]
        }
    })
}

fn image_body() -> Value {
    json!({
        "data": [{
            "asset_id": "img-1",
            "asset_url": "https://cdn.example/img-1.png",
            "type": "image/png",
            "width": 1024,
            "height": 1024
        }]
    })
}

fn song_body() -> Value {
    json!({
        "candidates": [{ "content": { "parts": [{ "text": "Empire State of Mind - Jay-Z" }] } }]
    })
}

fn config_for(server: &MockServer, image_secs: u64, song_secs: u64) -> Config {
    let mut cfg = Config::default();
    cfg.timeouts.weather_secs = 1;
    cfg.timeouts.image_secs = image_secs;
    cfg.timeouts.song_secs = song_secs;
    for id in ProviderId::all() {
        cfg.providers.insert(
            id.as_str().to_string(),
            ProviderConfig { api_key: "KEY".into(), base_url: Some(server.uri()), model: None },
        );
    }
    cfg
}

async fn mount(server: &MockServer, route: &str, template: ResponseTemplate, calls: u64) {
    Mock::given(method(if route == WEATHER_PATH { "GET" } else { "POST" }))
        .and(path(route))
        .respond_with(template)
        .expect(calls)
        .mount(server)
        .await;
}

async fn load(server: &MockServer, image_secs: u64, song_secs: u64) -> (StatusCode, Value) {
    let service = LoadService::from_config(&config_for(server, image_secs, song_secs)).unwrap();
    let out = service
        .load(br#"{"latitude": 40.7, "longitude": -74.0}"#, &NoopObserver)
        .await;
    (out.status, serde_json::to_value(&out.body).unwrap())
}

#[tokio::test]
async fn test_all_providers_succeed() {
    let server = MockServer::start().await;
    mount(&server, WEATHER_PATH, ResponseTemplate::new(200).set_body_json(weather_body()), 1).await;
    mount(&server, IMAGE_PATH, ResponseTemplate::new(200).set_body_json(image_body()), 1).await;
    mount(&server, SONG_PATH, ResponseTemplate::new(200).set_body_json(song_body()), 1).await;

    let (status, body) = load(&server, 15, 20).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weather"]["temperature"], 20.0);
    assert_eq!(body["weather"]["humidity"], 50.0);
    assert_eq!(body["weather"]["pressure"], 1012.0);
    assert_eq!(body["weather"]["conditions"][0]["main"], "Clear");
    assert_eq!(body["image"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["image"][0]["asset_id"], "img-1");
    assert_eq!(body["song"]["raw_text"], "Empire State of Mind - Jay-Z");
}

#[tokio::test]
async fn test_image_server_error_degrades_to_partial() {
    let server = MockServer::start().await;
    mount(&server, WEATHER_PATH, ResponseTemplate::new(200).set_body_json(weather_body()), 1).await;
    mount(&server, IMAGE_PATH, ResponseTemplate::new(500).set_body_string("boom"), 1).await;
    mount(&server, SONG_PATH, ResponseTemplate::new(200).set_body_json(song_body()), 1).await;

    let (status, body) = load(&server, 15, 20).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["image_error"]["kind"], "non_success_status");
    assert_eq!(body["image_error"]["status"], 500);
    assert!(body.get("image").is_none());
    assert_eq!(body["song"]["raw_text"], "Empire State of Mind - Jay-Z");
}

#[tokio::test]
async fn test_weather_failure_skips_branches() {
    let server = MockServer::start().await;
    mount(&server, WEATHER_PATH, ResponseTemplate::new(500), 1).await;
    mount(&server, IMAGE_PATH, ResponseTemplate::new(200).set_body_json(image_body()), 0).await;
    mount(&server, SONG_PATH, ResponseTemplate::new(200).set_body_json(song_body()), 0).await;

    let (status, body) = load(&server, 15, 20).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "upstream_unavailable");
    assert!(body.get("weather").is_none());
}

#[tokio::test]
async fn test_weather_timeout_skips_branches() {
    let server = MockServer::start().await;
    mount(
        &server,
        WEATHER_PATH,
        ResponseTemplate::new(200)
            .set_body_json(weather_body())
            .set_delay(Duration::from_secs(3)),
        1,
    )
    .await;
    mount(&server, IMAGE_PATH, ResponseTemplate::new(200).set_body_json(image_body()), 0).await;
    mount(&server, SONG_PATH, ResponseTemplate::new(200).set_body_json(song_body()), 0).await;

    let (status, body) = load(&server, 15, 20).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["message"].as_str().unwrap().contains("openweather"));
}

#[tokio::test]
async fn test_slow_image_times_out_independently() {
    let server = MockServer::start().await;
    mount(&server, WEATHER_PATH, ResponseTemplate::new(200).set_body_json(weather_body()), 1).await;
    mount(
        &server,
        IMAGE_PATH,
        ResponseTemplate::new(200)
            .set_body_json(image_body())
            .set_delay(Duration::from_secs(3)),
        1,
    )
    .await;
    mount(&server, SONG_PATH, ResponseTemplate::new(200).set_body_json(song_body()), 1).await;

    let (status, body) = load(&server, 1, 5).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["image_error"]["kind"], "timed_out");
    assert_eq!(body["song"]["raw_text"], "Empire State of Mind - Jay-Z");
}

#[tokio::test]
async fn test_invalid_coordinate_makes_no_calls() {
    let server = MockServer::start().await;
    mount(&server, WEATHER_PATH, ResponseTemplate::new(200).set_body_json(weather_body()), 0).await;

    let service = LoadService::from_config(&config_for(&server, 15, 20)).unwrap();
    let out = service
        .load(br#"{"latitude": 120.0, "longitude": 10.0}"#, &NoopObserver)
        .await;

    assert_eq!(out.status, StatusCode::UNPROCESSABLE_ENTITY);
}

const UNREACHABLE: &str = "http://127.0.0.1:9";

fn config_with_key(key: &str, base_url: impl Fn(ProviderId) -> String) -> Config {
    let mut cfg = Config::default();
    cfg.timeouts.weather_secs = 1;
    for id in ProviderId::all() {
        cfg.providers.insert(
            id.as_str().to_string(),
            ProviderConfig { api_key: key.into(), base_url: Some(base_url(*id)), model: None },
        );
    }
    cfg
}

#[tokio::test]
async fn test_unreachable_weather_does_not_leak_api_key() {
    let service =
        LoadService::from_config(&config_with_key("SUPERSECRET", |_| UNREACHABLE.to_string())).unwrap();
    let out = service
        .load(br#"{"latitude": 1.0, "longitude": 2.0}"#, &NoopObserver)
        .await;

    assert_eq!(out.status, StatusCode::BAD_GATEWAY);
    let body = serde_json::to_string(&out.body).unwrap();
    assert!(body.contains("upstream_unavailable"));
    assert!(!body.contains("SUPERSECRET"));
}

#[tokio::test]
async fn test_unreachable_song_does_not_leak_api_key() {
    let server = MockServer::start().await;
    mount(&server, WEATHER_PATH, ResponseTemplate::new(200).set_body_json(weather_body()), 1).await;
    mount(&server, IMAGE_PATH, ResponseTemplate::new(200).set_body_json(image_body()), 1).await;

    let cfg = config_with_key("SUPERSECRET", |id| match id {
        ProviderId::Gemini => UNREACHABLE.to_string(),
        _ => server.uri(),
    });
    let service = LoadService::from_config(&cfg).unwrap();
    let out = service
        .load(br#"{"latitude": 40.7, "longitude": -74.0}"#, &NoopObserver)
        .await;

    assert_eq!(out.status, StatusCode::OK);
    let body = serde_json::to_value(&out.body).unwrap();
    assert_eq!(body["song_error"]["kind"], "network_failure");
    assert!(!body.to_string().contains("SUPERSECRET"));
}
