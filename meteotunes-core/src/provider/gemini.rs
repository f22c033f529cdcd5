use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    error::ProviderError,
    model::{Prompt, SongSuggestion},
};

use super::{Provider, ProviderId, fetch_json, trim_base_url};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Song suggestions from a Gemini `generateContent` model.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    model: String,
    http: Client,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = trim_base_url(base_url);
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<OutPart<'a>>,
}

#[derive(Debug, Serialize)]
struct OutPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<InPart>,
}

#[derive(Debug, Deserialize)]
struct InPart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first part of the first candidate.
    fn into_first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    type Input = Prompt;
    type Output = SongSuggestion;

    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    #[instrument(skip_all, fields(provider = "gemini", model = %self.model))]
    async fn call(&self, input: &Prompt) -> Result<SongSuggestion, ProviderError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);

        let body = GenerateRequest {
            contents: vec![Content { parts: vec![OutPart { text: input.as_str() }] }],
        };
        let request = self.http.post(url).header(API_KEY_HEADER, &self.api_key).json(&body);

        let parsed: GenerateResponse = fetch_json(self.id(), request).await?;
        let raw_text = parsed.into_first_text().ok_or_else(|| ProviderError::DecodeFailure {
            provider: ProviderId::Gemini,
            message: "response contained no candidate text".to_string(),
        })?;

        Ok(SongSuggestion { raw_text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prompt() -> Prompt {
        Prompt::new("Suggest a song for a clear day").unwrap()
    }

    #[tokio::test]
    async fn extracts_first_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "G_KEY"))
            .and(body_json(serde_json::json!({
                "contents": [{ "parts": [{ "text": "Suggest a song for a clear day" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [
                    { "content": { "parts": [{ "text": "Here Comes the Sun - The Beatles" }, { "text": "ignored" }] } },
                    { "content": { "parts": [{ "text": "second candidate" }] } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("G_KEY".into()).with_base_url(&server.uri());
        let song = provider.call(&prompt()).await.unwrap();

        assert_eq!(song.raw_text, "Here Comes the Sun - The Beatles");
    }

    #[tokio::test]
    async fn honours_configured_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-pro:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "Song - Artist" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("G_KEY".into())
            .with_base_url(&server.uri())
            .with_model("gemini-pro");
        assert!(provider.call(&prompt()).await.is_ok());
    }

    #[tokio::test]
    async fn missing_candidates_is_decode_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("G_KEY".into()).with_base_url(&server.uri());
        let err = provider.call(&prompt()).await.unwrap_err();

        assert!(matches!(err, ProviderError::DecodeFailure { provider: ProviderId::Gemini, .. }));
    }

    #[test]
    fn empty_parts_yield_no_text() {
        let parsed: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "content": { "parts": [] } }]
        }))
        .unwrap();
        assert_eq!(parsed.into_first_text(), None);
    }
}
