use async_trait::async_trait;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    error::ProviderError,
    model::{GeneratedImage, Prompt},
};

use super::{Provider, ProviderId, fetch_json, trim_base_url};

const DEFAULT_BASE_URL: &str = "https://api.limewire.com";
const ASPECT_RATIO: &str = "1:1";

/// Image generation through the LimeWire API.
#[derive(Debug, Clone)]
pub struct LimeWireProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl LimeWireProvider {
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
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    prompt: &'a str,
    aspect_ratio: &'a str,
}

#[derive(Debug, Deserialize)]
struct LwImage {
    asset_id: String,
    asset_url: String,
    #[serde(rename = "type")]
    media_type: String,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct LwGenerationResponse {
    #[serde(default)]
    data: Vec<LwImage>,
}

impl From<LwImage> for GeneratedImage {
    fn from(img: LwImage) -> Self {
        Self {
            asset_id: img.asset_id,
            asset_url: img.asset_url,
            media_type: img.media_type,
            width: img.width,
            height: img.height,
        }
    }
}

#[async_trait]
impl Provider for LimeWireProvider {
    type Input = Prompt;
    type Output = Vec<GeneratedImage>;

    fn id(&self) -> ProviderId {
        ProviderId::LimeWire
    }

    #[instrument(skip_all, fields(provider = "limewire"))]
    async fn call(&self, input: &Prompt) -> Result<Vec<GeneratedImage>, ProviderError> {
        let url = format!("{}/api/image/generation", self.base_url);

        let request = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .header("X-Api-Version", "v1")
            .header(header::ACCEPT, "application/json")
            .json(&GenerationRequest { prompt: input.as_str(), aspect_ratio: ASPECT_RATIO });

        let parsed: LwGenerationResponse = fetch_json(self.id(), request).await?;
        let images: Vec<GeneratedImage> = parsed.data.into_iter().map(GeneratedImage::from).collect();

        debug!(count = images.len(), "images generated");
        Ok(images)
    }
}
