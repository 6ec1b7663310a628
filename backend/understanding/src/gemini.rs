//! Family-card extraction through the Gemini `generateContent` API with a
//! structured-output schema.
//!
//! One request per image. No retry, no backoff: any failure is terminal for
//! that upload.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use kkscan_core::{ExtractionError, Extractor, KartuKeluargaData};
use kkscan_media::split_data_uri;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::decode::parse_extraction;
use crate::prompt::{KK_EXTRACTION_PROMPT, response_schema};

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const FALLBACK_MIME: &str = "image/jpeg";

/// Extraction client for Google's Gemini models.
///
/// Build once at startup and share behind an `Arc<dyn Extractor>`.
pub struct GeminiExtractor {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiExtractor {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Abort requests that take longer than `timeout`. Unset by default.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ExtractionError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::Request(e.to_string()))?;
        Ok(self)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Build the request body: the raw image (data-URI prefix stripped) plus
/// the instruction, constrained to the household schema.
fn build_request(image_data_uri: &str) -> Result<GenerateContentRequest, ExtractionError> {
    let (mime, payload) = split_data_uri(image_data_uri);
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(ExtractionError::InvalidImage("empty image payload".into()));
    }

    Ok(GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part {
                    inline_data: Some(InlineData {
                        mime_type: mime.unwrap_or(FALLBACK_MIME).to_string(),
                        data: payload.to_string(),
                    }),
                    ..Default::default()
                },
                Part {
                    text: Some(KK_EXTRACTION_PROMPT.to_string()),
                    ..Default::default()
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: response_schema(),
        },
    })
}

/// Concatenated text of the first candidate, if any.
fn response_text(response: &GenerateContentResponse) -> Option<String> {
    let text: String = response
        .candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    if text.trim().is_empty() { None } else { Some(text) }
}

#[async_trait]
impl Extractor for GeminiExtractor {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn extract(&self, image_data_uri: &str) -> Result<KartuKeluargaData, ExtractionError> {
        let start = Instant::now();
        let body = build_request(image_data_uri)?;

        debug!(model = %self.model, "Sending extraction request to Gemini");
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Gemini returned an error status");
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::InvalidJson(e.without_url().to_string()))?;
        let text = response_text(&parsed).ok_or(ExtractionError::EmptyResponse)?;
        let record = parse_extraction(&text)?;

        info!(
            model = %self.model,
            members = record.anggota_keluarga.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Extraction completed"
        );
        Ok(record)
    }
}
