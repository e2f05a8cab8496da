use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::chat::{GroundingChunk, GroundingMetadata};
use std::env;

use crate::backend::{GeneratedReply, GenerativeBackend};
use crate::policy::{ModeConfig, CODE_SYSTEM_INSTRUCTION, IMAGE_MODEL};

/// One ordered part of the request contents. Inline media parts always
/// precede the text part.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<RequestConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    #[serde(skip_serializing_if = "Option::is_none")]
    google_search: Option<Empty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    google_maps: Option<Empty>,
}

#[derive(Debug, Serialize)]
struct Empty {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig {
    retrieval_config: RetrievalConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalConfig {
    lat_lng: LatLng,
}

#[derive(Debug, Serialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

fn request_config(config: &ModeConfig) -> Option<RequestConfig> {
    match config {
        ModeConfig::Plain => None,
        ModeConfig::Thinking { thinking_budget } => Some(RequestConfig {
            thinking_config: Some(ThinkingConfig {
                thinking_budget: *thinking_budget,
            }),
            ..Default::default()
        }),
        ModeConfig::Search => Some(RequestConfig {
            tools: Some(vec![Tool {
                google_search: Some(Empty {}),
                google_maps: None,
            }]),
            ..Default::default()
        }),
        ModeConfig::Maps { location } => Some(RequestConfig {
            tools: Some(vec![Tool {
                google_search: None,
                google_maps: Some(Empty {}),
            }]),
            tool_config: location.map(|l| ToolConfig {
                retrieval_config: RetrievalConfig {
                    lat_lng: LatLng {
                        latitude: l.latitude,
                        longitude: l.longitude,
                    },
                },
            }),
            ..Default::default()
        }),
        ModeConfig::Code => Some(RequestConfig {
            system_instruction: Some(CODE_SYSTEM_INSTRUCTION.to_string()),
            ..Default::default()
        }),
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<RawGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<RawGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct RawGroundingChunk {
    web: Option<RawChunkRef>,
    maps: Option<RawChunkRef>,
}

#[derive(Debug, Deserialize)]
struct RawChunkRef {
    uri: Option<String>,
    title: Option<String>,
}

impl RawChunkRef {
    fn into_chunk(self) -> GroundingChunk {
        GroundingChunk {
            uri: self.uri.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
        }
    }
}

/// Partition grounding chunks into web and maps citations; absent grounding
/// collapses to `None`.
fn normalize(resp: GenerateResponse) -> GeneratedReply {
    let Some(candidate) = resp.candidates.into_iter().next() else {
        return GeneratedReply::default();
    };

    let text = candidate
        .content
        .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        .unwrap_or_default();

    let mut grounding = GroundingMetadata::default();
    if let Some(raw) = candidate.grounding_metadata {
        for chunk in raw.grounding_chunks {
            if let Some(web) = chunk.web {
                grounding.search_chunks.push(web.into_chunk());
            } else if let Some(maps) = chunk.maps {
                grounding.map_chunks.push(maps.into_chunk());
            }
        }
    }

    GeneratedReply {
        text,
        grounding: if grounding.is_empty() {
            None
        } else {
            Some(grounding)
        },
    }
}

#[derive(Debug, Serialize)]
struct GenerateImagesRequest {
    prompt: String,
    config: ImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    number_of_images: u32,
    aspect_ratio: &'static str,
    output_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateImagesResponse {
    #[serde(default)]
    generated_images: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    image: ImagePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagePayload {
    image_bytes: String,
}

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    http: Client,
    auth_token: String,
}

impl GeminiClient {
    pub fn new() -> Result<Self> {
        let key = env::var("GEMINI_API_KEY").map_err(|_| anyhow!("GEMINI_API_KEY not set"))?;
        Ok(Self::with_key(key))
    }

    /// No request timeout: generation latency is unbounded and the caller
    /// holds its single in-flight slot until the call resolves.
    pub fn with_key(auth_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            auth_token: auth_token.into(),
        }
    }

    async fn post_json<T: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        model: &str,
        method: &str,
        body: &T,
    ) -> Result<R> {
        let url = format!(
            "{}/models/{}:{}?key={}",
            API_BASE, model, method, self.auth_token
        );
        let resp = self.http.post(url).json(body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let body = body.trim();
            if body.is_empty() {
                return Err(anyhow!("gemini error: {}", status));
            }
            let body = if body.len() > 800 {
                format!("{}...", &body[..800])
            } else {
                body.to_string()
            };
            return Err(anyhow!("gemini error: {}\n{}", status, body));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait::async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        config: &ModeConfig,
        parts: Vec<Part>,
    ) -> Result<GeneratedReply> {
        let req = GenerateRequest {
            contents: vec![Content { parts }],
            config: request_config(config),
        };
        tracing::debug!(model, "sending generateContent request");
        let resp: GenerateResponse = self.post_json(model, "generateContent", &req).await?;
        Ok(normalize(resp))
    }

    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let req = GenerateImagesRequest {
            prompt: prompt.to_string(),
            config: ImageConfig {
                number_of_images: 1,
                aspect_ratio: "1:1",
                output_mime_type: "image/png",
            },
        };
        tracing::debug!("sending generateImages request");
        let resp: GenerateImagesResponse =
            self.post_json(IMAGE_MODEL, "generateImages", &req).await?;
        resp.generated_images
            .into_iter()
            .next()
            .map(|g| g.image.image_bytes)
            .ok_or_else(|| anyhow!("gemini returned no generated images"))
    }
}
