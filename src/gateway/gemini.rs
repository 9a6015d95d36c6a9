//! Google Gemini `generateContent` implementation of [`AiGateway`].

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::prompts::{self, CAPTION_COUNT};
use super::{AiGateway, CaptionBrief, CaptionOption, ComposedImage, CompositionRequest, InlineMedia};
use crate::config::Config;
use crate::error::GatewayError;

const MAX_ERROR_BODY_CHARS: usize = 512;
const CAPTION_FORMAT_MESSAGE: &str =
    "The service returned captions in an unexpected format. Please try again.";

/// Failure of a single `generateContent` call.
#[derive(Debug, thiserror::Error)]
enum CallError {
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
    #[error("service returned an invalid response payload")]
    Payload(#[source] serde_json::Error),
}

#[derive(Clone)]
pub struct GeminiGateway {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    text_model: String,
    image_model: String,
    caption_language: String,
}

impl GeminiGateway {
    pub fn from_config(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            caption_language: config.caption_language.clone(),
        }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, CallError> {
        let endpoint = self.endpoint_for_model(model);

        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .with_context(|| format!("request to {model} failed"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read the service response")?;

        if !status.is_success() {
            return Err(anyhow!(
                "service responded {}: {}",
                status,
                truncate_text(&upstream_error_message(&body), MAX_ERROR_BODY_CHARS)
            )
            .into());
        }

        debug!(model, bytes = body.len(), "received generateContent response");
        serde_json::from_str(&body).map_err(CallError::Payload)
    }

    async fn describe(&self, media: &InlineMedia) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![
                RequestPart::inline(media),
                RequestPart::text(prompts::ANALYSIS_INSTRUCTION),
            ])],
            generation_config: None,
        };

        let response = self.generate_content(&self.text_model, &request).await?;
        let text = response.text();
        if text.trim().is_empty() {
            bail!("service returned an empty description");
        }
        Ok(text.trim().to_string())
    }

    async fn compose(&self, request: &CompositionRequest) -> Result<ComposedImage> {
        let instruction = prompts::composition_instruction(request);

        let mut parts = vec![RequestPart::inline(&request.image)];
        if let Some(logo) = request.logo.as_ref() {
            parts.push(RequestPart::inline(logo));
        }
        parts.push(RequestPart::text(&instruction));

        let body = GenerateContentRequest {
            contents: vec![Content::user(parts)],
            generation_config: Some(GenerationConfig {
                response_mime_type: None,
                response_schema: None,
                response_modalities: Some(vec!["IMAGE", "TEXT"]),
            }),
        };

        let response = self.generate_content(&self.image_model, &body).await?;
        extract_composed_image(&response)
    }
}

#[async_trait]
impl AiGateway for GeminiGateway {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn describe_visual(&self, media: &InlineMedia) -> Result<String, GatewayError> {
        info!(
            model = %self.text_model,
            mime_type = %media.mime_type,
            payload_bytes = media.base64.len(),
            "requesting visual description"
        );
        self.describe(media).await.map_err(|err| {
            warn!(error = %error_chain_text(&err), "visual analysis failed");
            GatewayError::Analysis(error_chain_text(&err))
        })
    }

    async fn generate_captions(
        &self,
        description: &str,
        brief: &CaptionBrief,
    ) -> Result<Vec<CaptionOption>, GatewayError> {
        info!(model = %self.text_model, "requesting captions");
        let prompt = prompts::caption_prompt(description, brief, &self.caption_language);
        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![RequestPart::text(&prompt)])],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json"),
                response_schema: Some(caption_schema()),
                response_modalities: None,
            }),
        };

        let response = match self.generate_content(&self.text_model, &request).await {
            Ok(response) => response,
            Err(CallError::Payload(err)) => {
                warn!(error = %err, "caption response envelope did not parse");
                return Err(GatewayError::Generation(CAPTION_FORMAT_MESSAGE.to_string()));
            }
            Err(CallError::Transport(err)) => {
                warn!(error = %error_chain_text(&err), "caption generation failed");
                return Err(GatewayError::Generation(error_chain_text(&err)));
            }
        };

        parse_caption_batch(&response.text()).map_err(|err| {
            warn!(error = %error_chain_text(&err), "caption response did not match the schema");
            GatewayError::Generation(CAPTION_FORMAT_MESSAGE.to_string())
        })
    }

    async fn compose_visual(
        &self,
        request: &CompositionRequest,
    ) -> Result<ComposedImage, GatewayError> {
        info!(
            model = %self.image_model,
            has_logo = request.logo.is_some(),
            frame = ?request.frame,
            placement = ?request.placement,
            "requesting composed visual"
        );
        self.compose(request).await.map_err(|err| {
            warn!(error = %error_chain_text(&err), "composition failed");
            GatewayError::Composition(error_chain_text(&err))
        })
    }
}

fn caption_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "items": {
                "type": "ARRAY",
                "description": format!("An array of {CAPTION_COUNT} quote options."),
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "INTEGER", "description": "Unique ID for the quote." },
                        "text": { "type": "STRING", "description": "The motivational quote text." }
                    },
                    "required": ["id", "text"]
                }
            }
        },
        "required": ["items"]
    })
}

#[derive(Debug, Deserialize)]
struct CaptionBatch {
    #[serde(alias = "opsi_kutipan")]
    items: Vec<CaptionItem>,
}

#[derive(Debug, Deserialize)]
struct CaptionItem {
    id: i64,
    #[serde(alias = "teks")]
    text: String,
}

pub fn parse_caption_batch(raw: &str) -> Result<Vec<CaptionOption>> {
    let batch: CaptionBatch =
        serde_json::from_str(raw.trim()).context("caption payload is not the expected JSON")?;
    if batch.items.len() != CAPTION_COUNT {
        warn!(count = batch.items.len(), "unexpected caption count");
    }
    Ok(batch
        .items
        .into_iter()
        .map(|item| CaptionOption {
            id: item.id,
            text: item.text.trim().to_string(),
        })
        .collect())
}

/// First image part of the first candidate. When there is none, whatever text
/// came back goes into the error so the user can see why.
pub fn extract_composed_image(response: &GenerateContentResponse) -> Result<ComposedImage> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        bail!("the request was blocked by the service ({reason})");
    }

    let image = response.parts().find_map(|part| match part {
        Part::InlineData { inline_data } if inline_data.mime_type.starts_with("image/") => {
            Some(ComposedImage {
                base64: inline_data.data.clone(),
                mime_type: inline_data.mime_type.clone(),
            })
        }
        _ => None,
    });

    match image {
        Some(image) => Ok(image),
        None => {
            let text = response.text();
            if text.trim().is_empty() {
                bail!("the service did not return an image");
            }
            bail!(
                "the service did not return an image. It returned text instead: {}",
                text.trim()
            )
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

impl<'a> Content<'a> {
    fn user(parts: Vec<RequestPart<'a>>) -> Self {
        Self { role: "user", parts }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: BlobRef<'a>,
    },
    Text {
        text: &'a str,
    },
}

impl<'a> RequestPart<'a> {
    fn inline(media: &'a InlineMedia) -> Self {
        Self::InlineData {
            inline_data: BlobRef {
                mime_type: &media.mime_type,
                data: &media.base64,
            },
        }
    }

    fn text(text: &'a str) -> Self {
        Self::Text { text }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BlobRef<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Parts of the first candidate, in order.
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or_default()
            .iter()
    }

    /// Concatenated text parts of the first candidate.
    fn text(&self) -> String {
        self.parts()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    InlineData {
        #[serde(rename = "inlineData", alias = "inline_data")]
        inline_data: Blob,
    },
    Text {
        text: String,
    },
    #[allow(dead_code)]
    Other(Value),
}

#[derive(Debug, Deserialize)]
struct Blob {
    #[serde(rename = "mimeType", alias = "mime_type", default)]
    mime_type: String,
    data: String,
}

fn upstream_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

fn error_chain_text(err: &anyhow::Error) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() || parts.last().map(|last| last == trimmed).unwrap_or(false) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return err.to_string();
    }
    parts.join(": ")
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
