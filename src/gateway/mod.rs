//! Request/response contract with the generative AI service.
//!
//! Three independent operations: describe a visual, write captions for a
//! description, and compose a caption onto an image. No retries; every
//! failure comes back as a [`GatewayError`] for the caller to surface.

pub mod gemini;
pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::options::{BrandPlacement, FrameStyle, TextPlacement};

pub use gemini::GeminiGateway;

/// One generated caption candidate. The id is only unique within its batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionOption {
    pub id: i64,
    pub text: String,
}

/// Inline payload sent alongside a prompt (main image or logo).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMedia {
    pub base64: String,
    pub mime_type: String,
}

/// Everything needed to render the final visual.
#[derive(Debug, Clone)]
pub struct CompositionRequest {
    pub image: InlineMedia,
    pub caption: String,
    pub placement: TextPlacement,
    pub frame: FrameStyle,
    pub logo: Option<InlineMedia>,
    pub brand_text: Option<String>,
    pub brand_placement: BrandPlacement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedImage {
    pub base64: String,
    pub mime_type: String,
}

impl ComposedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Inputs to caption generation beyond the description itself.
#[derive(Debug, Clone, Default)]
pub struct CaptionBrief {
    pub theme: String,
    pub instructions: String,
    pub is_video: bool,
}

#[async_trait]
pub trait AiGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn describe_visual(&self, media: &InlineMedia) -> Result<String, GatewayError>;

    async fn generate_captions(
        &self,
        description: &str,
        brief: &CaptionBrief,
    ) -> Result<Vec<CaptionOption>, GatewayError>;

    async fn compose_visual(
        &self,
        request: &CompositionRequest,
    ) -> Result<ComposedImage, GatewayError>;
}
