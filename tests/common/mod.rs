#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quote_visualizer::gateway::{
    AiGateway, CaptionBrief, CaptionOption, ComposedImage, CompositionRequest, InlineMedia,
};
use quote_visualizer::{GatewayError, MediaSource};
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub enum Call {
    Describe { mime_type: String },
    Captions { description: String, brief: CaptionBrief },
    Compose(CompositionRequest),
}

/// Lets a test hold a gateway call open until it chooses to release it.
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

/// In-process gateway that returns canned results and records every call.
pub struct ScriptedGateway {
    calls: Mutex<Vec<Call>>,
    description: Result<String, String>,
    captions: Result<Vec<CaptionOption>, String>,
    composed: Result<ComposedImage, String>,
    describe_gate: Option<Arc<Gate>>,
    captions_gate: Option<Arc<Gate>>,
    compose_gate: Option<Arc<Gate>>,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            description: Ok("A calm mountain sunrise".to_string()),
            captions: Ok(vec![
                caption(11, "Every sunrise is a new beginning."),
                caption(12, "Climb calmly, the summit waits."),
                caption(13, "Light always finds the peaks first."),
            ]),
            composed: Ok(ComposedImage {
                base64: "Y29tcG9zZWQ=".to_string(),
                mime_type: "image/png".to_string(),
            }),
            describe_gate: None,
            captions_gate: None,
            compose_gate: None,
        }
    }
}

impl ScriptedGateway {
    pub fn failing_describe(message: &str) -> Self {
        Self {
            description: Err(message.to_string()),
            ..Default::default()
        }
    }

    pub fn failing_captions(message: &str) -> Self {
        Self {
            captions: Err(message.to_string()),
            ..Default::default()
        }
    }

    pub fn failing_compose(message: &str) -> Self {
        Self {
            composed: Err(message.to_string()),
            ..Default::default()
        }
    }

    pub fn with_describe_gate(mut self, gate: Arc<Gate>) -> Self {
        self.describe_gate = Some(gate);
        self
    }

    pub fn with_captions_gate(mut self, gate: Arc<Gate>) -> Self {
        self.captions_gate = Some(gate);
        self
    }

    pub fn with_compose_gate(mut self, gate: Arc<Gate>) -> Self {
        self.compose_gate = Some(gate);
        self
    }

    pub fn with_captions(mut self, captions: Vec<CaptionOption>) -> Self {
        self.captions = Ok(captions);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn compose_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Compose(_)))
            .count()
    }

    pub fn caption_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Captions { .. }))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AiGateway for ScriptedGateway {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn describe_visual(&self, media: &InlineMedia) -> Result<String, GatewayError> {
        self.record(Call::Describe {
            mime_type: media.mime_type.clone(),
        });
        if let Some(gate) = &self.describe_gate {
            gate.pass().await;
        }
        self.description.clone().map_err(GatewayError::Analysis)
    }

    async fn generate_captions(
        &self,
        description: &str,
        brief: &CaptionBrief,
    ) -> Result<Vec<CaptionOption>, GatewayError> {
        self.record(Call::Captions {
            description: description.to_string(),
            brief: brief.clone(),
        });
        if let Some(gate) = &self.captions_gate {
            gate.pass().await;
        }
        self.captions.clone().map_err(GatewayError::Generation)
    }

    async fn compose_visual(
        &self,
        request: &CompositionRequest,
    ) -> Result<ComposedImage, GatewayError> {
        self.record(Call::Compose(request.clone()));
        if let Some(gate) = &self.compose_gate {
            gate.pass().await;
        }
        self.composed.clone().map_err(GatewayError::Composition)
    }
}

pub fn caption(id: i64, text: &str) -> CaptionOption {
    CaptionOption {
        id,
        text: text.to_string(),
    }
}

pub fn jpeg_upload() -> MediaSource {
    MediaSource::Bytes {
        data: b"\xFF\xD8\xFF\xE0fake-jpeg".to_vec(),
        mime_type: Some("image/jpeg".to_string()),
        file_name: Some("sunrise.jpg".to_string()),
    }
}

pub fn png_logo() -> MediaSource {
    MediaSource::Bytes {
        data: b"\x89PNG\r\n\x1a\nfake-logo".to_vec(),
        mime_type: Some("image/png".to_string()),
        file_name: Some("logo.png".to_string()),
    }
}

pub fn mp4_upload() -> MediaSource {
    MediaSource::Bytes {
        data: b"\x00\x00\x00\x18ftypmp42".to_vec(),
        mime_type: Some("video/mp4".to_string()),
        file_name: Some("waves.mp4".to_string()),
    }
}

pub fn broken_upload() -> MediaSource {
    MediaSource::Bytes {
        data: Vec::new(),
        mime_type: Some("image/jpeg".to_string()),
        file_name: Some("empty.jpg".to_string()),
    }
}
