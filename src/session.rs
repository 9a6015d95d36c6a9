//! Session state machine.
//!
//! One [`Session`] owns the user's selections and the results of the two
//! pipelines that run over them:
//!
//! - captions: `Idle -> Analyzing -> Writing -> (Ready | Failed)`
//! - composition: `Idle -> Composing(caption id) -> (Ready | Failed)`
//!
//! The pipelines keep separate result and error slots so neither can clobber
//! the other. Every transition publishes a [`SessionSnapshot`] to subscribers.
//!
//! Gateway calls run without the state lock held. Each call is tagged with the
//! request counters current at dispatch; a result whose tags no longer match
//! (new media selected, newer request started) is dropped instead of
//! overwriting newer state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::error::SessionError;
use crate::gateway::{AiGateway, CaptionBrief, CaptionOption, CompositionRequest};
use crate::media::{self, MediaAsset, MediaKind, MediaSource};
use crate::options::{BrandPlacement, FrameStyle, TextPlacement};

pub const MEDIA_DECODE_FAILED: &str = "Failed to process the file. Please try another file.";
pub const LOGO_DECODE_FAILED: &str = "Failed to process the logo file. Please try another file.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionStage {
    #[default]
    Idle,
    Analyzing,
    Writing,
    Ready,
    Failed,
}

impl CaptionStage {
    pub fn in_flight(self) -> bool {
        matches!(self, Self::Analyzing | Self::Writing)
    }

    fn progress_message(self) -> Option<&'static str> {
        match self {
            Self::Analyzing => Some("Analyzing the visual..."),
            Self::Writing => Some("Writing inspirational captions..."),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ComposeStage {
    #[default]
    Idle,
    Composing {
        caption_id: i64,
    },
    Ready,
    Failed,
}

impl ComposeStage {
    pub fn in_flight(self) -> bool {
        matches!(self, Self::Composing { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaView {
    pub preview_url: String,
    pub mime_type: String,
    pub kind: MediaKind,
    pub file_name: Option<String>,
}

impl From<&MediaAsset> for MediaView {
    fn from(asset: &MediaAsset) -> Self {
        Self {
            preview_url: asset.preview_url.clone(),
            mime_type: asset.mime_type.clone(),
            kind: asset.kind,
            file_name: asset.file_name.clone(),
        }
    }
}

/// Read-only view handed to the presentation layer after every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub media: Option<MediaView>,
    pub logo: Option<MediaView>,
    pub theme: String,
    pub instructions: String,
    pub placement: TextPlacement,
    pub frame: FrameStyle,
    pub brand_placement: BrandPlacement,
    pub brand_text: String,

    pub caption_stage: CaptionStage,
    pub is_generating: bool,
    pub progress_message: Option<String>,
    pub captions: Option<Vec<CaptionOption>>,
    pub active_caption: Option<CaptionOption>,
    pub caption_error: Option<String>,

    pub compose_stage: ComposeStage,
    pub is_composing: bool,
    pub composing_caption: Option<i64>,
    pub composite: Option<String>,
    pub composite_error: Option<String>,
}

/// Partial settings update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub theme: Option<String>,
    pub instructions: Option<String>,
    pub placement: Option<TextPlacement>,
    pub frame: Option<FrameStyle>,
    pub brand_placement: Option<BrandPlacement>,
    pub brand_text: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    media: Option<MediaAsset>,
    logo: Option<MediaAsset>,
    theme: String,
    instructions: String,
    placement: TextPlacement,
    frame: FrameStyle,
    brand_placement: BrandPlacement,
    brand_text: String,

    caption_stage: CaptionStage,
    captions: Option<Vec<CaptionOption>>,
    active_caption: Option<i64>,
    caption_error: Option<String>,

    compose_stage: ComposeStage,
    composite: Option<String>,
    composite_error: Option<String>,
}

impl SessionState {
    fn caption(&self, id: i64) -> Option<&CaptionOption> {
        self.captions
            .as_ref()
            .and_then(|batch| batch.iter().find(|caption| caption.id == id))
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            media: self.media.as_ref().map(MediaView::from),
            logo: self.logo.as_ref().map(MediaView::from),
            theme: self.theme.clone(),
            instructions: self.instructions.clone(),
            placement: self.placement,
            frame: self.frame,
            brand_placement: self.brand_placement,
            brand_text: self.brand_text.clone(),
            caption_stage: self.caption_stage,
            is_generating: self.caption_stage.in_flight(),
            progress_message: self.caption_stage.progress_message().map(str::to_string),
            captions: self.captions.clone(),
            active_caption: self.active_caption.and_then(|id| self.caption(id)).cloned(),
            caption_error: self.caption_error.clone(),
            compose_stage: self.compose_stage,
            is_composing: self.compose_stage.in_flight(),
            composing_caption: match self.compose_stage {
                ComposeStage::Composing { caption_id } => Some(caption_id),
                _ => None,
            },
            composite: self.composite.clone(),
            composite_error: self.composite_error.clone(),
        }
    }
}

/// Dispatch counters. `media_epoch` moves on every media reset; the others on
/// every request of their kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RequestTokens {
    media_epoch: u64,
    logo: u64,
    captions: u64,
    compose: u64,
}

struct Inner {
    state: SessionState,
    tokens: RequestTokens,
}

pub struct Session {
    gateway: Arc<dyn AiGateway>,
    inner: Mutex<Inner>,
    updates: watch::Sender<SessionSnapshot>,
}

impl Session {
    pub fn new(gateway: Arc<dyn AiGateway>) -> Self {
        let state = SessionState::default();
        let (updates, _) = watch::channel(state.snapshot());
        Self {
            gateway,
            inner: Mutex::new(Inner {
                state,
                tokens: RequestTokens::default(),
            }),
            updates,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.state.snapshot()
    }

    fn publish(&self, state: &SessionState) -> SessionSnapshot {
        let snapshot = state.snapshot();
        self.updates.send_replace(snapshot.clone());
        snapshot
    }

    /// Resets the whole session, then decodes and installs the new media.
    pub async fn select_media(&self, source: MediaSource) -> SessionSnapshot {
        let epoch = {
            let mut inner = self.inner.lock().await;
            inner.tokens.media_epoch += 1;
            inner.state = SessionState::default();
            self.publish(&inner.state);
            inner.tokens.media_epoch
        };

        let decoded = media::decode(source).await;

        let mut inner = self.inner.lock().await;
        if inner.tokens.media_epoch != epoch {
            warn!(epoch, "discarding decoded media superseded by a newer selection");
            return inner.state.snapshot();
        }
        match decoded {
            Ok(asset) => {
                info!(mime_type = %asset.mime_type, "media selected");
                inner.state.media = Some(asset);
            }
            Err(err) => {
                warn!(error = %err, "media decode failed");
                inner.state.caption_error = Some(MEDIA_DECODE_FAILED.to_string());
            }
        }
        self.publish(&inner.state)
    }

    pub async fn clear_media(&self) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        inner.tokens.media_epoch += 1;
        inner.state = SessionState::default();
        info!("media cleared");
        self.publish(&inner.state)
    }

    /// Decodes and installs a logo without touching anything else.
    pub async fn select_logo(&self, source: MediaSource) -> SessionSnapshot {
        let (epoch, token) = {
            let mut inner = self.inner.lock().await;
            inner.tokens.logo += 1;
            (inner.tokens.media_epoch, inner.tokens.logo)
        };

        let decoded = media::decode(source).await;

        let mut inner = self.inner.lock().await;
        if inner.tokens.media_epoch != epoch || inner.tokens.logo != token {
            warn!(token, "discarding decoded logo superseded by newer state");
            return inner.state.snapshot();
        }
        match decoded {
            Ok(asset) => {
                info!(mime_type = %asset.mime_type, "logo selected");
                inner.state.logo = Some(asset);
            }
            Err(err) => {
                warn!(error = %err, "logo decode failed");
                inner.state.caption_error = Some(LOGO_DECODE_FAILED.to_string());
            }
        }
        self.publish(&inner.state)
    }

    pub async fn clear_logo(&self) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        inner.tokens.logo += 1;
        inner.state.logo = None;
        self.publish(&inner.state)
    }

    pub async fn set_theme(&self, theme: impl Into<String>) -> SessionSnapshot {
        self.update_settings(SettingsUpdate {
            theme: Some(theme.into()),
            ..Default::default()
        })
        .await
    }

    pub async fn set_instructions(&self, instructions: impl Into<String>) -> SessionSnapshot {
        self.update_settings(SettingsUpdate {
            instructions: Some(instructions.into()),
            ..Default::default()
        })
        .await
    }

    pub async fn set_placement(&self, placement: TextPlacement) -> SessionSnapshot {
        self.update_settings(SettingsUpdate {
            placement: Some(placement),
            ..Default::default()
        })
        .await
    }

    pub async fn set_frame(&self, frame: FrameStyle) -> SessionSnapshot {
        self.update_settings(SettingsUpdate {
            frame: Some(frame),
            ..Default::default()
        })
        .await
    }

    pub async fn set_brand_placement(&self, placement: BrandPlacement) -> SessionSnapshot {
        self.update_settings(SettingsUpdate {
            brand_placement: Some(placement),
            ..Default::default()
        })
        .await
    }

    pub async fn set_brand_text(&self, brand_text: impl Into<String>) -> SessionSnapshot {
        self.update_settings(SettingsUpdate {
            brand_text: Some(brand_text.into()),
            ..Default::default()
        })
        .await
    }

    pub async fn update_settings(&self, update: SettingsUpdate) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        let state = &mut inner.state;
        if let Some(theme) = update.theme {
            state.theme = theme;
        }
        if let Some(instructions) = update.instructions {
            state.instructions = instructions;
        }
        if let Some(placement) = update.placement {
            state.placement = placement;
        }
        if let Some(frame) = update.frame {
            state.frame = frame;
        }
        if let Some(brand_placement) = update.brand_placement {
            state.brand_placement = brand_placement;
        }
        if let Some(brand_text) = update.brand_text {
            state.brand_text = brand_text;
        }
        self.publish(&inner.state)
    }

    pub async fn select_caption(&self, caption_id: i64) -> Result<SessionSnapshot, SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.state.caption(caption_id).is_none() {
            return Err(SessionError::UnknownCaption(caption_id));
        }
        inner.state.active_caption = Some(caption_id);
        Ok(self.publish(&inner.state))
    }

    /// Describes the current media, then writes captions for the description.
    /// Failures land in the caption error slot; the composition slots are not
    /// touched.
    pub async fn generate(&self) -> SessionSnapshot {
        let (tokens, media, brief) = {
            let mut inner = self.inner.lock().await;
            let Some(media) = inner.state.media.clone() else {
                inner.state.caption_error = Some(SessionError::NoMediaSelected.to_string());
                return self.publish(&inner.state);
            };
            inner.tokens.captions += 1;
            let state = &mut inner.state;
            state.captions = None;
            state.active_caption = None;
            state.caption_error = None;
            state.caption_stage = CaptionStage::Analyzing;
            let brief = CaptionBrief {
                theme: state.theme.clone(),
                instructions: state.instructions.clone(),
                is_video: media.is_video(),
            };
            self.publish(&inner.state);
            (inner.tokens, media, brief)
        };

        info!(gateway = self.gateway.name(), token = tokens.captions, "generating captions");

        let description = match self.gateway.describe_visual(&media.inline()).await {
            Ok(description) => description,
            Err(err) => return self.finish_captions(tokens, Err(err.into())).await,
        };

        {
            let mut inner = self.inner.lock().await;
            if !Self::captions_current(&inner, tokens) {
                warn!(token = tokens.captions, "discarding stale visual description");
                return inner.state.snapshot();
            }
            inner.state.caption_stage = CaptionStage::Writing;
            self.publish(&inner.state);
        }

        let result = self
            .gateway
            .generate_captions(&description, &brief)
            .await
            .map_err(SessionError::from);
        self.finish_captions(tokens, result).await
    }

    fn captions_current(inner: &Inner, tokens: RequestTokens) -> bool {
        inner.tokens.media_epoch == tokens.media_epoch && inner.tokens.captions == tokens.captions
    }

    async fn finish_captions(
        &self,
        tokens: RequestTokens,
        result: Result<Vec<CaptionOption>, SessionError>,
    ) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        if !Self::captions_current(&inner, tokens) {
            warn!(token = tokens.captions, "discarding stale caption result");
            return inner.state.snapshot();
        }
        let state = &mut inner.state;
        match result {
            Ok(batch) => {
                info!(count = batch.len(), "captions ready");
                state.active_caption = batch.first().map(|caption| caption.id);
                state.captions = Some(batch);
                state.caption_stage = CaptionStage::Ready;
            }
            Err(err) => {
                state.caption_error = Some(err.to_string());
                state.caption_stage = CaptionStage::Failed;
            }
        }
        self.publish(&inner.state)
    }

    /// Composes the given caption onto the current image with the current
    /// layout and branding settings.
    pub async fn create_visual(&self, caption_id: i64) -> Result<SessionSnapshot, SessionError> {
        let (tokens, request) = {
            let mut inner = self.inner.lock().await;
            let image = match inner.state.media.as_ref() {
                Some(media) if !media.is_video() => media.inline(),
                other => {
                    let err = if other.is_some() {
                        SessionError::VideoUnsupportedForComposition
                    } else {
                        SessionError::NoMediaSelected
                    };
                    warn!(error = %err, "composition rejected");
                    inner.state.composite = None;
                    inner.state.composite_error = Some(err.to_string());
                    inner.state.compose_stage = ComposeStage::Failed;
                    return Ok(self.publish(&inner.state));
                }
            };

            let caption = inner
                .state
                .caption(caption_id)
                .cloned()
                .ok_or(SessionError::UnknownCaption(caption_id))?;

            inner.tokens.compose += 1;
            let state = &mut inner.state;
            let request = CompositionRequest {
                image,
                caption: caption.text,
                placement: state.placement,
                frame: state.frame,
                logo: state.logo.as_ref().map(MediaAsset::inline),
                brand_text: Some(state.brand_text.trim().to_string())
                    .filter(|text| !text.is_empty()),
                brand_placement: state.brand_placement,
            };
            state.composite = None;
            state.composite_error = None;
            state.compose_stage = ComposeStage::Composing { caption_id };
            self.publish(&inner.state);
            (inner.tokens, request)
        };

        info!(caption_id, token = tokens.compose, "creating visual");
        let result = self.gateway.compose_visual(&request).await;

        let mut inner = self.inner.lock().await;
        if inner.tokens.media_epoch != tokens.media_epoch || inner.tokens.compose != tokens.compose
        {
            warn!(token = tokens.compose, "discarding stale composition result");
            return Ok(inner.state.snapshot());
        }
        let state = &mut inner.state;
        match result {
            Ok(image) => {
                state.composite = Some(image.data_url());
                state.compose_stage = ComposeStage::Ready;
            }
            Err(err) => {
                state.composite_error = Some(err.to_string());
                state.compose_stage = ComposeStage::Failed;
            }
        }
        Ok(self.publish(&inner.state))
    }
}
