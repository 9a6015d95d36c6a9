//! HTTP surface for the browser page: uploads, settings and the two pipelines.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, patch, post},
    Router,
};
use serde_json::json;
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::error::SessionError;
use crate::media::MediaSource;
use crate::session::{Session, SessionSnapshot, SettingsUpdate};

#[derive(Clone)]
struct AppState {
    session: Arc<Session>,
}

pub fn router(session: Arc<Session>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/events", get(session_events))
        .route("/api/media", post(upload_media).delete(clear_media))
        .route("/api/logo", post(upload_logo).delete(clear_logo))
        .route("/api/settings", patch(update_settings))
        .route("/api/generate", post(generate))
        .route("/api/captions/:id/select", post(select_caption))
        .route("/api/captions/:id/visual", post(create_visual))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(AppState { session })
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Session(SessionError),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Session(err @ SessionError::UnknownCaption(_)) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            Self::Session(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        };
        warn!(%status, %message, "request rejected");
        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot().await)
}

async fn session_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(state.session.subscribe()).map(|snapshot| {
        Ok(Event::default()
            .event("snapshot")
            .json_data(&snapshot)
            .unwrap_or_else(|err| Event::default().event("error").data(err.to_string())))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn read_upload(mut multipart: Multipart) -> Result<MediaSource, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))?
    {
        if field.file_name().is_none() && field.content_type().is_none() {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let mime_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|err| ApiError::BadRequest(err.to_string()))?;
        return Ok(MediaSource::Bytes {
            data: data.to_vec(),
            mime_type,
            file_name,
        });
    }
    Err(ApiError::BadRequest("upload contains no file".to_string()))
}

async fn upload_media(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let source = read_upload(multipart?).await?;
    Ok(Json(state.session.select_media(source).await))
}

async fn clear_media(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.clear_media().await)
}

async fn upload_logo(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let source = read_upload(multipart?).await?;
    Ok(Json(state.session.select_logo(source).await))
}

async fn clear_logo(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.clear_logo().await)
}

async fn update_settings(
    State(state): State<AppState>,
    update: Result<Json<SettingsUpdate>, JsonRejection>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let Json(update) = update?;
    Ok(Json(state.session.update_settings(update).await))
}

async fn generate(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.generate().await)
}

async fn select_caption(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.session.select_caption(id).await?))
}

async fn create_visual(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.session.create_visual(id).await?))
}
