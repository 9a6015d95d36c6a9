use thiserror::Error;

/// Failure turning an uploaded file into a [`crate::media::MediaAsset`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("file is empty")]
    Empty,
    #[error("unsupported media type {0:?}; expected image/* or video/*")]
    UnsupportedType(String),
    #[error("could not determine media type")]
    UnknownType,
    #[error("failed to encode media")]
    Encode(#[source] tokio::task::JoinError),
}

/// Failure of one of the three AI gateway operations.
///
/// Transport failures and malformed responses surface as the same variant:
/// the caller only needs to know which step failed and what to tell the user.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Failed to analyze the visual: {0}")]
    Analysis(String),
    #[error("Failed to generate captions: {0}")]
    Generation(String),
    #[error("Failed to create the visual: {0}")]
    Composition(String),
}

impl GatewayError {
    pub fn detail(&self) -> &str {
        match self {
            Self::Analysis(detail) | Self::Generation(detail) | Self::Composition(detail) => detail,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Please upload an image or video first.")]
    NoMediaSelected,
    #[error("Creating a visual is only available for images.")]
    VideoUnsupportedForComposition,
    #[error("caption {0} is not part of the current batch")]
    UnknownCaption(i64),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY (or GOOGLE_API_KEY) must be set")]
    MissingApiKey,
    #[error("invalid BIND_ADDR {value:?}: {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("invalid MAX_UPLOAD_BYTES {0:?}")]
    InvalidUploadLimit(String),
}
