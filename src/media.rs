//! Turns uploaded files into base64 payloads the gateway can forward.

use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;
use serde::Serialize;
use tracing::debug;

use crate::error::DecodeError;
use crate::gateway::InlineMedia;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// An uploaded image or video. Built once by [`decode`], never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub base64: String,
    /// `data:` URL suitable for an `<img>`/`<video>` source.
    pub preview_url: String,
    pub mime_type: String,
    pub kind: MediaKind,
    pub file_name: Option<String>,
}

impl MediaAsset {
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub fn inline(&self) -> InlineMedia {
        InlineMedia {
            base64: self.base64.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// A file as handed over by the caller: either bytes already received
/// (multipart upload) or a path to read.
#[derive(Debug, Clone)]
pub enum MediaSource {
    Bytes {
        data: Vec<u8>,
        mime_type: Option<String>,
        file_name: Option<String>,
    },
    Path(std::path::PathBuf),
}

pub async fn decode(source: MediaSource) -> Result<MediaAsset, DecodeError> {
    match source {
        MediaSource::Bytes {
            data,
            mime_type,
            file_name,
        } => from_bytes(data, mime_type, file_name).await,
        MediaSource::Path(path) => {
            let data = tokio::fs::read(&path)
                .await
                .map_err(|source| DecodeError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned());
            let mime_type = mime_from_extension(&path).map(str::to_string);
            from_bytes(data, mime_type, file_name).await
        }
    }
}

async fn from_bytes(
    data: Vec<u8>,
    declared: Option<String>,
    file_name: Option<String>,
) -> Result<MediaAsset, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mime_type = match declared
        .map(|mime| mime.trim().to_ascii_lowercase())
        .filter(|mime| !mime.is_empty() && mime != "application/octet-stream")
    {
        Some(mime) => mime,
        None => sniff_image_mime(&data)
            .map(str::to_string)
            .ok_or(DecodeError::UnknownType)?,
    };

    let kind = if mime_type.starts_with("image/") {
        MediaKind::Image
    } else if mime_type.starts_with("video/") {
        MediaKind::Video
    } else {
        return Err(DecodeError::UnsupportedType(mime_type));
    };

    let byte_len = data.len();
    // Videos can be large; keep the encode off the async workers.
    let base64 = tokio::task::spawn_blocking(move || general_purpose::STANDARD.encode(&data))
        .await
        .map_err(DecodeError::Encode)?;

    debug!(mime_type = %mime_type, bytes = byte_len, "decoded media");

    Ok(MediaAsset {
        preview_url: format!("data:{mime_type};base64,{base64}"),
        base64,
        mime_type,
        kind,
        file_name,
    })
}

fn sniff_image_mime(data: &[u8]) -> Option<&'static str> {
    let format = image::guess_format(data).ok()?;
    Some(match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Avif => "image/avif",
        _ => return None,
    })
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn bytes(data: &[u8], mime: Option<&str>) -> MediaSource {
        MediaSource::Bytes {
            data: data.to_vec(),
            mime_type: mime.map(str::to_string),
            file_name: Some("upload".to_string()),
        }
    }

    #[tokio::test]
    async fn jpeg_upload_produces_payload_preview_and_mime() {
        let asset = decode(bytes(b"\xFF\xD8\xFF\xE0jpeg", Some("image/jpeg")))
            .await
            .unwrap();
        assert_eq!(asset.mime_type, "image/jpeg");
        assert_eq!(asset.kind, MediaKind::Image);
        assert_eq!(asset.base64, general_purpose::STANDARD.encode(b"\xFF\xD8\xFF\xE0jpeg"));
        assert_eq!(
            asset.preview_url,
            format!("data:image/jpeg;base64,{}", asset.base64)
        );
    }

    #[tokio::test]
    async fn video_is_classified_as_video() {
        let asset = decode(bytes(b"\x00\x00\x00\x18ftypmp42", Some("video/mp4")))
            .await
            .unwrap();
        assert!(asset.is_video());
    }

    #[tokio::test]
    async fn missing_mime_is_sniffed_from_content() {
        let asset = decode(bytes(PNG_MAGIC, None)).await.unwrap();
        assert_eq!(asset.mime_type, "image/png");

        let err = decode(bytes(b"plain text", Some("application/octet-stream")))
            .await
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnknownType));
    }

    #[tokio::test]
    async fn rejects_empty_and_non_media_files() {
        assert!(matches!(
            decode(bytes(b"", Some("image/png"))).await.unwrap_err(),
            DecodeError::Empty
        ));
        assert!(matches!(
            decode(bytes(b"%PDF-1.7", Some("application/pdf"))).await.unwrap_err(),
            DecodeError::UnsupportedType(_)
        ));
    }

    #[tokio::test]
    async fn unreadable_path_is_a_read_error() {
        let err = decode(MediaSource::Path("/definitely/not/here.jpg".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, DecodeError::Read { .. }));
    }

    #[test]
    fn extension_table_covers_common_uploads() {
        assert_eq!(mime_from_extension(Path::new("a.JPG")), Some("image/jpeg"));
        assert_eq!(mime_from_extension(Path::new("clip.mov")), Some("video/quicktime"));
        assert_eq!(mime_from_extension(Path::new("notes.txt")), None);
    }
}
