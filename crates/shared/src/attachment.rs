//! Attachment codec.
//!
//! An attachment carries the same bytes twice: once base64-encoded for
//! transport (`data`) and once as a directly renderable data URI (`url`).
//! Both are produced together so they cannot drift apart.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Media class, decided by MIME prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Video,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::Video => "video",
        }
    }
}

/// A user- or model-provided media payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    /// Data URI rendering the same bytes as `data`.
    pub url: String,
    pub mime_type: String,
    /// Base64 payload for the backend request.
    pub data: String,
}

impl Attachment {
    /// Encode a raw file, classifying `video/*` as video and anything else
    /// as image. The explicit single-file picker accepts any MIME type.
    pub fn from_file(mime_type: &str, bytes: &[u8]) -> Self {
        let kind = if mime_type.starts_with("video/") {
            AttachmentKind::Video
        } else {
            AttachmentKind::Image
        };
        let data = STANDARD.encode(bytes);
        Self {
            kind,
            url: format!("data:{};base64,{}", mime_type, data),
            mime_type: mime_type.to_string(),
            data,
        }
    }

    /// Multi-file drop path: only image and video files are taken, anything
    /// else is ignored.
    pub fn from_dropped_file(mime_type: &str, bytes: &[u8]) -> Option<Self> {
        if mime_type.starts_with("image/") || mime_type.starts_with("video/") {
            Some(Self::from_file(mime_type, bytes))
        } else {
            None
        }
    }

    /// Wrap an image payload returned by the synthesis endpoint.
    pub fn from_generated_image(raw_base64: &str) -> Self {
        Self {
            kind: AttachmentKind::Image,
            url: format!("data:image/png;base64,{}", raw_base64),
            mime_type: "image/png".to_string(),
            data: raw_base64.to_string(),
        }
    }

    /// The raw bytes, decoded from the transport representation.
    pub fn decode_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }
}
