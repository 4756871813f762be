use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, locally unique handle for an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(String);

impl ImageId {
    pub fn random() -> Self {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        Self(raw[..9].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImageId {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A decoded user-selected file, immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub id: ImageId,
    pub display_url: String,
    /// Base64 of the raw file bytes.
    pub data: String,
    pub mime_type: String,
    pub file_name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl UploadedImage {
    pub fn dimensions_label(&self) -> String {
        match (self.width, self.height) {
            (Some(width), Some(height)) => format!("{width}x{height}"),
            _ => "unknown size".to_string(),
        }
    }
}

pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Image returned by the model, held as a PNG data URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub data_url: String,
}

impl GeneratedImage {
    pub fn from_base64_png(data: &str) -> Self {
        Self {
            data_url: format!("{PNG_DATA_URL_PREFIX}{data}"),
        }
    }

    /// Base64 payload with the data-URL prefix stripped.
    pub fn base64_payload(&self) -> &str {
        self.data_url
            .strip_prefix(PNG_DATA_URL_PREFIX)
            .unwrap_or(self.data_url.as_str())
    }
}
