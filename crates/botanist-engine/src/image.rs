use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::error::{GatewayError, Result};

pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Inline image payload: raw base64 data plus its MIME type.
///
/// `data` never carries a `data:` URL prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Accept either a `data:<mime>;base64,<payload>` URL or bare base64.
    ///
    /// The prefix is stripped and its MIME type kept; bare payloads pass
    /// through unchanged with the default MIME type.
    pub fn from_data_url(raw: &str) -> Self {
        let (mime_type, data) = strip_data_url_prefix(raw.trim());
        Self::new(mime_type.unwrap_or(DEFAULT_IMAGE_MIME), data)
    }

    pub fn from_bytes(bytes: &[u8], mime_hint: Option<&str>) -> Self {
        let mime_type = sniff_mime(bytes)
            .or(mime_hint)
            .unwrap_or(DEFAULT_IMAGE_MIME);
        Self::new(mime_type, BASE64.encode(bytes))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .map_err(|err| GatewayError::Image(format!("failed reading {}: {err}", path.display())))?;
        if bytes.is_empty() {
            return Err(GatewayError::Image(format!("{} is empty", path.display())));
        }
        Ok(Self::from_bytes(&bytes, mime_for_path(path)))
    }

    /// Interpret a CLI argument: `data:` URLs are taken inline, anything
    /// else is treated as a file path.
    pub fn from_source(source: &str) -> Result<Self> {
        if source.trim_start().starts_with("data:") {
            return Ok(Self::from_data_url(source));
        }
        Self::from_path(Path::new(source))
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.data.as_bytes())
            .map_err(|err| GatewayError::Image(format!("invalid base64 image payload: {err}")))
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Hex SHA-256 of the decoded bytes, or of the raw text when it does
    /// not decode.
    pub fn digest(&self) -> String {
        let bytes = self
            .decode()
            .unwrap_or_else(|_| self.data.as_bytes().to_vec());
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    pub fn extension(&self) -> &'static str {
        let lowered = self.mime_type.to_ascii_lowercase();
        if lowered.contains("png") {
            return "png";
        }
        if lowered.contains("webp") {
            return "webp";
        }
        if lowered.contains("gif") {
            return "gif";
        }
        "jpg"
    }
}

fn strip_data_url_prefix(raw: &str) -> (Option<&str>, &str) {
    let Some(rest) = raw.strip_prefix("data:") else {
        return (None, raw);
    };
    let Some((header, payload)) = rest.split_once(',') else {
        return (None, raw);
    };
    let Some(mime) = header.strip_suffix(";base64") else {
        return (None, raw);
    };
    let mime = mime.trim();
    (if mime.is_empty() { None } else { Some(mime) }, payload)
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        image::ImageFormat::Png => Some("image/png"),
        image::ImageFormat::Jpeg => Some("image/jpeg"),
        image::ImageFormat::WebP => Some("image/webp"),
        image::ImageFormat::Gif => Some("image/gif"),
        image::ImageFormat::Bmp => Some("image/bmp"),
        image::ImageFormat::Tiff => Some("image/tiff"),
        _ => None,
    }
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}
