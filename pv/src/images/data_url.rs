//! In-memory decoding of `data:image/<type>;base64,<payload>` URLs

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use super::ImageError;

/// Image formats the edit endpoint accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    fn from_subtype(subtype: &str) -> Option<Self> {
        match subtype.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

/// A decoded image ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    /// Decode a data URL
    pub fn from_data_url(url: &str) -> Result<Self, ImageError> {
        debug!(url_len = url.len(), "DecodedImage::from_data_url: called");
        let rest = url
            .strip_prefix("data:image/")
            .ok_or_else(|| ImageError::InvalidImage("expected a data:image/...;base64 URL".to_string()))?;
        let (subtype, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| ImageError::InvalidImage("expected a base64 payload".to_string()))?;

        if subtype.is_empty() || !subtype.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ImageError::InvalidImage(format!("malformed image type '{}'", subtype)));
        }
        let format = ImageFormat::from_subtype(subtype)
            .ok_or_else(|| ImageError::InvalidImage(format!("unsupported image format: {}", subtype)))?;

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| ImageError::InvalidImage(format!("invalid base64 payload: {}", e)))?;
        if bytes.is_empty() {
            return Err(ImageError::InvalidImage("empty image payload".to_string()));
        }

        Ok(Self { format, bytes })
    }
}

/// Wrap base64 PNG data in a data URL
pub fn png_data_url(b64: &str) -> String {
    format!("data:image/png;base64,{}", b64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_png() {
        let url = format!("data:image/png;base64,{}", STANDARD.encode(b"\x89PNG fake"));
        let img = DecodedImage::from_data_url(&url).unwrap();
        assert_eq!(img.format, ImageFormat::Png);
        assert_eq!(img.bytes, b"\x89PNG fake");
    }

    #[test]
    fn test_decode_jpeg_and_webp() {
        let payload = STANDARD.encode(b"abc");
        let jpeg = DecodedImage::from_data_url(&format!("data:image/jpeg;base64,{payload}")).unwrap();
        assert_eq!(jpeg.format.mime_type(), "image/jpeg");
        let webp = DecodedImage::from_data_url(&format!("data:image/webp;base64,{payload}")).unwrap();
        assert_eq!(webp.format.extension(), "webp");
    }

    #[test]
    fn test_rejects_unsupported_and_malformed() {
        let payload = STANDARD.encode(b"abc");
        for bad in [
            format!("data:image/gif;base64,{payload}"),
            format!("data:text/plain;base64,{payload}"),
            "https://example.com/cat.png".to_string(),
            "data:image/png;base64,!!!not-base64!!!".to_string(),
            "data:image/png;base64,".to_string(),
            format!("data:image/svg+xml;base64,{payload}"),
        ] {
            let err = DecodedImage::from_data_url(&bad).unwrap_err();
            assert!(matches!(err, ImageError::InvalidImage(_)), "{bad}: {err:?}");
        }
    }

    #[test]
    fn test_png_data_url() {
        assert_eq!(png_data_url("QUJD"), "data:image/png;base64,QUJD");
    }
}
