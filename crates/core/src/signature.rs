//! Decoding of raster images exported as `data:` URLs.
//!
//! The signature pad and the diagram canvas both hand over images as
//! `data:image/<kind>;base64,<payload>`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CoreError;

/// Image media types accepted in data URLs.
pub const ACCEPTED_MEDIA_TYPES: &[&str] = &["image/png", "image/jpeg", "image/jpg", "image/gif"];

/// A decoded data-URL image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrlImage {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Returns `true` if `value` starts with an accepted image data-URL prefix.
pub fn has_image_data_url_prefix(value: &str) -> bool {
    split_header(value).is_some_and(|(media_type, _)| {
        ACCEPTED_MEDIA_TYPES.contains(&media_type.to_ascii_lowercase().as_str())
    })
}

fn split_header(value: &str) -> Option<(&str, &str)> {
    let rest = value.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let media_type = header.strip_suffix(";base64")?;
    Some((media_type, payload))
}

/// Decode an image data URL.
///
/// Returns `Ok(None)` for an empty string (no image supplied).
pub fn decode_data_url(value: &str) -> Result<Option<DataUrlImage>, CoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    let (media_type, payload) = split_header(value).ok_or_else(|| {
        CoreError::Validation("image must be a base64 data URL (data:image/...;base64,...)".into())
    })?;

    let media_type = media_type.to_ascii_lowercase();
    if !ACCEPTED_MEDIA_TYPES.contains(&media_type.as_str()) {
        return Err(CoreError::Validation(format!(
            "Unsupported image type '{media_type}'. Must be one of: {}",
            ACCEPTED_MEDIA_TYPES.join(", ")
        )));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| CoreError::Validation(format!("Invalid base64 image payload: {e}")))?;
    if bytes.is_empty() {
        return Ok(None);
    }

    Ok(Some(DataUrlImage { media_type, bytes }))
}

/// Encode bytes as a data URL of the given media type.
pub fn encode_data_url(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{media_type};base64,{}", STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_png_data_url() {
        let url = encode_data_url("image/png", b"\x89PNG");
        let img = decode_data_url(&url).unwrap().unwrap();
        assert_eq!(img.media_type, "image/png");
        assert_eq!(img.bytes, b"\x89PNG");
    }

    #[test]
    fn empty_input_means_no_image() {
        assert_eq!(decode_data_url("").unwrap(), None);
        assert_eq!(decode_data_url("data:image/png;base64,").unwrap(), None);
    }

    #[test]
    fn rejects_non_data_urls_and_unsupported_types() {
        assert!(decode_data_url("https://example.com/sig.png").is_err());
        assert!(decode_data_url("data:image/svg+xml;base64,PHN2Zz4=").is_err());
        assert!(decode_data_url("data:image/png,raw").is_err());
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(decode_data_url("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn prefix_check_is_case_insensitive_on_media_type() {
        assert!(has_image_data_url_prefix("data:image/JPEG;base64,AAAA"));
        assert!(has_image_data_url_prefix("data:image/jpg;base64,AAAA"));
        assert!(!has_image_data_url_prefix("data:text/plain;base64,AAAA"));
        assert!(!has_image_data_url_prefix("image/png;base64,AAAA"));
    }
}
