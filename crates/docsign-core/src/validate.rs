//! Validation of captured signature images

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// PNG magic bytes: 89 50 4E 47 0D 0A 1A 0A
pub const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Validate a drawn signature
pub fn validate_drawn_signature(image_data: &[u8]) -> Result<(), &'static str> {
    if image_data.is_empty() {
        return Err("Drawn signature image data must not be empty");
    }
    if image_data.len() < PNG_MAGIC.len() {
        return Err("PNG data too short");
    }
    if !image_data.starts_with(&PNG_MAGIC) {
        return Err("Invalid PNG magic bytes");
    }
    Ok(())
}

/// Decode and validate a `data:image/png;base64,` URL, returning the PNG bytes.
pub fn decode_signature_data_url(url: &str) -> Result<Vec<u8>, &'static str> {
    let payload = url
        .trim()
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .ok_or("Signature must be a PNG data URL")?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| "Signature data URL is not valid base64")?;
    validate_drawn_signature(&bytes)?;
    Ok(bytes)
}

pub fn png_data_url(png: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_roundtrip() {
        let mut png = PNG_MAGIC.to_vec();
        png.extend_from_slice(&[0, 0, 0, 13]);
        let url = png_data_url(&png);
        assert_eq!(decode_signature_data_url(&url).unwrap(), png);
    }

    #[test]
    fn wrong_mime_rejected() {
        assert_eq!(
            decode_signature_data_url("data:image/svg+xml;base64,PHN2Zz4="),
            Err("Signature must be a PNG data URL")
        );
    }
}
