// libs/check-in-cell/src/services/signature.rs
use base64::{engine::general_purpose, Engine as _};

use crate::models::CheckInError;

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
const DATA_URL_PREFIX: &str = "data:image/png;base64,";
pub const MAX_SIGNATURE_BYTES: usize = 2 * 1024 * 1024;

/// Validates a drawn signature and returns it as plain base64 for storage.
pub fn normalize_signature(input: &str) -> Result<String, CheckInError> {
    let trimmed = input.trim();
    let encoded = trimmed.strip_prefix(DATA_URL_PREFIX).unwrap_or(trimmed);

    if encoded.is_empty() {
        return Err(CheckInError::InvalidSignature("image is empty".to_string()));
    }
    if encoded.starts_with("data:") {
        return Err(CheckInError::InvalidSignature("only PNG images are accepted".to_string()));
    }

    let bytes = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| CheckInError::InvalidSignature(format!("not base64 ({})", e)))?;

    if bytes.len() > MAX_SIGNATURE_BYTES {
        return Err(CheckInError::InvalidSignature("image is too large".to_string()));
    }
    if !bytes.starts_with(&PNG_MAGIC) {
        return Err(CheckInError::InvalidSignature("not a PNG image".to_string()));
    }

    Ok(encoded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn png_base64() -> String {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.extend_from_slice(b"\0\0\0\rIHDR");
        general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_plain_base64_png_is_accepted() {
        let encoded = png_base64();
        assert_eq!(normalize_signature(&encoded).unwrap(), encoded);
    }

    #[test]
    fn test_data_url_prefix_is_stripped() {
        let encoded = png_base64();
        let url = format!("{}{}", DATA_URL_PREFIX, encoded);
        assert_eq!(normalize_signature(&url).unwrap(), encoded);
    }

    #[test]
    fn test_other_images_are_rejected() {
        let jpeg = general_purpose::STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0]);
        assert_matches!(normalize_signature(&jpeg), Err(CheckInError::InvalidSignature(_)));

        let jpeg_url = format!("data:image/jpeg;base64,{}", jpeg);
        assert_matches!(normalize_signature(&jpeg_url), Err(CheckInError::InvalidSignature(_)));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_matches!(normalize_signature("   "), Err(CheckInError::InvalidSignature(_)));
        assert_matches!(normalize_signature("not base64!!"), Err(CheckInError::InvalidSignature(_)));
    }
}
