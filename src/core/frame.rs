use crate::common::{FaceGateError, Result};
use base64::{engine::general_purpose, Engine as _};
use image::DynamicImage;

/// Decodes a submitted frame. Accepts encoded image bytes (JPEG, PNG, ...)
/// or a browser `data:<mime>;base64,<payload>` URL.
pub fn decode_image(payload: &[u8]) -> Result<DynamicImage> {
    if payload.is_empty() {
        return Err(FaceGateError::Extraction("empty image payload".into()));
    }

    if payload.starts_with(b"data:") {
        let comma = payload
            .iter()
            .position(|&b| b == b',')
            .ok_or_else(|| FaceGateError::Extraction("data URL without payload".into()))?;
        let encoded: Vec<u8> = payload[comma + 1..]
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        let bytes = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| FaceGateError::Extraction(format!("invalid base64 image: {}", e)))?;
        return Ok(image::load_from_memory(&bytes)?);
    }

    Ok(image::load_from_memory(payload)?)
}
