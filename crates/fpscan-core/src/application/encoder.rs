//! Frame encoding: raw grayscale samples → PNG → data URI.
//!
//! Browsers can display a `data:image/png;base64,...` string directly as an
//! `<img>` source, so that is the payload format sent to every subscriber.
//! Encoding is pure: the same samples always produce the same string.
//!
//! # Failure
//!
//! The only expected failure is a sample buffer whose length does not match
//! the stated dimensions.  Buffers are sized from the same configuration the
//! encoder is called with, so this indicates a programming error; the capture
//! loop treats it as fatal to that iteration only.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageError};
use thiserror::Error;

use crate::domain::{FrameBuffer, FrameDimensions};

/// Prefix of every outbound payload.
pub const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Errors produced while encoding a frame.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The sample buffer is not exactly `width * height` bytes.
    #[error("sample buffer holds {actual} bytes but {expected} were expected")]
    BufferSize { expected: usize, actual: usize },

    /// The PNG encoder rejected the image.
    #[error("PNG encoding failed: {0}")]
    Png(#[from] ImageError),
}

/// Encodes `samples` as an 8-bit single-channel PNG.
///
/// # Errors
///
/// [`EncodeError::BufferSize`] if `samples.len() != width * height`, or
/// [`EncodeError::Png`] if the encoder fails.
pub fn encode_png(samples: &[u8], dimensions: FrameDimensions) -> Result<Vec<u8>, EncodeError> {
    let expected = dimensions.sample_count();
    if samples.len() != expected {
        return Err(EncodeError::BufferSize {
            expected,
            actual: samples.len(),
        });
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(
        samples,
        dimensions.width,
        dimensions.height,
        ExtendedColorType::L8,
    )?;
    Ok(png)
}

/// Wraps encoded PNG bytes in a `data:image/png;base64,` URI.
pub fn to_data_uri(png: &[u8]) -> String {
    let mut uri = String::with_capacity(DATA_URI_PREFIX.len() + png.len().div_ceil(3) * 4);
    uri.push_str(DATA_URI_PREFIX);
    STANDARD.encode_string(png, &mut uri);
    uri
}

/// Encodes a captured frame into the outbound payload.
///
/// # Errors
///
/// See [`encode_png`].
pub fn encode_frame(frame: &FrameBuffer) -> Result<String, EncodeError> {
    let png = encode_png(frame.as_slice(), frame.dimensions())?;
    Ok(to_data_uri(&png))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ColorType, ImageFormat};

    fn decode(png: &[u8]) -> image::DynamicImage {
        image::load_from_memory_with_format(png, ImageFormat::Png).expect("valid PNG")
    }

    #[test]
    fn test_all_zero_frame_round_trips_to_zero_grayscale() {
        // Arrange
        let dims = FrameDimensions::new(30, 40);
        let samples = vec![0u8; dims.sample_count()];

        // Act
        let png = encode_png(&samples, dims).expect("encode");
        let decoded = decode(&png);

        // Assert
        assert_eq!(decoded.color(), ColorType::L8);
        assert_eq!((decoded.width(), decoded.height()), (30, 40));
        assert!(decoded.to_luma8().as_raw().iter().all(|&s| s == 0));
    }

    #[test]
    fn test_sample_values_survive_encoding() {
        let dims = FrameDimensions::new(16, 16);
        let samples: Vec<u8> = (0..=255).collect();

        let png = encode_png(&samples, dims).unwrap();

        assert_eq!(decode(&png).to_luma8().into_raw(), samples);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let dims = FrameDimensions::new(8, 4);
        let samples = vec![0x42; dims.sample_count()];

        let a = encode_png(&samples, dims).unwrap();
        let b = encode_png(&samples, dims).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        // Arrange: 3x3 needs 9 bytes
        let dims = FrameDimensions::new(3, 3);

        // Act
        let result = encode_png(&[0u8; 8], dims);

        // Assert
        assert!(matches!(
            result,
            Err(EncodeError::BufferSize {
                expected: 9,
                actual: 8
            })
        ));
    }

    #[test]
    fn test_data_uri_has_png_prefix_and_base64_body() {
        let uri = to_data_uri(&[0x89, b'P', b'N', b'G']);
        assert_eq!(uri, "data:image/png;base64,iVBORw==");
    }

    #[test]
    fn test_encode_frame_produces_decodable_data_uri() {
        // Arrange
        let mut frame = FrameBuffer::new(FrameDimensions::new(5, 7));
        frame.as_mut_slice().fill(200);

        // Act
        let payload = encode_frame(&frame).unwrap();

        // Assert
        let body = payload.strip_prefix(DATA_URI_PREFIX).expect("prefix");
        let png = STANDARD.decode(body).expect("base64");
        let img = decode(&png).to_luma8();
        assert_eq!(img.dimensions(), (5, 7));
        assert!(img.as_raw().iter().all(|&s| s == 200));
    }
}
