//! Frame and template buffers owned by the capture thread.
//!
//! Both buffers are allocated once when the capture loop starts and are
//! overwritten in place by every acquire call.  They never leave the capture
//! thread, so no locking is involved: acquisition writes, then encoding reads,
//! strictly in sequence.

use crate::domain::config::{CaptureConfig, ConfigError};

/// Width and height of a scanner frame, in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

impl FrameDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of one-byte samples in a frame of this size.
    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// A single-channel 8-bit sample buffer of exactly `width * height` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    dimensions: FrameDimensions,
    samples: Vec<u8>,
}

impl FrameBuffer {
    /// Allocates a zero-filled buffer for frames of `dimensions`.
    pub fn new(dimensions: FrameDimensions) -> Self {
        Self {
            dimensions,
            samples: vec![0; dimensions.sample_count()],
        }
    }

    /// Allocates a frame buffer sized for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn for_config(config: &CaptureConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(FrameDimensions::new(config.width, config.height)))
    }

    pub fn dimensions(&self) -> FrameDimensions {
        self.dimensions
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.samples
    }

    /// Mutable view handed to the SDK's acquire call.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Fixed-capacity buffer receiving the SDK's template output.
///
/// The SDK reports how many bytes it actually wrote; [`TemplateBuffer::len`]
/// tracks that so callers can read back only the valid prefix.  The broadcast
/// path does not use templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateBuffer {
    bytes: Vec<u8>,
    len: usize,
}

impl TemplateBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Number of valid bytes written by the last successful acquire.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The valid prefix of the buffer.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Full-capacity storage for the SDK to write into.
    pub fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Records the length reported by the SDK, clamped to capacity.
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(self.bytes.len());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_buffer_has_width_times_height_samples() {
        let frame = FrameBuffer::new(FrameDimensions::new(4, 3));
        assert_eq!(frame.len(), 12);
        assert!(frame.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_frame_buffer_for_config_uses_configured_geometry() {
        let frame = FrameBuffer::for_config(&CaptureConfig::default()).unwrap();
        assert_eq!(frame.dimensions(), FrameDimensions::new(300, 400));
        assert_eq!(frame.len(), 120_000);
    }

    #[test]
    fn test_frame_buffer_for_invalid_config_fails() {
        let cfg = CaptureConfig {
            width: 0,
            ..CaptureConfig::default()
        };
        assert!(FrameBuffer::for_config(&cfg).is_err());
    }

    #[test]
    fn test_frame_buffer_is_overwritten_in_place() {
        // Arrange
        let mut frame = FrameBuffer::new(FrameDimensions::new(2, 2));
        let before = frame.as_slice().as_ptr();

        // Act
        frame.as_mut_slice().fill(0xAB);

        // Assert: same allocation, new contents
        assert_eq!(frame.as_slice().as_ptr(), before);
        assert_eq!(frame.as_slice(), &[0xAB; 4]);
    }

    #[test]
    fn test_template_len_is_clamped_to_capacity() {
        let mut template = TemplateBuffer::with_capacity(8);
        template.set_len(100);
        assert_eq!(template.len(), 8);
    }

    #[test]
    fn test_template_as_slice_returns_valid_prefix() {
        let mut template = TemplateBuffer::with_capacity(8);
        template.storage_mut()[..3].copy_from_slice(&[1, 2, 3]);
        template.set_len(3);
        assert_eq!(template.as_slice(), &[1, 2, 3]);
        assert_eq!(template.capacity(), 8);
    }
}
