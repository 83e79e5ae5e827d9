//! Capture configuration.
//!
//! [`CaptureConfig`] holds every setting the capture thread needs: which
//! scanner to open, the frame geometry the scanner produces, and how often to
//! poll it.  It is built once at startup (from defaults, a config file, or CLI
//! flags) and validated with [`CaptureConfig::validate`] before the device is
//! touched.
//!
//! Keeping configuration as a plain struct (no globals, no environment reads)
//! lets tests construct any geometry they need directly.

use std::time::Duration;

use thiserror::Error;

/// Default scanner index.  The pipeline only ever drives a single device.
pub const DEFAULT_DEVICE_INDEX: u32 = 0;
/// Default frame width in samples (ZK9500-class sensors).
pub const DEFAULT_WIDTH: u32 = 300;
/// Default frame height in samples.
pub const DEFAULT_HEIGHT: u32 = 400;
/// Default delay between two acquire calls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Default capacity of the template output buffer, in bytes.
pub const DEFAULT_TEMPLATE_CAPACITY: usize = 2048;

/// Reasons a [`CaptureConfig`] is rejected at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Width or height is zero.
    #[error("frame dimensions must be non-zero (got {width}x{height})")]
    ZeroDimension { width: u32, height: u32 },

    /// `width * height` does not fit in memory addressing.
    #[error("frame dimensions {width}x{height} overflow the sample buffer size")]
    DimensionOverflow { width: u32, height: u32 },

    /// A zero poll interval would spin the capture thread.
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,

    /// The template buffer must be able to hold at least one byte.
    #[error("template capacity must be greater than zero")]
    ZeroTemplateCapacity,
}

/// All settings for the capture thread.
///
/// # Example
///
/// ```rust
/// use fpscan_core::domain::CaptureConfig;
///
/// let cfg = CaptureConfig::default();
/// assert_eq!((cfg.width, cfg.height), (300, 400));
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Index passed to the SDK's open call.
    pub device_index: u32,
    /// Frame width in samples.
    pub width: u32,
    /// Frame height in samples.
    pub height: u32,
    /// Fixed delay after every acquire attempt, successful or not.
    ///
    /// This bounds both the scanner polling rate and the client update rate.
    pub poll_interval: Duration,
    /// Capacity of the auxiliary template buffer handed to the SDK.
    pub template_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_index: DEFAULT_DEVICE_INDEX,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            template_capacity: DEFAULT_TEMPLATE_CAPACITY,
        }
    }
}

impl CaptureConfig {
    /// Checks that the configuration can drive a capture loop.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroDimension {
                width: self.width,
                height: self.height,
            });
        }
        self.sample_count()?;
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.template_capacity == 0 {
            return Err(ConfigError::ZeroTemplateCapacity);
        }
        Ok(())
    }

    /// Number of bytes in one frame (`width * height`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DimensionOverflow`] when the product does not
    /// fit in `usize`.
    pub fn sample_count(&self) -> Result<usize, ConfigError> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .ok_or(ConfigError::DimensionOverflow {
                width: self.width,
                height: self.height,
            })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_scanner_geometry() {
        let cfg = CaptureConfig::default();
        assert_eq!(cfg.device_index, 0);
        assert_eq!(cfg.width, 300);
        assert_eq!(cfg.height, 400);
        assert_eq!(cfg.poll_interval, Duration::from_millis(100));
        assert_eq!(cfg.template_capacity, 2048);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(CaptureConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_sample_count_is_width_times_height() {
        let cfg = CaptureConfig::default();
        assert_eq!(cfg.sample_count(), Ok(120_000));
    }

    #[test]
    fn test_zero_width_is_rejected() {
        // Arrange
        let cfg = CaptureConfig {
            width: 0,
            ..CaptureConfig::default()
        };

        // Act
        let result = cfg.validate();

        // Assert
        assert_eq!(
            result,
            Err(ConfigError::ZeroDimension {
                width: 0,
                height: 400
            })
        );
    }

    #[test]
    fn test_zero_height_is_rejected() {
        let cfg = CaptureConfig {
            height: 0,
            ..CaptureConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroDimension { .. })
        ));
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let cfg = CaptureConfig {
            poll_interval: Duration::ZERO,
            ..CaptureConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroPollInterval));
    }

    #[test]
    fn test_zero_template_capacity_is_rejected() {
        let cfg = CaptureConfig {
            template_capacity: 0,
            ..CaptureConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroTemplateCapacity));
    }

    #[test]
    fn test_error_message_names_dimensions() {
        let err = ConfigError::ZeroDimension {
            width: 0,
            height: 7,
        };
        assert_eq!(err.to_string(), "frame dimensions must be non-zero (got 0x7)");
    }
}
