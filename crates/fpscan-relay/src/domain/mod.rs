//! Domain layer for fpscan-relay: runtime configuration and its file schema.

pub mod config;

pub use config::{CaptureSection, FileConfig, RelayConfig, RelayConfigError, ServerSection};
