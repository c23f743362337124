//! # pcm-capture-core
//!
//! Platform-agnostic microphone capture core library.
//!
//! Provides ring buffering, fixed-size frame reads, sample conversion and the
//! status taxonomy. Platform backends implement the `CaptureProvider` trait
//! and plug into the generic `AudioSession`.
//!
//! ## Architecture
//!
//! ```text
//! pcm-capture-core (this crate)
//! ├── traits/       ← CaptureProvider, SampleCallback
//! ├── models/       ← CaptureError, CaptureStatus, CaptureState, RecorderConfig, AudioSource
//! ├── processing/   ← RingBuffer, PcmConverter, SilenceDetector
//! └── session/      ← AudioSession (generic recorder)
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{
    AudioSource, DeviceSelector, SessionDiagnostics, BITS_PER_SAMPLE, CHANNELS,
    DEFAULT_DEVICE_INDEX, SAMPLE_RATE,
};
pub use models::config::{BufferSizing, RecorderConfig, RetryPolicy};
pub use models::error::{
    buffer_status_to_string, capture_status_to_string, BufferError, BufferStatus, CaptureError,
    CaptureStatus,
};
pub use models::state::CaptureState;
pub use processing::convert::PcmConverter;
pub use processing::ring_buffer::{ReadOutcome, RingBuffer, WriteOutcome};
pub use processing::silence::SilenceDetector;
pub use session::recorder::AudioSession;
pub use traits::capture_provider::{CaptureProvider, SampleCallback};

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    #[test]
    fn version_matches_manifest() {
        assert_eq!(super::version(), env!("CARGO_PKG_VERSION"));
        assert!(!super::version().is_empty());
    }
}
