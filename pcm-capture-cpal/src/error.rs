use thiserror::Error;

use pcm_capture_core::models::error::CaptureError;

/// Failures reported by the cpal host while enumerating or streaming.
#[derive(Debug, Error)]
pub enum CpalError {
    #[error("no input device available")]
    NoInputDevice,

    #[error("input device not found: {0}")]
    DeviceNotFound(String),

    #[error("unsupported sample format: {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query device configuration: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to query supported configurations: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start input stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("failed to pause input stream: {0}")]
    Pause(#[from] cpal::PauseStreamError),
}

impl From<CpalError> for CaptureError {
    fn from(err: CpalError) -> Self {
        use cpal::{BuildStreamError, SupportedStreamConfigsError};

        let message = err.to_string();
        match err {
            CpalError::BuildStream(BuildStreamError::InvalidArgument)
            | CpalError::SupportedConfigs(SupportedStreamConfigsError::InvalidArgument) => {
                CaptureError::InvalidArgument(message)
            }
            CpalError::NoInputDevice
            | CpalError::DeviceNotFound(_)
            | CpalError::UnsupportedFormat(_)
            | CpalError::Devices(_)
            | CpalError::DefaultConfig(_)
            | CpalError::SupportedConfigs(_)
            | CpalError::BuildStream(_) => CaptureError::Backend(message),
            CpalError::Play(_) | CpalError::Pause(_) => CaptureError::Runtime(message),
        }
    }
}
