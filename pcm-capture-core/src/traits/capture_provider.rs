use std::sync::Arc;

use crate::models::audio_models::{AudioSource, DeviceSelector};
use crate::models::error::CaptureError;

/// Callback invoked when captured samples are available.
///
/// Samples are 16-bit signed mono PCM at 16 kHz. The callback runs on the
/// backend's audio thread and must return quickly.
pub type SampleCallback = Arc<dyn Fn(&[i16]) + Send + Sync + 'static>;

/// Interface for platform-specific audio capture backends.
///
/// Implemented by:
/// - `CpalMicCapture` (pcm-capture-cpal)
///
/// A provider manages at most one open stream. Opening binds a device and
/// a callback; start and stop only toggle delivery.
pub trait CaptureProvider: Send {
    /// Names of the available input devices, in backend enumeration order.
    fn input_devices(&self) -> Result<Vec<String>, CaptureError>;

    /// Open a capture stream on `device` delivering into `callback`.
    ///
    /// Fails with `DeviceAlreadyInitialized` if a stream is already open.
    fn open(
        &mut self,
        device: &DeviceSelector,
        callback: SampleCallback,
    ) -> Result<AudioSource, CaptureError>;

    /// Whether a stream is currently open.
    fn is_open(&self) -> bool;

    /// Begin delivering samples. Fails with `DeviceNotInitialized` if no
    /// stream is open.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Pause delivery. The stream stays open.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Whether the stream is open, started, and has not failed.
    fn is_active(&self) -> bool;

    /// Release the stream. A no-op when nothing is open.
    fn close(&mut self);
}
