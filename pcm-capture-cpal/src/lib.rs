//! # pcm-capture-cpal
//!
//! cpal backend for pcm-capture.
//!
//! Provides:
//! - `CpalMicCapture`: Microphone capture through the cpal default host
//! - `DeviceEnumerator`: Input device enumeration and lookup by name
//! - `available_devices`: Input device names in host order
//!
//! ## Platform Requirements
//! - Linux: ALSA development headers (`libasound2-dev`)
//! - Windows/macOS: no extra setup
//!
//! ## Usage
//! ```ignore
//! use pcm_capture_core::{AudioSession, RecorderConfig};
//! use pcm_capture_cpal::CpalMicCapture;
//!
//! let session = AudioSession::new(CpalMicCapture::new(), RecorderConfig::new(512))?;
//! session.start()?;
//! let frame = session.read_frame()?;
//! ```

pub mod cpal_mic;
pub mod device_enumerator;
pub mod error;

pub use cpal_mic::CpalMicCapture;
pub use device_enumerator::{available_devices, DeviceEnumerator};
pub use error::CpalError;
