//! Input device enumeration via the cpal default host.
//!
//! Device identity is the name the host reports. Devices whose name cannot be
//! read get a positional placeholder so indices stay aligned with the host's
//! enumeration order.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

use pcm_capture_core::models::audio_models::{AudioSource, DeviceSelector};
use pcm_capture_core::models::error::CaptureError;

use crate::error::CpalError;

/// Audio device enumerator over a cpal host.
pub struct DeviceEnumerator {
    host: Host,
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEnumerator {
    /// Enumerator over the platform's default host.
    pub fn new() -> Self {
        Self::with_host(cpal::default_host())
    }

    pub fn with_host(host: Host) -> Self {
        Self { host }
    }

    /// Active capture devices in host order, with the default flagged.
    pub fn list_capture_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        let names = self.capture_device_names()?;
        let default_name = self.default_capture_device_name();
        Ok(mark_default(names, default_name.as_deref()))
    }

    /// Names of the capture devices in host order.
    pub fn capture_device_names(&self) -> Result<Vec<String>, CaptureError> {
        let devices = self.host.input_devices().map_err(CpalError::from)?;
        Ok(devices
            .enumerate()
            .map(|(index, device)| device_name(index, &device))
            .collect())
    }

    /// Name of the system default capture device, if there is one.
    pub fn default_capture_device_name(&self) -> Option<String> {
        self.host.default_input_device().and_then(|d| d.name().ok())
    }

    /// Resolve `selector` to an openable device.
    ///
    /// Named lookups take the first device with a matching name.
    pub fn find_capture_device(
        &self,
        selector: &DeviceSelector,
    ) -> Result<(Device, AudioSource), CpalError> {
        match selector {
            DeviceSelector::Default => {
                let device = self
                    .host
                    .default_input_device()
                    .ok_or(CpalError::NoInputDevice)?;
                let name = device
                    .name()
                    .unwrap_or_else(|_| "Default Input Device".to_string());
                Ok((
                    device,
                    AudioSource {
                        name,
                        is_default: true,
                    },
                ))
            }
            DeviceSelector::Named(wanted) => {
                let default_name = self.default_capture_device_name();
                self.host
                    .input_devices()?
                    .enumerate()
                    .find(|(index, device)| device_name(*index, device) == *wanted)
                    .map(|(_, device)| {
                        let source = AudioSource {
                            is_default: default_name.as_deref() == Some(wanted.as_str()),
                            name: wanted.clone(),
                        };
                        (device, source)
                    })
                    .ok_or_else(|| CpalError::DeviceNotFound(wanted.clone()))
            }
        }
    }
}

/// Names of the input devices on the default host, in host order.
pub fn available_devices() -> Result<Vec<String>, CaptureError> {
    DeviceEnumerator::new().capture_device_names()
}

fn device_name(index: usize, device: &Device) -> String {
    device
        .name()
        .unwrap_or_else(|_| placeholder_name(index))
}

fn placeholder_name(index: usize) -> String {
    format!("Input Device {}", index + 1)
}

fn mark_default(names: Vec<String>, default_name: Option<&str>) -> Vec<AudioSource> {
    names
        .into_iter()
        .map(|name| AudioSource {
            is_default: default_name == Some(name.as_str()),
            name,
        })
        .collect()
}
