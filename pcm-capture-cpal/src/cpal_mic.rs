//! cpal microphone capture provider.
//!
//! `cpal::Stream` is `!Send` on most hosts, so each open stream lives on a
//! dedicated thread. The provider talks to that thread over a command
//! channel and waits for a reply to every command.
//!
//! Samples reach the session callback as 16 kHz mono i16. Devices that
//! cannot deliver that directly are converted with `PcmConverter`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig, SupportedStreamConfigRange};
use crossbeam_channel::{bounded, Receiver, Sender};

use pcm_capture_core::models::audio_models::{AudioSource, DeviceSelector, CHANNELS, SAMPLE_RATE};
use pcm_capture_core::models::error::CaptureError;
use pcm_capture_core::processing::convert::PcmConverter;
use pcm_capture_core::traits::capture_provider::{CaptureProvider, SampleCallback};

use crate::device_enumerator::DeviceEnumerator;
use crate::error::CpalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Pause,
    Close,
}

type Reply = Sender<Result<(), CpalError>>;

struct StreamWorker {
    commands: Sender<(Command, Reply)>,
    handle: thread::JoinHandle<()>,
}

/// Microphone capture through the cpal default host.
pub struct CpalMicCapture {
    worker: Option<StreamWorker>,
    active: Arc<AtomicBool>,
}

impl Default for CpalMicCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalMicCapture {
    pub fn new() -> Self {
        Self {
            worker: None,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    fn request(&self, command: Command) -> Result<(), CaptureError> {
        let worker = self
            .worker
            .as_ref()
            .ok_or(CaptureError::DeviceNotInitialized)?;
        let gone = || CaptureError::Runtime("capture thread exited".into());

        let (reply_tx, reply_rx) = bounded(1);
        worker
            .commands
            .send((command, reply_tx))
            .map_err(|_| gone())?;
        reply_rx.recv().map_err(|_| gone())?.map_err(CaptureError::from)
    }
}

impl CaptureProvider for CpalMicCapture {
    fn input_devices(&self) -> Result<Vec<String>, CaptureError> {
        DeviceEnumerator::new().capture_device_names()
    }

    fn open(
        &mut self,
        device: &DeviceSelector,
        callback: SampleCallback,
    ) -> Result<AudioSource, CaptureError> {
        if self.worker.is_some() {
            return Err(CaptureError::DeviceAlreadyInitialized);
        }

        self.active.store(false, Ordering::SeqCst);
        let (ready_tx, ready_rx) = bounded(1);
        let (commands, command_rx) = bounded(1);
        let selector = device.clone();
        let active = Arc::clone(&self.active);

        let handle = thread::Builder::new()
            .name("pcm-capture-mic".into())
            .spawn(move || stream_thread(selector, callback, active, ready_tx, command_rx))
            .map_err(|e| CaptureError::Runtime(format!("failed to spawn capture thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(source)) => {
                self.worker = Some(StreamWorker { commands, handle });
                Ok(source)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e.into())
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::Runtime("capture thread exited during open".into()))
            }
        }
    }

    fn is_open(&self) -> bool {
        self.worker.is_some()
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        self.request(Command::Play)
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        if self.worker.is_none() {
            return Ok(());
        }
        self.request(Command::Pause)
    }

    fn is_active(&self) -> bool {
        self.worker.is_some() && self.active.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        if self.worker.is_none() {
            return;
        }
        if let Err(e) = self.request(Command::Close) {
            log::debug!("Capture thread already gone on close: {}", e);
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.handle.join();
        }
        self.active.store(false, Ordering::SeqCst);
    }
}

impl Drop for CpalMicCapture {
    fn drop(&mut self) {
        self.close();
    }
}

/// Body of the thread that owns the stream.
///
/// Sequence:
/// 1. Resolve the device
/// 2. Negotiate a stream config
/// 3. Build the stream (paused) and report readiness
/// 4. Serve commands until `Close` or the provider goes away
fn stream_thread(
    selector: DeviceSelector,
    callback: SampleCallback,
    active: Arc<AtomicBool>,
    ready: Sender<Result<AudioSource, CpalError>>,
    commands: Receiver<(Command, Reply)>,
) {
    let stream = match open_stream(&selector, callback, Arc::clone(&active)) {
        Ok((stream, source)) => {
            let _ = ready.send(Ok(source));
            stream
        }
        Err(e) => {
            log::error!("Failed to open capture device: {}", e);
            let _ = ready.send(Err(e));
            return;
        }
    };

    for (command, reply) in commands.iter() {
        let result = match command {
            Command::Play => stream.play().map_err(CpalError::from).map(|()| {
                active.store(true, Ordering::SeqCst);
            }),
            Command::Pause => {
                active.store(false, Ordering::SeqCst);
                stream.pause().map_err(CpalError::from)
            }
            Command::Close => {
                active.store(false, Ordering::SeqCst);
                let _ = reply.send(Ok(()));
                break;
            }
        };
        let _ = reply.send(result);
    }

    log::debug!("Capture thread exiting");
}

fn open_stream(
    selector: &DeviceSelector,
    callback: SampleCallback,
    active: Arc<AtomicBool>,
) -> Result<(Stream, AudioSource), CpalError> {
    let (device, source) = DeviceEnumerator::new().find_capture_device(selector)?;
    let (config, format) = negotiate_config(&device)?;

    log::info!(
        "Opening '{}': {} Hz, {} channel(s), {:?}",
        source.name,
        config.sample_rate.0,
        config.channels,
        format
    );

    let stream = build_stream(&device, &config, format, callback, active)?;
    // Streams may start running as soon as they are built on some hosts.
    if let Err(e) = stream.pause() {
        log::debug!("Could not pause freshly built stream: {}", e);
    }
    Ok((stream, source))
}

fn supports_target_rate(range: &SupportedStreamConfigRange) -> bool {
    let target = SampleRate(SAMPLE_RATE);
    range.min_sample_rate() <= target && target <= range.max_sample_rate()
}

/// Pick the stream config, preferring formats that need no conversion.
///
/// Order: 16 kHz mono i16, then 16 kHz i16/f32 with the fewest channels,
/// then the device default (converted in the callback).
fn negotiate_config(device: &Device) -> Result<(StreamConfig, SampleFormat), CpalError> {
    let ranges: Vec<SupportedStreamConfigRange> = device.supported_input_configs()?.collect();

    let exact = ranges.iter().find(|r| {
        supports_target_rate(r) && r.channels() == CHANNELS && r.sample_format() == SampleFormat::I16
    });
    let near = ranges
        .iter()
        .filter(|r| {
            supports_target_rate(r)
                && matches!(r.sample_format(), SampleFormat::I16 | SampleFormat::F32)
        })
        .min_by_key(|r| r.channels());

    if let Some(range) = exact.or(near) {
        let supported = range.clone().with_sample_rate(SampleRate(SAMPLE_RATE));
        return Ok((supported.config(), supported.sample_format()));
    }

    let default = device.default_input_config()?;
    log::warn!(
        "Device has no 16 kHz i16/f32 input; converting from {} Hz, {} channel(s)",
        default.sample_rate().0,
        default.channels()
    );
    Ok((default.config(), default.sample_format()))
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    format: SampleFormat,
    callback: SampleCallback,
    active: Arc<AtomicBool>,
) -> Result<Stream, CpalError> {
    // Owned by the callback; scratch keeps the realtime path allocation-free
    // once it has grown to the device's chunk size.
    let mut converter = PcmConverter::new(config.sample_rate.0, config.channels);
    let mut scratch: Vec<i16> = Vec::with_capacity(SAMPLE_RATE as usize / 10);
    let on_error = move |err: cpal::StreamError| {
        log::error!("Audio input stream error: {}", err);
        active.store(false, Ordering::SeqCst);
    };

    let stream = match format {
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if converter.is_identity() {
                    callback(data);
                } else {
                    converter.convert_i16_into(data, &mut scratch);
                    callback(scratch.as_slice());
                }
            },
            on_error,
            None,
        )?,
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                converter.convert_f32_into(data, &mut scratch);
                callback(scratch.as_slice());
            },
            on_error,
            None,
        )?,
        other => return Err(CpalError::UnsupportedFormat(other)),
    };
    Ok(stream)
}
