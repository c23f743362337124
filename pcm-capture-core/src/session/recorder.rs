use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::models::audio_models::{
    AudioSource, DeviceSelector, SessionDiagnostics, DEFAULT_DEVICE_INDEX, SAMPLE_RATE,
};
use crate::models::config::{RecorderConfig, RetryPolicy};
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::processing::ring_buffer::RingBuffer;
use crate::processing::silence::SilenceDetector;
use crate::traits::capture_provider::{CaptureProvider, SampleCallback};

/// Counters shared with the producer callback.
///
/// Atomics only, so the audio thread never waits on a session lock.
#[derive(Default)]
struct SessionCounters {
    log_overflow: AtomicBool,
    callback_count: AtomicU64,
    samples_written: AtomicU64,
    overflow_count: AtomicU64,
    samples_dropped: AtomicU64,
    frames_read: AtomicU64,
    failed_reads: AtomicU64,
}

/// Build the callback the backend invokes with fresh samples.
fn producer_callback(buffer: Arc<RingBuffer<i16>>, counters: Arc<SessionCounters>) -> SampleCallback {
    Arc::new(move |samples: &[i16]| {
        counters.callback_count.fetch_add(1, Ordering::Relaxed);

        // Empty chunks are the only write error; nothing to record for them.
        let Ok(outcome) = buffer.write(samples) else {
            return;
        };
        counters
            .samples_written
            .fetch_add(outcome.written as u64, Ordering::Relaxed);

        if outcome.overflowed() {
            counters.overflow_count.fetch_add(1, Ordering::Relaxed);
            counters
                .samples_dropped
                .fetch_add(outcome.dropped as u64, Ordering::Relaxed);
            if counters.log_overflow.load(Ordering::Relaxed) {
                log::warn!(
                    "Overflow - reader is not reading fast enough ({} samples dropped)",
                    outcome.dropped
                );
            }
        }
    })
}

fn closed_error() -> CaptureError {
    CaptureError::InvalidArgument("session has been closed".into())
}

/// Microphone recorder delivering fixed-size PCM frames.
///
/// Generic over the audio backend via the `CaptureProvider` trait. Data flow:
/// ```text
/// [Provider thread] → callback → [RingBuffer<i16>] → read() → [caller frame]
/// ```
///
/// All methods take `&self`, so a session can be shared (e.g. in an `Arc`)
/// between a reading thread and a controlling thread. Lock order is
/// provider, then state; the ring buffer lock is never held across a sleep.
pub struct AudioSession<P: CaptureProvider> {
    provider: Mutex<P>,
    callback: SampleCallback,
    buffer: Arc<RingBuffer<i16>>,
    counters: Arc<SessionCounters>,
    state: Mutex<CaptureState>,
    device: DeviceSelector,
    selected_device: AudioSource,
    frame_length: usize,
    retry: RetryPolicy,
    log_silence: AtomicBool,
    silence: Mutex<SilenceDetector>,
}

impl<P: CaptureProvider> AudioSession<P> {
    /// Validate `config`, allocate the buffer and open the capture stream.
    ///
    /// The stream is opened but not started. On error nothing stays open.
    pub fn new(mut provider: P, config: RecorderConfig) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::InvalidArgument)?;

        let capacity = config
            .buffer_capacity()
            .ok_or_else(|| CaptureError::InvalidArgument("buffer size overflows".into()))?;
        let buffer = Arc::new(RingBuffer::new(capacity)?);

        let device = Self::resolve_device(&provider, config.device_index)?;

        let counters = Arc::new(SessionCounters::default());
        counters
            .log_overflow
            .store(config.log_overflow, Ordering::Relaxed);
        let callback = producer_callback(Arc::clone(&buffer), Arc::clone(&counters));

        let selected_device = provider.open(&device, Arc::clone(&callback))?;
        log::info!(
            "Opened capture device '{}' ({} samples/frame, {} samples buffered)",
            selected_device.name,
            config.frame_length,
            capacity
        );

        Ok(Self {
            provider: Mutex::new(provider),
            callback,
            buffer,
            counters,
            state: Mutex::new(CaptureState::Stopped),
            device,
            selected_device,
            frame_length: config.frame_length,
            retry: config.retry_policy(),
            log_silence: AtomicBool::new(config.log_silence),
            silence: Mutex::new(SilenceDetector::default()),
        })
    }

    /// Turn an enumeration index into a stable device identity.
    fn resolve_device(provider: &P, device_index: i32) -> Result<DeviceSelector, CaptureError> {
        if device_index == DEFAULT_DEVICE_INDEX {
            return Ok(DeviceSelector::Default);
        }

        let out_of_range =
            || CaptureError::InvalidArgument(format!("device index {} is out of range", device_index));
        let index = usize::try_from(device_index).map_err(|_| out_of_range())?;
        provider
            .input_devices()?
            .into_iter()
            .nth(index)
            .map(DeviceSelector::Named)
            .ok_or_else(out_of_range)
    }

    pub fn state(&self) -> CaptureState {
        *self.state.lock()
    }

    fn set_state(&self, new_state: CaptureState) {
        let mut state = self.state.lock();
        if *state != new_state {
            log::debug!("Capture state {} -> {}", state.as_str(), new_state.as_str());
            *state = new_state;
        }
    }

    /// Start delivering audio into the buffer.
    ///
    /// Calling this while already started is a no-op, unless the stream
    /// died underneath the session, in which case it is reopened on the
    /// same device.
    pub fn start(&self) -> Result<(), CaptureError> {
        let mut provider = self.provider.lock();

        match self.state() {
            CaptureState::Uninitialized => return Err(closed_error()),
            CaptureState::Started if provider.is_active() => return Ok(()),
            CaptureState::Started => {
                log::warn!(
                    "Capture stream on '{}' stopped unexpectedly, reopening",
                    self.selected_device.name
                );
                provider.close();
                self.set_state(CaptureState::Stopped);
            }
            CaptureState::Stopped => {}
        }

        if !provider.is_open() {
            provider.open(&self.device, Arc::clone(&self.callback))?;
        }
        provider.start()?;

        self.silence.lock().reset();
        self.set_state(CaptureState::Started);
        Ok(())
    }

    /// Stop delivering audio and discard everything still buffered.
    ///
    /// Safe to call repeatedly and after a failed `start`.
    pub fn stop(&self) -> Result<(), CaptureError> {
        let mut provider = self.provider.lock();
        let state = self.state();
        if state.is_closed() {
            return Err(closed_error());
        }

        self.buffer.reset();

        if !provider.is_active() {
            if state.is_started() {
                // Dead stream: drop it so the next start opens a fresh one.
                provider.close();
            }
            self.set_state(CaptureState::Stopped);
            return Ok(());
        }

        provider.stop()?;
        // Drop chunks delivered between the first reset and the pause.
        self.buffer.reset();
        self.set_state(CaptureState::Stopped);
        Ok(())
    }

    fn ensure_started(&self) -> Result<(), CaptureError> {
        match self.state() {
            CaptureState::Started => Ok(()),
            CaptureState::Stopped => Err(CaptureError::InvalidState("recorder is not started".into())),
            CaptureState::Uninitialized => Err(closed_error()),
        }
    }

    /// Fill `frame` with the next `frame_length` samples.
    ///
    /// Polls the buffer, sleeping between attempts, until the frame is full
    /// or the retry budget runs out (`Io`, with `frame` partially written).
    /// A concurrent `stop` ends the read with `InvalidState`.
    pub fn read(&self, frame: &mut [i16]) -> Result<(), CaptureError> {
        if frame.len() != self.frame_length {
            return Err(CaptureError::InvalidArgument(format!(
                "frame holds {} samples, expected {}",
                frame.len(),
                self.frame_length
            )));
        }
        self.ensure_started()?;

        let mut filled = 0;
        for attempt in 0..self.retry.attempts {
            if attempt > 0 {
                thread::sleep(self.retry.interval);
                self.ensure_started()?;
            }

            let outcome = self.buffer.read(&mut frame[filled..])?;
            filled += outcome.copied;

            if filled == self.frame_length {
                self.counters.frames_read.fetch_add(1, Ordering::Relaxed);
                self.observe_silence(frame);
                return Ok(());
            }
        }

        self.counters.failed_reads.fetch_add(1, Ordering::Relaxed);
        Err(CaptureError::Io {
            read: filled,
            expected: self.frame_length,
        })
    }

    /// Read one frame into a freshly allocated vector.
    pub fn read_frame(&self) -> Result<Vec<i16>, CaptureError> {
        let mut frame = vec![0i16; self.frame_length];
        self.read(&mut frame)?;
        Ok(frame)
    }

    fn observe_silence(&self, frame: &[i16]) {
        if !self.log_silence.load(Ordering::Relaxed) {
            return;
        }
        if self.silence.lock().observe(frame) {
            log::warn!("Input device might be muted or volume level is set to 0");
        }
    }

    /// Whether audio is currently being captured.
    pub fn is_recording(&self) -> bool {
        let provider = self.provider.lock();
        self.state().is_started() && provider.is_active()
    }

    /// The device resolved when the session was created.
    pub fn selected_device(&self) -> &AudioSource {
        &self.selected_device
    }

    /// Input devices currently reported by the backend, in its order.
    pub fn available_devices(&self) -> Result<Vec<String>, CaptureError> {
        self.provider.lock().input_devices()
    }

    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    pub fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    /// Library version string.
    pub fn version(&self) -> &'static str {
        crate::version()
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Toggle both overflow and silence warnings.
    pub fn set_debug_logging(&self, enabled: bool) {
        self.set_log_overflow(enabled);
        self.set_log_silence(enabled);
    }

    pub fn set_log_overflow(&self, enabled: bool) {
        self.counters.log_overflow.store(enabled, Ordering::Relaxed);
    }

    pub fn set_log_silence(&self, enabled: bool) {
        if !self.log_silence.swap(enabled, Ordering::Relaxed) {
            self.silence.lock().reset();
        }
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        let c = &self.counters;
        SessionDiagnostics {
            callback_count: c.callback_count.load(Ordering::Relaxed),
            samples_written: c.samples_written.load(Ordering::Relaxed),
            overflow_count: c.overflow_count.load(Ordering::Relaxed),
            samples_dropped: c.samples_dropped.load(Ordering::Relaxed),
            frames_read: c.frames_read.load(Ordering::Relaxed),
            failed_reads: c.failed_reads.load(Ordering::Relaxed),
            silent_samples: self.silence.lock().silent_samples(),
        }
    }

    /// Release the capture stream. Further calls are no-ops; every other
    /// operation on a closed session fails with `InvalidArgument`.
    pub fn close(&self) {
        let mut provider = self.provider.lock();
        if self.state().is_closed() {
            return;
        }
        provider.close();
        self.buffer.reset();
        self.set_state(CaptureState::Uninitialized);
        log::debug!("Closed capture device '{}'", self.selected_device.name);
    }
}

impl<P: CaptureProvider> Drop for AudioSession<P> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::config::BufferSizing;
    use crate::models::error::CaptureStatus;

    #[derive(Default)]
    struct FakeState {
        devices: Vec<String>,
        callback: Option<SampleCallback>,
        opened_with: Option<DeviceSelector>,
        open_count: u32,
        started: bool,
        failed: bool,
        /// Delivered from inside `stop`, as a backend callback racing the pause would.
        tail_on_stop: Vec<i16>,
    }

    /// In-memory provider; clones share state so tests can drive the callback.
    #[derive(Clone, Default)]
    struct FakeProvider {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakeProvider {
        fn with_devices(names: &[&str]) -> Self {
            let provider = Self::default();
            provider.inner.lock().devices = names.iter().map(|n| n.to_string()).collect();
            provider
        }

        fn push(&self, samples: &[i16]) {
            let callback = {
                let s = self.inner.lock();
                if !s.started || s.failed {
                    return;
                }
                s.callback.clone()
            };
            if let Some(callback) = callback {
                callback(samples);
            }
        }

        fn kill_stream(&self) {
            self.inner.lock().failed = true;
        }

        fn open_count(&self) -> u32 {
            self.inner.lock().open_count
        }
    }

    impl CaptureProvider for FakeProvider {
        fn input_devices(&self) -> Result<Vec<String>, CaptureError> {
            Ok(self.inner.lock().devices.clone())
        }

        fn open(
            &mut self,
            device: &DeviceSelector,
            callback: SampleCallback,
        ) -> Result<AudioSource, CaptureError> {
            let mut s = self.inner.lock();
            if s.callback.is_some() {
                return Err(CaptureError::DeviceAlreadyInitialized);
            }
            s.callback = Some(callback);
            s.opened_with = Some(device.clone());
            s.open_count += 1;
            s.failed = false;
            let name = match device {
                DeviceSelector::Default => "Fake Default".to_string(),
                DeviceSelector::Named(name) => name.clone(),
            };
            Ok(AudioSource {
                is_default: *device == DeviceSelector::Default,
                name,
            })
        }

        fn is_open(&self) -> bool {
            self.inner.lock().callback.is_some()
        }

        fn start(&mut self) -> Result<(), CaptureError> {
            let mut s = self.inner.lock();
            if s.callback.is_none() {
                return Err(CaptureError::DeviceNotInitialized);
            }
            s.started = true;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), CaptureError> {
            let (callback, tail) = {
                let mut s = self.inner.lock();
                s.started = false;
                (s.callback.clone(), std::mem::take(&mut s.tail_on_stop))
            };
            if let Some(callback) = callback.filter(|_| !tail.is_empty()) {
                callback(tail.as_slice());
            }
            Ok(())
        }

        fn is_active(&self) -> bool {
            let s = self.inner.lock();
            s.callback.is_some() && s.started && !s.failed
        }

        fn close(&mut self) {
            let mut s = self.inner.lock();
            s.callback = None;
            s.started = false;
        }
    }

    fn config(frame_length: usize, frames: usize) -> RecorderConfig {
        RecorderConfig {
            frame_length,
            buffer_sizing: BufferSizing::BufferedFrames(frames),
            read_retry_count: 5,
            read_sleep_ms: 1,
            ..RecorderConfig::default()
        }
    }

    fn started_session(frame_length: usize, frames: usize) -> (AudioSession<FakeProvider>, FakeProvider) {
        let provider = FakeProvider::default();
        let session = AudioSession::new(provider.clone(), config(frame_length, frames)).unwrap();
        session.start().unwrap();
        (session, provider)
    }

    #[test]
    fn new_rejects_invalid_config() {
        let err = AudioSession::new(FakeProvider::default(), RecorderConfig::new(0))
            .err()
            .unwrap();
        assert_eq!(err.status(), CaptureStatus::InvalidArgument);
    }

    #[test]
    fn new_opens_default_device_without_starting() {
        let provider = FakeProvider::default();
        let session = AudioSession::new(provider.clone(), config(8, 4)).unwrap();

        assert_eq!(session.state(), CaptureState::Stopped);
        assert!(!session.is_recording());
        assert_eq!(session.selected_device().name, "Fake Default");
        assert_eq!(session.buffer_capacity(), 32);
        assert_eq!(session.sample_rate(), 16_000);
        assert_eq!(provider.inner.lock().opened_with, Some(DeviceSelector::Default));
    }

    #[test]
    fn device_index_resolves_to_name() {
        let provider = FakeProvider::with_devices(&["Built-in Mic", "USB Mic"]);
        let mut cfg = config(8, 4);
        cfg.device_index = 1;

        let session = AudioSession::new(provider.clone(), cfg).unwrap();

        assert_eq!(session.selected_device().name, "USB Mic");
        assert_eq!(
            provider.inner.lock().opened_with,
            Some(DeviceSelector::Named("USB Mic".into()))
        );
        assert_eq!(
            session.available_devices().unwrap(),
            vec!["Built-in Mic".to_string(), "USB Mic".to_string()]
        );
    }

    #[test]
    fn out_of_range_device_index_is_rejected() {
        let provider = FakeProvider::with_devices(&["Built-in Mic"]);
        let mut cfg = config(8, 4);
        cfg.device_index = 1;

        let err = AudioSession::new(provider.clone(), cfg).err().unwrap();
        assert_eq!(err.status(), CaptureStatus::InvalidArgument);
        assert_eq!(provider.open_count(), 0);
    }

    #[test]
    fn read_requires_started_session() {
        let session = AudioSession::new(FakeProvider::default(), config(8, 4)).unwrap();
        let mut frame = [0i16; 8];

        let err = session.read(&mut frame).unwrap_err();
        assert_eq!(err.status(), CaptureStatus::InvalidState);
    }

    #[test]
    fn read_rejects_wrong_frame_size() {
        let (session, _provider) = started_session(8, 4);
        let mut frame = [0i16; 7];

        let err = session.read(&mut frame).unwrap_err();
        assert_eq!(err.status(), CaptureStatus::InvalidArgument);
    }

    #[test]
    fn read_returns_buffered_frames_in_order() {
        let (session, provider) = started_session(4, 4);
        provider.push(&[1, 2, 3]);
        provider.push(&[4, 5, 6, 7, 8]);

        assert_eq!(session.read_frame().unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(session.read_frame().unwrap(), vec![5, 6, 7, 8]);
        assert_eq!(session.diagnostics().frames_read, 2);
        assert_eq!(session.diagnostics().callback_count, 2);
    }

    #[test]
    fn read_assembles_frame_from_late_chunks() {
        let provider = FakeProvider::default();
        let mut cfg = config(8, 4);
        cfg.read_retry_count = 500;
        let session = AudioSession::new(provider.clone(), cfg).unwrap();
        session.start().unwrap();

        let producer = provider.clone();
        let handle = thread::spawn(move || {
            for chunk in [[1i16, 2], [3, 4], [5, 6], [7, 8]] {
                thread::sleep(Duration::from_millis(5));
                producer.push(&chunk);
            }
        });

        let frame = session.read_frame().unwrap();
        handle.join().unwrap();
        assert_eq!(frame, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn read_times_out_with_partial_frame() {
        let (session, provider) = started_session(8, 4);
        provider.push(&[9, 9, 9]);

        let mut frame = [0i16; 8];
        let err = session.read(&mut frame).unwrap_err();

        assert_eq!(err, CaptureError::Io { read: 3, expected: 8 });
        assert_eq!(err.status(), CaptureStatus::IoError);
        assert_eq!(&frame[..3], &[9, 9, 9]);
        assert_eq!(session.diagnostics().failed_reads, 1);
    }

    #[test]
    fn overflow_keeps_newest_samples() {
        let (session, provider) = started_session(4, 2);
        let samples: Vec<i16> = (1..=12).collect();
        provider.push(&samples);

        let diagnostics = session.diagnostics();
        assert_eq!(diagnostics.overflow_count, 1);
        assert_eq!(diagnostics.samples_dropped, 4);
        assert_eq!(diagnostics.samples_written, 12);

        assert_eq!(session.read_frame().unwrap(), vec![5, 6, 7, 8]);
        assert_eq!(session.read_frame().unwrap(), vec![9, 10, 11, 12]);
    }

    #[test]
    fn stop_discards_buffered_audio() {
        let (session, provider) = started_session(4, 4);
        provider.push(&[1, 2, 3, 4, 5, 6, 7, 8]);

        session.stop().unwrap();
        assert_eq!(session.state(), CaptureState::Stopped);
        session.stop().unwrap();

        session.start().unwrap();
        let err = session.read_frame().unwrap_err();
        assert_eq!(err, CaptureError::Io { read: 0, expected: 4 });
    }

    #[test]
    fn stop_discards_audio_delivered_while_pausing() {
        let (session, provider) = started_session(4, 4);
        provider.inner.lock().tail_on_stop = vec![7, 7, 7, 7];

        session.stop().unwrap();
        assert_eq!(session.diagnostics().samples_written, 4);

        session.start().unwrap();
        let err = session.read_frame().unwrap_err();
        assert_eq!(err, CaptureError::Io { read: 0, expected: 4 });
    }

    #[test]
    fn unallocatable_buffer_is_out_of_memory() {
        let cfg = RecorderConfig {
            frame_length: 2,
            buffer_sizing: BufferSizing::BufferedFrames(usize::MAX / 4),
            ..RecorderConfig::default()
        };
        let provider = FakeProvider::default();

        let err = AudioSession::new(provider.clone(), cfg).err().unwrap();
        assert_eq!(err, CaptureError::OutOfMemory);
        assert_eq!(err.status(), CaptureStatus::OutOfMemory);
        assert_eq!(provider.open_count(), 0);
    }

    #[test]
    fn stop_before_start_is_safe() {
        let session = AudioSession::new(FakeProvider::default(), config(4, 4)).unwrap();
        session.stop().unwrap();
        assert_eq!(session.state(), CaptureState::Stopped);
    }

    #[test]
    fn start_is_idempotent() {
        let (session, provider) = started_session(4, 4);
        session.start().unwrap();

        assert!(session.is_recording());
        assert_eq!(provider.open_count(), 1);
    }

    #[test]
    fn start_reopens_dead_stream() {
        let (session, provider) = started_session(4, 4);
        provider.kill_stream();
        assert!(!session.is_recording());

        session.start().unwrap();

        assert!(session.is_recording());
        assert_eq!(provider.open_count(), 2);
        provider.push(&[1, 2, 3, 4]);
        assert_eq!(session.read_frame().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn stop_after_stream_death_reopens_on_next_start() {
        let (session, provider) = started_session(4, 4);
        provider.kill_stream();

        session.stop().unwrap();
        assert!(!provider.is_open());

        session.start().unwrap();
        assert_eq!(provider.open_count(), 2);
        assert!(session.is_recording());
    }

    #[test]
    fn silence_counter_warns_and_resets() {
        let provider = FakeProvider::default();
        let mut cfg = config(16_000, 2);
        cfg.log_silence = true;
        let session = AudioSession::new(provider.clone(), cfg).unwrap();
        session.start().unwrap();

        let quiet = vec![0i16; 16_000];
        provider.push(&quiet);
        session.read_frame().unwrap();
        assert_eq!(session.diagnostics().silent_samples, 16_000);

        provider.push(&quiet);
        session.read_frame().unwrap();
        assert_eq!(session.diagnostics().silent_samples, 0);
    }

    #[test]
    fn silence_is_not_tracked_when_logging_is_off() {
        let (session, provider) = started_session(4, 4);
        provider.push(&[0, 0, 0, 0]);
        session.read_frame().unwrap();
        assert_eq!(session.diagnostics().silent_samples, 0);

        session.set_debug_logging(true);
        provider.push(&[0, 0, 0, 0]);
        session.read_frame().unwrap();
        assert_eq!(session.diagnostics().silent_samples, 4);
    }

    #[test]
    fn closed_session_rejects_calls() {
        let (session, provider) = started_session(4, 4);
        session.close();
        session.close();

        assert!(!provider.is_open());
        assert_eq!(session.state(), CaptureState::Uninitialized);
        assert_eq!(session.start().unwrap_err().status(), CaptureStatus::InvalidArgument);
        assert_eq!(session.stop().unwrap_err().status(), CaptureStatus::InvalidArgument);
        assert_eq!(
            session.read_frame().unwrap_err().status(),
            CaptureStatus::InvalidArgument
        );
    }

    #[test]
    fn drop_releases_stream() {
        let (session, provider) = started_session(4, 4);
        drop(session);
        assert!(!provider.is_open());
    }
}
