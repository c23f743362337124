use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::audio_models::{DEFAULT_DEVICE_INDEX, SAMPLE_RATE};

/// Default samples per frame.
pub const DEFAULT_FRAME_LENGTH: usize = 512;

/// Default buffer depth, in frames.
pub const DEFAULT_BUFFERED_FRAMES: usize = 50;

/// Default number of read attempts before a frame read gives up.
pub const READ_RETRY_COUNT: u32 = 500;

/// Default pause between read attempts.
pub const READ_SLEEP_MILLIS: u64 = 2;

/// How much audio the session buffers between producer and reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferSizing {
    /// A whole number of frames.
    BufferedFrames(usize),
    /// A duration, converted to samples at [`SAMPLE_RATE`].
    Milliseconds(u32),
}

impl BufferSizing {
    /// Buffer capacity in samples for the given frame length.
    pub fn capacity(&self, frame_length: usize) -> Option<usize> {
        match *self {
            Self::BufferedFrames(frames) => frame_length.checked_mul(frames),
            Self::Milliseconds(ms) => {
                usize::try_from(SAMPLE_RATE as u64 * ms as u64 / 1000).ok()
            }
        }
    }
}

/// Bounded retry schedule for frame reads.
///
/// Worst-case read latency is `attempts * interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// One attempt, no sleeping: take what is buffered or fail.
    pub fn snapshot() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_wait(&self) -> Duration {
        self.interval * self.attempts.saturating_sub(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(READ_RETRY_COUNT, Duration::from_millis(READ_SLEEP_MILLIS))
    }
}

/// Configuration for a capture session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Samples returned by every frame read (default: 512).
    pub frame_length: usize,

    /// Index into the enumerated input devices, or -1 for the system default.
    pub device_index: i32,

    /// Ring-buffer depth (default: 50 frames).
    pub buffer_sizing: BufferSizing,

    /// Read attempts per frame (default: 500).
    pub read_retry_count: u32,

    /// Milliseconds slept between read attempts (default: 2).
    pub read_sleep_ms: u64,

    /// Log a warning whenever the producer overwrites unread audio.
    pub log_overflow: bool,

    /// Log a warning after two seconds of uninterrupted silence.
    pub log_silence: bool,
}

impl RecorderConfig {
    pub fn new(frame_length: usize) -> Self {
        Self {
            frame_length,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.frame_length == 0 {
            return Err("frame length must be positive".into());
        }
        if self.device_index < DEFAULT_DEVICE_INDEX {
            return Err(format!("invalid device index: {}", self.device_index));
        }
        match self.buffer_sizing {
            BufferSizing::BufferedFrames(0) => {
                return Err("buffered frame count must be positive".into())
            }
            BufferSizing::Milliseconds(0) => {
                return Err("buffer duration must be positive".into())
            }
            _ => {}
        }
        match self.buffer_capacity() {
            None => return Err("buffer size overflows".into()),
            Some(capacity) if capacity < self.frame_length => {
                return Err(format!(
                    "buffer of {} samples cannot hold a {}-sample frame",
                    capacity, self.frame_length
                ))
            }
            Some(_) => {}
        }
        if self.read_retry_count == 0 {
            return Err("read retry count must be positive".into());
        }
        Ok(())
    }

    pub fn buffer_capacity(&self) -> Option<usize> {
        self.buffer_sizing.capacity(self.frame_length)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.read_retry_count,
            Duration::from_millis(self.read_sleep_ms),
        )
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            frame_length: DEFAULT_FRAME_LENGTH,
            device_index: DEFAULT_DEVICE_INDEX,
            buffer_sizing: BufferSizing::BufferedFrames(DEFAULT_BUFFERED_FRAMES),
            read_retry_count: READ_RETRY_COUNT,
            read_sleep_ms: READ_SLEEP_MILLIS,
            log_overflow: false,
            log_silence: false,
        }
    }
}
