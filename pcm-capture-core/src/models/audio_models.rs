use serde::{Deserialize, Serialize};

/// Capture sample rate in Hz. Fixed for every session.
pub const SAMPLE_RATE: u32 = 16_000;

/// Channel count of delivered frames (mono).
pub const CHANNELS: u16 = 1;

/// Bits per delivered sample (signed, little-endian).
pub const BITS_PER_SAMPLE: u16 = 16;

/// Device index meaning "use the system default input".
pub const DEFAULT_DEVICE_INDEX: i32 = -1;

/// Which input device a stream should bind to.
///
/// Index-based requests are resolved to a name once, when the session is
/// created; later reopens use the stored name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSelector {
    Default,
    Named(String),
}

/// An input device bound to (or available for) capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSource {
    pub name: String,
    pub is_default: bool,
}

/// Diagnostics for debugging capture sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionDiagnostics {
    pub callback_count: u64,
    pub samples_written: u64,
    pub overflow_count: u64,
    pub samples_dropped: u64,
    pub frames_read: u64,
    pub failed_reads: u64,
    pub silent_samples: usize,
}
