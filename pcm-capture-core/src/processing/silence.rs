use crate::models::audio_models::SAMPLE_RATE;

/// Largest absolute sample value still treated as silence.
pub const ABSOLUTE_SILENCE_THRESHOLD: i16 = 1;

/// Samples of uninterrupted silence (two seconds) before a warning.
pub const MAX_SILENT_SAMPLES: usize = 2 * SAMPLE_RATE as usize;

/// Tracks runs of silent frames to spot a muted input device.
///
/// Purely observational: the detector only says when a warning is due.
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    threshold: i16,
    limit: usize,
    silent_samples: usize,
}

impl Default for SilenceDetector {
    fn default() -> Self {
        Self::new(ABSOLUTE_SILENCE_THRESHOLD, MAX_SILENT_SAMPLES)
    }
}

impl SilenceDetector {
    pub fn new(threshold: i16, limit: usize) -> Self {
        Self {
            threshold,
            limit,
            silent_samples: 0,
        }
    }

    /// Feed one complete frame. Returns `true` when the silent run has just
    /// reached the limit; the run is reset at that point.
    pub fn observe(&mut self, frame: &[i16]) -> bool {
        let threshold = self.threshold.unsigned_abs();
        if frame.iter().any(|s| s.unsigned_abs() > threshold) {
            self.silent_samples = 0;
            return false;
        }

        self.silent_samples += frame.len();
        if self.silent_samples >= self.limit {
            self.silent_samples = 0;
            return true;
        }
        false
    }

    /// Length of the current silent run, in samples.
    pub fn silent_samples(&self) -> usize {
        self.silent_samples
    }

    pub fn reset(&mut self) {
        self.silent_samples = 0;
    }
}
