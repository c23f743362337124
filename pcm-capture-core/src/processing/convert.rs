//! Sample-format conversion for backends that cannot deliver the session
//! format (16 kHz mono i16) directly.
//!
//! `PcmConverter` is meant to be owned by a single stream callback. It keeps
//! resampling state between chunks so the output rate is exact over time,
//! and it reuses its scratch buffers so steady-state conversion does not
//! allocate.

use crate::models::audio_models::{CHANNELS, SAMPLE_RATE};

fn sample_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn sample_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Average interleaved frames into `out` (cleared first).
fn downmix_into<S: Copy>(samples: &[S], channels: usize, to_f32: fn(S) -> f32, out: &mut Vec<f32>) {
    out.clear();
    let channels = channels.max(1);
    let scale = 1.0 / channels as f32;
    out.extend(
        samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().map(|&s| to_f32(s)).sum::<f32>() * scale),
    );
}

/// Downmix interleaved multi-channel audio to mono by averaging channels per frame.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    let mut mono = Vec::with_capacity(samples.len() / channels.max(1));
    downmix_into(samples, channels, |s| s, &mut mono);
    mono
}

/// Convert f32 samples in `[-1.0, 1.0]` to signed 16-bit PCM.
///
/// Out-of-range values are clamped.
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| sample_to_i16(s)).collect()
}

pub fn i16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| sample_to_f32(s)).collect()
}

/// Streaming linear-interpolation resampler for mono audio.
///
/// Input arrives in chunks of any size. The read position and the last
/// sample of the previous chunk carry over, so chunk boundaries are
/// interpolated like any other pair of samples.
#[derive(Debug, Clone)]
pub struct Resampler {
    source_sample_rate: u32,
    target_sample_rate: u32,
    /// Source samples advanced per output sample.
    step: f64,
    /// Position of the next output, relative to the start of the next chunk.
    /// Lies in `[-1, 0)` when it falls between the previous chunk and the next.
    position: f64,
    previous: Option<f32>,
}

impl Resampler {
    pub fn new(source_sample_rate: u32, target_sample_rate: u32) -> Self {
        Self {
            source_sample_rate,
            target_sample_rate,
            step: source_sample_rate as f64 / target_sample_rate.max(1) as f64,
            position: 0.0,
            previous: None,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.source_sample_rate == self.target_sample_rate
    }

    /// Forget carried-over state, e.g. after a stream restart.
    pub fn reset(&mut self) {
        self.position = 0.0;
        self.previous = None;
    }

    /// Resample one chunk into `out` (cleared first).
    ///
    /// Outputs whose right-hand neighbour has not arrived yet are produced on
    /// the next call.
    pub fn process_into(&mut self, samples: &[f32], out: &mut Vec<f32>) {
        out.clear();
        if self.is_passthrough() {
            out.extend_from_slice(samples);
            return;
        }
        let Some(&last) = samples.last() else {
            return;
        };

        let len = samples.len() as f64;
        let mut position = self.position;
        loop {
            let index = position.floor();
            let next = index as isize + 1;
            if next as f64 >= len {
                break;
            }
            let left = if index < 0.0 {
                // Only reachable once a previous chunk has been seen.
                self.previous.unwrap_or(samples[0])
            } else {
                samples[index as usize]
            };
            let right = samples[next as usize];
            let fraction = (position - index) as f32;
            out.push(left + (right - left) * fraction);
            position += self.step;
        }

        self.position = position - len;
        self.previous = Some(last);
    }

    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let mut out = Vec::new();
        self.process_into(samples, &mut out);
        out
    }
}

/// Converts device audio into session PCM, one callback chunk at a time.
#[derive(Debug, Clone)]
pub struct PcmConverter {
    channels: usize,
    resampler: Resampler,
    mono: Vec<f32>,
    resampled: Vec<f32>,
}

impl PcmConverter {
    pub fn new(source_sample_rate: u32, source_channels: u16) -> Self {
        Self {
            channels: source_channels.max(1) as usize,
            resampler: Resampler::new(source_sample_rate, SAMPLE_RATE),
            mono: Vec::new(),
            resampled: Vec::new(),
        }
    }

    /// True when the device already delivers mono at the session rate.
    pub fn is_identity(&self) -> bool {
        self.channels == CHANNELS as usize && self.resampler.is_passthrough()
    }

    /// Convert `data` into `out` (cleared first).
    pub fn convert_f32_into(&mut self, data: &[f32], out: &mut Vec<i16>) {
        out.clear();
        if self.is_identity() {
            out.extend(data.iter().map(|&s| sample_to_i16(s)));
            return;
        }
        downmix_into(data, self.channels, |s| s, &mut self.mono);
        self.finish_into(out);
    }

    /// Convert `data` into `out` (cleared first).
    pub fn convert_i16_into(&mut self, data: &[i16], out: &mut Vec<i16>) {
        out.clear();
        if self.is_identity() {
            out.extend_from_slice(data);
            return;
        }
        downmix_into(data, self.channels, sample_to_f32, &mut self.mono);
        self.finish_into(out);
    }

    fn finish_into(&mut self, out: &mut Vec<i16>) {
        self.resampler.process_into(&self.mono, &mut self.resampled);
        out.extend(self.resampled.iter().map(|&s| sample_to_i16(s)));
    }

    pub fn convert_f32(&mut self, data: &[f32]) -> Vec<i16> {
        let mut out = Vec::new();
        self.convert_f32_into(data, &mut out);
        out
    }

    pub fn convert_i16(&mut self, data: &[i16]) -> Vec<i16> {
        let mut out = Vec::new();
        self.convert_i16_into(data, &mut out);
        out
    }
}
