// Synthetic test signals
//
// Generates mono f32 signals for exercising the peer without a microphone:
// silence, white noise, a pure tone, and a linear frequency sweep.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use super::chunk::AudioChunk;
use super::source::SampleCursor;
use crate::error::HarnessError;

pub const DEFAULT_NOISE_AMPLITUDE: f32 = 0.1;
pub const DEFAULT_TONE_AMPLITUDE: f32 = 0.5;
pub const DEFAULT_TONE_FREQUENCY: f64 = 440.0;
pub const DEFAULT_SWEEP_START_HZ: f64 = 200.0;
pub const DEFAULT_SWEEP_END_HZ: f64 = 2000.0;

/// Generator type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Silence,
    Noise,
    Tone,
    Sweep,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Silence => "silence",
            SignalKind::Noise => "noise",
            SignalKind::Tone => "tone",
            SignalKind::Sweep => "sweep",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "silence" => Ok(SignalKind::Silence),
            "noise" => Ok(SignalKind::Noise),
            "tone" => Ok(SignalKind::Tone),
            "sweep" => Ok(SignalKind::Sweep),
            _ => Err(HarnessError::UnknownGeneratorType {
                name: s.to_string(),
            }),
        }
    }
}

/// Parameters for one synthetic signal
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSpec {
    pub kind: SignalKind,
    /// Length of the generated signal in seconds
    pub duration_secs: f64,
    /// Tone frequency in Hz (ignored by other kinds)
    pub frequency: f64,
    /// Peak amplitude
    pub amplitude: f32,
    /// Sweep start/end frequency in Hz
    pub sweep_range: (f64, f64),
    /// Seed for the noise generator; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl SignalSpec {
    /// Spec with the default amplitude and frequencies for `kind`
    pub fn new(kind: SignalKind, duration_secs: f64) -> Self {
        let amplitude = match kind {
            SignalKind::Noise => DEFAULT_NOISE_AMPLITUDE,
            _ => DEFAULT_TONE_AMPLITUDE,
        };

        Self {
            kind,
            duration_secs,
            frequency: DEFAULT_TONE_FREQUENCY,
            amplitude,
            sweep_range: (DEFAULT_SWEEP_START_HZ, DEFAULT_SWEEP_END_HZ),
            seed: None,
        }
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Number of samples produced at `sample_rate`
    pub fn sample_count(&self, sample_rate: u32) -> usize {
        (self.duration_secs.max(0.0) * sample_rate as f64) as usize
    }

    /// Render the whole signal
    pub fn generate(&self, sample_rate: u32) -> Vec<f32> {
        let n = self.sample_count(sample_rate);
        match self.kind {
            SignalKind::Silence => silence(n),
            SignalKind::Noise => white_noise(n, self.amplitude, self.seed),
            SignalKind::Tone => tone(n, self.frequency, sample_rate, self.amplitude),
            SignalKind::Sweep => sweep(
                n,
                self.sweep_range.0,
                self.sweep_range.1,
                sample_rate,
                self.amplitude,
            ),
        }
    }
}

pub fn silence(n: usize) -> Vec<f32> {
    vec![0.0; n]
}

/// Uniform noise in `[-amplitude, amplitude)`, independent per sample
pub fn white_noise(n: usize, amplitude: f32, seed: Option<u64>) -> Vec<f32> {
    if amplitude <= 0.0 {
        return silence(n);
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    (0..n).map(|_| rng.gen_range(-amplitude..amplitude)).collect()
}

/// `amplitude * sin(2π f t)` with `t = i / sample_rate`
pub fn tone(n: usize, frequency: f64, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    let sr = sample_rate as f64;
    (0..n)
        .map(|i| {
            let t = i as f64 / sr;
            (amplitude as f64 * (2.0 * PI * frequency * t).sin()) as f32
        })
        .collect()
}

/// Linear chirp. The instantaneous frequency ramps from `start_hz` to
/// `end_hz` inclusive, and the phase accumulates it sample by sample.
pub fn sweep(n: usize, start_hz: f64, end_hz: f64, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    sweep_phases(n, start_hz, end_hz, sample_rate)
        .into_iter()
        .map(|phase| (amplitude as f64 * phase.sin()) as f32)
        .collect()
}

/// Running phase of the chirp: `2π * cumsum(f_i) / sample_rate`
pub fn sweep_phases(n: usize, start_hz: f64, end_hz: f64, sample_rate: u32) -> Vec<f64> {
    let sr = sample_rate as f64;
    let step = if n > 1 {
        (end_hz - start_hz) / (n - 1) as f64
    } else {
        0.0
    };

    let mut cumulative = 0.0;
    (0..n)
        .map(|i| {
            cumulative += start_hz + step * i as f64;
            2.0 * PI * cumulative / sr
        })
        .collect()
}

/// Pre-rendered synthetic signal served in chunks
#[derive(Debug)]
pub struct SyntheticSource {
    spec: SignalSpec,
    cursor: SampleCursor,
}

impl SyntheticSource {
    pub fn new(spec: SignalSpec, sample_rate: u32) -> Self {
        let samples = spec.generate(sample_rate);

        info!(
            "Generated {} signal: {:.1}s, {} samples at {}Hz",
            spec.kind,
            spec.duration_secs,
            samples.len(),
            sample_rate
        );

        Self {
            spec,
            cursor: SampleCursor::new(samples, sample_rate),
        }
    }

    pub fn spec(&self) -> &SignalSpec {
        &self.spec
    }

    pub fn sample_rate(&self) -> u32 {
        self.cursor.sample_rate()
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Next `n` samples, or `None` once the signal is exhausted
    pub fn next_chunk(&mut self, n: usize) -> Option<AudioChunk> {
        self.cursor.next_chunk(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 16000;

    #[test]
    fn test_parse_kinds() {
        assert_eq!("silence".parse::<SignalKind>().unwrap(), SignalKind::Silence);
        assert_eq!("Noise".parse::<SignalKind>().unwrap(), SignalKind::Noise);
        assert_eq!("tone".parse::<SignalKind>().unwrap(), SignalKind::Tone);
        assert_eq!("sweep".parse::<SignalKind>().unwrap(), SignalKind::Sweep);
    }

    #[test]
    fn test_parse_unknown_kind() {
        let err = "square".parse::<SignalKind>().unwrap_err();
        assert!(matches!(err, HarnessError::UnknownGeneratorType { name } if name == "square"));
    }

    #[test]
    fn test_silence_length_and_values() {
        let samples = SignalSpec::new(SignalKind::Silence, 2.5).generate(SR);
        assert_eq!(samples.len(), 40000);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_tone_zero_hz_is_zero() {
        let samples = SignalSpec::new(SignalKind::Tone, 1.0)
            .with_frequency(0.0)
            .generate(SR);
        assert_eq!(samples.len(), 16000);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_tone_peak_and_period() {
        // 1kHz at 16kHz: 16 samples per period, quarter period hits the peak
        let samples = tone(64, 1000.0, SR, 0.5);
        assert!((samples[4] - 0.5).abs() < 1e-6);
        assert!((samples[12] + 0.5).abs() < 1e-6);
        assert!((samples[0] - samples[16]).abs() < 1e-6);
    }

    #[test]
    fn test_noise_bounded_and_seeded() {
        let a = white_noise(10000, 0.1, Some(7));
        let b = white_noise(10000, 0.1, Some(7));
        assert_eq!(a, b);
        assert!(a.iter().all(|&s| (-0.1..0.1).contains(&s)));
        assert!(a.iter().any(|&s| s != 0.0));

        let c = white_noise(10000, 0.1, Some(8));
        assert_ne!(a, c);
    }

    #[test]
    fn test_sweep_phase_derivative_matches_ramp() {
        let n = SR as usize * 2;
        let phases = sweep_phases(n, 200.0, 2000.0, SR);
        let inst_freq = |i: usize| (phases[i] - phases[i - 1]) * SR as f64 / (2.0 * PI);

        // First difference is the second ramp point, last one is the end frequency
        let step = 1800.0 / (n - 1) as f64;
        assert!((inst_freq(1) - (200.0 + step)).abs() < 1e-6);
        assert!((inst_freq(1) - 200.0).abs() < 0.1);
        assert!((inst_freq(n - 1) - 2000.0).abs() < 1e-6);

        // Monotonic ramp, no jumps
        for i in 2..n {
            let delta = inst_freq(i) - inst_freq(i - 1);
            assert!((delta - step).abs() < 1e-6, "frequency jump at {}", i);
        }
    }

    #[test]
    fn test_sweep_has_no_discontinuity() {
        let samples = sweep(SR as usize, 200.0, 2000.0, SR, 0.5);
        // Largest possible step is amplitude * phase increment at the top frequency
        let max_step = 0.5 * 2.0 * PI * 2000.0 / SR as f64 + 1e-6;
        for pair in samples.windows(2) {
            assert!(((pair[1] - pair[0]) as f64).abs() <= max_step);
        }
    }

    #[test]
    fn test_synthetic_source_chunks() {
        let mut source = SyntheticSource::new(SignalSpec::new(SignalKind::Silence, 0.25), SR);
        assert_eq!(source.remaining(), 4000);

        let sizes: Vec<usize> = std::iter::from_fn(|| source.next_chunk(1600))
            .map(|c| c.len())
            .collect();
        assert_eq!(sizes, vec![1600, 1600, 800]);
        assert!(source.next_chunk(1600).is_none());
    }
}
