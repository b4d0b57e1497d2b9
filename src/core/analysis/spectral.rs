// src/core/analysis/spectral.rs
//
// Rule-based high-band energy detection and mel feature extraction.
// The high-band ratio is the cheap always-on detector; the mel matrix
// feeds the score model when the backend is available.

use crate::config::GuardConfig;
use crate::core::dsp::{bin_frequency, log_mel_spectrogram, MelSpectrogram, RealFft};

/// Outcome of the rule detector for one chunk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighBandReading {
    /// Fraction of total spectral energy at or above the cutoff, 0..1
    pub ratio: f32,
    /// ratio >= threshold
    pub flagged: bool,
}

impl HighBandReading {
    fn silent() -> Self {
        Self {
            ratio: 0.0,
            flagged: false,
        }
    }
}

/// Spectral analyzer with configurable cutoff and mel parameters
#[derive(Debug, Clone)]
pub struct SpectralAnalyzer {
    min_freq_hz: f32,
    flag_threshold: f32,
    n_mels: usize,
    mel_fft_size: usize,
    mel_hop_size: usize,
}

impl SpectralAnalyzer {
    pub fn new(min_freq_hz: f32, flag_threshold: f32) -> Self {
        Self {
            min_freq_hz,
            flag_threshold,
            n_mels: 64,
            mel_fft_size: 1024,
            mel_hop_size: 512,
        }
    }

    pub fn from_config(config: &GuardConfig) -> Self {
        Self {
            min_freq_hz: config.min_freq_hz,
            flag_threshold: config.rule_threshold,
            n_mels: config.n_mels,
            mel_fft_size: config.mel_fft_size,
            mel_hop_size: config.mel_hop_size,
        }
    }

    /// Energy fraction at or above the cutoff frequency.
    ///
    /// Computed over the magnitude spectrum of the whole chunk; the
    /// epsilon in the denominator keeps this total over silent input.
    /// Empty input reads as 0.0, unflagged.
    pub fn high_band(&self, samples: &[f32], sample_rate: u32) -> HighBandReading {
        if samples.is_empty() || sample_rate == 0 {
            return HighBandReading::silent();
        }

        let mut fft = RealFft::new();
        let spectrum = fft.magnitude_spectrum(samples);
        let n = samples.len();

        let mut high_energy = 0.0f64;
        let mut total_energy = 0.0f64;
        for (bin, &mag) in spectrum.iter().enumerate() {
            let energy = (mag as f64) * (mag as f64);
            total_energy += energy;
            if bin_frequency(bin, n, sample_rate) >= self.min_freq_hz {
                high_energy += energy;
            }
        }

        let ratio = (high_energy / (total_energy + 1e-12)) as f32;
        HighBandReading {
            ratio,
            flagged: ratio >= self.flag_threshold,
        }
    }

    /// Log-mel features for the score model, absent when the mel
    /// backend is unavailable or the chunk is too short for one frame
    pub fn log_mel(&self, samples: &[f32], sample_rate: u32) -> Option<MelSpectrogram> {
        log_mel_spectrogram(
            samples,
            sample_rate,
            self.n_mels,
            self.mel_fft_size,
            self.mel_hop_size,
        )
    }
}
