// src/config/mod.rs
//
// Pipeline configuration and sensitivity presets

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Preset sensitivity profiles for common deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensitivityPreset {
    /// Quiet environments where false alerts are costly
    Relaxed,
    /// Balanced default
    Balanced,
    /// Hostile environments - lowest alert thresholds
    Paranoid,
}

impl SensitivityPreset {
    /// The sensitivity value this preset maps to (0..1, higher = more alerts)
    pub fn sensitivity(&self) -> f32 {
        match self {
            SensitivityPreset::Relaxed => 0.25,
            SensitivityPreset::Balanced => 0.5,
            SensitivityPreset::Paranoid => 0.85,
        }
    }
}

/// Complete pipeline configuration. Constructed once and handed to
/// `GuardPipeline`; the pipeline holds no other mutable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Expected input sample rate in Hz
    pub sample_rate: u32,
    /// Channel count of the raw producer stream (downmixed to mono on push)
    pub channels: u16,
    /// Nominal chunk duration in seconds
    pub chunk_seconds: f32,
    /// Alert sensitivity, 0..1 (raising it never raises alert thresholds)
    pub sensitivity: f32,
    /// High-band cutoff for the rule detector in Hz
    pub min_freq_hz: f32,
    /// Energy fraction above the cutoff that flags the rule detector
    pub rule_threshold: f32,
    /// Mel filterbank size
    pub n_mels: usize,
    /// FFT size for mel frames
    pub mel_fft_size: usize,
    /// Hop between mel frames in samples
    pub mel_hop_size: usize,
    /// Capture queue capacity in producer blocks
    pub queue_capacity: usize,
    /// Directory evidence bundles are written under
    pub evidence_dir: PathBuf,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
            chunk_seconds: 1.0,
            sensitivity: SensitivityPreset::Balanced.sensitivity(),
            min_freq_hz: 18_000.0,
            rule_threshold: 0.1,
            n_mels: 64,
            mel_fft_size: 1024,
            mel_hop_size: 512,
            queue_capacity: 64,
            evidence_dir: default_evidence_dir(),
        }
    }
}

impl GuardConfig {
    /// Configuration with sensitivity taken from a preset
    pub fn with_preset(preset: SensitivityPreset) -> Self {
        Self {
            sensitivity: preset.sensitivity(),
            ..Default::default()
        }
    }

    /// Target chunk length in samples
    pub fn chunk_len(&self) -> usize {
        (self.sample_rate as f32 * self.chunk_seconds) as usize
    }
}

/// Default evidence location under the platform data directory,
/// falling back to a relative path when no data dir is available.
pub fn default_evidence_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("audioguardr").join("evidence"))
        .unwrap_or_else(|| PathBuf::from("evidence"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chunk_len() {
        let config = GuardConfig::default();
        assert_eq!(config.chunk_len(), 44_100);
    }

    #[test]
    fn test_preset_ordering() {
        assert!(
            SensitivityPreset::Relaxed.sensitivity() < SensitivityPreset::Balanced.sensitivity()
        );
        assert!(
            SensitivityPreset::Balanced.sensitivity() < SensitivityPreset::Paranoid.sensitivity()
        );
    }

    #[test]
    fn test_preset_config() {
        let config = GuardConfig::with_preset(SensitivityPreset::Paranoid);
        assert!((config.sensitivity - 0.85).abs() < 1e-6);
        assert_eq!(config.sample_rate, 44_100);
    }
}
