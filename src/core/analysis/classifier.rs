// src/core/analysis/classifier.rs
//
// Heuristic multi-class scorer. A fixed closed-form transform, not a
// learned model; the ScoreModel trait is the substitution seam for a
// real inference backend later.

use crate::core::dsp::{MelSpectrogram, RealFft, WindowType, DB_FLOOR};
use crate::detection::ClassScores;

/// Scoring contract: features and/or waveform in, class confidences out.
///
/// Implementations must be total - any input, including empty waveforms
/// and degenerate feature matrices, yields a valid normalized vector.
pub trait ScoreModel: Send {
    fn predict(
        &self,
        features: Option<&MelSpectrogram>,
        waveform: &[f32],
        sample_rate: u32,
    ) -> ClassScores;
}

/// Bottom of the audible band considered for hidden-content energy
const MID_BAND_LOW_HZ: f32 = 300.0;
/// Ultrasonic cutoff used by both scoring paths
const HIGH_BAND_HZ: f32 = 18_000.0;

/// Deterministic heuristic scorer.
///
/// With mel features available it scores from band energies and
/// temporal variance; otherwise it falls back to FFT band ratios over
/// the raw waveform. The fallback cannot score the Deepfake class and
/// leaves it at zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self
    }

    fn predict_from_mel(&self, mel: &MelSpectrogram) -> ClassScores {
        let bins = mel.bins();

        // Per-bin time-average energy, floor-clipped
        let energies: Vec<f32> = (0..bins)
            .map(|b| {
                let row = mel.bin(b);
                row.iter().map(|&v| v.max(DB_FLOOR)).sum::<f32>() / row.len() as f32
            })
            .collect();

        // Min-max normalize across bins
        let e_min = energies.iter().copied().fold(f32::MAX, f32::min);
        let e_max = energies.iter().copied().fold(f32::MIN, f32::max);
        let norm: Vec<f32> = if e_max - e_min > 1e-6 {
            energies.iter().map(|&e| (e - e_min) / (e_max - e_min)).collect()
        } else {
            vec![0.0; bins]
        };

        let high_start = (bins as f32 * 0.75) as usize;
        let mid_start = (bins as f32 * 0.3) as usize;
        let high_energy = mean(&norm[high_start.min(bins)..]);
        let mid_energy = mean(&norm[mid_start.min(bins)..high_start.min(bins)]);

        let ultrasonic = (high_energy * 1.6).min(1.0);
        let hidden = (mid_energy * 1.2 * (1.0 - ultrasonic)).min(1.0);

        // Low temporal variance reads as synthetic audio
        let time_var = mean(
            &(0..bins)
                .map(|b| variance(mel.bin(b)))
                .collect::<Vec<f32>>(),
        );
        let denom = mel.mean_abs() + 1e-6;
        let deepfake = ((1.0 - time_var / denom) * 0.8).clamp(0.0, 1.0);

        let normal = (1.0 - (ultrasonic + hidden + deepfake) * 0.9).max(0.0);

        ClassScores {
            normal,
            ultrasonic,
            hidden,
            deepfake,
        }
        .finalized()
    }

    fn predict_from_waveform(&self, waveform: &[f32], sample_rate: u32) -> ClassScores {
        if waveform.is_empty() || sample_rate == 0 {
            return ClassScores::all_normal();
        }

        let mut fft = RealFft::new();
        let spectrum = fft.windowed_magnitude_spectrum(waveform, WindowType::Hann);
        let n = waveform.len();
        let bin_hz = sample_rate as f32 / n as f32;

        let mut high_energy = 0.0f64;
        let mut mid_energy = 0.0f64;
        let mut total_energy = 0.0f64;
        for (bin, &mag) in spectrum.iter().enumerate() {
            let freq = bin as f32 * bin_hz;
            let energy = (mag as f64) * (mag as f64);
            total_energy += energy;
            if freq >= HIGH_BAND_HZ {
                high_energy += energy;
            } else if freq >= MID_BAND_LOW_HZ {
                mid_energy += energy;
            }
        }

        let high_ratio = (high_energy / (total_energy + 1e-12)) as f32;
        let mid_ratio = (mid_energy / (total_energy + 1e-12)) as f32;

        let ultrasonic = (high_ratio * 10.0).min(1.0);
        let hidden = (mid_ratio * 2.0 * (1.0 - ultrasonic)).min(1.0);
        // The waveform path has no temporal-variance signal to score
        // synthetic audio from; the class stays at zero here.
        let deepfake = 0.0;
        let normal = (1.0 - (ultrasonic + hidden + deepfake)).max(0.0);

        ClassScores {
            normal,
            ultrasonic,
            hidden,
            deepfake,
        }
        .finalized()
    }
}

impl ScoreModel for HeuristicClassifier {
    fn predict(
        &self,
        features: Option<&MelSpectrogram>,
        waveform: &[f32],
        sample_rate: u32,
    ) -> ClassScores {
        match features {
            // A degenerate or flat matrix (silence, DC) carries no
            // spectral shape to score from; use the waveform path so
            // silent input reads as Normal rather than low-variance
            // synthetic audio.
            Some(mel) if !mel.is_degenerate() && mel.value_span() > 1e-6 => {
                self.predict_from_mel(mel)
            }
            _ => self.predict_from_waveform(waveform, sample_rate),
        }
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Population variance
fn variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|&v| (v - m) * (v - m)).sum::<f32>() / values.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 44_100;

    fn sine(freq: f32, amplitude: f32) -> Vec<f32> {
        (0..SR as usize)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / SR as f32).sin())
            .collect()
    }

    fn assert_normalized(scores: &ClassScores) {
        let sum = scores.normal + scores.ultrasonic + scores.hidden + scores.deepfake;
        assert!((sum - 1.0).abs() < 1e-6, "sum was {sum}");
        for (name, value) in scores.iter() {
            assert!((0.0..=1.0).contains(&value), "{name} out of range: {value}");
        }
    }

    #[test]
    fn test_empty_waveform_is_normal() {
        let scores = HeuristicClassifier::new().predict(None, &[], SR);
        assert_eq!(scores, ClassScores::all_normal());
    }

    #[test]
    fn test_all_zero_waveform_is_exactly_normal() {
        let silence = vec![0.0f32; SR as usize];
        let scores = HeuristicClassifier::new().predict(None, &silence, SR);
        assert_eq!(scores.normal, 1.0);
        assert_eq!(scores.ultrasonic, 0.0);
        assert_eq!(scores.hidden, 0.0);
        assert_eq!(scores.deepfake, 0.0);
    }

    #[cfg(feature = "mel")]
    #[test]
    fn test_all_zero_waveform_with_features_is_normal() {
        // A silent chunk yields a flat mel matrix, which must not be
        // scored as synthetic audio
        let silence = vec![0.0f32; SR as usize];
        let mel = crate::core::dsp::log_mel_spectrogram(&silence, SR, 64, 1024, 512).unwrap();
        let scores = HeuristicClassifier::new().predict(Some(&mel), &silence, SR);
        assert_eq!(scores, ClassScores::all_normal());
    }

    #[test]
    fn test_ultrasonic_sine_waveform_path() {
        let scores = HeuristicClassifier::new().predict(None, &sine(19_000.0, 0.5), SR);
        assert_normalized(&scores);
        assert!(scores.ultrasonic > 0.9, "ultrasonic was {}", scores.ultrasonic);
        assert_eq!(scores.deepfake, 0.0);
    }

    #[test]
    fn test_audible_sine_waveform_path_scores_hidden() {
        let scores = HeuristicClassifier::new().predict(None, &sine(1_000.0, 0.5), SR);
        assert_normalized(&scores);
        assert!(scores.hidden > 0.5, "hidden was {}", scores.hidden);
    }

    #[test]
    fn test_mel_path_high_bins_score_ultrasonic() {
        // Hot top-quarter bins with temporal variation (so the
        // low-variance synthetic signal does not fire)
        let rows: Vec<Vec<f32>> = (0..64)
            .map(|b| {
                (0..10)
                    .map(|t| {
                        if b >= 48 {
                            if t % 2 == 0 {
                                0.0
                            } else {
                                -40.0
                            }
                        } else {
                            -80.0
                        }
                    })
                    .collect()
            })
            .collect();
        let mel = MelSpectrogram::from_rows(rows);
        let scores = HeuristicClassifier::new().predict(Some(&mel), &[], SR);
        assert_normalized(&scores);
        assert_eq!(scores.top().0, "Ultrasonic");
    }

    #[test]
    fn test_mel_path_low_variance_scores_deepfake() {
        // Static spectral slope, no temporal movement at all
        let rows: Vec<Vec<f32>> = (0..64)
            .map(|b| vec![-30.0 - 0.5 * b as f32; 20])
            .collect();
        let mel = MelSpectrogram::from_rows(rows);
        let scores = HeuristicClassifier::new().predict(Some(&mel), &[], SR);
        assert_normalized(&scores);
        assert_eq!(scores.top().0, "Deepfake");
        assert!(scores.deepfake > 0.5, "deepfake was {}", scores.deepfake);
    }

    #[test]
    fn test_degenerate_matrix_falls_back() {
        let mel = MelSpectrogram::from_rows(Vec::new());
        let scores = HeuristicClassifier::new().predict(Some(&mel), &sine(19_000.0, 0.5), SR);
        assert!(scores.ultrasonic > 0.9);
    }

    #[test]
    fn test_scores_normalized_across_inputs() {
        let classifier = HeuristicClassifier::new();
        for freq in [50.0, 440.0, 5_000.0, 12_000.0, 19_500.0, 21_000.0] {
            for amplitude in [0.01, 0.5, 1.0] {
                let scores = classifier.predict(None, &sine(freq, amplitude), SR);
                assert_normalized(&scores);
            }
        }
    }
}
