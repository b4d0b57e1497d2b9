//! Log-mel feature extraction (optional backend, `mel` feature)

#[cfg(feature = "mel")]
use num_complex::Complex;
#[cfg(feature = "mel")]
use rustfft::FftPlanner;

#[cfg(feature = "mel")]
use super::windows::{create_window, WindowType};

/// Floor applied to dB values, 80 dB below the matrix maximum
pub const DB_FLOOR: f32 = -80.0;

/// Log-scaled mel feature matrix, bins x time-frames, dB scale.
/// Values lie in [DB_FLOOR, 0] relative to the matrix maximum.
#[derive(Debug, Clone)]
pub struct MelSpectrogram {
    data: Vec<Vec<f32>>,
}

impl MelSpectrogram {
    pub fn from_rows(data: Vec<Vec<f32>>) -> Self {
        Self { data }
    }

    pub fn bins(&self) -> usize {
        self.data.len()
    }

    pub fn frames(&self) -> usize {
        self.data.first().map(|row| row.len()).unwrap_or(0)
    }

    /// dB values of one mel bin across time
    pub fn bin(&self, index: usize) -> &[f32] {
        &self.data[index]
    }

    /// A matrix with no bins or no frames carries no signal
    pub fn is_degenerate(&self) -> bool {
        self.bins() == 0 || self.frames() == 0
    }

    /// Spread between the largest and smallest value in the matrix
    pub fn value_span(&self) -> f32 {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for row in &self.data {
            for &v in row {
                min = min.min(v);
                max = max.max(v);
            }
        }
        if min > max {
            0.0
        } else {
            max - min
        }
    }

    /// Mean absolute value over all entries
    pub fn mean_abs(&self) -> f32 {
        let count = self.bins() * self.frames();
        if count == 0 {
            return 0.0;
        }
        let sum: f32 = self.data.iter().flatten().map(|v| v.abs()).sum();
        sum / count as f32
    }
}

/// Compute a log-mel spectrogram, or `None` when the backend is
/// unavailable or the waveform is shorter than one FFT frame.
/// Downstream stages treat absence as "use the waveform fallback".
#[cfg(feature = "mel")]
pub fn log_mel_spectrogram(
    samples: &[f32],
    sample_rate: u32,
    n_mels: usize,
    fft_size: usize,
    hop_size: usize,
) -> Option<MelSpectrogram> {
    if samples.len() < fft_size || n_mels == 0 || hop_size == 0 || sample_rate == 0 {
        return None;
    }

    let num_frames = (samples.len() - fft_size) / hop_size + 1;
    let freq_bins = fft_size / 2 + 1;

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    let window = create_window(fft_size, WindowType::Hann);

    // Power spectrum per frame
    let mut power = vec![vec![0.0f32; num_frames]; freq_bins];
    for frame in 0..num_frames {
        let start = frame * hop_size;
        let mut buffer: Vec<Complex<f32>> = (0..fft_size)
            .map(|i| Complex::new(samples[start + i] * window[i], 0.0))
            .collect();
        fft.process(&mut buffer);
        for (bin, c) in buffer.iter().take(freq_bins).enumerate() {
            power[bin][frame] = c.re * c.re + c.im * c.im;
        }
    }

    // Triangular mel filterbank over the power spectrum
    let filters = mel_filterbank(n_mels, fft_size, sample_rate);
    let mut mel_power = vec![vec![0.0f32; num_frames]; n_mels];
    for (m, filter) in filters.iter().enumerate() {
        for frame in 0..num_frames {
            let mut acc = 0.0f32;
            for &(bin, weight) in filter {
                acc += weight * power[bin][frame];
            }
            mel_power[m][frame] = acc;
        }
    }

    // Power to dB referenced to the matrix maximum, floored 80 dB below it
    let amin = 1e-10f32;
    let reference = mel_power
        .iter()
        .flatten()
        .fold(amin, |acc, &p| acc.max(p));
    let rows: Vec<Vec<f32>> = mel_power
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|p| {
                    let db = 10.0 * (p.max(amin).log10() - reference.log10());
                    db.max(DB_FLOOR)
                })
                .collect()
        })
        .collect();

    Some(MelSpectrogram::from_rows(rows))
}

/// Stub when the mel backend is compiled out
#[cfg(not(feature = "mel"))]
pub fn log_mel_spectrogram(
    _samples: &[f32],
    _sample_rate: u32,
    _n_mels: usize,
    _fft_size: usize,
    _hop_size: usize,
) -> Option<MelSpectrogram> {
    None
}

/// Sparse triangular filters: for each mel band, the (freq bin, weight)
/// pairs with non-zero weight
#[cfg(feature = "mel")]
fn mel_filterbank(n_mels: usize, fft_size: usize, sample_rate: u32) -> Vec<Vec<(usize, f32)>> {
    let freq_bins = fft_size / 2 + 1;
    let max_mel = freq_to_mel(sample_rate as f32 / 2.0);

    // n_mels + 2 equally spaced mel points mapped back to fractional bins
    let bin_points: Vec<f32> = (0..n_mels + 2)
        .map(|i| {
            let mel = max_mel * i as f32 / (n_mels + 1) as f32;
            mel_to_freq(mel) / sample_rate as f32 * fft_size as f32
        })
        .collect();

    (0..n_mels)
        .map(|m| {
            let lower = bin_points[m];
            let center = bin_points[m + 1];
            let upper = bin_points[m + 2];
            let mut filter = Vec::new();
            for bin in lower.floor() as usize..=(upper.ceil() as usize).min(freq_bins - 1) {
                let b = bin as f32;
                let weight = if b < center {
                    (b - lower) / (center - lower).max(1e-6)
                } else {
                    (upper - b) / (upper - center).max(1e-6)
                };
                if weight > 0.0 {
                    filter.push((bin, weight));
                }
            }
            filter
        })
        .collect()
}

#[cfg(feature = "mel")]
fn freq_to_mel(freq: f32) -> f32 {
    2595.0 * (1.0 + freq / 700.0).log10()
}

#[cfg(feature = "mel")]
fn mel_to_freq(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "mel")]
    fn sine(freq: f32, sr: u32, secs: f32) -> Vec<f32> {
        (0..(sr as f32 * secs) as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    #[test]
    fn test_too_short_returns_none() {
        let samples = vec![0.0f32; 512];
        assert!(log_mel_spectrogram(&samples, 44_100, 64, 1024, 512).is_none());
    }

    #[cfg(feature = "mel")]
    #[test]
    fn test_shape_and_range() {
        let samples = sine(1000.0, 44_100, 1.0);
        let mel = log_mel_spectrogram(&samples, 44_100, 64, 1024, 512).unwrap();
        assert_eq!(mel.bins(), 64);
        assert_eq!(mel.frames(), (44_100 - 1024) / 512 + 1);
        for b in 0..mel.bins() {
            for &v in mel.bin(b) {
                assert!((DB_FLOOR..=0.0).contains(&v));
            }
        }
    }

    #[cfg(feature = "mel")]
    #[test]
    fn test_silence_is_flat() {
        let samples = vec![0.0f32; 44_100];
        let mel = log_mel_spectrogram(&samples, 44_100, 64, 1024, 512).unwrap();
        assert!(mel.value_span() < 1e-6);
    }

    #[cfg(feature = "mel")]
    #[test]
    fn test_high_tone_excites_high_bins() {
        let mel = log_mel_spectrogram(&sine(19_000.0, 44_100, 1.0), 44_100, 64, 1024, 512).unwrap();
        let top_quarter: f32 = (48..64).map(|b| mel.bin(b).iter().sum::<f32>()).sum();
        let bottom_quarter: f32 = (0..16).map(|b| mel.bin(b).iter().sum::<f32>()).sum();
        // dB values are <= 0; closer to zero means more energy
        assert!(top_quarter > bottom_quarter);
    }

    #[test]
    fn test_degenerate_matrix() {
        let mel = MelSpectrogram::from_rows(Vec::new());
        assert!(mel.is_degenerate());
        assert_eq!(mel.mean_abs(), 0.0);
    }
}
