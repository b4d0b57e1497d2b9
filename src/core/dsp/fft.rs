//! Real-valued FFT helpers with optional windowing

use num_complex::Complex;
use realfft::RealFftPlanner;

use super::windows::{create_window, WindowType};

/// Real-input forward transforms over arbitrary-length signals.
///
/// Plans are cached per length by the underlying planner, so repeated
/// transforms of same-sized chunks are cheap.
pub struct RealFft {
    planner: RealFftPlanner<f32>,
}

impl RealFft {
    pub fn new() -> Self {
        Self {
            planner: RealFftPlanner::new(),
        }
    }

    /// Magnitude spectrum of the full input, no windowing.
    /// Returns len/2 + 1 bins; empty input yields an empty spectrum.
    pub fn magnitude_spectrum(&mut self, samples: &[f32]) -> Vec<f32> {
        self.transform(samples.to_vec())
    }

    /// Magnitude spectrum with a window applied first
    pub fn windowed_magnitude_spectrum(
        &mut self,
        samples: &[f32],
        window_type: WindowType,
    ) -> Vec<f32> {
        let window = create_window(samples.len(), window_type);
        let windowed: Vec<f32> = samples
            .iter()
            .zip(window.iter())
            .map(|(&s, &w)| s * w)
            .collect();
        self.transform(windowed)
    }

    fn transform(&mut self, mut input: Vec<f32>) -> Vec<f32> {
        if input.is_empty() {
            return Vec::new();
        }
        let r2c = self.planner.plan_fft_forward(input.len());
        let mut spectrum: Vec<Complex<f32>> = r2c.make_output_vec();
        // Buffer lengths come from the planner, so a length mismatch
        // cannot occur; treat the impossible error as an empty spectrum.
        if r2c.process(&mut input, &mut spectrum).is_err() {
            return Vec::new();
        }
        spectrum.iter().map(|c| c.norm()).collect()
    }
}

impl Default for RealFft {
    fn default() -> Self {
        Self::new()
    }
}

/// Center frequency of bin `bin` for an `n`-point transform
pub fn bin_frequency(bin: usize, n: usize, sample_rate: u32) -> f32 {
    bin as f32 * sample_rate as f32 / n as f32
}
