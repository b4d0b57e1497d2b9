// src/core/visualization/spectrogram.rs
//
// Evidence imagery: spectrogram rendering with a plain waveform plot
// as the fallback when the chunk is too short for spectral frames.

use anyhow::Result;
use image::{ImageBuffer, Rgb};
use num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::PI;
use std::path::Path;

/// Render configuration
#[derive(Debug, Clone)]
pub struct SpectrogramConfig {
    pub width: u32,
    pub height: u32,
    pub fft_size: usize,
    pub hop_size: usize,
    pub min_db: f32,
    pub max_db: f32,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        // Tuned for one-second evidence chunks
        Self {
            width: 800,
            height: 320,
            fft_size: 1024,
            hop_size: 256,
            min_db: -90.0,
            max_db: 0.0,
        }
    }
}

/// Render a linear-frequency spectrogram of the chunk to a PNG
pub fn render_spectrogram(
    samples: &[f32],
    _sample_rate: u32,
    config: &SpectrogramConfig,
    output_path: &Path,
) -> Result<()> {
    let num_frames = samples.len().saturating_sub(config.fft_size) / config.hop_size + 1;
    if samples.len() < config.fft_size || num_frames == 0 {
        anyhow::bail!("audio too short for spectrogram rendering");
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(config.fft_size);

    let window: Vec<f32> = (0..config.fft_size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / config.fft_size as f32).cos()))
        .collect();

    let freq_bins = config.fft_size / 2;
    let mut spectrogram = vec![vec![0.0f32; num_frames]; freq_bins];

    for frame in 0..num_frames {
        let start = frame * config.hop_size;
        let end = (start + config.fft_size).min(samples.len());

        let mut buffer: Vec<Complex<f32>> = (0..config.fft_size)
            .map(|i| {
                let sample = if start + i < end { samples[start + i] } else { 0.0 };
                Complex::new(sample * window[i], 0.0)
            })
            .collect();

        fft.process(&mut buffer);

        for (bin, c) in buffer.iter().take(freq_bins).enumerate() {
            let magnitude = (c.re * c.re + c.im * c.im).sqrt();
            let db = if magnitude > 1e-10 {
                20.0 * magnitude.log10()
            } else {
                config.min_db
            };
            spectrogram[bin][frame] = db.clamp(config.min_db, config.max_db);
        }
    }

    let mut img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::new(config.width, config.height);
    let x_scale = num_frames as f32 / config.width as f32;
    let y_scale = freq_bins as f32 / config.height as f32;

    for y in 0..config.height {
        for x in 0..config.width {
            let frame_idx = ((x as f32 * x_scale) as usize).min(num_frames - 1);
            // Flip Y so low frequencies sit at the bottom
            let bin_idx = (((config.height - 1 - y) as f32 * y_scale) as usize).min(freq_bins - 1);

            let db = spectrogram[bin_idx][frame_idx];
            let normalized = (db - config.min_db) / (config.max_db - config.min_db);
            img.put_pixel(x, y, db_to_color(normalized));
        }
    }

    img.save(output_path)?;
    Ok(())
}

/// Render a time-domain amplitude envelope as the fallback image
pub fn render_waveform(
    samples: &[f32],
    _sample_rate: u32,
    width: u32,
    height: u32,
    output_path: &Path,
) -> Result<()> {
    if samples.is_empty() {
        anyhow::bail!("no samples to plot");
    }

    let background = Rgb([16u8, 18, 32]);
    let trace = Rgb([98u8, 200, 148]);
    let mut img: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_pixel(width, height, background);

    let mid = height as f32 / 2.0;
    let samples_per_col = (samples.len() as f32 / width as f32).max(1.0);

    for x in 0..width {
        let start = (x as f32 * samples_per_col) as usize;
        let end = (((x + 1) as f32 * samples_per_col) as usize).min(samples.len());
        if start >= end {
            continue;
        }

        let slice = &samples[start..end];
        let lo = slice.iter().copied().fold(f32::MAX, f32::min).clamp(-1.0, 1.0);
        let hi = slice.iter().copied().fold(f32::MIN, f32::max).clamp(-1.0, 1.0);

        let y_top = (mid - hi * (mid - 1.0)) as u32;
        let y_bottom = (mid - lo * (mid - 1.0)) as u32;
        for y in y_top..=y_bottom.min(height - 1) {
            img.put_pixel(x, y, trace);
        }
    }

    img.save(output_path)?;
    Ok(())
}

fn db_to_color(value: f32) -> Rgb<u8> {
    // Viridis-like colormap
    let v = value.clamp(0.0, 1.0);

    let r = (68.0 + v * (235.0 - 68.0)) as u8;
    let g = (1.0 + v * (237.0 - 1.0)) as u8;
    let b = (84.0 + v * (32.0 - 84.0 + (1.0 - v) * 150.0)) as u8;

    Rgb([r, g, b])
}
