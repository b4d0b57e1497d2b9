//! Evidence image rendering

pub mod spectrogram;

pub use spectrogram::{render_spectrogram, render_waveform, SpectrogramConfig};
