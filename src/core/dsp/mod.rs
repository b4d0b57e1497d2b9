//! DSP primitives: windowing, real FFT, mel features

pub mod fft;
pub mod mel;
pub mod windows;

pub use fft::{bin_frequency, RealFft};
pub use mel::{log_mel_spectrogram, MelSpectrogram, DB_FLOOR};
pub use windows::{create_window, WindowType};
