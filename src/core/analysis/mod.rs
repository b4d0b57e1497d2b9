//! Spectral analysis and heuristic scoring

pub mod classifier;
pub mod spectral;

pub use classifier::{HeuristicClassifier, ScoreModel};
pub use spectral::{HighBandReading, SpectralAnalyzer};
