//! Core analysis pipeline modules

pub mod analysis;
pub mod capture;
pub mod dsp;
pub mod evidence;
pub mod fusion;
pub mod pipeline;
pub mod visualization;

pub use analysis::{HeuristicClassifier, ScoreModel, SpectralAnalyzer};
pub use capture::{AudioChunk, CaptureBuffer, CaptureHandle};
pub use evidence::{EvidenceBundle, EvidenceError, EvidenceMetadata, EvidenceStore};
pub use fusion::fuse_scores;
pub use pipeline::{ChunkOutcome, GuardPipeline};
