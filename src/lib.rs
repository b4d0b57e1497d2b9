//! AudioGuardr - Real-time audio threat monitoring
//!
//! A continuous analysis pipeline that watches an audio stream for
//! ultrasonic carriers, hidden in-band content, and synthetic audio,
//! and captures tamper-evident evidence when risk is elevated.
//!
//! ## Features
//!
//! - **Lock-free producer hand-off**: the audio source pushes sample
//!   blocks without ever blocking; the analysis loop assembles
//!   fixed-length, peak-normalized chunks with a bounded wait
//! - **Rule + model fusion**: a cheap high-band energy detector runs
//!   on every chunk and is fused with a multi-class score model under
//!   a tunable sensitivity
//! - **Swappable scoring**: the built-in classifier is a deterministic
//!   heuristic behind the `ScoreModel` trait, so a learned model can
//!   replace it without touching fusion or evidence capture
//! - **Tamper-evident evidence**: alerting chunks are persisted as
//!   immutable bundles (lossless WAV, spectrogram, metadata) with a
//!   SHA-256 content fingerprint
//! - **Graceful degradation**: mel features are optional (`mel`
//!   feature flag); every stage has a deterministic fallback for
//!   degenerate input
//!
//! ## Module Structure
//!
//! - `core` - capture, DSP, analysis, fusion, evidence pipeline
//! - `config` - pipeline configuration and sensitivity presets
//! - `detection` - result, score, and event types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use audioguardr::config::GuardConfig;
//! use audioguardr::core::GuardPipeline;
//! use std::time::Duration;
//!
//! let config = GuardConfig::default();
//! let chunk_len = config.chunk_len();
//! let mut pipeline = GuardPipeline::new(config);
//!
//! let mut buffer = pipeline.capture_buffer();
//! let handle = buffer.handle();
//! // hand `handle` to the audio source; it pushes sample blocks
//!
//! while let Some(chunk) = buffer.pop_chunk(chunk_len, Duration::from_secs(2)) {
//!     let outcome = pipeline.process(&chunk, false);
//!     println!("{} {:.3}", outcome.report.level, outcome.report.combined_score);
//! }
//! ```
//!
//! ## Risk Levels
//!
//! | Level      | Meaning                              | Side effects            |
//! |------------|--------------------------------------|-------------------------|
//! | SAFE       | No elevated signal                   | none                    |
//! | SUSPICIOUS | Elevated signal below the threat bar | event log + evidence    |
//! | THREAT     | High confidence audio threat         | event log + evidence    |

// Core analysis pipeline
pub mod core;

// Configuration and presets
pub mod config;

// Detection result and event types
pub mod detection;

// Re-export commonly used types at crate root for convenience
pub use crate::config::{GuardConfig, SensitivityPreset};
pub use crate::core::{
    fuse_scores, AudioChunk, CaptureBuffer, CaptureHandle, ChunkOutcome, EvidenceBundle,
    EvidenceError, EvidenceMetadata, EvidenceStore, GuardPipeline, HeuristicClassifier,
    ScoreModel, SpectralAnalyzer,
};
pub use crate::detection::{
    AnalysisReport, ClassScores, EventLog, EventLogEntry, FusionResult, RiskLevel,
};
