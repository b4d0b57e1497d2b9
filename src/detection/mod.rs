//! Detection result and event types

pub mod events;
pub mod result;

pub use events::{EventLog, EventLogEntry};
pub use result::{AnalysisReport, ClassScores, FusionResult, RiskLevel};
