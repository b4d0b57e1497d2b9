//! Append-only in-memory record of alerting decisions

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::result::RiskLevel;

/// One alerting decision, stamped at append time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Unix timestamp (seconds)
    pub ts: i64,
    pub level: RiskLevel,
    pub score: f32,
    /// Evidence bundle fingerprint, when a bundle was persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Process-lifetime event log. Entries are never mutated or removed;
/// persistence beyond memory is an outer-layer concern.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<EventLogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, level: RiskLevel, score: f32, fingerprint: Option<String>) {
        let entry = EventLogEntry {
            ts: Utc::now().timestamp(),
            level,
            score,
            fingerprint,
        };
        log::info!(
            "event logged: {} score={:.3} fingerprint={}",
            entry.level,
            entry.score,
            entry.fingerprint.as_deref().unwrap_or("-")
        );
        self.entries.push(entry);
    }

    /// Entries in arrival order
    pub fn entries(&self) -> &[EventLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
