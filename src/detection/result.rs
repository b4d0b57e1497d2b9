//! Detection result types shared across the analysis pipeline

use serde::{Deserialize, Serialize};

/// Risk level for a single analyzed chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// No elevated signal detected
    Safe,
    /// Elevated signal - worth logging, below the threat bar
    Suspicious,
    /// High confidence audio threat
    Threat,
}

impl RiskLevel {
    /// Whether this level triggers evidence capture and event logging
    pub fn is_alerting(&self) -> bool {
        !matches!(self, RiskLevel::Safe)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::Suspicious => "SUSPICIOUS",
            RiskLevel::Threat => "THREAT",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "✓",
            RiskLevel::Suspicious => "?",
            RiskLevel::Threat => "✗",
        }
    }

    pub fn color_code(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "\x1b[32m",       // green
            RiskLevel::Suspicious => "\x1b[33m", // yellow
            RiskLevel::Threat => "\x1b[31m",     // red
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-class confidence vector produced by a score model.
///
/// Components are each in [0,1] and sum to 1 after `finalized()`.
/// Serializes as a map keyed by class name (`Normal`, `Ultrasonic`,
/// `Hidden`, `Deepfake`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClassScores {
    pub normal: f32,
    pub ultrasonic: f32,
    pub hidden: f32,
    pub deepfake: f32,
}

impl ClassScores {
    /// The all-clear vector: Normal 1, everything else 0
    pub fn all_normal() -> Self {
        Self {
            normal: 1.0,
            ultrasonic: 0.0,
            hidden: 0.0,
            deepfake: 0.0,
        }
    }

    /// Clamp components to >= 0 and renormalize to sum 1.
    /// A degenerate (all-zero) vector collapses to `all_normal`.
    pub fn finalized(self) -> Self {
        let normal = self.normal.max(0.0);
        let ultrasonic = self.ultrasonic.max(0.0);
        let hidden = self.hidden.max(0.0);
        let deepfake = self.deepfake.max(0.0);
        let sum = normal + ultrasonic + hidden + deepfake;
        if sum <= 0.0 {
            return Self::all_normal();
        }
        Self {
            normal: normal / sum,
            ultrasonic: ultrasonic / sum,
            hidden: hidden / sum,
            deepfake: deepfake / sum,
        }
    }

    /// Highest confidence among the non-Normal classes
    pub fn max_non_normal(&self) -> f32 {
        self.ultrasonic.max(self.hidden).max(self.deepfake)
    }

    /// (class name, confidence) pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> {
        [
            ("Normal", self.normal),
            ("Ultrasonic", self.ultrasonic),
            ("Hidden", self.hidden),
            ("Deepfake", self.deepfake),
        ]
        .into_iter()
    }

    /// The dominant class and its confidence
    pub fn top(&self) -> (&'static str, f32) {
        self.iter().fold(("Normal", f32::MIN), |best, cur| {
            if cur.1 > best.1 {
                cur
            } else {
                best
            }
        })
    }
}

/// Fused decision for one chunk
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    pub level: RiskLevel,
    pub combined_score: f32,
}

/// Complete analysis output for one chunk, as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub level: RiskLevel,
    pub combined_score: f32,
    pub class_scores: ClassScores,
    pub rule_ratio: f32,
}

impl AnalysisReport {
    pub fn fusion(&self) -> FusionResult {
        FusionResult {
            level: self.level,
            combined_score: self.combined_score,
        }
    }
}
