// src/core/pipeline.rs
//
// The analysis-and-decision pipeline. One context object, constructed
// once, owns every stage; there is no process-wide state.

use crate::config::GuardConfig;
use crate::core::analysis::{HeuristicClassifier, ScoreModel, SpectralAnalyzer};
use crate::core::capture::{AudioChunk, CaptureBuffer};
use crate::core::evidence::{EvidenceBundle, EvidenceError, EvidenceStore};
use crate::core::fusion::fuse_scores;
use crate::detection::{AnalysisReport, EventLog};

/// Result of processing one chunk: the report, plus the persistence
/// outcome when the decision was an alerting one. A persistence error
/// never invalidates the report.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub report: AnalysisReport,
    pub evidence: Option<Result<EvidenceBundle, EvidenceError>>,
}

/// Analysis pipeline: spectral analysis, scoring, fusion, evidence.
///
/// `analyze` is pure and total; `process` adds the side effects
/// (event log, evidence bundle) for alerting decisions.
pub struct GuardPipeline {
    config: GuardConfig,
    analyzer: SpectralAnalyzer,
    model: Box<dyn ScoreModel>,
    evidence: EvidenceStore,
    events: EventLog,
}

impl GuardPipeline {
    /// Pipeline with the built-in heuristic score model
    pub fn new(config: GuardConfig) -> Self {
        Self::with_model(config, Box::new(HeuristicClassifier::new()))
    }

    /// Pipeline with a caller-supplied score model implementation
    pub fn with_model(config: GuardConfig, model: Box<dyn ScoreModel>) -> Self {
        let analyzer = SpectralAnalyzer::from_config(&config);
        let evidence = EvidenceStore::new(config.evidence_dir.clone());
        Self {
            config,
            analyzer,
            model,
            evidence,
            events: EventLog::new(),
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn evidence_store(&self) -> &EvidenceStore {
        &self.evidence
    }

    /// A capture buffer matching this pipeline's stream parameters
    pub fn capture_buffer(&self) -> CaptureBuffer {
        CaptureBuffer::new(
            self.config.sample_rate,
            self.config.channels,
            self.config.queue_capacity,
        )
    }

    /// Run the decision path on one chunk at the configured sensitivity
    pub fn analyze(&self, chunk: &AudioChunk, whitelist: bool) -> AnalysisReport {
        self.analyze_with(chunk, self.config.sensitivity, whitelist)
    }

    /// Run the decision path with an explicit sensitivity.
    /// Total over all inputs; degenerate chunks read as safe.
    pub fn analyze_with(
        &self,
        chunk: &AudioChunk,
        sensitivity: f32,
        whitelist: bool,
    ) -> AnalysisReport {
        let reading = self.analyzer.high_band(&chunk.samples, chunk.sample_rate);
        let features = self.analyzer.log_mel(&chunk.samples, chunk.sample_rate);
        let class_scores = self
            .model
            .predict(features.as_ref(), &chunk.samples, chunk.sample_rate);
        let fusion = fuse_scores(reading.ratio, &class_scores, sensitivity, whitelist);

        log::debug!(
            "chunk analyzed: level={} combined={:.3} rule={:.3} top={}",
            fusion.level,
            fusion.combined_score,
            reading.ratio,
            class_scores.top().0
        );

        AnalysisReport {
            level: fusion.level,
            combined_score: fusion.combined_score,
            class_scores,
            rule_ratio: reading.ratio,
        }
    }

    /// Analyze a chunk, then on an alerting level record the event and
    /// persist an evidence bundle. Persistence failures are surfaced in
    /// the outcome and logged; the decision stands either way.
    pub fn process(&mut self, chunk: &AudioChunk, whitelist: bool) -> ChunkOutcome {
        let report = self.analyze(chunk, whitelist);

        if !report.level.is_alerting() {
            return ChunkOutcome {
                report,
                evidence: None,
            };
        }

        let saved = self.evidence.save(
            &chunk.samples,
            chunk.sample_rate,
            &report.class_scores,
            report.rule_ratio,
            report.level,
            report.combined_score,
        );
        let fingerprint = match &saved {
            Ok(bundle) => Some(bundle.fingerprint.clone()),
            Err(err) => {
                log::error!("evidence persistence failed: {err}");
                None
            }
        };
        self.events
            .append(report.level, report.combined_score, fingerprint);

        ChunkOutcome {
            report,
            evidence: Some(saved),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::RiskLevel;

    const SR: u32 = 44_100;

    fn chunk(samples: Vec<f32>) -> AudioChunk {
        AudioChunk {
            samples,
            sample_rate: SR,
            channels: 1,
        }
    }

    fn sine_chunk(freq: f32, amplitude: f32) -> AudioChunk {
        chunk(
            (0..SR as usize)
                .map(|i| {
                    amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / SR as f32).sin()
                })
                .collect(),
        )
    }

    fn test_config(dir: &std::path::Path) -> GuardConfig {
        GuardConfig {
            evidence_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_silence_is_safe_and_side_effect_free() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = GuardPipeline::new(test_config(dir.path()));

        let outcome = pipeline.process(&chunk(vec![0.0; SR as usize]), false);
        assert_eq!(outcome.report.level, RiskLevel::Safe);
        assert_eq!(outcome.report.combined_score, 0.0);
        assert!(outcome.report.rule_ratio.abs() < 1e-6);
        assert_eq!(outcome.report.class_scores.normal, 1.0);
        assert!(outcome.evidence.is_none());
        assert!(pipeline.events().is_empty());
    }

    #[test]
    fn test_ultrasonic_sine_is_threat_with_evidence() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = GuardPipeline::new(test_config(dir.path()));

        let outcome = pipeline.process(&sine_chunk(19_000.0, 0.5), false);
        assert_eq!(outcome.report.level, RiskLevel::Threat);
        assert!(outcome.report.rule_ratio >= 0.9);

        let bundle = outcome.evidence.unwrap().unwrap();
        assert!(bundle.audio_path.exists());
        assert_eq!(pipeline.events().len(), 1);
        assert_eq!(
            pipeline.events().entries()[0].fingerprint.as_deref(),
            Some(bundle.fingerprint.as_str())
        );
    }

    #[test]
    fn test_whitelist_suppresses_alerting() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = GuardPipeline::new(test_config(dir.path()));

        let outcome = pipeline.process(&sine_chunk(19_000.0, 0.5), true);
        assert_eq!(outcome.report.level, RiskLevel::Safe);
        assert_eq!(outcome.report.combined_score, 0.0);
        assert!(outcome.evidence.is_none());
        assert!(pipeline.events().is_empty());
    }

    #[test]
    fn test_persistence_failure_keeps_decision() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("taken");
        std::fs::write(&blocked, b"file, not dir").unwrap();
        let mut pipeline = GuardPipeline::new(test_config(&blocked));

        let outcome = pipeline.process(&sine_chunk(19_000.0, 0.5), false);
        assert_eq!(outcome.report.level, RiskLevel::Threat);
        assert!(outcome.evidence.unwrap().is_err());
        // The event is still recorded, without a fingerprint
        assert_eq!(pipeline.events().len(), 1);
        assert!(pipeline.events().entries()[0].fingerprint.is_none());
    }

    #[test]
    fn test_empty_chunk_is_safe() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = GuardPipeline::new(test_config(dir.path()));

        let report = pipeline.analyze(&chunk(Vec::new()), false);
        assert_eq!(report.level, RiskLevel::Safe);
        assert_eq!(report.rule_ratio, 0.0);
        assert_eq!(report.class_scores.normal, 1.0);
    }

    #[test]
    fn test_sensitivity_override() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = GuardPipeline::new(test_config(dir.path()));
        let chunk = sine_chunk(19_000.0, 0.5);

        // High-band sine alerts regardless; the bar just moves
        let relaxed = pipeline.analyze_with(&chunk, 0.0, false);
        let paranoid = pipeline.analyze_with(&chunk, 1.0, false);
        assert!(paranoid.level >= relaxed.level);
        assert_eq!(paranoid.level, RiskLevel::Threat);
    }
}
