// src/core/evidence.rs
//
// Tamper-evident evidence bundles: lossless audio, a visualization,
// and a metadata descriptor carrying a SHA-256 content fingerprint.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use walkdir::WalkDir;

use crate::core::visualization::{render_spectrogram, render_waveform, SpectrogramConfig};
use crate::detection::{ClassScores, RiskLevel};

/// Persistence failures. These never carry decision-path meaning; the
/// fusion result that triggered the save stays valid regardless.
#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("evidence I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("audio encoding failed: {0}")]
    Wav(#[from] hound::Error),
    #[error("metadata encoding failed: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("could not allocate a bundle directory under {0}")]
    BundleNaming(PathBuf),
}

/// Descriptor of a persisted bundle
#[derive(Debug, Clone)]
pub struct EvidenceBundle {
    pub folder: PathBuf,
    pub audio_path: PathBuf,
    /// Absent when both the spectrogram and the waveform plot failed
    pub image_path: Option<PathBuf>,
    pub metadata_path: PathBuf,
    /// Hex-encoded SHA-256 of the audio file bytes
    pub fingerprint: String,
}

/// Contents of a bundle's metadata descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceMetadata {
    /// Unix timestamp (seconds)
    pub ts: i64,
    pub level: RiskLevel,
    pub score: f32,
    pub rule_ratio: f32,
    pub ml_scores: ClassScores,
    pub fingerprint: String,
}

const AUDIO_FILE: &str = "audio.wav";
const IMAGE_FILE: &str = "spectrogram.png";
const METADATA_FILE: &str = "metadata.json";

/// Writes immutable evidence bundles under a base directory.
///
/// Bundle directories are named from a millisecond timestamp plus a
/// per-store monotonic counter; creation retries on a name collision,
/// so concurrent saves from one store never overwrite each other.
#[derive(Debug)]
pub struct EvidenceStore {
    base_dir: PathBuf,
    seq: AtomicU64,
}

impl EvidenceStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            seq: AtomicU64::new(0),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Persist one alerting event. The audio write completes before
    /// fingerprinting; a failed visualization downgrades the bundle
    /// instead of aborting it.
    pub fn save(
        &self,
        waveform: &[f32],
        sample_rate: u32,
        scores: &ClassScores,
        rule_ratio: f32,
        level: RiskLevel,
        combined_score: f32,
    ) -> Result<EvidenceBundle, EvidenceError> {
        let now = Utc::now();
        let folder = self.create_bundle_dir(now.timestamp_millis())?;

        let audio_path = folder.join(AUDIO_FILE);
        write_wav(&audio_path, waveform, sample_rate)?;
        let fingerprint = sha256_file(&audio_path)?;

        let image_path = folder.join(IMAGE_FILE);
        let image_path = match render_spectrogram(
            waveform,
            sample_rate,
            &SpectrogramConfig::default(),
            &image_path,
        ) {
            Ok(()) => Some(image_path),
            Err(err) => {
                log::warn!("spectrogram rendering failed ({err}), trying waveform plot");
                match render_waveform(waveform, sample_rate, 800, 240, &image_path) {
                    Ok(()) => Some(image_path),
                    Err(err) => {
                        log::warn!("waveform plot failed ({err}), bundle kept without image");
                        None
                    }
                }
            }
        };

        let metadata = EvidenceMetadata {
            ts: now.timestamp(),
            level,
            score: combined_score,
            rule_ratio,
            ml_scores: *scores,
            fingerprint: fingerprint.clone(),
        };
        let metadata_path = folder.join(METADATA_FILE);
        fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)?;

        log::info!(
            "evidence bundle saved: {} level={} fingerprint={}",
            folder.display(),
            level,
            &fingerprint[..12.min(fingerprint.len())]
        );

        Ok(EvidenceBundle {
            folder,
            audio_path,
            image_path,
            metadata_path,
            fingerprint,
        })
    }

    /// Scan the store and parse every bundle descriptor, newest first.
    /// Unreadable bundles are skipped with a warning.
    pub fn list(&self) -> Vec<EvidenceMetadata> {
        let mut bundles = Vec::new();
        for entry in WalkDir::new(&self.base_dir)
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_name().to_str() != Some(METADATA_FILE) {
                continue;
            }
            match fs::read_to_string(entry.path())
                .map_err(anyhow::Error::from)
                .and_then(|text| serde_json::from_str(&text).map_err(anyhow::Error::from))
            {
                Ok(metadata) => bundles.push(metadata),
                Err(err) => {
                    log::warn!("skipping unreadable bundle {}: {err}", entry.path().display());
                }
            }
        }
        bundles.sort_by_key(|m: &EvidenceMetadata| std::cmp::Reverse(m.ts));
        bundles
    }

    fn create_bundle_dir(&self, ts_millis: i64) -> Result<PathBuf, EvidenceError> {
        fs::create_dir_all(&self.base_dir)?;
        for _ in 0..64 {
            let seq = self.seq.fetch_add(1, Ordering::Relaxed);
            let path = self.base_dir.join(format!("event_{ts_millis}_{seq:04}"));
            match fs::create_dir(&path) {
                Ok(()) => return Ok(path),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(EvidenceError::BundleNaming(self.base_dir.clone()))
    }
}

/// Write the chunk losslessly as 32-bit float WAV
fn write_wav(path: &Path, waveform: &[f32], sample_rate: u32) -> Result<(), EvidenceError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in waveform {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Hex SHA-256 over a file's exact bytes
pub fn sha256_file(path: &Path) -> Result<String, std::io::Error> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scores() -> ClassScores {
        ClassScores {
            normal: 0.1,
            ultrasonic: 0.8,
            hidden: 0.05,
            deepfake: 0.05,
        }
    }

    fn sine_chunk() -> Vec<f32> {
        (0..44_100)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 19_000.0 * i as f32 / 44_100.0).sin())
            .collect()
    }

    #[test]
    fn test_save_roundtrip_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let store = EvidenceStore::new(dir.path());
        let bundle = store
            .save(&sine_chunk(), 44_100, &sample_scores(), 0.95, RiskLevel::Threat, 0.95)
            .unwrap();

        assert!(bundle.audio_path.exists());
        assert!(bundle.metadata_path.exists());
        assert_eq!(sha256_file(&bundle.audio_path).unwrap(), bundle.fingerprint);

        let metadata: EvidenceMetadata =
            serde_json::from_str(&fs::read_to_string(&bundle.metadata_path).unwrap()).unwrap();
        assert_eq!(metadata.fingerprint, bundle.fingerprint);
        assert_eq!(metadata.level, RiskLevel::Threat);
        assert!((metadata.rule_ratio - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_metadata_key_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = EvidenceStore::new(dir.path());
        let bundle = store
            .save(&sine_chunk(), 44_100, &sample_scores(), 0.9, RiskLevel::Threat, 0.9)
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&bundle.metadata_path).unwrap()).unwrap();
        let obj = value.as_object().unwrap();
        for key in ["ts", "level", "score", "rule_ratio", "ml_scores", "fingerprint"] {
            assert!(obj.contains_key(key), "missing key {key}");
        }
        assert_eq!(value["level"], "THREAT");
        assert!(value["ml_scores"].as_object().unwrap().contains_key("Ultrasonic"));
    }

    #[test]
    fn test_concurrent_saves_get_distinct_folders() {
        let dir = tempfile::tempdir().unwrap();
        let store = EvidenceStore::new(dir.path());
        let a = store
            .save(&sine_chunk(), 44_100, &sample_scores(), 0.9, RiskLevel::Threat, 0.9)
            .unwrap();
        let b = store
            .save(&sine_chunk(), 44_100, &sample_scores(), 0.9, RiskLevel::Threat, 0.9)
            .unwrap();
        assert_ne!(a.folder, b.folder);
    }

    #[test]
    fn test_short_chunk_falls_back_to_waveform_plot() {
        let dir = tempfile::tempdir().unwrap();
        let store = EvidenceStore::new(dir.path());
        // Too short for spectrogram frames, long enough to plot
        let bundle = store
            .save(&[0.5f32; 200], 44_100, &sample_scores(), 0.0, RiskLevel::Suspicious, 0.5)
            .unwrap();
        assert!(bundle.image_path.is_some());
    }

    #[test]
    fn test_list_returns_saved_bundles() {
        let dir = tempfile::tempdir().unwrap();
        let store = EvidenceStore::new(dir.path());
        assert!(store.list().is_empty());

        store
            .save(&sine_chunk(), 44_100, &sample_scores(), 0.9, RiskLevel::Threat, 0.9)
            .unwrap();
        store
            .save(&sine_chunk(), 44_100, &sample_scores(), 0.5, RiskLevel::Suspicious, 0.5)
            .unwrap();

        let listed = store.list();
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn test_unwritable_base_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("taken");
        fs::write(&blocked, b"not a directory").unwrap();
        let store = EvidenceStore::new(&blocked);
        let result = store.save(&sine_chunk(), 44_100, &sample_scores(), 0.9, RiskLevel::Threat, 0.9);
        assert!(result.is_err());
    }
}
