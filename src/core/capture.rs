// src/core/capture.rs
//
// Producer/consumer hand-off between the audio source and the analysis
// loop. The producer side never blocks; the consumer side assembles
// fixed-length, peak-normalized chunks with a bounded wait.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fixed-length mono segment handed to the analysis pipeline.
/// Discarded after feature extraction; the buffer retains nothing.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioChunk {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Root-mean-square amplitude, used for status reporting
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum_sq / self.samples.len() as f32).sqrt()
    }
}

/// Producer-side handle. Clone freely into callback or thread contexts;
/// `push` never blocks, dropping blocks when the queue is full.
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    tx: Sender<Vec<f32>>,
    channels: u16,
    stopped: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl CaptureHandle {
    /// Enqueue a block of interleaved samples. Multi-channel input is
    /// averaged to mono here, before it enters the queue.
    pub fn push(&self, samples: &[f32]) {
        if self.stopped.load(Ordering::SeqCst) || samples.is_empty() {
            return;
        }

        let block = if self.channels > 1 {
            let channels = self.channels as usize;
            samples
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        } else {
            samples.to_vec()
        };

        match self.tx.try_send(block) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                log::warn!("capture queue full, dropped block ({dropped} total)");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Whether the owning buffer has been stopped; producers should
    /// wind down once this reads true
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Bridges an asynchronous sample producer and the synchronous
/// analysis consumer.
///
/// Chunk-boundary policy: carry-forward. Samples beyond the target
/// length, and samples accumulated before a timeout, stay in the
/// pending buffer for the next call; nothing is silently discarded.
pub struct CaptureBuffer {
    rx: Receiver<Vec<f32>>,
    tx: Sender<Vec<f32>>,
    pending: VecDeque<f32>,
    sample_rate: u32,
    channels: u16,
    stopped: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl CaptureBuffer {
    /// `queue_capacity` is counted in producer blocks, not samples
    pub fn new(sample_rate: u32, channels: u16, queue_capacity: usize) -> Self {
        let (tx, rx) = bounded(queue_capacity.max(1));
        Self {
            rx,
            tx,
            pending: VecDeque::new(),
            sample_rate,
            channels: channels.max(1),
            stopped: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn handle(&self) -> CaptureHandle {
        CaptureHandle {
            tx: self.tx.clone(),
            channels: self.channels,
            stopped: self.stopped.clone(),
            dropped: self.dropped.clone(),
        }
    }

    /// Block until `target_len` samples are available or `timeout`
    /// elapses. On success the chunk is exactly `target_len` samples,
    /// peak-normalized to max |s| = 1 (all-zero chunks pass through
    /// unmodified). On timeout returns `None`; accumulated samples are
    /// kept for the next call.
    pub fn pop_chunk(&mut self, target_len: usize, timeout: Duration) -> Option<AudioChunk> {
        if target_len == 0 {
            return None;
        }

        let deadline = Instant::now() + timeout;
        while self.pending.len() < target_len {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            match self.rx.recv_timeout(deadline - now) {
                Ok(block) => self.pending.extend(block),
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }

        let mut samples: Vec<f32> = self.pending.drain(..target_len).collect();
        normalize_peak(&mut samples);

        Some(AudioChunk {
            samples,
            sample_rate: self.sample_rate,
            channels: 1,
        })
    }

    /// Mark the buffer stopped: handles drop further pushes, already
    /// queued data can still be drained. Safe to call repeatedly.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            log::info!("capture stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Producer blocks discarded because the queue was full
    pub fn dropped_blocks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

fn normalize_peak(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak > 0.0 {
        for sample in samples.iter_mut() {
            *sample /= peak;
        }
    }
}
