// src/main.rs
use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use colorful::Colorful;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use audioguardr::config::{default_evidence_dir, GuardConfig};
use audioguardr::core::{CaptureHandle, GuardPipeline};
use audioguardr::RiskLevel;

#[derive(Parser, Debug)]
#[command(name = "audioguardr")]
#[command(about = "Monitor an audio stream for ultrasonic, hidden, and synthetic signals")]
struct Args {
    /// WAV file to stream through the pipeline (default: synthesized test signal)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Seconds to run (omit to run until the input is exhausted)
    #[arg(short, long)]
    duration: Option<u64>,

    /// Alert sensitivity, 0..1
    #[arg(short, long, default_value = "0.5")]
    sensitivity: f32,

    /// Directory for evidence bundles
    #[arg(short, long)]
    evidence_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .init();

    let source = match &args.input {
        Some(path) => read_wav(path)?,
        None => synthesized_signal(args.duration.unwrap_or(15)),
    };

    let config = GuardConfig {
        sample_rate: source.sample_rate,
        channels: source.channels,
        sensitivity: args.sensitivity.clamp(0.0, 1.0),
        evidence_dir: args.evidence_dir.clone().unwrap_or_else(default_evidence_dir),
        ..Default::default()
    };
    let chunk_len = config.chunk_len();
    let chunk_timeout = Duration::from_secs(2);

    println!(
        "Monitoring {} at {} Hz (sensitivity {:.2})\n",
        args.input
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "synthesized test signal".to_string())
            .cyan(),
        source.sample_rate,
        config.sensitivity,
    );

    let mut pipeline = GuardPipeline::new(config);
    let mut buffer = pipeline.capture_buffer();
    let producer = spawn_producer(buffer.handle(), source);

    let deadline = args
        .duration
        .map(|secs| Instant::now() + Duration::from_secs(secs));

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        match buffer.pop_chunk(chunk_len, chunk_timeout) {
            Some(chunk) => {
                let rms = chunk.rms();
                let outcome = pipeline.process(&chunk, false);
                print_status(outcome.report.level, outcome.report.combined_score, rms);

                if outcome.report.level == RiskLevel::Threat {
                    println!("{}", "ALERT - High confidence audio threat detected".red());
                }
            }
            None => {
                if producer.is_finished() {
                    break;
                }
                println!("No audio chunk available");
            }
        }
    }

    buffer.stop();
    let _ = producer.join();

    println!(
        "\n{} alerting event(s), {} producer block(s) dropped",
        pipeline.events().len(),
        buffer.dropped_blocks()
    );
    if !pipeline.events().is_empty() {
        println!(
            "Evidence bundles under {}",
            pipeline.evidence_store().base_dir().display()
        );
    }

    Ok(())
}

struct SampleSource {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

/// Stream the source in ~100ms blocks at real-time pace
fn spawn_producer(handle: CaptureHandle, source: SampleSource) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let frames_per_block = source.sample_rate as usize / 10;
        let block_len = frames_per_block * source.channels as usize;
        let pace = Duration::from_millis(100);

        for block in source.samples.chunks(block_len.max(1)) {
            if handle.is_stopped() {
                break;
            }
            handle.push(block);
            thread::sleep(pace);
        }
    })
}

fn read_wav(path: &PathBuf) -> Result<SampleSource> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Failed to decode float samples")?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .context("Failed to decode integer samples")?
        }
    };

    Ok(SampleSource {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Quiet hum with a strong 19 kHz burst every fifth second, so a
/// smoke run shows both safe chunks and alerts
fn synthesized_signal(seconds: u64) -> SampleSource {
    let sr = 44_100u32;
    let samples = (0..sr as u64 * seconds)
        .map(|i| {
            let t = i as f32 / sr as f32;
            let mut s = 0.05 * (2.0 * std::f32::consts::PI * 440.0 * t).sin();
            if (i / sr as u64) % 5 == 4 {
                s += 0.5 * (2.0 * std::f32::consts::PI * 19_000.0 * t).sin();
            }
            s
        })
        .collect();

    SampleSource {
        samples,
        sample_rate: sr,
        channels: 1,
    }
}

fn print_status(level: RiskLevel, score: f32, rms: f32) {
    let ts = Local::now().format("%H:%M:%S");
    let label = match level {
        RiskLevel::Safe => {
            if rms < 1e-4 {
                "Safe (low input)".to_string().green()
            } else {
                "Safe".to_string().green()
            }
        }
        RiskLevel::Suspicious => "Suspicious".to_string().yellow(),
        RiskLevel::Threat => "THREAT".to_string().red(),
    };
    println!("{ts} - {label}  score:{score:.3}  RMS:{rms:.6}");
}
