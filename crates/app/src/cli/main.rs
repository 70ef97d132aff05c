//! Parametrix CLI: offline renders and analytic responses

mod signal;
mod sweep;

use anyhow::Context;
use clap::{Parser, Subcommand};
use parametrix_core::domain::{ChannelStrip, EqEngine, StripConfig};
use serde::Serialize;
use signal::{Levels, SignalKind};
use std::path::PathBuf;
use sweep::{Automation, Sweep};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parametrix")]
#[command(about = "Multi-channel parametric equalizer", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the analytic magnitude response of the configured chain
    Response {
        /// TOML configuration (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of log-spaced frequencies between 20 Hz and 20 kHz
        #[arg(long, default_value_t = 31)]
        points: usize,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run a generated test signal through the channel strip
    Render {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = SignalKind::Sine)]
        signal: SignalKind,

        /// Sine frequency in Hz
        #[arg(long, default_value_t = 1000.0)]
        freq: f32,

        #[arg(long, default_value_t = 1.0)]
        seconds: f32,

        /// Peak level of the test signal in dBFS
        #[arg(long, default_value_t = -20.0, allow_hyphen_values = true)]
        level_db: f32,

        /// Noise seed
        #[arg(long, default_value_t = 1)]
        seed: u64,

        /// Linear automation, `PARAM:FROM:TO` (repeatable)
        #[arg(long = "sweep")]
        sweeps: Vec<Sweep>,

        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as TOML
    Config,
}

#[derive(Serialize)]
struct ResponsePoint {
    freq_hz: f64,
    magnitude_db: f64,
}

#[derive(Serialize)]
struct ChannelReport {
    channel: usize,
    input: Levels,
    output: Levels,
}

#[derive(Serialize)]
struct RenderReport {
    signal: SignalKind,
    frames: usize,
    sample_rate: f64,
    build_passes: u64,
    channels: Vec<ChannelReport>,
}

async fn load_config(path: Option<&PathBuf>) -> anyhow::Result<StripConfig> {
    match path {
        Some(path) => StripConfig::load_from_file(path)
            .await
            .with_context(|| format!("failed to load {}", path.display())),
        None => Ok(StripConfig::default()),
    }
}

fn log_spaced(points: usize) -> Vec<f64> {
    let (lo, hi) = (20.0_f64.ln(), 20000.0_f64.ln());
    match points {
        0 => Vec::new(),
        1 => vec![1000.0],
        n => (0..n)
            .map(|i| (lo + (hi - lo) * i as f64 / (n - 1) as f64).exp())
            .collect(),
    }
}

fn response(config: &StripConfig, points: usize, json: bool) -> anyhow::Result<()> {
    let mut engine = EqEngine::with_config(&config.engine);
    engine.apply_snapshot(&config.params);

    // Run silence until every smoother has landed, then one more block so the
    // scheduler picks up the final values
    let mut silence = vec![vec![0.0_f32; engine.config().max_block_size]; engine.channels()];
    let max_blocks = 1 + (engine.config().smoothing_samples() * 30.0) as usize
        / engine.config().max_block_size;
    for _ in 0..max_blocks {
        engine.process(&mut silence);
        if !engine.front_end().is_smoothing() {
            break;
        }
    }
    engine.process(&mut silence);

    let curve: Vec<ResponsePoint> = log_spaced(points)
        .into_iter()
        .map(|freq_hz| ResponsePoint {
            freq_hz,
            magnitude_db: engine.magnitude_db(freq_hz),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&curve)?);
    } else {
        for point in &curve {
            println!("{:>9.1} Hz  {:>+8.2} dB", point.freq_hz, point.magnitude_db);
        }
    }
    Ok(())
}

fn ensure_positive_seconds(seconds: f32) -> anyhow::Result<()> {
    anyhow::ensure!(seconds.is_finite() && seconds > 0.0, "--seconds must be positive");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn render(
    config: &StripConfig,
    kind: SignalKind,
    freq: f32,
    seconds: f32,
    level_db: f32,
    seed: u64,
    sweeps: Vec<Sweep>,
    json: bool,
) -> anyhow::Result<()> {
    ensure_positive_seconds(seconds)?;

    let mut strip = ChannelStrip::new(config);
    let engine_config = *strip.engine().config();

    let frames = (f64::from(seconds) * engine_config.sample_rate).round() as usize;
    let block = engine_config.max_block_size;

    let input = signal::generate(kind, freq, engine_config.sample_rate, frames, level_db, seed);
    let mut buffer = vec![input.clone(); engine_config.channels];
    let automation = Automation::new(config.params, sweeps);

    info!(frames, block, channels = engine_config.channels, "Rendering");

    let mut start = 0;
    while start < frames {
        let end = (start + block).min(frames);
        let snapshot = automation.at(start as f32 / frames as f32);
        let mut views: Vec<&mut [f32]> = buffer
            .iter_mut()
            .map(|channel| &mut channel[start..end])
            .collect();
        strip.process(&snapshot, &mut views);
        start = end;
    }

    let report = RenderReport {
        signal: kind,
        frames,
        sample_rate: engine_config.sample_rate,
        build_passes: strip.engine().scheduler().build_passes(),
        channels: buffer
            .iter()
            .enumerate()
            .map(|(channel, output)| ChannelReport {
                channel,
                input: Levels::measure(&input),
                output: Levels::measure(output),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{:?} signal, {} frames @ {} Hz, {} coefficient build passes",
            report.signal, report.frames, report.sample_rate, report.build_passes
        );
        for ch in &report.channels {
            println!(
                "  ch{}: in {:>+7.2} dBFS rms / {:>+7.2} peak   out {:>+7.2} dBFS rms / {:>+7.2} peak",
                ch.channel,
                ch.input.rms_dbfs,
                ch.input.peak_dbfs,
                ch.output.rms_dbfs,
                ch.output.peak_dbfs
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Response {
            config,
            points,
            json,
        } => {
            let config = load_config(config.as_ref()).await?;
            response(&config, points, json)
        }
        Command::Render {
            config,
            signal,
            freq,
            seconds,
            level_db,
            seed,
            sweeps,
            json,
        } => {
            let config = load_config(config.as_ref()).await?;
            render(&config, signal, freq, seconds, level_db, seed, sweeps, json)
        }
        Command::Config => {
            print!("{}", StripConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}
