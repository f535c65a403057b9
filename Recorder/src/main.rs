// main.rs

use std::path::PathBuf;

use body_track::{EmissionPolicy, RecorderConfig};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::runtime;
use tracing::{info, instrument, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, Layer};

mod commands;
mod generators;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
enum Emission {
    Dense,
    Transitions,
    SparseAbsence,
}

impl From<Emission> for EmissionPolicy {
    fn from(emission: Emission) -> Self {
        match emission {
            Emission::Dense => EmissionPolicy::Dense,
            Emission::Transitions => EmissionPolicy::Transitions,
            Emission::SparseAbsence => EmissionPolicy::SparseAbsence,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "body-recorder")]
struct Args {
    // Set the log level (possible values: error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: LogLevel,
    /// JSON file with recorder settings
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a synthetic walking skeleton with placeholder video
    Record {
        /// Number of frames to capture
        #[arg(short, long, default_value_t = 90)]
        frames: u64,
        /// Output movie; a unique name in the output directory when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overrides the emission policy of the configuration
        #[arg(short, long)]
        emission: Option<Emission>,
        /// Overrides the capture rate of the configuration
        #[arg(long)]
        frame_rate: Option<u32>,
        /// Overrides the per-track queue depth of the configuration
        #[arg(long)]
        queue_depth: Option<usize>,
        /// First frame without a subject
        #[arg(long)]
        absent_from: Option<u64>,
        /// First frame with the subject back
        #[arg(long)]
        absent_to: Option<u64>,
        /// Print the ingest counters when done
        #[arg(long)]
        metrics: bool,
    },
    /// Print the joint metadata of a movie
    Play {
        file: PathBuf,
        /// Deliver samples against the playback clock instead of dumping them
        #[arg(long)]
        realtime: bool,
    },
    /// List the tracks of a movie and summarize its joint metadata
    Inspect { file: PathBuf },
}

#[instrument(skip_all)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_filter(match args.log_level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        });
    let subscriber = tracing_subscriber::registry().with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global default subscriber");

    info!("{:?}", args);

    let mut config = match &args.config {
        Some(path) => RecorderConfig::from_json_file(path)?,
        None => RecorderConfig::default(),
    };

    let runtime = runtime::Builder::new_multi_thread()
        .thread_name_fn(|| {
            static ATOMIC_ID: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);
            let id = ATOMIC_ID.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            format!("MAIN_R w-{}", id)
        })
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        match args.command {
            Command::Record { frames, output, emission, frame_rate, queue_depth, absent_from, absent_to, metrics } => {
                if let Some(emission) = emission {
                    config.emission = emission.into();
                }
                if let Some(frame_rate) = frame_rate {
                    config.frame_rate = frame_rate;
                }
                if let Some(queue_depth) = queue_depth {
                    config.queue_depth = queue_depth;
                }
                let absent = match (absent_from, absent_to) {
                    (Some(from), Some(to)) => from..to,
                    (Some(from), None) => from..u64::MAX,
                    (None, Some(to)) => 0..to,
                    (None, None) => 0..0,
                };
                commands::record(config, frames, output, absent, metrics).await
            }
            Command::Play { file, realtime } => commands::play(&file, realtime).await,
            Command::Inspect { file } => commands::inspect(&file),
        }
    })
}
