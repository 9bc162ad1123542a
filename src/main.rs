//! Sensor Telemetry CLI
//!
//! Streams a live sensor reading, shows it smoothed with its rate of change,
//! and exports the session as CSV when it ends.

use chrono::Utc;
use clap::{Parser, Subcommand};
use sensor_telemetry::{
    collector::{FrameInput, FrameSource, SimulatedConfig, SimulatedSource},
    config::Config,
    core::{default_file_name, write_export, ExportHeader, SmoothingStrategy},
    pipeline::{ConsoleSink, NullSink, Pipeline, PresentationSink, Recorder},
    stats::{counters::StatsSnapshot, create_shared_stats_with_persistence},
    VERSION,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sensor-telemetry")]
#[command(version = VERSION)]
#[command(about = "Live sensor smoothing, rate of change and CSV export", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a streaming session; Ctrl+C stops it and writes the export
    Start {
        /// Reading source (simulated or frames)
        #[arg(long, default_value = "simulated")]
        source: String,

        /// Frame file for the frames source ("-" for stdin)
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Moving-average window radius in samples
        #[arg(long)]
        window: Option<usize>,

        /// Smoothing strategy (incremental or brute-force)
        #[arg(long)]
        strategy: Option<String>,

        /// Interval between simulated readings, in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Delay between replayed frames, in milliseconds
        #[arg(long)]
        pace_ms: Option<u64>,

        /// Unit label for the live readout
        #[arg(long)]
        unit: Option<String>,

        /// Use the "Time,Temperature,Temperature Change" header
        #[arg(long)]
        temperature_header: bool,

        /// Export file (defaults to a timestamped file in the export directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Do not print a line per reading
        #[arg(long)]
        quiet: bool,
    },

    /// Show configuration and cumulative statistics
    Status,

    /// Show configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            source,
            input,
            window,
            strategy,
            interval_ms,
            pace_ms,
            unit,
            temperature_header,
            output,
            quiet,
        } => {
            let mut config = Config::load().unwrap_or_else(|e| {
                eprintln!("Warning: Could not load config ({e}), using defaults");
                Config::default()
            });
            if let Some(window) = window {
                config.window_radius = window;
            }
            if let Some(strategy) = strategy {
                match strategy.parse::<SmoothingStrategy>() {
                    Ok(s) => config.strategy = s,
                    Err(e) => {
                        eprintln!("Error: {e}");
                        std::process::exit(1);
                    }
                }
            }
            if let Some(ms) = interval_ms {
                config.sample_interval = Duration::from_millis(ms.max(1));
            }
            if unit.is_some() {
                config.unit = unit;
            }
            if temperature_header {
                config.header = ExportHeader::Temperature;
            }

            cmd_start(&config, &source, input, pace_ms, output, quiet);
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

fn cmd_start(
    config: &Config,
    source: &str,
    input: Option<PathBuf>,
    pace_ms: Option<u64>,
    output: Option<PathBuf>,
    quiet: bool,
) {
    println!("Sensor Telemetry v{VERSION}");
    println!();

    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    println!("Starting session...");
    println!("  Source: {source}");
    println!("  Window radius: {} samples", config.window_radius);
    println!("  Smoothing: {}", config.strategy);
    println!();

    let stats = create_shared_stats_with_persistence(config.stats_path());
    let sink: Box<dyn PresentationSink> = if quiet {
        Box::new(NullSink)
    } else {
        Box::new(ConsoleSink::new())
    };

    let pipeline = match Pipeline::spawn(config.pipeline_config(), sink, stats.clone()) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Error starting pipeline: {e}");
            std::process::exit(1);
        }
    };

    let mut recorder = match source {
        "simulated" => {
            let simulated = SimulatedSource::new(SimulatedConfig {
                interval: config.sample_interval,
                ..SimulatedConfig::default()
            });
            Recorder::new(simulated, pipeline, stats.clone())
        }
        "frames" => {
            let input = match input {
                Some(path) if path.as_os_str() == "-" => FrameInput::Stdin,
                Some(path) => FrameInput::Path(path),
                None => FrameInput::Stdin,
            };
            let mut frames = FrameSource::new(input);
            if let Some(ms) = pace_ms {
                frames = frames.with_pace(Duration::from_millis(ms));
            }
            Recorder::new(frames, pipeline, stats.clone())
        }
        other => {
            eprintln!("Error: unknown source '{other}' (expected simulated or frames)");
            std::process::exit(1);
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    if let Err(e) = recorder.start() {
        eprintln!("Error starting session: {e}");
        std::process::exit(1);
    }
    println!("Press Ctrl+C to stop");
    println!();

    // The session also ends on its own when the link drops.
    while running.load(Ordering::SeqCst) && recorder.is_streaming().unwrap_or(false) {
        thread::sleep(Duration::from_millis(200));
    }

    println!();
    println!("Stopping session...");
    if let Err(e) = recorder.stop() {
        eprintln!("Warning: {e}");
    }

    match recorder.pipeline().summary() {
        Ok(Some(summary)) => println!("{}", summary.display(config.unit.as_deref())),
        Ok(None) => println!("No readings were recorded."),
        Err(e) => eprintln!("Warning: {e}"),
    }
    println!();

    match recorder.export() {
        Ok(csv) => {
            let path = output
                .unwrap_or_else(|| config.export_path.join(default_file_name(Utc::now())));
            match write_export(&path, &csv) {
                Ok(()) => println!("Exported {} rows to {:?}", csv.lines().count() - 1, path),
                Err(e) => eprintln!("Error writing export: {e}"),
            }
        }
        Err(e) => eprintln!("Error exporting session: {e}"),
    }

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save statistics: {e}");
    }

    println!();
    println!("{}", stats.summary());
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("Sensor Telemetry Status");
    println!("=======================");
    println!();

    println!("Configuration:");
    println!("  Window radius: {} samples", config.window_radius);
    println!("  Smoothing: {}", config.strategy);
    println!("  Export header: {}", config.header.columns());
    println!("  Export directory: {:?}", config.export_path);
    println!();

    match StatsSnapshot::read(&config.stats_path()) {
        Ok(Some(stats)) => {
            println!("Cumulative Statistics:");
            println!("  Samples accepted: {}", stats.samples_accepted);
            println!("  Samples rejected: {}", stats.samples_rejected);
            println!("  Zero-interval derivatives: {}", stats.degenerate_derivatives);
            println!("  Sessions started: {}", stats.sessions_started);
            println!("  Link failures: {}", stats.link_failures);
            println!("  Exports written: {}", stats.exports_written);
            println!("  Last updated: {}", stats.last_updated.format("%Y-%m-%d %H:%M:%S"));
        }
        Ok(None) => println!("No previous session data found."),
        Err(e) => eprintln!("Warning: Could not read statistics: {e}"),
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}
