//! Branch prediction trace-replay CLI.
//!
//! This binary drives the `bpred-core` prediction unit from recorded branch traces. It provides:
//! 1. **Replay:** Load a trace and optional JSON configuration, replay it, and print statistics.
//! 2. **Defaults:** Print the default configuration as JSON, as a starting point for a config file.
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (e.g. `RUST_LOG=bpred_core=debug`).

use std::fs;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bpred_core::BpuConfig;
use bpred_core::sim::{self, TraceError};
use bpred_core::stats::STATS_SECTIONS;

#[derive(Parser, Debug)]
#[command(
    name = "bpsim",
    author,
    version,
    about = "Speculative branch prediction unit trace replayer",
    long_about = "Replay a recorded branch trace through the prediction unit and report accuracy.\n\nTraces are JSON arrays or JSON Lines of {seq, tid, pc, inst, taken, target} records.\n\nExamples:\n  bpsim replay --trace traces/qsort.jsonl\n  bpsim replay --trace t.json --config bpu.json --window 64 --stats direction btb\n  bpsim defaults > bpu.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a branch trace and print statistics.
    Replay {
        /// Trace file (JSON array or JSON Lines).
        #[arg(short, long)]
        trace: String,

        /// Unit configuration (JSON); defaults are used for absent fields.
        #[arg(short, long)]
        config: Option<String>,

        /// Predictions kept in flight per thread before retiring the oldest.
        #[arg(short, long, default_value_t = 32)]
        window: usize,

        /// Statistics sections to print (all if omitted).
        #[arg(long, num_args = 1.., value_parser = clap::builder::PossibleValuesParser::new(STATS_SECTIONS.iter().copied()))]
        stats: Vec<String>,

        /// Print statistics as JSON instead of the text report.
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as JSON.
    Defaults,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay {
            trace,
            config,
            window,
            stats,
            json,
        } => cmd_replay(&trace, config.as_deref(), window, &stats, json),
        Commands::Defaults => cmd_defaults(),
    };

    if let Err(e) = result {
        eprintln!("[!] {e}");
        process::exit(1);
    }
}

/// Loads the configuration at `path`, or the default configuration if none is given.
fn load_config(path: Option<&str>) -> Result<BpuConfig, String> {
    let Some(path) = path else {
        return Ok(BpuConfig::default());
    };
    let text = fs::read_to_string(path).map_err(|e| format!("could not read config '{path}': {e}"))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid config '{path}': {e}"))
}

/// Replays the trace at `trace` and prints the summary and statistics.
fn cmd_replay(
    trace: &str,
    config: Option<&str>,
    window: usize,
    sections: &[String],
    json: bool,
) -> Result<(), String> {
    let config = load_config(config)?;
    let records = sim::load_trace(trace).map_err(|e: TraceError| e.to_string())?;
    tracing::info!(trace, records = records.len(), window, "replaying");

    let (summary, stats) = sim::replay(&config, &records, window).map_err(|e| e.to_string())?;

    if json {
        let out = serde_json::json!({ "summary": summary, "stats": stats });
        let text = serde_json::to_string_pretty(&out).map_err(|e| e.to_string())?;
        println!("{text}");
        return Ok(());
    }

    println!("[*] Replayed {} branches from {trace}", summary.predictions);
    println!(
        "    direction mispredicts: {}  target mispredicts: {}  accuracy: {:.2}%",
        summary.direction_mispredicts,
        summary.target_mispredicts,
        summary.accuracy() * 100.0
    );
    println!();
    stats.print_sections(sections);
    Ok(())
}

/// Prints the default configuration, with an indirect predictor enabled so every field appears.
fn cmd_defaults() -> Result<(), String> {
    let config = BpuConfig {
        indirect: Some(bpred_core::config::IndirectConfig::default()),
        ..BpuConfig::default()
    };
    let text = serde_json::to_string_pretty(&config).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}
