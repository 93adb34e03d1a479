//! `luma`: run, transpile or check a LumaLab sketch from the terminal.
//!
//! Usage:
//!   luma run <sketch> [--pins N] [--max-runtime MS] [--safety MS] [--duration MS] [--config FILE]
//!   luma transpile <sketch>
//!   luma check <sketch>

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use luma_runtime::{LedStrip, RunConfig, RunOutcome, Scheduler, StdoutConsole, SKETCH_FILE};
use luma_transpile::transpile;
use tracing_subscriber::{fmt, EnvFilter};

/// Worker stack size; deep sketch recursion nests evaluator futures.
const WORKER_STACK_BYTES: usize = 8 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "luma")]
#[command(about = "Run Arduino-style LED sketches against a simulated strip")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a sketch until it stops, fails, or the duration elapses
    Run(RunArgs),
    /// Print the transformed host script
    Transpile {
        sketch: PathBuf,
    },
    /// Print compile diagnostics as JSON
    Check {
        sketch: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    sketch: PathBuf,

    /// JSON run configuration; flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of LEDs on the strip
    #[arg(long)]
    pins: Option<usize>,

    /// Runtime guard in milliseconds
    #[arg(long = "max-runtime")]
    max_runtime: Option<u64>,

    /// Pause after every loop() in milliseconds
    #[arg(long)]
    safety: Option<u64>,

    /// Stop the sketch after this many milliseconds
    #[arg(long)]
    duration: Option<u64>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_sketch(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading sketch {}", path.display()))
}

fn load_config(args: &RunArgs) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            RunConfig::from_json_str(&json)?
        }
        None => RunConfig::default(),
    };
    if let Some(pins) = args.pins {
        config.pin_count = pins;
    }
    if let Some(ms) = args.max_runtime {
        config.max_runtime_ms = ms;
    }
    if let Some(ms) = args.safety {
        config.loop_safety_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

async fn run(args: RunArgs) -> Result<ExitCode> {
    let source = read_sketch(&args.sketch)?;
    let config = load_config(&args)?;

    let strip = Arc::new(LedStrip::new(config.pin_count));
    let scheduler = Scheduler::new();
    let handle = scheduler
        .start(&source, strip.clone(), Arc::new(StdoutConsole), config)
        .context("scheduler already running")?;

    let duration = args.duration.map(Duration::from_millis);
    let until_deadline = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };

    let mut handle = std::pin::pin!(handle.wait());
    let outcome = tokio::select! {
        outcome = &mut handle => outcome,
        _ = until_deadline => {
            scheduler.stop();
            handle.await
        }
        _ = tokio::signal::ctrl_c() => {
            scheduler.stop();
            handle.await
        }
    };

    let snapshot = scheduler.snapshot();
    println!(
        "{} after {} loops ({} loops/s)",
        strip.stats(),
        snapshot.loops,
        snapshot.loop_rate
    );
    Ok(match outcome {
        RunOutcome::Stopped => ExitCode::SUCCESS,
        RunOutcome::Errored(_) => ExitCode::FAILURE,
    })
}

fn check(path: &Path) -> Result<ExitCode> {
    let source = read_sketch(path)?;
    let diagnostics = luma_compiler::check(&transpile(&source), SKETCH_FILE);
    println!("{}", serde_json::to_string_pretty(&diagnostics)?);
    Ok(if diagnostics.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn main() -> Result<ExitCode> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Transpile { sketch } => {
            print!("{}", transpile(&read_sketch(&sketch)?));
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { sketch } => check(&sketch),
        Command::Run(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .thread_stack_size(WORKER_STACK_BYTES)
                .build()
                .context("building tokio runtime")?;
            runtime.block_on(run(args))
        }
    }
}
