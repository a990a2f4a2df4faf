//! l2switchd daemon entry point.
//!
//! Reads newline-delimited JSON wire messages from stdin, runs them through
//! the learning-switch controller and writes the resulting commands to
//! stdout, one JSON object per line.

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sdn_l2switchd::{
    ControllerError, Dispatcher, JsonLinesSink, L2Controller, L2SwitchConfig, LoggingConfig,
    ProcessTables, DEFAULT_CONFIG_PATH,
};

/// Upper bound on how often the aging sweep runs.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Parser)]
#[command(name = "l2switchd", version, about = "MAC-learning L2 forwarding controller")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override logging.level from the configuration file
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

/// Initialize tracing/logging. `RUST_LOG` takes precedence over the config.
fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(args: &Args) -> Result<L2SwitchConfig> {
    let mut config = L2SwitchConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json = true;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn sweep_interval(config: &L2SwitchConfig) -> Duration {
    config
        .learning
        .aging_time()
        .map_or(MAX_SWEEP_INTERVAL, |aging| aging.min(MAX_SWEEP_INTERVAL))
}

/// Pumps newline-delimited wire messages from `input` through the
/// dispatcher and writes the resulting commands to `output`.
///
/// Returns when `input` reaches EOF or `shutdown` completes. Lines that do
/// not decode are logged and skipped.
async fn run_event_loop<R, W, F>(
    dispatcher: &Dispatcher,
    mut input: R,
    mut output: W,
    sweep_every: Duration,
    shutdown: F,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future,
{
    let mut line = Vec::new();
    let mut line_no: u64 = 0;
    let mut sweep = tokio::time::interval(sweep_every);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            read = input.read_until(b'\n', &mut line) => {
                let eof = read.context("reading input")? == 0;
                if !line.is_empty() {
                    line_no += 1;
                    if let Some(out) = handle_line(dispatcher, &line, line_no)? {
                        output.write_all(&out).await.context("writing commands")?;
                        output.flush().await.context("flushing commands")?;
                    }
                    line.clear();
                }
                if eof {
                    info!("Input closed");
                    break;
                }
            }
            _ = sweep.tick() => {
                dispatcher.controller().expire_stale(Instant::now());
            }
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    Ok(())
}

/// Dispatches one raw input line and returns the encoded commands, if any.
fn handle_line(dispatcher: &Dispatcher, line: &[u8], line_no: u64) -> Result<Option<Vec<u8>>> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let mut sink = JsonLinesSink::new(Vec::new());
    match dispatcher.dispatch_bytes(line, &mut sink) {
        Ok(_) => {}
        Err(ControllerError::Decode(e)) => {
            warn!(line = line_no, error = %e, "Skipping undecodable input line");
            return Ok(None);
        }
        Err(e) => return Err(e).context("dispatching wire message"),
    }

    let out = sink.into_inner();
    Ok((!out.is_empty()).then_some(out))
}

fn log_stats(controller: &L2Controller) {
    let stats = controller.stats();
    info!(
        switches_attached = stats.switches_attached,
        switches_detached = stats.switches_detached,
        packet_ins = stats.packet_ins,
        floods = stats.floods,
        rules_installed = stats.rules_installed,
        packet_outs = stats.packet_outs,
        host_moves = stats.host_moves,
        malformed_dropped = stats.malformed_dropped,
        entries_aged_out = stats.entries_aged_out,
        switches = controller.tables().switch_count(),
        "Controller statistics"
    );
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("l2switchd: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging);

    info!("--- Starting l2switchd ---");
    match config.learning.aging_time() {
        Some(aging) => info!(aging_secs = aging.as_secs(), "MAC aging enabled"),
        None => info!("MAC aging disabled"),
    }

    let tables = Arc::new(ProcessTables::with_table_capacity(
        config.learning.table_capacity,
    ));
    let controller = Arc::new(L2Controller::new(tables, config.learning.clone()));
    let dispatcher = Dispatcher::new(Arc::clone(&controller));

    let result = run_event_loop(
        &dispatcher,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        sweep_interval(&config),
        signal::ctrl_c(),
    )
    .await;

    log_stats(&controller);

    match result {
        Ok(()) => {
            info!("l2switchd exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("l2switchd error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
