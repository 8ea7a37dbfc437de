use crate::model::{RunConfig, SessionEvent};
use crate::orchestrator::{run_controller, SessionController, UiCommand};
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "sim-stopwatch",
    version,
    about = "Drive a simulated hardware stopwatch through its file command protocol"
)]
pub struct Cli {
    /// Directory holding the slot files; the simulator runs here
    #[arg(long, default_value = ".")]
    pub workdir: PathBuf,

    /// One-time command that builds the simulator artifact
    #[arg(long, default_value = "iverilog -o tick.out stopwatch_tb.v stopwatch.v")]
    pub build_cmd: String,

    /// Command that runs the simulator once per invocation
    #[arg(long, default_value = "vvp tick.out")]
    pub run_cmd: String,

    /// Skip the build step (artifact already prepared)
    #[arg(long)]
    pub skip_build: bool,

    /// Use the in-process reference stopwatch instead of an external simulator
    #[arg(long)]
    pub builtin_oracle: bool,

    /// Real-time interval between ticks
    #[arg(long, default_value = "1s")]
    pub tick_interval: humantime::Duration,

    /// Command slot file name
    #[arg(long, default_value = "action.txt")]
    pub command_file: String,

    /// Elapsed-seconds slot file name
    #[arg(long, default_value = "time.txt")]
    pub elapsed_file: String,

    /// Running-flag slot file name
    #[arg(long, default_value = "status.txt")]
    pub running_file: String,

    /// Headless: read commands from stdin, print MM:SS lines (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Headless: read commands from stdin, print events as JSON lines (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Log file (defaults to the user cache dir in TUI mode, stderr otherwise)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `sim_stopwatch=trace` (overrides RUST_LOG)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.text || self.json || cfg!(not(feature = "tui"))
    }
}

fn split_command(label: &str, raw: &str) -> Result<Vec<String>> {
    let argv: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
    if argv.is_empty() {
        bail!("--{label} must not be empty");
    }
    Ok(argv)
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> Result<RunConfig> {
    let build_cmd = if args.skip_build {
        None
    } else {
        Some(split_command("build-cmd", &args.build_cmd)?)
    };
    let tick_interval = Duration::from(args.tick_interval);
    if tick_interval.is_zero() {
        bail!("--tick-interval must be greater than zero");
    }
    Ok(RunConfig {
        workdir: args.workdir.clone(),
        command_file: args.command_file.clone(),
        elapsed_file: args.elapsed_file.clone(),
        running_file: args.running_file.clone(),
        build_cmd,
        run_cmd: split_command("run-cmd", &args.run_cmd)?,
        builtin_oracle: args.builtin_oracle,
        tick_interval,
    })
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args)?;
    if !cfg.workdir.is_dir() {
        bail!("workdir {} is not a directory", cfg.workdir.display());
    }
    tracing::info!(config = ?cfg, "starting");

    if !args.is_headless() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(cfg).await;
        }
    }

    run_headless(cfg, args.json).await
}

/// Parse one line of headless input.
fn parse_input(line: &str) -> Option<UiCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "start" | "s" => Some(UiCommand::Start),
        "stop" | "t" => Some(UiCommand::Stop),
        "reset" | "r" => Some(UiCommand::Reset),
        "exit" | "quit" | "q" => Some(UiCommand::Quit),
        _ => None,
    }
}

fn render_event(ev: &SessionEvent, json: bool) -> Result<OutputLine> {
    if json {
        return Ok(OutputLine::Stdout(serde_json::to_string(ev)?));
    }
    Ok(match ev {
        SessionEvent::StateChanged { state, .. } => OutputLine::Stdout(format!(
            "{} [{}]",
            state.clock(),
            if state.running { "running" } else { "stopped" }
        )),
        SessionEvent::Info(info) => OutputLine::Stderr(info.to_message()),
    })
}

/// Read commands from stdin on a plain thread; an async stdin read would keep the
/// runtime from shutting down while it waits for input.
fn spawn_input_reader(
    cmd_tx: mpsc::UnboundedSender<UiCommand>,
    out_tx: mpsc::UnboundedSender<OutputLine>,
) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match parse_input(&line) {
                Some(cmd) => {
                    if cmd_tx.send(cmd).is_err() || cmd == UiCommand::Quit {
                        break;
                    }
                }
                None => {
                    let _ = out_tx.send(OutputLine::Stderr(format!(
                        "unknown command {:?} (start, stop, reset, exit)",
                        line.trim()
                    )));
                }
            }
        }
        tracing::debug!("input reader finished");
    });
}

async fn run_headless(cfg: RunConfig, json: bool) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let controller = SessionController::from_config(&cfg, event_tx)?;

    let printer_tx = out_tx.clone();
    let printer = tokio::spawn(async move {
        while let Some(ev) = event_rx.recv().await {
            match render_event(&ev, json) {
                Ok(line) => {
                    let _ = printer_tx.send(line);
                }
                Err(e) => tracing::warn!(error = %e, "failed to render event"),
            }
        }
    });

    controller.initialize().await?;
    // Keep a sender alive so stdin EOF alone does not end the session.
    spawn_input_reader(cmd_tx.clone(), out_tx.clone());

    let res = run_controller(controller, cfg.tick_interval, cmd_rx).await;
    drop(cmd_tx);

    printer.await.context("event printer task failed")?;
    drop(out_tx);
    let _ = out_handle.await;
    res
}
