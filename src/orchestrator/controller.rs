//! Session lifecycle controller.
//!
//! Owns the current elapsed/running state, issues start/stop/reset through the invoker,
//! and emits events for presentation layers.

use super::Ticker;
use crate::channel::{ChannelStore, FileChannelStore};
use crate::model::{InfoEvent, Invocation, RunConfig, SessionEvent, SessionState};
use crate::oracle::{run_build_step, BuiltinStopwatch, ExternalProcess, Invoker, OracleProcess};
use crate::protocol::Command;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UiCommand {
    Start,
    Stop,
    Reset,
    Quit,
}

/// One-time preparation of the oracle artifact.
struct BuildStep {
    argv: Vec<String>,
    workdir: PathBuf,
}

struct Inner {
    invoker: Invoker,
    // Held across each invocation so state replacement shares its critical section.
    state: Mutex<SessionState>,
    build: Option<BuildStep>,
    event_tx: UnboundedSender<SessionEvent>,
}

#[derive(Clone)]
pub(crate) struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    #[cfg(test)]
    pub fn new(invoker: Invoker, event_tx: UnboundedSender<SessionEvent>) -> Self {
        Self {
            inner: Arc::new(Inner {
                invoker,
                state: Mutex::new(SessionState::default()),
                build: None,
                event_tx,
            }),
        }
    }

    /// Wire up file slots and the configured oracle.
    pub fn from_config(cfg: &RunConfig, event_tx: UnboundedSender<SessionEvent>) -> Result<Self> {
        let store: Arc<dyn ChannelStore> = Arc::new(FileChannelStore::from_config(cfg));
        let oracle: Arc<dyn OracleProcess> = if cfg.builtin_oracle {
            Arc::new(BuiltinStopwatch::new(store.clone()))
        } else {
            Arc::new(ExternalProcess::new(&cfg.run_cmd, &cfg.workdir)?)
        };
        // The built-in oracle needs no artifact.
        let build = if cfg.builtin_oracle {
            None
        } else {
            cfg.build_cmd.as_ref().map(|argv| BuildStep {
                argv: argv.clone(),
                workdir: cfg.workdir.clone(),
            })
        };

        Ok(Self {
            inner: Arc::new(Inner {
                invoker: Invoker::new(store, oracle),
                state: Mutex::new(SessionState::default()),
                build,
                event_tx,
            }),
        })
    }

    /// Default the slots, prepare the oracle, and seed the state with a `NOP` read-back.
    pub async fn initialize(&self) -> Result<SessionState> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.initialize_blocking())
            .await
            .context("initialize task failed")
    }

    fn initialize_blocking(&self) -> SessionState {
        let inner = &self.inner;
        {
            let _state = inner.state.lock().unwrap_or_else(|e| e.into_inner());
            if let Err(e) = inner.invoker.store().reset_to_defaults() {
                tracing::warn!(error = %e, "failed to default slots");
                self.emit_info(InfoEvent::Message(format!("Could not reset slots: {e:#}")));
            }
        }

        if let Some(build) = &inner.build {
            match run_build_step(&build.argv, &build.workdir) {
                Ok(()) => tracing::info!("build step finished"),
                Err(e) => {
                    tracing::warn!(error = %e, "build step failed");
                    self.emit_info(InfoEvent::BuildFailed {
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        self.apply_blocking(Command::Nop)
    }

    pub async fn start(&self) -> Result<SessionState> {
        self.dispatch(Command::Start).await
    }

    pub async fn stop(&self) -> Result<SessionState> {
        self.dispatch(Command::Stop).await
    }

    pub async fn reset(&self) -> Result<SessionState> {
        self.dispatch(Command::Reset).await
    }

    /// Issue `TICK` only if the last known state is running. Returns `None` when idle.
    pub async fn tick_if_running(&self) -> Result<Option<SessionState>> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.tick_if_running_blocking())
            .await
            .context("tick task failed")
    }

    /// Last state reported by the oracle. Blocks while an invocation is in flight.
    pub fn snapshot(&self) -> SessionState {
        *self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn dispatch(&self, command: Command) -> Result<SessionState> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.apply_blocking(command))
            .await
            .with_context(|| format!("{command} task failed"))
    }

    fn apply_blocking(&self, command: Command) -> SessionState {
        let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        let inv = self.inner.invoker.invoke(command);
        *state = inv.state;
        self.publish(&inv);
        inv.state
    }

    fn tick_if_running_blocking(&self) -> Option<SessionState> {
        let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.running {
            return None;
        }
        let inv = self.inner.invoker.invoke(Command::Tick);
        *state = inv.state;
        self.publish(&inv);
        Some(inv.state)
    }

    fn publish(&self, inv: &Invocation) {
        if let Some(info) = InfoEvent::from_invocation(inv) {
            self.emit_info(info);
        }
        let _ = self.inner.event_tx.send(SessionEvent::StateChanged {
            command: inv.command,
            state: inv.state,
            completed_at: inv.completed_at.clone(),
        });
    }

    fn emit_info(&self, info: InfoEvent) {
        let _ = self.inner.event_tx.send(SessionEvent::Info(info));
    }
}

/// Run the ticker and apply UI commands until quit, the command channel closing, or Ctrl-C.
pub(crate) async fn run_controller(
    controller: SessionController,
    tick_interval: Duration,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let ticker = Ticker::spawn(controller.clone(), tick_interval);

    let res = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let outcome = match cmd {
                    Some(UiCommand::Start) => controller.start().await,
                    Some(UiCommand::Stop) => controller.stop().await,
                    Some(UiCommand::Reset) => controller.reset().await,
                    Some(UiCommand::Quit) | None => break Ok(()),
                };
                if let Err(e) = outcome {
                    break Err(e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break Ok(());
            }
        }
    };

    // Stop scheduling ticks; an invocation already in flight runs to completion.
    let iterations = *ticker.iterations().borrow();
    let last = controller.snapshot();
    tracing::info!(
        iterations,
        elapsed = last.elapsed_seconds,
        running = last.running,
        "stopping ticker"
    );
    ticker.shutdown().await;
    res
}
