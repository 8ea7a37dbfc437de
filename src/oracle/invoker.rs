use super::OracleProcess;
use crate::channel::ChannelStore;
use crate::model::{now_timestamp, Invocation, OracleOutcome, SessionState};
use crate::protocol::Command;
use std::sync::{Arc, Mutex};

/// Serializes write-command, run-oracle, read-result cycles.
///
/// Every caller shares the same slots, so the gate is held for the whole cycle: a `TICK`
/// written by one caller must not be overwritten by another caller's `STAR` before the
/// oracle has consumed it.
pub struct Invoker {
    store: Arc<dyn ChannelStore>,
    oracle: Arc<dyn OracleProcess>,
    gate: Mutex<()>,
}

impl Invoker {
    pub fn new(store: Arc<dyn ChannelStore>, oracle: Arc<dyn OracleProcess>) -> Self {
        Self {
            store,
            oracle,
            gate: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &dyn ChannelStore {
        self.store.as_ref()
    }

    /// Blocking. Never fails: a command that cannot be written or an oracle that cannot
    /// be launched still ends with a read-back of whatever the slots hold.
    pub fn invoke(&self, command: Command) -> Invocation {
        let _gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());

        let command_written = match self.store.write_command(command) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(%command, error = %e, "failed to write command slot");
                false
            }
        };

        let outcome = self.oracle.run();
        match &outcome {
            OracleOutcome::Completed {
                success, code, stdout,
            } => {
                if !stdout.trim().is_empty() {
                    tracing::debug!(%command, stdout = %stdout.trim_end(), "oracle stdout");
                }
                if !success {
                    tracing::warn!(%command, ?code, "oracle exited abnormally");
                }
            }
            OracleOutcome::LaunchFailed { reason } => {
                tracing::warn!(%command, %reason, "oracle failed to launch");
            }
        }

        let state = SessionState {
            elapsed_seconds: self.store.read_elapsed(),
            running: self.store.read_running(),
        };
        tracing::debug!(%command, elapsed = state.elapsed_seconds, running = state.running, "invocation complete");

        Invocation {
            command,
            state,
            outcome,
            command_written,
            completed_at: now_timestamp(),
        }
    }
}
