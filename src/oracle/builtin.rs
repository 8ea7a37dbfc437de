use super::OracleProcess;
use crate::channel::{ChannelStore, Slot};
use crate::model::OracleOutcome;
use crate::protocol::Command;
use std::sync::Arc;

/// In-process reference stopwatch. Like the simulated hardware it keeps no memory between
/// runs: each run loads elapsed/running from the slots, applies the command slot, and
/// writes the result back.
pub struct BuiltinStopwatch {
    store: Arc<dyn ChannelStore>,
}

impl BuiltinStopwatch {
    pub fn new(store: Arc<dyn ChannelStore>) -> Self {
        Self { store }
    }
}

impl OracleProcess for BuiltinStopwatch {
    fn run(&self) -> OracleOutcome {
        let raw = self.store.read_slot(Slot::Command).unwrap_or_default();
        let mut elapsed = self.store.read_elapsed();
        let mut running = self.store.read_running();

        let command = Command::from_wire(&raw);
        match command {
            Some(Command::Start) => running = true,
            Some(Command::Stop) => running = false,
            Some(Command::Tick) if running => elapsed = elapsed.saturating_add(1),
            Some(Command::Reset) => {
                elapsed = 0;
                running = false;
            }
            Some(Command::Tick) | Some(Command::Nop) | None => {}
        }

        let written = self
            .store
            .write_elapsed(elapsed)
            .and_then(|_| self.store.write_running(running));
        if let Err(e) = written {
            return OracleOutcome::Completed {
                success: false,
                code: Some(1),
                stdout: format!("write failed: {e:#}\n"),
            };
        }

        OracleOutcome::Completed {
            success: true,
            code: Some(0),
            stdout: format!(
                "CMD={} SEC={} RUNNING={}\n",
                raw.trim(),
                elapsed,
                u8::from(running)
            ),
        }
    }
}
