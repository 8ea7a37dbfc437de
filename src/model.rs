use crate::protocol::{format_clock, Command};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory holding the slot files; the oracle runs with this as its cwd.
    pub workdir: PathBuf,
    pub command_file: String,
    pub elapsed_file: String,
    pub running_file: String,
    /// One-time preparation step (program + args). `None` skips it.
    #[serde(default)]
    pub build_cmd: Option<Vec<String>>,
    /// Oracle executable (program + args), run once per invocation.
    pub run_cmd: Vec<String>,
    #[serde(default)]
    pub builtin_oracle: bool,
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            command_file: "action.txt".into(),
            elapsed_file: "time.txt".into(),
            running_file: "status.txt".into(),
            build_cmd: Some(
                ["iverilog", "-o", "tick.out", "stopwatch_tb.v", "stopwatch.v"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            run_cmd: vec!["vvp".into(), "tick.out".into()],
            builtin_oracle: false,
            tick_interval: Duration::from_secs(1),
        }
    }
}

/// Elapsed time and running flag as last reported by the oracle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub elapsed_seconds: u64,
    pub running: bool,
}

impl SessionState {
    pub fn clock(&self) -> String {
        format_clock(self.elapsed_seconds)
    }
}

/// What happened when the oracle process was run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OracleOutcome {
    Completed {
        success: bool,
        code: Option<i32>,
        stdout: String,
    },
    LaunchFailed {
        reason: String,
    },
}

impl OracleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, OracleOutcome::Completed { success: true, .. })
    }
}

/// One full write-command, run-oracle, read-result cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    pub command: Command,
    pub state: SessionState,
    pub outcome: OracleOutcome,
    /// False when the command slot could not be written; the oracle still ran.
    pub command_written: bool,
    pub completed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    StateChanged {
        command: Command,
        state: SessionState,
        completed_at: String,
    },
    Info(InfoEvent),
}

/// Structured info events emitted by the controller and consumed by UI/CLI layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InfoEvent {
    Message(String),
    BuildFailed { reason: String },
    OracleFailed { command: Command, reason: String },
    SlotWriteFailed { command: Command },
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::BuildFailed { reason } => format!("Build step failed: {reason}"),
            InfoEvent::OracleFailed { command, reason } => {
                format!("Oracle run for {command} failed: {reason}")
            }
            InfoEvent::SlotWriteFailed { command } => {
                format!("Could not write command slot for {command}")
            }
        }
    }

    /// Derive the info event, if any, a finished invocation should surface.
    pub fn from_invocation(inv: &Invocation) -> Option<InfoEvent> {
        if !inv.command_written {
            return Some(InfoEvent::SlotWriteFailed {
                command: inv.command,
            });
        }
        if inv.outcome.is_success() {
            return None;
        }
        let reason = match &inv.outcome {
            OracleOutcome::LaunchFailed { reason } => reason.clone(),
            OracleOutcome::Completed { code: Some(c), .. } => format!("exit status {c}"),
            OracleOutcome::Completed { code: None, .. } => "terminated by signal".into(),
        };
        Some(InfoEvent::OracleFailed {
            command: inv.command,
            reason,
        })
    }
}

/// Current local wall-clock time as `HH:MM:SS`, falling back to UTC when the local
/// offset cannot be determined.
pub fn now_timestamp() -> String {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    now.format(time::macros::format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| "now".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(outcome: OracleOutcome, command_written: bool) -> Invocation {
        Invocation {
            command: Command::Tick,
            state: SessionState::default(),
            outcome,
            command_written,
            completed_at: "00:00:00".into(),
        }
    }

    #[test]
    fn successful_invocation_has_no_info() {
        let inv = invocation(
            OracleOutcome::Completed {
                success: true,
                code: Some(0),
                stdout: String::new(),
            },
            true,
        );
        assert!(InfoEvent::from_invocation(&inv).is_none());
    }

    #[test]
    fn failed_exit_is_reported_with_code() {
        let inv = invocation(
            OracleOutcome::Completed {
                success: false,
                code: Some(2),
                stdout: String::new(),
            },
            true,
        );
        let msg = InfoEvent::from_invocation(&inv).unwrap().to_message();
        assert_eq!(msg, "Oracle run for tick failed: exit status 2");
    }

    #[test]
    fn unwritten_command_takes_precedence() {
        let inv = invocation(
            OracleOutcome::LaunchFailed {
                reason: "not found".into(),
            },
            false,
        );
        assert!(matches!(
            InfoEvent::from_invocation(&inv),
            Some(InfoEvent::SlotWriteFailed { .. })
        ));
    }

    #[test]
    fn config_round_trips_tick_interval_as_humantime() {
        let cfg = RunConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"tick_interval\":\"1s\""));
        let back: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tick_interval, Duration::from_secs(1));
    }
}
