//! Command vocabulary understood by the stopwatch oracle.
//!
//! Internal names (`Start`, `Reset`, ...) differ from the four-letter wire codes the
//! simulator's parser expects (`STAR`, `RESE`, ...). The wire codes are fixed.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    Start,
    Stop,
    Tick,
    Reset,
    /// No timekeeping change; forces a read-back of the current state.
    Nop,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::Start,
        Command::Stop,
        Command::Tick,
        Command::Reset,
        Command::Nop,
    ];

    /// Literal code written to the command slot.
    pub fn wire_code(self) -> &'static str {
        match self {
            Command::Start => "STAR",
            Command::Stop => "STOP",
            Command::Tick => "TICK",
            Command::Reset => "RESE",
            Command::Nop => "NOP",
        }
    }

    /// Parse a command slot value. Surrounding whitespace is ignored; anything else must
    /// match a wire code exactly.
    pub fn from_wire(raw: &str) -> Option<Command> {
        let code = raw.trim();
        Command::ALL.into_iter().find(|c| c.wire_code() == code)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Tick => "tick",
            Command::Reset => "reset",
            Command::Nop => "nop",
        };
        f.write_str(name)
    }
}

/// Render elapsed seconds as `MM:SS`. Minutes are not capped at 59.
pub fn format_clock(elapsed_seconds: u64) -> String {
    let minutes = elapsed_seconds / 60;
    let seconds = elapsed_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}
