//! Shared slots through which the controller and the oracle exchange state.
//!
//! The transport is behind [`ChannelStore`] so the protocol and session layers never see
//! paths. Reads are tolerant: a missing, empty, or non-conforming slot decodes to a
//! default (`0` elapsed, not running) instead of an error, because the oracle may simply
//! not have written yet.

mod file;
#[cfg(test)]
mod memory;

pub(crate) use file::FileChannelStore;
#[cfg(test)]
pub(crate) use memory::MemoryChannelStore;

use crate::protocol::Command;
use anyhow::Result;

/// Marker the oracle writes into the running-flag slot to mean "running".
pub const RUNNING_MARKER: &str = "RUNNING=1";
const STOPPED_MARKER: &str = "RUNNING=0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Command,
    Elapsed,
    RunningFlag,
}

pub trait ChannelStore: Send + Sync {
    /// Replace the slot's whole value. Readers observe either the old or the new value.
    fn write_slot(&self, slot: Slot, value: &str) -> Result<()>;

    /// Raw slot content, or `None` when the slot is absent or unreadable.
    fn read_slot(&self, slot: Slot) -> Option<String>;

    fn read_elapsed(&self) -> u64 {
        self.read_slot(Slot::Elapsed)
            .map(|raw| parse_elapsed(&raw))
            .unwrap_or(0)
    }

    fn read_running(&self) -> bool {
        self.read_slot(Slot::RunningFlag)
            .map(|raw| parse_running_flag(&raw))
            .unwrap_or(false)
    }

    fn write_command(&self, command: Command) -> Result<()> {
        self.write_slot(Slot::Command, command.wire_code())
    }

    fn write_elapsed(&self, elapsed_seconds: u64) -> Result<()> {
        self.write_slot(Slot::Elapsed, &elapsed_seconds.to_string())
    }

    fn write_running(&self, running: bool) -> Result<()> {
        self.write_slot(Slot::RunningFlag, running_flag_text(running))
    }

    /// Seed every slot with its startup default: elapsed 0, stopped, `NOP`.
    fn reset_to_defaults(&self) -> Result<()> {
        self.write_elapsed(0)?;
        self.write_running(false)?;
        self.write_command(Command::Nop)
    }
}

/// Decode the elapsed slot. Only unsigned decimal digits (surrounding whitespace allowed)
/// are accepted; anything else, including overflow, reads as `0`.
pub fn parse_elapsed(raw: &str) -> u64 {
    let digits = raw.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    digits.parse().unwrap_or(0)
}

/// Decode the running-flag slot: true iff it contains [`RUNNING_MARKER`].
pub fn parse_running_flag(raw: &str) -> bool {
    raw.contains(RUNNING_MARKER)
}

pub fn running_flag_text(running: bool) -> &'static str {
    if running {
        RUNNING_MARKER
    } else {
        STOPPED_MARKER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_parsing_tolerates_garbage() {
        assert_eq!(parse_elapsed("42"), 42);
        assert_eq!(parse_elapsed("42\n"), 42);
        assert_eq!(parse_elapsed("  7 \r\n"), 7);
        assert_eq!(parse_elapsed(""), 0);
        assert_eq!(parse_elapsed("abc"), 0);
        assert_eq!(parse_elapsed("-3"), 0);
        assert_eq!(parse_elapsed("+3"), 0);
        assert_eq!(parse_elapsed("1 2"), 0);
        assert_eq!(parse_elapsed("99999999999999999999999"), 0);
    }

    #[test]
    fn running_flag_is_substring_match() {
        assert!(parse_running_flag("RUNNING=1"));
        assert!(parse_running_flag("status: RUNNING=1\n"));
        assert!(!parse_running_flag("RUNNING=0"));
        assert!(!parse_running_flag("running=1"));
        assert!(!parse_running_flag(""));
    }

    #[test]
    fn missing_slots_read_as_defaults() {
        let store = MemoryChannelStore::default();
        assert_eq!(store.read_elapsed(), 0);
        assert!(!store.read_running());
    }

    #[test]
    fn reset_to_defaults_seeds_all_slots() {
        let store = MemoryChannelStore::default();
        store.write_elapsed(12).unwrap();
        store.write_running(true).unwrap();
        store.reset_to_defaults().unwrap();
        assert_eq!(store.read_slot(Slot::Elapsed).as_deref(), Some("0"));
        assert_eq!(store.read_slot(Slot::RunningFlag).as_deref(), Some("RUNNING=0"));
        assert_eq!(store.read_slot(Slot::Command).as_deref(), Some("NOP"));
    }
}
