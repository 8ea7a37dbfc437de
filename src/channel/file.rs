use super::{ChannelStore, Slot};
use crate::model::RunConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Slots stored as small plain-text files in one directory.
#[derive(Debug, Clone)]
pub struct FileChannelStore {
    command: PathBuf,
    elapsed: PathBuf,
    running: PathBuf,
}

impl FileChannelStore {
    pub fn new(dir: &Path, command: &str, elapsed: &str, running: &str) -> Self {
        Self {
            command: dir.join(command),
            elapsed: dir.join(elapsed),
            running: dir.join(running),
        }
    }

    pub fn from_config(cfg: &RunConfig) -> Self {
        Self::new(
            &cfg.workdir,
            &cfg.command_file,
            &cfg.elapsed_file,
            &cfg.running_file,
        )
    }

    pub fn path(&self, slot: Slot) -> &Path {
        match slot {
            Slot::Command => &self.command,
            Slot::Elapsed => &self.elapsed,
            Slot::RunningFlag => &self.running,
        }
    }
}

impl ChannelStore for FileChannelStore {
    /// Write to a sibling temp file then rename over the slot, so a concurrent reader
    /// never sees a truncated value.
    fn write_slot(&self, slot: Slot, value: &str) -> Result<()> {
        let path = self.path(slot);
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, value)
            .with_context(|| format!("write temp slot file {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!("rename {} -> {}", tmp_path.display(), path.display())
        })?;
        Ok(())
    }

    fn read_slot(&self, slot: Slot) -> Option<String> {
        let path = self.path(slot);
        match fs::read(path) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                tracing::debug!(slot = ?slot, path = %path.display(), error = %e, "slot unreadable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> FileChannelStore {
        FileChannelStore::new(dir, "action.txt", "time.txt", "status.txt")
    }

    #[test]
    fn writes_replace_whole_value() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        store.write_slot(Slot::Elapsed, "12345").unwrap();
        store.write_slot(Slot::Elapsed, "7").unwrap();
        assert_eq!(fs::read_to_string(tmp.path().join("time.txt")).unwrap(), "7");
        assert!(!tmp.path().join("time.txt.tmp").exists());
    }

    #[test]
    fn reads_files_written_by_another_process() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("time.txt"), "61\n").unwrap();
        fs::write(tmp.path().join("status.txt"), "RUNNING=1\n").unwrap();
        let store = store_in(tmp.path());
        assert_eq!(store.read_elapsed(), 61);
        assert!(store.read_running());
    }

    #[test]
    fn missing_and_malformed_files_default() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        assert_eq!(store.read_slot(Slot::Elapsed), None);
        assert_eq!(store.read_elapsed(), 0);
        assert!(!store.read_running());

        fs::write(tmp.path().join("time.txt"), [0xff, 0xfe, b'1']).unwrap();
        fs::write(tmp.path().join("status.txt"), "").unwrap();
        assert_eq!(store.read_elapsed(), 0);
        assert!(!store.read_running());
    }

    #[test]
    fn command_slot_holds_wire_code() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        store.write_command(crate::protocol::Command::Reset).unwrap();
        assert_eq!(
            fs::read_to_string(tmp.path().join("action.txt")).unwrap(),
            "RESE"
        );
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let tmp = tempdir().unwrap();
        let store = store_in(&tmp.path().join("nope"));
        assert!(store.write_slot(Slot::Command, "NOP").is_err());
    }
}
