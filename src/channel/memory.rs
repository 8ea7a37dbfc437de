use super::{ChannelStore, Slot};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-process slot store, used where no external process needs to see the slots.
#[derive(Debug, Default)]
pub struct MemoryChannelStore {
    slots: Mutex<HashMap<Slot, String>>,
}

impl ChannelStore for MemoryChannelStore {
    fn write_slot(&self, slot: Slot, value: &str) -> Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.insert(slot, value.to_string());
        Ok(())
    }

    fn read_slot(&self, slot: Slot) -> Option<String> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get(&slot).cloned()
    }
}
