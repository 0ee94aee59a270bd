//! Append-only activity log held in process memory.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::ActivityLogEntry;
use crate::domain::ports::{ActivityLog, ActivityLogError};

/// [`ActivityLog`] that keeps every entry in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryActivityLog {
    entries: Mutex<Vec<ActivityLogEntry>>,
}

impl InMemoryActivityLog {
    /// Snapshot of the entries written so far.
    pub fn entries(&self) -> Vec<ActivityLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ActivityLog for InMemoryActivityLog {
    async fn append(&self, entry: &ActivityLogEntry) -> Result<(), ActivityLogError> {
        self.entries
            .lock()
            .map_err(|_| ActivityLogError::write("activity log lock poisoned"))?
            .push(entry.clone());
        Ok(())
    }
}
