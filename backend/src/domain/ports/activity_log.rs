//! Port abstraction for the append-only activity log.

use async_trait::async_trait;

use crate::domain::ActivityLogEntry;

use super::define_port_error;

define_port_error! {
    /// Errors raised while appending audit entries.
    pub enum ActivityLogError {
        /// The entry could not be written.
        Write { message: String } => "activity log write failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityLog: Send + Sync {
    /// Append one entry.
    async fn append(&self, entry: &ActivityLogEntry) -> Result<(), ActivityLogError>;
}

/// Activity log that discards every entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureActivityLog;

#[async_trait]
impl ActivityLog for FixtureActivityLog {
    async fn append(&self, _entry: &ActivityLogEntry) -> Result<(), ActivityLogError> {
        Ok(())
    }
}
