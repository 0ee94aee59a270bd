//! In-memory adapters.
//!
//! Each adapter guards its state with a single `std::sync::Mutex`, which
//! makes multi-document operations such as promotion atomic. A poisoned lock
//! is reported as an unavailable backend rather than a panic.

mod activity_log;
mod identity_provider;
mod student_store;

pub use activity_log::InMemoryActivityLog;
pub use identity_provider::{DEFAULT_LOCKOUT_THRESHOLD, InMemoryIdentityProvider};
pub use student_store::InMemoryStudentStore;
