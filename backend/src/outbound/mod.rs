//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! This module follows the hexagonal architecture pattern, providing concrete
//! implementations of domain port traits:
//!
//! - **memory**: process-local student store, identity provider, and activity
//!   log used by the development server and integration tests
//! - **notifier**: credential delivery when no mail relay is configured
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod memory;
pub mod notifier;
