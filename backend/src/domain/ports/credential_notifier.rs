//! Port abstraction for delivering onboarding credentials out of band.
//!
//! Delivery is fire-and-forget from the student's point of view, but the
//! registration workflow must know when it failed so it can fall back to
//! showing the credential to the operator.

use async_trait::async_trait;

use crate::domain::{Email, FullName, OnboardingCredential};

use super::define_port_error;

define_port_error! {
    /// Failures raised by notifier adapters.
    pub enum CredentialNotifierError {
        /// No delivery channel is reachable or configured.
        Unavailable { message: String } => "credential delivery unavailable: {message}",
        /// The channel refused the message.
        Rejected { message: String } => "credential delivery rejected: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialNotifier: Send + Sync {
    /// Send `credential` to the student.
    async fn deliver(
        &self,
        email: &Email,
        name: &FullName,
        credential: &OnboardingCredential,
    ) -> Result<(), CredentialNotifierError>;
}
