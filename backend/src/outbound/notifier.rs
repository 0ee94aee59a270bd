//! Credential notifier used when no mail relay is configured.
//!
//! Every delivery fails as unavailable, so registration hands the onboarding
//! credential back to the operator instead.

use async_trait::async_trait;

use crate::domain::ports::{CredentialNotifier, CredentialNotifierError};
use crate::domain::{Email, FullName, OnboardingCredential};

/// [`CredentialNotifier`] with no delivery channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredCredentialNotifier;

#[async_trait]
impl CredentialNotifier for UnconfiguredCredentialNotifier {
    async fn deliver(
        &self,
        _email: &Email,
        _name: &FullName,
        _credential: &OnboardingCredential,
    ) -> Result<(), CredentialNotifierError> {
        Err(CredentialNotifierError::unavailable(
            "no credential delivery channel configured",
        ))
    }
}
