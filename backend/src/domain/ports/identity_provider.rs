//! Port abstraction for the external identity provider.
//!
//! The provider owns permanent credentials and issues the durable UID a
//! student is keyed by once active. Email addresses are unique within it.

use async_trait::async_trait;

use crate::domain::{Email, PermanentCredential, Uid};

use super::define_port_error;

define_port_error! {
    /// Distinguishable failures reported by identity provider adapters.
    pub enum IdentityProviderError {
        /// The credential does not match the identity.
        WrongCredential => "wrong credential",
        /// No identity exists for the email.
        NotFound => "identity not found",
        /// The identity has been disabled by an administrator.
        Disabled => "identity disabled",
        /// Sign-in is temporarily locked after repeated failures.
        TooManyAttempts => "too many sign-in attempts",
        /// The provider rejected the credential as too weak.
        WeakCredential => "credential rejected as too weak",
        /// Another identity already uses the email.
        EmailAlreadyInUse => "email already in use",
        /// The provider could not be reached.
        Unavailable { message: String } => "identity provider unavailable: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an identity and return its durable UID.
    async fn create_identity(
        &self,
        email: &Email,
        credential: &PermanentCredential,
    ) -> Result<Uid, IdentityProviderError>;

    /// Sign in with a permanent credential.
    async fn sign_in(&self, email: &Email, password: &str) -> Result<Uid, IdentityProviderError>;

    /// Whether an identity exists for the email.
    async fn email_registered(&self, email: &Email) -> Result<bool, IdentityProviderError>;
}
