//! Driving port for student sign-in.
//!
//! Inbound adapters call this port without knowing whether the student is
//! already active or still holds an onboarding credential.

use async_trait::async_trait;

use crate::domain::{ClassCode, Error, LoginCredentials, Uid};

/// Result of a sign-in attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The identity provider accepted the credential.
    Authenticated { uid: Uid, class_code: ClassCode },
    /// The onboarding credential matched; a permanent one must be chosen.
    ActivationRequired { class_code: ClassCode },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StudentLogin: Send + Sync {
    /// Authenticate with either a permanent or an onboarding credential.
    async fn sign_in(&self, credentials: &LoginCredentials) -> Result<LoginOutcome, Error>;
}
