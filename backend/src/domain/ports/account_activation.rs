//! Driving port for completing first login and repairing half-finished
//! activations.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use zeroize::Zeroizing;

use crate::domain::{ClassCode, Email, Error, Uid};

/// First-login request: the onboarding credential plus the chosen permanent
/// credential and its confirmation.
#[derive(Clone, PartialEq, Eq)]
pub struct ActivationRequest {
    pub email: String,
    pub temporary_credential: Zeroizing<String>,
    pub new_credential: Zeroizing<String>,
    pub confirmation: Zeroizing<String>,
}

impl ActivationRequest {
    pub fn new(
        email: impl Into<String>,
        temporary_credential: impl Into<String>,
        new_credential: impl Into<String>,
        confirmation: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            temporary_credential: Zeroizing::new(temporary_credential.into()),
            new_credential: Zeroizing::new(new_credential.into()),
            confirmation: Zeroizing::new(confirmation.into()),
        }
    }
}

impl fmt::Debug for ActivationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Account state after activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivatedAccount {
    pub uid: Uid,
    pub class_code: ClassCode,
    /// True when an earlier attempt had already promoted the record.
    pub already_active: bool,
}

/// One pending record removed by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairedActivation {
    pub class_code: ClassCode,
    pub email: Email,
    pub uid: Uid,
}

/// Summary of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub repaired: Vec<RepairedActivation>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountActivation: Send + Sync {
    /// Verify the onboarding credential, create the durable identity, and
    /// promote the pending record.
    async fn activate(&self, request: ActivationRequest) -> Result<ActivatedAccount, Error>;

    /// Delete pending records left behind by partial activations.
    async fn reconcile(&self) -> Result<ReconciliationReport, Error>;
}
