//! Failures raised by the activation engine.

use serde_json::json;

use crate::domain::{ClassCode, Email, Error, Uid};

/// Coarse failure taxonomy shared by the workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed input; the caller must fix it.
    Validation,
    /// No matching record or identity.
    NotFound,
    /// Duplicate data or a record that changed underneath the caller.
    Conflict,
    /// Mismatched, missing, or rejected credential.
    Credential,
    /// Store or provider I/O failure; safe to retry with backoff.
    TransientStore,
    /// A move left both records behind and needs reconciliation.
    PartialActivation,
}

/// Activation engine failures.
///
/// Messages on validation and credential variants are shown to students
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivationError {
    #[error("{message}")]
    InvalidInput { message: String },
    #[error("No pending account found for this email.")]
    CandidateNotFound,
    #[error("This account has already been activated. Please log in with your password.")]
    AccountNotPending,
    #[error("Account setup incomplete. Please contact administrator.")]
    NoCredentialIssued,
    #[error("Incorrect temporary password.")]
    CredentialMismatch,
    #[error("Password is too weak. Please choose a stronger password.")]
    WeakCredential,
    #[error("This account was activated by another session. Please log in again.")]
    StaleRecord,
    #[error("activation write failed: {message}")]
    WriteFailed { message: String },
    #[error("service temporarily unavailable: {message}")]
    Transient { message: String },
    /// The store refused the operation for a reason a retry cannot fix.
    #[error("student store rejected the operation: {message}")]
    StoreRejected { message: String },
    #[error("activation of {email} in {class_code} as {uid} left the pending record behind")]
    PartialActivation {
        class_code: ClassCode,
        email: Email,
        uid: Uid,
    },
}

impl ActivationError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn store_rejected(message: impl Into<String>) -> Self {
        Self::StoreRejected {
            message: message.into(),
        }
    }

    /// Taxonomy bucket for this failure.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. } => ErrorCategory::Validation,
            Self::CandidateNotFound => ErrorCategory::NotFound,
            Self::AccountNotPending | Self::StaleRecord | Self::StoreRejected { .. } => {
                ErrorCategory::Conflict
            }
            Self::NoCredentialIssued | Self::CredentialMismatch | Self::WeakCredential => {
                ErrorCategory::Credential
            }
            Self::WriteFailed { .. } | Self::Transient { .. } => ErrorCategory::TransientStore,
            Self::PartialActivation { .. } => ErrorCategory::PartialActivation,
        }
    }

    /// Stable code exposed in error details.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::CandidateNotFound => "candidate_not_found",
            Self::AccountNotPending => "account_not_pending",
            Self::NoCredentialIssued => "no_credential_issued",
            Self::CredentialMismatch => "credential_mismatch",
            Self::WeakCredential => "weak_credential",
            Self::StaleRecord => "stale_record",
            Self::WriteFailed { .. } => "write_failed",
            Self::Transient { .. } => "transient",
            Self::StoreRejected { .. } => "store_rejected",
            Self::PartialActivation { .. } => "partial_activation",
        }
    }
}

impl From<ActivationError> for Error {
    fn from(err: ActivationError) -> Self {
        let code = err.code();
        let mapped = match &err {
            ActivationError::InvalidInput { message } => Error::invalid_request(message.clone()),
            ActivationError::WeakCredential => Error::invalid_request(err.to_string()),
            ActivationError::CandidateNotFound => Error::not_found(err.to_string()),
            ActivationError::AccountNotPending | ActivationError::StaleRecord => {
                Error::conflict(err.to_string())
            }
            ActivationError::StoreRejected { .. } => {
                Error::conflict("Student records changed. Please try again.")
            }
            ActivationError::NoCredentialIssued => Error::forbidden(err.to_string()),
            ActivationError::CredentialMismatch => Error::unauthorized(err.to_string()),
            ActivationError::WriteFailed { .. } | ActivationError::Transient { .. } => {
                Error::service_unavailable("Student records are unavailable. Please try again.")
            }
            ActivationError::PartialActivation { .. } => Error::internal(
                "Activation did not finish cleanly. Please contact administrator.",
            ),
        };
        mapped.with_details(json!({ "code": code }))
    }
}
