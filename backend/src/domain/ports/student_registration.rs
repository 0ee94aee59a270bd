//! Driving port for registering students with an onboarding credential.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{ClassCode, Email, Error, OnboardingCredential};

/// Raw registration form as submitted by an operator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRegistrationRequest {
    pub student_number: String,
    pub name: String,
    pub email: String,
    pub class_code: String,
}

/// How the onboarding credential reached the student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialDelivery {
    /// The notifier accepted the message.
    Emailed,
    /// Delivery failed; the caller must show the credential to the operator.
    DisplayToOperator(OnboardingCredential),
}

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationReceipt {
    pub class_code: ClassCode,
    pub email: Email,
    pub delivery: CredentialDelivery,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StudentRegistration: Send + Sync {
    /// Register a student in a class and issue an onboarding credential.
    ///
    /// # Errors
    ///
    /// - `invalid_request` when a field is blank or malformed.
    /// - `not_found` when the class does not exist.
    /// - `conflict` when the email or student number is already taken.
    async fn register(
        &self,
        request: StudentRegistrationRequest,
    ) -> Result<RegistrationReceipt, Error>;
}
