//! Login credentials submitted by students.
//!
//! Keep inbound payload parsing outside the domain by exposing constructors
//! that validate string inputs before a handler talks to a port or service.

use std::fmt;

use zeroize::Zeroizing;

use crate::domain::{Email, StudentValidationError};

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Email was missing or blank once trimmed.
    EmptyEmail,
    /// Email was present but malformed.
    InvalidEmail,
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEmail | Self::EmptyPassword => write!(f, "Please fill in all fields."),
            Self::InvalidEmail => write!(f, "Please enter a valid email address."),
        }
    }
}

impl std::error::Error for LoginValidationError {}

impl LoginValidationError {
    /// Stable code exposed in error details.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyEmail => "empty_email",
            Self::InvalidEmail => "invalid_email",
            Self::EmptyPassword => "empty_password",
        }
    }
}

/// Validated login credentials used by the login workflow.
///
/// ## Invariants
/// - `email` is trimmed, lower-cased, and syntactically valid.
/// - `password` is required to be non-empty but retains caller-provided
///   whitespace to avoid surprising credential comparisons.
///
/// # Examples
/// ```
/// use classroom_onboarding::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts("Alice@Example.com", "Ab3dEf9h").unwrap();
/// assert_eq!(creds.email().as_str(), "alice@example.com");
/// assert_eq!(creds.password(), "Ab3dEf9h");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: Email,
    password: Zeroizing<String>,
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl LoginCredentials {
    /// Construct credentials from raw email/password inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, LoginValidationError> {
        let email = Email::parse(email).map_err(|err| match err {
            StudentValidationError::EmptyEmail => LoginValidationError::EmptyEmail,
            _ => LoginValidationError::InvalidEmail,
        })?;

        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }

        Ok(Self {
            email,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Normalised email used for lookups.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Password string provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "pw", LoginValidationError::EmptyEmail)]
    #[case("   ", "pw", LoginValidationError::EmptyEmail)]
    #[case("alice", "pw", LoginValidationError::InvalidEmail)]
    #[case("alice@example.com", "", LoginValidationError::EmptyPassword)]
    fn invalid_credentials(
        #[case] email: &str,
        #[case] password: &str,
        #[case] expected: LoginValidationError,
    ) {
        let err = LoginCredentials::try_from_parts(email, password)
            .expect_err("invalid inputs must fail");
        assert_eq!(err, expected);
    }

    #[rstest]
    #[case("  alice@example.com  ", " secret ")]
    #[case("BOB@example.org", "correct horse battery staple")]
    fn valid_credentials_normalise_email(#[case] email: &str, #[case] password: &str) {
        let creds = LoginCredentials::try_from_parts(email, password)
            .expect("valid inputs should succeed");
        assert_eq!(creds.email().as_str(), email.trim().to_lowercase());
        assert_eq!(creds.password(), password);
    }
}
