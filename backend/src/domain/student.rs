//! Student record model and the value types it is built from.
//!
//! A student exists exactly once per class: as a pending record keyed by
//! email until activation, then as an active record keyed by the durable
//! identity issued by the identity provider. Field names serialise in
//! camelCase because other tooling reads the same documents.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::credential::CredentialHash;

/// Validation errors raised while constructing student value types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentValidationError {
    EmptyEmail,
    InvalidEmail,
    EmptyClassCode,
    InvalidClassCode,
    EmptyStudentNumber,
    EmptyName,
    EmptyUid,
    InvalidUid,
}

impl fmt::Display for StudentValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::InvalidEmail => write!(f, "Please enter a valid email address."),
            Self::EmptyClassCode => write!(f, "class code must not be empty"),
            Self::InvalidClassCode => write!(f, "class code must not contain '/' or whitespace"),
            Self::EmptyStudentNumber => write!(f, "student number must not be empty"),
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::EmptyUid => write!(f, "uid must not be empty"),
            Self::InvalidUid => write!(f, "uid must not contain '/' or whitespace"),
        }
    }
}

impl std::error::Error for StudentValidationError {}

impl StudentValidationError {
    /// Stable code exposed in error details.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyEmail => "empty_email",
            Self::InvalidEmail => "invalid_email",
            Self::EmptyClassCode => "empty_class_code",
            Self::InvalidClassCode => "invalid_class_code",
            Self::EmptyStudentNumber => "empty_student_number",
            Self::EmptyName => "empty_name",
            Self::EmptyUid => "empty_uid",
            Self::InvalidUid => "invalid_uid",
        }
    }
}

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Borrow the normalised value.
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = StudentValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }
    };
}

fn is_path_safe(value: &str) -> bool {
    !value.contains('/') && !value.chars().any(char::is_whitespace)
}

string_newtype! {
    /// Lower-cased, syntactically valid email address.
    ///
    /// # Examples
    /// ```
    /// use classroom_onboarding::domain::Email;
    ///
    /// let email = Email::parse("  Alice@Example.com ").unwrap();
    /// assert_eq!(email.as_str(), "alice@example.com");
    /// assert!(Email::parse("alice example.com").is_err());
    /// ```
    Email
}

impl Email {
    /// Trim, lower-case, and validate `local@domain` syntax.
    pub fn parse(raw: &str) -> Result<Self, StudentValidationError> {
        let normalised = raw.trim().to_lowercase();
        if normalised.is_empty() {
            return Err(StudentValidationError::EmptyEmail);
        }
        if normalised.chars().any(char::is_whitespace) || normalised.contains('/') {
            return Err(StudentValidationError::InvalidEmail);
        }
        let Some((local, domain)) = normalised.split_once('@') else {
            return Err(StudentValidationError::InvalidEmail);
        };
        let domain_ok = domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !domain.contains('@');
        if local.is_empty() || !domain_ok {
            return Err(StudentValidationError::InvalidEmail);
        }
        Ok(Self(normalised))
    }
}

string_newtype! {
    /// Code identifying a class; also the name of its student collection.
    ClassCode
}

impl ClassCode {
    /// Trim and validate a class code.
    pub fn parse(raw: &str) -> Result<Self, StudentValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(StudentValidationError::EmptyClassCode);
        }
        if !is_path_safe(trimmed) {
            return Err(StudentValidationError::InvalidClassCode);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

string_newtype! {
    /// Institution-issued student number, unique across all classes.
    StudentNumber
}

impl StudentNumber {
    /// Trim and validate a student number.
    pub fn parse(raw: &str) -> Result<Self, StudentValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(StudentValidationError::EmptyStudentNumber);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

string_newtype! {
    /// Student's full display name.
    FullName
}

impl FullName {
    /// Trim and validate a name.
    pub fn parse(raw: &str) -> Result<Self, StudentValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(StudentValidationError::EmptyName);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

string_newtype! {
    /// Durable identifier issued by the identity provider.
    Uid
}

impl Uid {
    /// Validate an identifier returned by the identity provider.
    pub fn parse(raw: &str) -> Result<Self, StudentValidationError> {
        if raw.is_empty() {
            return Err(StudentValidationError::EmptyUid);
        }
        if !is_path_safe(raw) {
            return Err(StudentValidationError::InvalidUid);
        }
        Ok(Self(raw.to_owned()))
    }
}

/// Key of a student document inside its class collection.
///
/// Equals the email while the record is pending and the UID once active.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentKey(String);

impl DocumentKey {
    /// Borrow the raw key.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&Email> for DocumentKey {
    fn from(value: &Email) -> Self {
        Self(value.as_str().to_owned())
    }
}

impl From<&Uid> for DocumentKey {
    fn from(value: &Uid) -> Self {
        Self(value.as_str().to_owned())
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role attached to a student record; only players may sign in here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

/// Role assigned to newly registered students.
pub const PLAYER_ROLE: &str = "Player";

impl Role {
    /// Wrap an arbitrary role name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Whether this role may use the game client (case-insensitive).
    pub fn is_player(&self) -> bool {
        self.0.eq_ignore_ascii_case(PLAYER_ROLE)
    }

    /// Borrow the role name.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for Role {
    fn default() -> Self {
        Self(PLAYER_ROLE.to_owned())
    }
}

/// Lifecycle status of a student record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    /// Invited with a temporary credential; keyed by email.
    Pending,
    /// Activated with a durable identity; keyed by UID.
    Active,
}

/// Validated registration data for a new student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub class_code: ClassCode,
    pub student_number: StudentNumber,
    pub name: FullName,
    pub email: Email,
}

/// Persisted student document.
///
/// ## Invariants
/// - `status == Pending` implies `document_key` is the email, `first_login`
///   is true, and `uid` is absent.
/// - `status == Active` implies `document_key` is the UID and
///   `temp_credential_hash` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub class_code: ClassCode,
    pub document_key: DocumentKey,
    pub student_number: StudentNumber,
    pub name: FullName,
    pub email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "tempPassword")]
    pub temp_credential_hash: Option<CredentialHash>,
    pub status: StudentStatus,
    pub is_active: bool,
    pub first_login: bool,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uid>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
}

impl StudentRecord {
    /// Build the pending record written at registration time.
    pub fn pending(student: NewStudent, hash: CredentialHash, created_at: DateTime<Utc>) -> Self {
        let NewStudent {
            class_code,
            student_number,
            name,
            email,
        } = student;
        Self {
            class_code,
            document_key: DocumentKey::from(&email),
            student_number,
            name,
            email,
            temp_credential_hash: Some(hash),
            status: StudentStatus::Pending,
            is_active: false,
            first_login: true,
            role: Role::default(),
            uid: None,
            created_at,
            activated_at: None,
        }
    }

    /// Whether the record is still waiting for its first login.
    pub fn is_pending(&self) -> bool {
        self.status == StudentStatus::Pending
    }

    /// Derive the active record that replaces this pending one.
    #[must_use]
    pub fn into_active(self, uid: Uid, activated_at: DateTime<Utc>) -> Self {
        Self {
            document_key: DocumentKey::from(&uid),
            uid: Some(uid),
            temp_credential_hash: None,
            status: StudentStatus::Active,
            is_active: true,
            first_login: false,
            activated_at: Some(activated_at),
            ..self
        }
    }

    /// Whether `other` describes the same student in the same class.
    pub fn same_student(&self, other: &Self) -> bool {
        self.class_code == other.class_code && self.email == other.email
    }
}
