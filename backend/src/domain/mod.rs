//! Domain primitives, ports, and the onboarding workflows.
//!
//! Purpose: Define strongly typed student records and credentials, the ports
//! the workflows depend on, and the services that drive a student from
//! registration through first-login activation. Keep types immutable and
//! document invariants and serialisation contracts (serde) in each type's
//! Rustdoc.
//!
//! Public surface:
//! - Error (alias to `error::Error`) — API error response payload.
//! - ErrorCode (alias to `error::ErrorCode`) — stable error identifier.
//! - StudentRecord and its validated field types.
//! - ActivationService — the activation protocol engine.
//! - RegistrationService and LoginService — workflows built on the engine.

pub mod activation;
mod activity_log;
mod auth;
mod credential;
pub mod error;
mod login;
pub mod ports;
mod registration;
mod retry;
mod student;
mod trace_id;

pub use self::activation::{
    ActivationError, ActivationService, ActivationStrategy, ErrorCategory, PromotionOutcome,
    VerifiedActivation,
};
pub use self::activity_log::{ActivityAction, ActivityLogEntry};
pub use self::auth::{LoginCredentials, LoginValidationError};
pub use self::credential::{
    CredentialHash, CredentialHashError, CredentialHasher, HashScheme, ONBOARDING_ALPHABET,
    ONBOARDING_CREDENTIAL_LENGTH, OnboardingCredential, PERMANENT_CREDENTIAL_MIN,
    PermanentCredential, PermanentCredentialError, legacy_sha256_hex,
};
pub use self::error::{Error, ErrorCode};
pub use self::login::LoginService;
pub use self::registration::RegistrationService;
pub use self::retry::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY, RetryPolicy};
pub use self::student::{
    ClassCode, DocumentKey, Email, FullName, NewStudent, PLAYER_ROLE, Role, StudentNumber,
    StudentRecord, StudentStatus, StudentValidationError, Uid,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use classroom_onboarding::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
