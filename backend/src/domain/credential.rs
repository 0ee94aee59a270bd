//! Onboarding and permanent credentials, and the hashing applied to them.
//!
//! Newly issued onboarding credentials are hashed with salted Argon2id and
//! stored as PHC strings. Records written by earlier clients hold an unsalted
//! lowercase-hex SHA-256 digest instead; verification accepts both so existing
//! stores keep working.

use std::fmt;

use argon2::password_hash::rand_core::OsRng as SaltRng;
use argon2::password_hash::{
    self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Characters an onboarding credential is drawn from.
pub const ONBOARDING_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890";
/// Length of a generated onboarding credential.
pub const ONBOARDING_CREDENTIAL_LENGTH: usize = 8;
/// Minimum length accepted for a permanent credential.
pub const PERMANENT_CREDENTIAL_MIN: usize = 6;

const LEGACY_DIGEST_LEN: usize = 64;

/// One-time secret delivered to a student at registration.
///
/// The plaintext only lives in memory long enough to be hashed and handed to
/// the notification channel; it is zeroed on drop and redacted from `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct OnboardingCredential(Zeroizing<String>);

impl OnboardingCredential {
    /// Draw a fresh credential from the operating system CSPRNG.
    ///
    /// # Examples
    /// ```
    /// use classroom_onboarding::domain::OnboardingCredential;
    ///
    /// let credential = OnboardingCredential::generate();
    /// assert_eq!(credential.expose().len(), 8);
    /// assert!(credential.expose().chars().all(|c| c.is_ascii_alphanumeric()));
    /// ```
    pub fn generate() -> Self {
        let mut rng = OsRng;
        let secret: String = (0..ONBOARDING_CREDENTIAL_LENGTH)
            .filter_map(|_| ONBOARDING_ALPHABET.choose(&mut rng).copied().map(char::from))
            .collect();
        Self(Zeroizing::new(secret))
    }

    /// Plaintext value for hashing and one-time delivery.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for OnboardingCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OnboardingCredential(<redacted>)")
    }
}

/// Errors raised when a permanent credential is rejected before reaching the
/// identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermanentCredentialError {
    /// Either field was left blank.
    Empty,
    /// Confirmation differs from the new credential.
    Mismatch,
    /// Shorter than the configured minimum.
    TooShort { min: usize },
}

impl fmt::Display for PermanentCredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Please fill in all fields."),
            Self::Mismatch => write!(f, "Passwords do not match."),
            Self::TooShort { min } => {
                write!(f, "Password must be at least {min} characters long.")
            }
        }
    }
}

impl std::error::Error for PermanentCredentialError {}

impl PermanentCredentialError {
    /// Stable code exposed in error details.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty => "empty_password",
            Self::Mismatch => "password_mismatch",
            Self::TooShort { .. } => "password_too_short",
        }
    }
}

/// Permanent credential chosen by the student during activation.
#[derive(Clone, PartialEq, Eq)]
pub struct PermanentCredential(Zeroizing<String>);

impl PermanentCredential {
    /// Validate the new credential against its confirmation.
    pub fn try_new(new: &str, confirmation: &str) -> Result<Self, PermanentCredentialError> {
        if new.is_empty() || confirmation.is_empty() {
            return Err(PermanentCredentialError::Empty);
        }
        if new != confirmation {
            return Err(PermanentCredentialError::Mismatch);
        }
        if new.chars().count() < PERMANENT_CREDENTIAL_MIN {
            return Err(PermanentCredentialError::TooShort {
                min: PERMANENT_CREDENTIAL_MIN,
            });
        }
        Ok(Self(Zeroizing::new(new.to_owned())))
    }

    /// Plaintext value handed to the identity provider.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for PermanentCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PermanentCredential(<redacted>)")
    }
}

/// Stored one-way hash of an onboarding credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialHash(String);

/// Encoding of a stored [`CredentialHash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    /// Salted Argon2id PHC string.
    Argon2,
    /// Unsalted lowercase-hex SHA-256 digest from earlier clients.
    LegacySha256,
    /// Anything else, including the empty string.
    Unrecognised,
}

impl CredentialHash {
    /// Wrap a stored hash value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Whether no hash was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Borrow the stored encoding.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Detect which scheme produced this hash.
    pub fn scheme(&self) -> HashScheme {
        if self.0.starts_with("$argon2") {
            HashScheme::Argon2
        } else if self.0.len() == LEGACY_DIGEST_LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            HashScheme::LegacySha256
        } else {
            HashScheme::Unrecognised
        }
    }
}

impl fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialHash({:?})", self.scheme())
    }
}

/// Hashing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialHashError {
    /// Argon2 parameters or hashing failed.
    #[error("credential hashing failed: {message}")]
    Hashing { message: String },
    /// The stored hash cannot be interpreted.
    #[error("stored credential hash is malformed")]
    Malformed,
}

/// Hashes and verifies onboarding credentials.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialHasher").finish_non_exhaustive()
    }
}

impl CredentialHasher {
    /// Build a hasher with explicit Argon2id cost parameters.
    ///
    /// Verification always uses the parameters encoded in the stored hash, so
    /// changing these only affects newly issued credentials.
    pub fn with_params(memory_kib: u32, iterations: u32) -> Result<Self, CredentialHashError> {
        let params = Params::new(memory_kib, iterations, 1, None).map_err(|err| {
            CredentialHashError::Hashing {
                message: err.to_string(),
            }
        })?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash `secret` with a fresh random salt.
    pub fn hash(&self, secret: &str) -> Result<CredentialHash, CredentialHashError> {
        let salt = SaltString::generate(&mut SaltRng);
        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| CredentialHash(hash.to_string()))
            .map_err(|err| CredentialHashError::Hashing {
                message: err.to_string(),
            })
    }

    /// Check `secret` against `stored`.
    ///
    /// Returns `Ok(false)` on a mismatch and an error only when `stored` cannot
    /// be interpreted.
    pub fn verify(&self, secret: &str, stored: &CredentialHash) -> Result<bool, CredentialHashError> {
        match stored.scheme() {
            HashScheme::Argon2 => {
                let parsed =
                    PasswordHash::new(stored.as_str()).map_err(|_| CredentialHashError::Malformed)?;
                if parsed.hash.is_none() {
                    return Err(CredentialHashError::Malformed);
                }
                match self.argon2.verify_password(secret.as_bytes(), &parsed) {
                    Ok(()) => Ok(true),
                    Err(password_hash::Error::Password) => Ok(false),
                    Err(_) => Err(CredentialHashError::Malformed),
                }
            }
            HashScheme::LegacySha256 => {
                let computed = legacy_sha256_hex(secret);
                Ok(computed.as_bytes().ct_eq(stored.as_str().as_bytes()).into())
            }
            HashScheme::Unrecognised => Err(CredentialHashError::Malformed),
        }
    }
}

/// Unsalted SHA-256 digest, as earlier clients stored it.
pub fn legacy_sha256_hex(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn hasher() -> CredentialHasher {
        CredentialHasher::with_params(8, 1).expect("cheap test parameters")
    }

    #[rstest]
    fn generated_credentials_use_the_alphabet() {
        for _ in 0..32 {
            let credential = OnboardingCredential::generate();
            assert_eq!(credential.expose().len(), ONBOARDING_CREDENTIAL_LENGTH);
            assert!(
                credential
                    .expose()
                    .bytes()
                    .all(|b| ONBOARDING_ALPHABET.contains(&b))
            );
        }
    }

    #[rstest]
    fn generated_credentials_differ() {
        let first = OnboardingCredential::generate();
        let second = OnboardingCredential::generate();
        assert_ne!(first.expose(), second.expose());
    }

    #[rstest]
    fn debug_output_hides_secrets() {
        let credential = OnboardingCredential::generate();
        assert!(!format!("{credential:?}").contains(credential.expose()));
        let permanent = PermanentCredential::try_new("s3cret!", "s3cret!").expect("valid");
        assert!(!format!("{permanent:?}").contains("s3cret!"));
    }

    #[rstest]
    fn argon2_hashes_are_salted_and_verify(hasher: CredentialHasher) {
        let first = hasher.hash("Ab3dEf9h").expect("hash");
        let second = hasher.hash("Ab3dEf9h").expect("hash");

        assert_ne!(first, second);
        assert_eq!(first.scheme(), HashScheme::Argon2);
        assert_eq!(hasher.verify("Ab3dEf9h", &first), Ok(true));
        assert_eq!(hasher.verify("Ab3dEf9H", &first), Ok(false));
    }

    #[rstest]
    fn legacy_digests_still_verify(hasher: CredentialHasher) {
        let stored = CredentialHash::new(legacy_sha256_hex("password"));

        assert_eq!(stored.scheme(), HashScheme::LegacySha256);
        assert_eq!(
            stored.as_str(),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
        assert_eq!(hasher.verify("password", &stored), Ok(true));
        assert_eq!(hasher.verify("Password", &stored), Ok(false));
    }

    #[rstest]
    #[case("")]
    #[case("plaintext")]
    #[case("$argon2id$broken")]
    #[case("$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHRzYWx0")]
    fn malformed_hashes_are_reported(hasher: CredentialHasher, #[case] stored: &str) {
        let result = hasher.verify("anything", &CredentialHash::new(stored));
        assert_eq!(result, Err(CredentialHashError::Malformed));
    }

    #[rstest]
    #[case("", "", PermanentCredentialError::Empty)]
    #[case("secret1", "", PermanentCredentialError::Empty)]
    #[case("secret1", "secret2", PermanentCredentialError::Mismatch)]
    #[case("abc", "abc", PermanentCredentialError::TooShort { min: PERMANENT_CREDENTIAL_MIN })]
    fn rejects_invalid_permanent_credentials(
        #[case] new: &str,
        #[case] confirmation: &str,
        #[case] expected: PermanentCredentialError,
    ) {
        let err = PermanentCredential::try_new(new, confirmation).expect_err("must fail");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn accepts_matching_permanent_credentials() {
        let credential = PermanentCredential::try_new("abcdef", "abcdef").expect("valid");
        assert_eq!(credential.expose(), "abcdef");
    }
}
