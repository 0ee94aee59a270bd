//! Identity provider held in process memory.
//!
//! Credentials are stored as salted Argon2id hashes produced by the
//! provider's [`CredentialHasher`]. Repeated wrong credentials lock the identity until
//! [`InMemoryIdentityProvider::unlock`] clears the failure counter.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::ports::{IdentityProvider, IdentityProviderError};
use crate::domain::{
    CredentialHash, CredentialHashError, CredentialHasher, Email, PERMANENT_CREDENTIAL_MIN,
    PermanentCredential, Uid,
};

/// Consecutive failures after which sign-in is refused.
pub const DEFAULT_LOCKOUT_THRESHOLD: u32 = 5;

#[derive(Debug)]
struct Account {
    uid: Uid,
    hash: CredentialHash,
    disabled: bool,
    failures: u32,
}

/// [`IdentityProvider`] keyed by normalised email.
#[derive(Debug)]
pub struct InMemoryIdentityProvider {
    accounts: Mutex<HashMap<Email, Account>>,
    lockout_threshold: u32,
    hasher: CredentialHasher,
}

fn hashing_failure(err: CredentialHashError) -> IdentityProviderError {
    IdentityProviderError::unavailable(err.to_string())
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::with_lockout_threshold(DEFAULT_LOCKOUT_THRESHOLD)
    }
}

impl InMemoryIdentityProvider {
    /// Provider that locks an identity after `threshold` consecutive failures.
    pub fn with_lockout_threshold(threshold: u32) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            lockout_threshold: threshold.max(1),
            hasher: CredentialHasher::default(),
        }
    }

    /// Replace the hasher used to store new credentials.
    #[must_use]
    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = hasher;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Email, Account>>, IdentityProviderError> {
        self.accounts
            .lock()
            .map_err(|_| IdentityProviderError::unavailable("identity store lock poisoned"))
    }

    fn insert(&self, email: &Email, secret: &str) -> Result<Uid, IdentityProviderError> {
        if secret.chars().count() < PERMANENT_CREDENTIAL_MIN {
            return Err(IdentityProviderError::weak_credential());
        }
        let hash = self.hasher.hash(secret).map_err(hashing_failure)?;
        let mut accounts = self.lock()?;
        if accounts.contains_key(email) {
            return Err(IdentityProviderError::email_already_in_use());
        }
        let uid = Uid::parse(&Uuid::new_v4().simple().to_string())
            .map_err(|err| IdentityProviderError::unavailable(err.to_string()))?;
        accounts.insert(
            email.clone(),
            Account {
                uid: uid.clone(),
                hash,
                disabled: false,
                failures: 0,
            },
        );
        Ok(uid)
    }

    /// Register an identity that predates this process, such as an account
    /// created by an earlier client.
    ///
    /// # Errors
    /// Same as [`IdentityProvider::create_identity`].
    pub fn register_existing(
        &self,
        email: &Email,
        secret: &str,
    ) -> Result<Uid, IdentityProviderError> {
        self.insert(email, secret)
    }

    /// Disable the identity for `email`.
    ///
    /// # Errors
    /// [`IdentityProviderError::NotFound`] when no identity exists.
    pub fn disable(&self, email: &Email) -> Result<(), IdentityProviderError> {
        let mut accounts = self.lock()?;
        let account = accounts
            .get_mut(email)
            .ok_or_else(IdentityProviderError::not_found)?;
        account.disabled = true;
        Ok(())
    }

    /// Clear the failure counter for `email`.
    ///
    /// # Errors
    /// [`IdentityProviderError::NotFound`] when no identity exists.
    pub fn unlock(&self, email: &Email) -> Result<(), IdentityProviderError> {
        let mut accounts = self.lock()?;
        let account = accounts
            .get_mut(email)
            .ok_or_else(IdentityProviderError::not_found)?;
        account.failures = 0;
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn create_identity(
        &self,
        email: &Email,
        credential: &PermanentCredential,
    ) -> Result<Uid, IdentityProviderError> {
        let uid = self.insert(email, credential.expose())?;
        debug!(%uid, "identity created");
        Ok(uid)
    }

    async fn sign_in(&self, email: &Email, password: &str) -> Result<Uid, IdentityProviderError> {
        let (uid, hash) = {
            let accounts = self.lock()?;
            let account = accounts
                .get(email)
                .ok_or_else(IdentityProviderError::not_found)?;
            if account.disabled {
                return Err(IdentityProviderError::disabled());
            }
            if account.failures >= self.lockout_threshold {
                return Err(IdentityProviderError::too_many_attempts());
            }
            (account.uid.clone(), account.hash.clone())
        };

        // Argon2 runs without the lock held.
        let matches = self
            .hasher
            .verify(password, &hash)
            .map_err(hashing_failure)?;

        let mut accounts = self.lock()?;
        let account = accounts
            .get_mut(email)
            .filter(|account| account.uid == uid)
            .ok_or_else(IdentityProviderError::not_found)?;
        if matches {
            account.failures = 0;
            Ok(uid)
        } else {
            account.failures += 1;
            if account.failures >= self.lockout_threshold {
                warn!(%uid, "identity locked after repeated failures");
            }
            Err(IdentityProviderError::wrong_credential())
        }
    }

    async fn email_registered(&self, email: &Email) -> Result<bool, IdentityProviderError> {
        Ok(self.lock()?.contains_key(email))
    }
}
