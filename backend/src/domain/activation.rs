//! Activation protocol engine.
//!
//! Owns the per-student state machine
//! `Unregistered -> PendingActivation -> Active`. Registration creates the
//! pending record; this engine verifies the onboarding credential and moves
//! the record from its email key to the UID issued by the identity provider.
//! Failed verification leaves the record untouched and `Active` is terminal.
//!
//! The engine performs no retries and no internal waiting. It suspends only
//! at port calls.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, error, info, warn};

use crate::domain::ports::{
    AccountActivation, ActivatedAccount, ActivationRequest, ActivityLog, IdentityProvider,
    IdentityProviderError, PromotionWrite, ReconciliationReport, RepairedActivation, StudentStore,
    StudentStoreError,
};
use crate::domain::{
    ActivityLogEntry, CredentialHash, CredentialHashError, CredentialHasher, DocumentKey, Email,
    Error, OnboardingCredential, PermanentCredential, StudentRecord, StudentStatus, Uid,
};

mod error;

pub use error::{ActivationError, ErrorCategory};

/// How a promotion is committed to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActivationStrategy {
    /// Write the active record and delete the pending one in a single store
    /// transaction.
    #[default]
    Transactional,
    /// Read, write, then delete as separate calls. A crash between the write
    /// and the delete leaves a duplicate that
    /// [`ActivationService::reconcile_partial_activations`] repairs.
    Sequential,
}

/// Proof that a pending record's onboarding credential was verified.
///
/// Only [`ActivationService::verify_activation`] constructs this, so
/// promotion cannot be requested for an unverified record.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedActivation {
    record: StudentRecord,
}

impl VerifiedActivation {
    /// The pending record as it was when verified.
    pub fn record(&self) -> &StudentRecord {
        &self.record
    }
}

/// Result of [`ActivationService::promote_to_active`].
#[derive(Debug, Clone, PartialEq)]
pub enum PromotionOutcome {
    /// This call moved the record.
    Activated(StudentRecord),
    /// An earlier call already moved the record to the same UID.
    AlreadyActive(StudentRecord),
}

impl PromotionOutcome {
    /// The active record.
    pub fn record(&self) -> &StudentRecord {
        match self {
            Self::Activated(record) | Self::AlreadyActive(record) => record,
        }
    }

    /// Whether this call performed the move.
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Activated(_))
    }
}

/// Activation engine over the student store, identity provider and
/// activity log.
pub struct ActivationService<S, I, L> {
    store: Arc<S>,
    identity: Arc<I>,
    activity_log: Arc<L>,
    clock: Arc<dyn Clock>,
    hasher: CredentialHasher,
    strategy: ActivationStrategy,
}

impl<S, I, L> Clone for ActivationService<S, I, L> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            identity: Arc::clone(&self.identity),
            activity_log: Arc::clone(&self.activity_log),
            clock: Arc::clone(&self.clock),
            hasher: self.hasher.clone(),
            strategy: self.strategy,
        }
    }
}

impl<S, I, L> ActivationService<S, I, L> {
    /// Create an engine using transactional promotion and default Argon2
    /// parameters.
    ///
    /// ```rust,no_run
    /// # use std::sync::Arc;
    /// # use classroom_onboarding::domain::{ActivationService, ClassCode};
    /// # use classroom_onboarding::outbound::memory::{
    /// #     InMemoryActivityLog, InMemoryIdentityProvider, InMemoryStudentStore,
    /// # };
    /// # use mockable::DefaultClock;
    /// let classes = [ClassCode::parse("CS101").expect("class code")];
    /// let engine = ActivationService::new(
    ///     Arc::new(InMemoryStudentStore::with_classes(classes)),
    ///     Arc::new(InMemoryIdentityProvider::default()),
    ///     Arc::new(InMemoryActivityLog::default()),
    ///     Arc::new(DefaultClock),
    /// );
    /// # let _ = engine;
    /// ```
    pub fn new(
        store: Arc<S>,
        identity: Arc<I>,
        activity_log: Arc<L>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            identity,
            activity_log,
            clock,
            hasher: CredentialHasher::default(),
            strategy: ActivationStrategy::default(),
        }
    }

    /// Choose how promotions are committed.
    #[must_use]
    pub fn with_strategy(mut self, strategy: ActivationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Replace the Argon2 hasher used for onboarding credentials.
    #[must_use]
    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// The configured promotion strategy.
    pub fn strategy(&self) -> ActivationStrategy {
        self.strategy
    }

    /// Draw a fresh onboarding credential from the OS CSPRNG.
    pub fn generate_onboarding_credential(&self) -> OnboardingCredential {
        OnboardingCredential::generate()
    }

    /// Hash an onboarding credential for storage.
    pub fn hash_onboarding_credential(
        &self,
        credential: &OnboardingCredential,
    ) -> Result<CredentialHash, CredentialHashError> {
        self.hasher.hash(credential.expose())
    }

    pub(crate) fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub(crate) fn identity(&self) -> &Arc<I> {
        &self.identity
    }

    pub(crate) fn activity_log(&self) -> &Arc<L> {
        &self.activity_log
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Check `supplied` against the record's onboarding credential.
    ///
    /// Preconditions: the record is pending, `first_login` is set, and a
    /// credential hash is present.
    ///
    /// # Errors
    ///
    /// - [`ActivationError::AccountNotPending`] once the record is active.
    /// - [`ActivationError::NoCredentialIssued`] when the hash is absent,
    ///   empty, or unreadable.
    /// - [`ActivationError::CredentialMismatch`] when `supplied` is wrong.
    pub fn verify_activation(
        &self,
        record: &StudentRecord,
        supplied: &str,
    ) -> Result<VerifiedActivation, ActivationError> {
        if !record.is_pending() || !record.first_login {
            return Err(ActivationError::AccountNotPending);
        }
        let Some(hash) = record
            .temp_credential_hash
            .as_ref()
            .filter(|hash| !hash.is_empty())
        else {
            warn!(
                class_code = %record.class_code,
                key = %record.document_key,
                "pending record has no onboarding credential"
            );
            return Err(ActivationError::NoCredentialIssued);
        };

        match self.hasher.verify(supplied, hash) {
            Ok(true) => Ok(VerifiedActivation {
                record: record.clone(),
            }),
            Ok(false) => Err(ActivationError::CredentialMismatch),
            Err(err) => {
                error!(
                    class_code = %record.class_code,
                    key = %record.document_key,
                    error = %err,
                    "stored onboarding credential hash is unreadable"
                );
                Err(ActivationError::NoCredentialIssued)
            }
        }
    }

    /// Boolean form of [`Self::verify_activation`]: a mismatch is `Ok(false)`.
    pub fn matches_credential(
        &self,
        record: &StudentRecord,
        supplied: &str,
    ) -> Result<bool, ActivationError> {
        match self.verify_activation(record, supplied) {
            Ok(_) => Ok(true),
            Err(ActivationError::CredentialMismatch) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Map a failed store read; only connection and query failures stay
/// retryable.
pub(crate) fn read_failure(err: StudentStoreError) -> ActivationError {
    if err.is_transient() {
        ActivationError::transient(err.to_string())
    } else {
        ActivationError::store_rejected(err.to_string())
    }
}

pub(crate) fn write_failure(err: StudentStoreError) -> ActivationError {
    if err.is_transient() {
        ActivationError::write_failed(err.to_string())
    } else {
        ActivationError::store_rejected(err.to_string())
    }
}

impl<S, I, L> ActivationService<S, I, L>
where
    S: StudentStore,
    I: IdentityProvider,
    L: ActivityLog,
{
    /// Find the pending record keyed by `email` in any class.
    ///
    /// Classes are scanned in the store's iteration order and the first
    /// match wins; no ordering between classes is guaranteed. Returns
    /// `Ok(None)` when no class holds the key.
    pub async fn locate_activation_candidate(
        &self,
        email: &str,
    ) -> Result<Option<StudentRecord>, ActivationError> {
        let email =
            Email::parse(email).map_err(|err| ActivationError::invalid_input(err.to_string()))?;
        self.find_pending(&email).await
    }

    pub(crate) async fn find_pending(
        &self,
        email: &Email,
    ) -> Result<Option<StudentRecord>, ActivationError> {
        let key = DocumentKey::from(email);
        let classes = self.store.class_codes().await.map_err(read_failure)?;
        for class_code in &classes {
            if let Some(record) = self.store.get(class_code, &key).await.map_err(read_failure)? {
                debug!(%class_code, "activation candidate located");
                return Ok(Some(record));
            }
        }
        debug!(classes = classes.len(), "no activation candidate");
        Ok(None)
    }

    /// Move a verified pending record to the key `uid`.
    ///
    /// The active record is durably written before the pending one is
    /// removed. Re-entry is idempotent: when the pending record is gone and
    /// an active record for the same student already sits at `uid`, that
    /// record is returned as [`PromotionOutcome::AlreadyActive`].
    ///
    /// # Errors
    ///
    /// - [`ActivationError::StaleRecord`] when the pending record changed or
    ///   vanished and no matching active record exists at `uid`.
    /// - [`ActivationError::WriteFailed`] on store I/O failure.
    /// - [`ActivationError::PartialActivation`] when the sequential strategy
    ///   wrote the active record but could not delete the pending one.
    pub async fn promote_to_active(
        &self,
        verified: &VerifiedActivation,
        uid: Uid,
    ) -> Result<PromotionOutcome, ActivationError> {
        let pending = verified.record();
        let active = pending.clone().into_active(uid.clone(), self.clock.utc());

        let outcome = match self.strategy {
            ActivationStrategy::Transactional => {
                self.promote_transactionally(pending, active).await?
            }
            ActivationStrategy::Sequential => {
                self.promote_sequentially(pending, active, &uid).await?
            }
        };

        if let PromotionOutcome::Activated(record) = &outcome {
            info!(class_code = %record.class_code, %uid, "student activated");
            self.record_activity(ActivityLogEntry::activated(
                record.class_code.clone(),
                record.email.clone(),
                uid,
                self.clock.utc(),
            ))
            .await;
        }
        Ok(outcome)
    }

    async fn promote_transactionally(
        &self,
        pending: &StudentRecord,
        active: StudentRecord,
    ) -> Result<PromotionOutcome, ActivationError> {
        let write = PromotionWrite {
            class_code: pending.class_code.clone(),
            pending_key: pending.document_key.clone(),
            expected: pending.clone(),
            active,
        };
        match self.store.promote(&write).await {
            Ok(()) => Ok(PromotionOutcome::Activated(write.active)),
            Err(StudentStoreError::Stale { .. } | StudentStoreError::TargetOccupied { .. }) => {
                self.resolve_conflict(pending, &write.active.document_key).await
            }
            Err(err) => Err(write_failure(err)),
        }
    }

    async fn promote_sequentially(
        &self,
        pending: &StudentRecord,
        active: StudentRecord,
        uid: &Uid,
    ) -> Result<PromotionOutcome, ActivationError> {
        let current = self
            .store
            .get(&pending.class_code, &pending.document_key)
            .await
            .map_err(write_failure)?;
        match current {
            Some(current) if current == *pending => {}
            Some(_) => return Err(ActivationError::StaleRecord),
            None => return self.resolve_conflict(pending, &active.document_key).await,
        }

        let occupied = self
            .store
            .get(&active.class_code, &active.document_key)
            .await
            .map_err(write_failure)?;
        if occupied.is_some() {
            return self.resolve_conflict(pending, &active.document_key).await;
        }

        self.store.set(&active).await.map_err(write_failure)?;

        if let Err(err) = self
            .store
            .delete(&pending.class_code, &pending.document_key)
            .await
        {
            error!(
                class_code = %pending.class_code,
                pending_key = %pending.document_key,
                active_key = %active.document_key,
                error = %err,
                "partial activation: pending record could not be deleted"
            );
            return Err(ActivationError::PartialActivation {
                class_code: active.class_code.clone(),
                email: active.email.clone(),
                uid: uid.clone(),
            });
        }

        Ok(PromotionOutcome::Activated(active))
    }

    async fn resolve_conflict(
        &self,
        pending: &StudentRecord,
        target: &DocumentKey,
    ) -> Result<PromotionOutcome, ActivationError> {
        let existing = self
            .store
            .get(&pending.class_code, target)
            .await
            .map_err(write_failure)?;
        match existing {
            Some(record) if record.status == StudentStatus::Active && record.same_student(pending) => {
                debug!(
                    class_code = %record.class_code,
                    uid = %record.document_key,
                    "promotion already applied"
                );
                Ok(PromotionOutcome::AlreadyActive(record))
            }
            _ => {
                warn!(
                    class_code = %pending.class_code,
                    key = %pending.document_key,
                    "pending record changed during promotion"
                );
                Err(ActivationError::StaleRecord)
            }
        }
    }

    /// Validate the permanent credential, verify the onboarding credential,
    /// create the durable identity, and promote the record.
    ///
    /// Repeating a request that already succeeded returns the same account
    /// with `already_active` set.
    pub async fn complete_first_login(
        &self,
        request: &ActivationRequest,
    ) -> Result<ActivatedAccount, ActivationError> {
        if request.email.trim().is_empty() || request.temporary_credential.is_empty() {
            return Err(ActivationError::invalid_input("Please fill in all fields."));
        }
        let permanent =
            PermanentCredential::try_new(&request.new_credential, &request.confirmation)
                .map_err(|err| ActivationError::invalid_input(err.to_string()))?;

        let email = Email::parse(&request.email)
            .map_err(|err| ActivationError::invalid_input(err.to_string()))?;
        let Some(record) = self.find_pending(&email).await? else {
            return self.already_activated(&email, &permanent).await;
        };
        let verified = self.verify_activation(&record, &request.temporary_credential)?;
        let uid = self.create_identity(&record.email, &permanent).await?;
        let outcome = self.promote_to_active(&verified, uid.clone()).await?;

        Ok(ActivatedAccount {
            uid,
            class_code: outcome.record().class_code.clone(),
            already_active: !outcome.is_fresh(),
        })
    }

    /// Answer a repeated activation whose pending record is already gone.
    ///
    /// Succeeds only when the caller holds the permanent credential and the
    /// active record for the issued UID exists; anything else is
    /// [`ActivationError::CandidateNotFound`].
    async fn already_activated(
        &self,
        email: &Email,
        permanent: &PermanentCredential,
    ) -> Result<ActivatedAccount, ActivationError> {
        let uid = match self.identity.sign_in(email, permanent.expose()).await {
            Ok(uid) => uid,
            Err(IdentityProviderError::Unavailable { message }) => {
                return Err(ActivationError::transient(message));
            }
            Err(_) => return Err(ActivationError::CandidateNotFound),
        };
        let key = DocumentKey::from(&uid);
        for class_code in self.store.class_codes().await.map_err(read_failure)? {
            let Some(record) = self.store.get(&class_code, &key).await.map_err(read_failure)?
            else {
                continue;
            };
            if record.status == StudentStatus::Active && record.email == *email {
                debug!(%class_code, %uid, "activation already completed");
                return Ok(ActivatedAccount {
                    uid,
                    class_code,
                    already_active: true,
                });
            }
        }
        Err(ActivationError::CandidateNotFound)
    }

    async fn create_identity(
        &self,
        email: &Email,
        permanent: &PermanentCredential,
    ) -> Result<Uid, ActivationError> {
        match self.identity.create_identity(email, permanent).await {
            Ok(uid) => Ok(uid),
            Err(IdentityProviderError::EmailAlreadyInUse) => {
                // An earlier attempt may have created the identity before its
                // promotion failed; resume with it if the credential matches.
                match self.identity.sign_in(email, permanent.expose()).await {
                    Ok(uid) => {
                        info!(%uid, "resuming activation with existing identity");
                        Ok(uid)
                    }
                    Err(_) => Err(ActivationError::StaleRecord),
                }
            }
            Err(IdentityProviderError::WeakCredential) => Err(ActivationError::WeakCredential),
            Err(err) => Err(ActivationError::transient(err.to_string())),
        }
    }

    /// Delete pending records whose student already has an active record in
    /// the same class.
    pub async fn reconcile_partial_activations(
        &self,
    ) -> Result<ReconciliationReport, ActivationError> {
        let mut report = ReconciliationReport::default();
        for class_code in self.store.class_codes().await.map_err(read_failure)? {
            let students = self.store.students(&class_code).await.map_err(read_failure)?;
            let (pending, active): (Vec<_>, Vec<_>) =
                students.into_iter().partition(StudentRecord::is_pending);

            for leftover in pending {
                let Some(uid) = active
                    .iter()
                    .find(|record| record.same_student(&leftover))
                    .and_then(|record| record.uid.clone())
                else {
                    continue;
                };
                self.store
                    .delete(&class_code, &leftover.document_key)
                    .await
                    .map_err(write_failure)?;
                warn!(
                    %class_code,
                    key = %leftover.document_key,
                    %uid,
                    "removed pending record left by partial activation"
                );
                report.repaired.push(RepairedActivation {
                    class_code: class_code.clone(),
                    email: leftover.email,
                    uid,
                });
            }
        }
        Ok(report)
    }

    pub(crate) async fn record_activity(&self, entry: ActivityLogEntry) {
        if let Err(err) = self.activity_log.append(&entry).await {
            warn!(
                action = ?entry.action,
                class_code = %entry.class_code,
                error = %err,
                "activity log write failed"
            );
        }
    }
}

#[async_trait]
impl<S, I, L> AccountActivation for ActivationService<S, I, L>
where
    S: StudentStore,
    I: IdentityProvider,
    L: ActivityLog,
{
    async fn activate(&self, request: ActivationRequest) -> Result<ActivatedAccount, Error> {
        self.complete_first_login(&request).await.map_err(Error::from)
    }

    async fn reconcile(&self) -> Result<ReconciliationReport, Error> {
        self.reconcile_partial_activations()
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests;
