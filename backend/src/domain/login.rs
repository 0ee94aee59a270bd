//! Login workflow.
//!
//! Active students sign in through the identity provider. When the provider
//! does not know the email, the onboarding credential is checked against the
//! pending record instead and the caller is told to finish activation.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::domain::activation::{read_failure, write_failure};
use crate::domain::ports::{
    ActivityLog, IdentityProvider, IdentityProviderError, LoginOutcome, StudentField,
    StudentLogin, StudentStore,
};
use crate::domain::{
    ActivationError, ActivationService, ActivityLogEntry, Email, Error, LoginCredentials,
    RetryPolicy, StudentRecord, Uid,
};

/// Login service implementing [`StudentLogin`].
pub struct LoginService<S, I, L> {
    engine: ActivationService<S, I, L>,
    retry: RetryPolicy,
}

impl<S, I, L> LoginService<S, I, L> {
    /// Build the workflow on top of the activation engine's ports. Store
    /// reads are retried under `retry`.
    pub fn new(engine: ActivationService<S, I, L>, retry: RetryPolicy) -> Self {
        Self { engine, retry }
    }
}

fn provider_error(err: IdentityProviderError) -> Error {
    match err {
        IdentityProviderError::WrongCredential => Error::unauthorized("Incorrect password."),
        IdentityProviderError::NotFound => {
            Error::not_found("No account found with this email.")
        }
        IdentityProviderError::Disabled => {
            Error::forbidden("This account has been disabled. Please contact administrator.")
        }
        IdentityProviderError::TooManyAttempts => {
            Error::rate_limited("Too many failed attempts. Please try again later.")
        }
        IdentityProviderError::Unavailable { message } => {
            ActivationError::transient(message).into()
        }
        other @ (IdentityProviderError::WeakCredential
        | IdentityProviderError::EmailAlreadyInUse) => Error::internal(format!(
            "identity provider returned an unexpected sign-in error: {other}"
        )),
    }
}

impl<S, I, L> LoginService<S, I, L>
where
    S: StudentStore,
    I: IdentityProvider,
    L: ActivityLog,
{
    async fn find_by_uid(&self, uid: &Uid) -> Result<Option<StudentRecord>, ActivationError> {
        let store = self.engine.store();
        let classes = self
            .retry
            .run("class_codes", || async move {
                store.class_codes().await.map_err(read_failure)
            })
            .await?;
        for class_code in &classes {
            let matches = self
                .retry
                .run("find_by_field", || async move {
                    store
                        .find_by_field(class_code, StudentField::Uid, uid.as_str())
                        .await
                        .map_err(read_failure)
                })
                .await?;
            if let Some(record) = matches.into_iter().next() {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    async fn authenticated(&self, email: &Email, uid: Uid) -> Result<LoginOutcome, Error> {
        let record = self.find_by_uid(&uid).await?.ok_or_else(|| {
            Error::not_found("Student record not found. Please contact administrator.")
        })?;

        if !record.role.is_player() {
            return Err(Error::forbidden("Access denied. This app is for students only.")
                .with_details(json!({ "code": "role_not_permitted" })));
        }

        self.engine
            .store()
            .set_active_flag(&record.class_code, &record.document_key, true)
            .await
            .map_err(|err| Error::from(write_failure(err)))?;

        info!(class_code = %record.class_code, %uid, "student signed in");
        self.engine
            .record_activity(ActivityLogEntry::logged_in(
                record.class_code.clone(),
                email.clone(),
                uid.clone(),
                self.engine.clock().utc(),
            ))
            .await;

        Ok(LoginOutcome::Authenticated {
            uid,
            class_code: record.class_code,
        })
    }

    async fn first_login(&self, credentials: &LoginCredentials) -> Result<LoginOutcome, Error> {
        let engine = &self.engine;
        let email = credentials.email();
        let record = self
            .retry
            .run("find_pending", || async move { engine.find_pending(email).await })
            .await?
            .ok_or_else(|| Error::not_found("No account found with this email."))?;

        engine.verify_activation(&record, credentials.password())?;
        debug!(class_code = %record.class_code, "onboarding credential accepted");
        Ok(LoginOutcome::ActivationRequired {
            class_code: record.class_code,
        })
    }
}

#[async_trait]
impl<S, I, L> StudentLogin for LoginService<S, I, L>
where
    S: StudentStore,
    I: IdentityProvider,
    L: ActivityLog,
{
    async fn sign_in(&self, credentials: &LoginCredentials) -> Result<LoginOutcome, Error> {
        let email = credentials.email();
        match self
            .engine
            .identity()
            .sign_in(email, credentials.password())
            .await
        {
            Ok(uid) => self.authenticated(email, uid).await,
            Err(IdentityProviderError::NotFound) => self.first_login(credentials).await,
            Err(err) => Err(provider_error(err)),
        }
    }
}
