//! Registration workflow: validates the form, enforces uniqueness, issues the
//! onboarding credential, and writes the pending record.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::activation::{read_failure, write_failure};
use crate::domain::ports::{
    ActivityLog, CredentialDelivery, CredentialNotifier, IdentityProvider, IdentityProviderError,
    RegistrationReceipt, StudentField, StudentRegistration, StudentRegistrationRequest,
    StudentStore, StudentStoreError,
};
use crate::domain::{
    ActivationError, ActivationService, ActivityLogEntry, ClassCode, Email, Error, FullName,
    NewStudent, OnboardingCredential, RetryPolicy, StudentNumber, StudentRecord,
    StudentValidationError,
};

/// Registration service implementing [`StudentRegistration`].
pub struct RegistrationService<S, I, L, N> {
    engine: ActivationService<S, I, L>,
    notifier: Arc<N>,
    retry: RetryPolicy,
}

impl<S, I, L, N> RegistrationService<S, I, L, N> {
    /// Build the workflow on top of the activation engine's ports.
    pub fn new(engine: ActivationService<S, I, L>, notifier: Arc<N>, retry: RetryPolicy) -> Self {
        Self {
            engine,
            notifier,
            retry,
        }
    }
}

fn validation_error(err: &StudentValidationError) -> Error {
    Error::invalid_request(err.to_string()).with_details(json!({ "code": err.code() }))
}

fn parse_form(request: &StudentRegistrationRequest) -> Result<NewStudent, Error> {
    let fields = [
        &request.student_number,
        &request.name,
        &request.email,
        &request.class_code,
    ];
    if fields.iter().any(|field| field.trim().is_empty()) {
        return Err(Error::invalid_request("Please fill in all fields.")
            .with_details(json!({ "code": "missing_field" })));
    }
    Ok(NewStudent {
        email: Email::parse(&request.email).map_err(|err| validation_error(&err))?,
        class_code: ClassCode::parse(&request.class_code).map_err(|err| validation_error(&err))?,
        student_number: StudentNumber::parse(&request.student_number)
            .map_err(|err| validation_error(&err))?,
        name: FullName::parse(&request.name).map_err(|err| validation_error(&err))?,
    })
}

fn duplicate(field: StudentField, scope: &str) -> Error {
    let message = match (field, scope) {
        (StudentField::Email, _) => {
            "A student with this email is already registered in this class."
        }
        (_, "class") => {
            "A student with this student number is already registered in this class."
        }
        _ => "This student number is already registered in another class.",
    };
    Error::conflict(message).with_details(json!({
        "code": "duplicate_student",
        "field": field.to_string(),
        "scope": scope,
    }))
}

impl<S, I, L, N> RegistrationService<S, I, L, N>
where
    S: StudentStore,
    I: IdentityProvider,
    L: ActivityLog,
    N: CredentialNotifier,
{
    async fn taken_in(
        &self,
        class_code: &ClassCode,
        field: StudentField,
        value: &str,
    ) -> Result<bool, ActivationError> {
        let store = self.engine.store();
        self.retry
            .run("find_by_field", || async move {
                store
                    .find_by_field(class_code, field, value)
                    .await
                    .map(|matches| !matches.is_empty())
                    .map_err(read_failure)
            })
            .await
    }

    async fn ensure_unique(&self, student: &NewStudent) -> Result<(), Error> {
        let class_code = &student.class_code;
        if self
            .taken_in(class_code, StudentField::Email, student.email.as_str())
            .await?
        {
            return Err(duplicate(StudentField::Email, "class"));
        }
        if self
            .taken_in(class_code, StudentField::StudentNumber, student.student_number.as_str())
            .await?
        {
            return Err(duplicate(StudentField::StudentNumber, "class"));
        }

        let store = self.engine.store();
        let classes = self
            .retry
            .run("class_codes", || async move {
                store.class_codes().await.map_err(read_failure)
            })
            .await?;
        for other in classes.iter().filter(|code| *code != class_code) {
            if self
                .taken_in(other, StudentField::StudentNumber, student.student_number.as_str())
                .await?
            {
                return Err(duplicate(StudentField::StudentNumber, "other_class"));
            }
        }

        match self.engine.identity().email_registered(&student.email).await {
            Ok(false) => Ok(()),
            Ok(true) => Err(Error::conflict("This email is already registered.")
                .with_details(json!({ "code": "email_already_in_use" }))),
            Err(IdentityProviderError::Unavailable { message }) => {
                Err(ActivationError::transient(message).into())
            }
            Err(err) => Err(Error::internal(format!(
                "identity provider returned an unexpected error: {err}"
            ))),
        }
    }

    async fn insert(&self, record: &StudentRecord) -> Result<(), Error> {
        match self.engine.store().insert_pending(record).await {
            Ok(()) => Ok(()),
            Err(StudentStoreError::Duplicate { field }) => Err(duplicate(field, "class")),
            Err(StudentStoreError::ClassNotFound { .. }) => Err(class_not_found()),
            Err(err) => Err(write_failure(err).into()),
        }
    }

    async fn deliver(
        &self,
        student: &NewStudent,
        credential: OnboardingCredential,
    ) -> CredentialDelivery {
        match self
            .notifier
            .deliver(&student.email, &student.name, &credential)
            .await
        {
            Ok(()) => CredentialDelivery::Emailed,
            Err(err) => {
                warn!(
                    class_code = %student.class_code,
                    error = %err,
                    "credential delivery failed; returning credential to operator"
                );
                CredentialDelivery::DisplayToOperator(credential)
            }
        }
    }
}

fn class_not_found() -> Error {
    Error::not_found("Class code not found.").with_details(json!({ "code": "class_not_found" }))
}

#[async_trait]
impl<S, I, L, N> StudentRegistration for RegistrationService<S, I, L, N>
where
    S: StudentStore,
    I: IdentityProvider,
    L: ActivityLog,
    N: CredentialNotifier,
{
    async fn register(
        &self,
        request: StudentRegistrationRequest,
    ) -> Result<RegistrationReceipt, Error> {
        let student = parse_form(&request)?;

        let store = self.engine.store();
        let class_code = &student.class_code;
        let class_exists = self
            .retry
            .run("class_exists", || async move {
                store.class_exists(class_code).await.map_err(read_failure)
            })
            .await?;
        if !class_exists {
            return Err(class_not_found());
        }

        self.ensure_unique(&student).await?;

        let credential = self.engine.generate_onboarding_credential();
        let hash = self
            .engine
            .hash_onboarding_credential(&credential)
            .map_err(|err| Error::internal(format!("failed to hash onboarding credential: {err}")))?;
        let record = StudentRecord::pending(student.clone(), hash, self.engine.clock().utc());
        self.insert(&record).await?;
        info!(class_code = %record.class_code, "student registered");

        let delivery = self.deliver(&student, credential).await;
        self.engine
            .record_activity(ActivityLogEntry::registered(
                student.class_code.clone(),
                student.email.clone(),
                self.engine.clock().utc(),
            ))
            .await;

        Ok(RegistrationReceipt {
            class_code: student.class_code,
            email: student.email,
            delivery,
        })
    }
}
