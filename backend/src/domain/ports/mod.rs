//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`StudentStore`, `IdentityProvider`, `ActivityLog`,
//! `CredentialNotifier`) are implemented by outbound adapters. Driving ports
//! (`StudentRegistration`, `StudentLogin`, `AccountActivation`) are
//! implemented by domain services and called by inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod account_activation;
mod activity_log;
mod credential_notifier;
mod identity_provider;
mod student_login;
mod student_registration;
mod student_store;

#[cfg(test)]
pub use account_activation::MockAccountActivation;
pub use account_activation::{
    AccountActivation, ActivatedAccount, ActivationRequest, ReconciliationReport,
    RepairedActivation,
};
#[cfg(test)]
pub use activity_log::MockActivityLog;
pub use activity_log::{ActivityLog, ActivityLogError, FixtureActivityLog};
#[cfg(test)]
pub use credential_notifier::MockCredentialNotifier;
pub use credential_notifier::{CredentialNotifier, CredentialNotifierError};
#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{IdentityProvider, IdentityProviderError};
#[cfg(test)]
pub use student_login::MockStudentLogin;
pub use student_login::{LoginOutcome, StudentLogin};
#[cfg(test)]
pub use student_registration::MockStudentRegistration;
pub use student_registration::{
    CredentialDelivery, RegistrationReceipt, StudentRegistration, StudentRegistrationRequest,
};
#[cfg(test)]
pub use student_store::MockStudentStore;
pub use student_store::{PromotionWrite, StudentField, StudentStore, StudentStoreError};
