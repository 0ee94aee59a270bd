//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{AccountActivation, StudentLogin, StudentRegistration};

/// Dependency bundle for HTTP handlers.
///
/// # Examples
/// ```no_run
/// use std::sync::Arc;
///
/// use classroom_onboarding::domain::{
///     ActivationService, ClassCode, LoginService, RegistrationService, RetryPolicy,
/// };
/// use classroom_onboarding::inbound::http::state::HttpState;
/// use classroom_onboarding::outbound::memory::{
///     InMemoryActivityLog, InMemoryIdentityProvider, InMemoryStudentStore,
/// };
/// use classroom_onboarding::outbound::notifier::UnconfiguredCredentialNotifier;
/// use mockable::DefaultClock;
///
/// let engine = ActivationService::new(
///     Arc::new(InMemoryStudentStore::with_classes([ClassCode::parse("CS101").expect("class")])),
///     Arc::new(InMemoryIdentityProvider::default()),
///     Arc::new(InMemoryActivityLog::default()),
///     Arc::new(DefaultClock),
/// );
/// let state = HttpState::new(
///     Arc::new(RegistrationService::new(
///         engine.clone(),
///         Arc::new(UnconfiguredCredentialNotifier),
///         RetryPolicy::default(),
///     )),
///     Arc::new(LoginService::new(engine.clone(), RetryPolicy::default())),
///     Arc::new(engine),
/// );
/// let _registration = state.registration.clone();
/// ```
#[derive(Clone)]
pub struct HttpState {
    pub registration: Arc<dyn StudentRegistration>,
    pub login: Arc<dyn StudentLogin>,
    pub activation: Arc<dyn AccountActivation>,
}

impl HttpState {
    /// Bundle the driving ports.
    pub fn new(
        registration: Arc<dyn StudentRegistration>,
        login: Arc<dyn StudentLogin>,
        activation: Arc<dyn AccountActivation>,
    ) -> Self {
        Self {
            registration,
            login,
            activation,
        }
    }
}
