//! Builders wiring the in-memory adapters into the driving ports.

use std::sync::Arc;

use actix_web::web;
use mockable::DefaultClock;

use classroom_onboarding::domain::{ActivationService, LoginService, RegistrationService};
use classroom_onboarding::inbound::http::state::HttpState;
use classroom_onboarding::outbound::memory::{
    InMemoryActivityLog, InMemoryIdentityProvider, InMemoryStudentStore,
};
use classroom_onboarding::outbound::notifier::UnconfiguredCredentialNotifier;

use super::ServerConfig;

type Engine = ActivationService<InMemoryStudentStore, InMemoryIdentityProvider, InMemoryActivityLog>;

fn build_engine(config: &ServerConfig) -> Engine {
    ActivationService::new(
        Arc::new(InMemoryStudentStore::with_classes(
            config.seed_classes.iter().cloned(),
        )),
        Arc::new(InMemoryIdentityProvider::with_lockout_threshold(
            config.lockout_threshold,
        )),
        Arc::new(InMemoryActivityLog::default()),
        Arc::new(DefaultClock),
    )
    .with_strategy(config.strategy)
}

/// Build the HTTP state shared by every worker.
///
/// All workers share one engine so the in-memory adapters stay consistent.
pub(crate) fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    let engine = build_engine(config);
    let registration = RegistrationService::new(
        engine.clone(),
        Arc::new(UnconfiguredCredentialNotifier),
        config.retry,
    );
    let login = LoginService::new(engine.clone(), config.retry);
    web::Data::new(HttpState::new(
        Arc::new(registration),
        Arc::new(login),
        Arc::new(engine),
    ))
}
