//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use classroom_onboarding::domain::{ActivationStrategy, ClassCode, RetryPolicy};
use classroom_onboarding::settings::OnboardingSettings;

/// Resolved configuration for creating the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) strategy: ActivationStrategy,
    pub(crate) retry: RetryPolicy,
    pub(crate) seed_classes: Vec<ClassCode>,
    pub(crate) lockout_threshold: u32,
}

impl ServerConfig {
    /// Resolve defaults and validate the seeded class codes.
    ///
    /// # Errors
    /// Returns [`std::io::Error`] when a seeded class code is invalid.
    pub fn from_settings(settings: &OnboardingSettings) -> std::io::Result<Self> {
        let seed_classes = settings.seed_classes().map_err(|err| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid ONBOARDING_SEED_CLASSES: {err}"),
            )
        })?;
        Ok(Self {
            bind_addr: settings.bind_addr(),
            strategy: settings.activation_strategy(),
            retry: settings.retry_policy(),
            seed_classes,
            lockout_threshold: settings.lockout_threshold(),
        })
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
