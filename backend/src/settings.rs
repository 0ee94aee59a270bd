//! Server settings loaded via OrthoConfig.
//!
//! Values layer CLI flags over `ONBOARDING_*` environment variables over an
//! optional configuration file. Every field is optional; accessors apply the
//! defaults.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Deserializer};

use crate::domain::{
    ActivationStrategy, ClassCode, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY, RetryPolicy,
    StudentValidationError,
};
use crate::outbound::memory::DEFAULT_LOCKOUT_THRESHOLD;

const DEFAULT_PORT: u16 = 8080;

/// A list setting given either as a sequence or as one comma-separated
/// string.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<OneOrMany>::deserialize(deserializer)?.map(|value| match value {
            OneOrMany::One(joined) => joined.split(',').map(str::to_owned).collect(),
            OneOrMany::Many(items) => items,
        }),
    )
}

/// Configuration for the onboarding server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "ONBOARDING")]
pub struct OnboardingSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<SocketAddr>,
    /// Promote with separate write and delete calls instead of one
    /// transaction.
    #[ortho_config(default = false)]
    pub sequential_activation: bool,
    /// Attempts made for transient store reads, including the first.
    pub retry_attempts: Option<u32>,
    /// Delay before the second attempt, in milliseconds.
    pub retry_base_delay_ms: Option<u64>,
    /// Class codes created at startup.
    #[serde(default, deserialize_with = "one_or_many")]
    pub seed_classes: Option<Vec<String>>,
    /// Consecutive sign-in failures before the identity provider locks out.
    pub lockout_threshold: Option<u32>,
}

impl OnboardingSettings {
    /// Configured listen address, defaulting to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)))
    }

    /// Sequential promotion when `sequential_activation` is set, otherwise
    /// transactional.
    pub fn activation_strategy(&self) -> ActivationStrategy {
        if self.sequential_activation {
            ActivationStrategy::Sequential
        } else {
            ActivationStrategy::Transactional
        }
    }

    /// Retry budget for store reads, falling back to
    /// [`DEFAULT_RETRY_ATTEMPTS`] and [`DEFAULT_RETRY_BASE_DELAY`].
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            self.retry_base_delay_ms
                .map_or(DEFAULT_RETRY_BASE_DELAY, Duration::from_millis),
        )
    }

    /// Consecutive sign-in failures before an identity is locked.
    pub fn lockout_threshold(&self) -> u32 {
        self.lockout_threshold.unwrap_or(DEFAULT_LOCKOUT_THRESHOLD)
    }

    /// Parse the seeded class codes, skipping blank entries.
    ///
    /// # Errors
    /// Returns the first [`StudentValidationError`] for an invalid code.
    pub fn seed_classes(&self) -> Result<Vec<ClassCode>, StudentValidationError> {
        self.seed_classes
            .iter()
            .flatten()
            .map(|code| code.trim())
            .filter(|code| !code.is_empty())
            .map(ClassCode::parse)
            .collect()
    }
}
