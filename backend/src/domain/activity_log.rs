//! Append-only audit entries for onboarding actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ClassCode, Email, Uid};

/// Action recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    /// A student was registered with an onboarding credential.
    Register,
    /// A pending record was promoted to an active one.
    AccountActivated,
    /// An active student signed in.
    Login,
}

/// One audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub action: ActivityAction,
    pub class_code: ClassCode,
    pub actor_email: Email,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performed_by_uid: Option<Uid>,
}

impl ActivityLogEntry {
    /// Entry written after a student is registered.
    pub fn registered(class_code: ClassCode, email: Email, timestamp: DateTime<Utc>) -> Self {
        Self {
            description: format!("Student {email} registered"),
            action: ActivityAction::Register,
            class_code,
            actor_email: email,
            timestamp,
            performed_by_uid: None,
        }
    }

    /// Entry written after a fresh promotion.
    pub fn activated(
        class_code: ClassCode,
        email: Email,
        uid: Uid,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            description: format!("Student {email} completed first login"),
            action: ActivityAction::AccountActivated,
            class_code,
            actor_email: email,
            timestamp,
            performed_by_uid: Some(uid),
        }
    }

    /// Entry written after a regular sign-in.
    pub fn logged_in(class_code: ClassCode, email: Email, uid: Uid, timestamp: DateTime<Utc>) -> Self {
        Self {
            description: format!("Student {email} logged in"),
            action: ActivityAction::Login,
            class_code,
            actor_email: email,
            timestamp,
            performed_by_uid: Some(uid),
        }
    }
}
