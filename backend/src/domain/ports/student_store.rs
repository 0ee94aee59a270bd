//! Port abstraction for the class-scoped student document store.
//!
//! Every class owns a collection of student documents. Pending records are
//! keyed by email and active records by UID; see [`StudentRecord`]. Adapters
//! must provide a two-document transaction for [`StudentStore::promote`] and
//! an atomic insert-if-absent for [`StudentStore::insert_pending`].

use std::fmt;

use async_trait::async_trait;

use crate::domain::{ClassCode, DocumentKey, StudentRecord};

use super::define_port_error;

/// Indexed student fields that can be queried for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StudentField {
    Email,
    StudentNumber,
    Uid,
}

impl fmt::Display for StudentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::StudentNumber => write!(f, "student number"),
            Self::Uid => write!(f, "uid"),
        }
    }
}

impl StudentField {
    /// Project the queried value out of a record.
    pub fn value_of<'a>(&self, record: &'a StudentRecord) -> Option<&'a str> {
        match self {
            Self::Email => Some(record.email.as_str()),
            Self::StudentNumber => Some(record.student_number.as_str()),
            Self::Uid => record.uid.as_ref().map(|uid| uid.as_str()),
        }
    }
}

define_port_error! {
    /// Persistence errors raised by student store adapters.
    pub enum StudentStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "student store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "student store query failed: {message}",
        /// Insert rejected because a unique field is already taken in the class.
        Duplicate { field: StudentField } => "a student with this {field} already exists",
        /// The class collection does not exist.
        ClassNotFound { class_code: String } => "class {class_code} does not exist",
        /// The pending record vanished or changed inside a transaction.
        Stale { key: String } => "student record {key} changed or no longer exists",
        /// A transaction tried to create a record over an existing one.
        TargetOccupied { key: String } => "student record {key} already exists",
    }
}

impl StudentStoreError {
    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Query { .. })
    }
}

/// Two-document move applied by [`StudentStore::promote`].
///
/// The adapter re-reads `pending_key`, requires it to still equal `expected`,
/// requires the key of `active` to be free, then writes `active` and deletes
/// the pending document in one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct PromotionWrite {
    pub class_code: ClassCode,
    pub pending_key: DocumentKey,
    pub expected: StudentRecord,
    pub active: StudentRecord,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StudentStore: Send + Sync {
    /// List every class collection. Iteration order is adapter defined.
    async fn class_codes(&self) -> Result<Vec<ClassCode>, StudentStoreError>;

    /// Whether a class collection exists.
    async fn class_exists(&self, class_code: &ClassCode) -> Result<bool, StudentStoreError>;

    /// Fetch a student document by key.
    async fn get(
        &self,
        class_code: &ClassCode,
        key: &DocumentKey,
    ) -> Result<Option<StudentRecord>, StudentStoreError>;

    /// Query a class collection by field equality.
    async fn find_by_field(
        &self,
        class_code: &ClassCode,
        field: StudentField,
        value: &str,
    ) -> Result<Vec<StudentRecord>, StudentStoreError>;

    /// Every student in a class.
    async fn students(
        &self,
        class_code: &ClassCode,
    ) -> Result<Vec<StudentRecord>, StudentStoreError>;

    /// Insert a pending record unless its email or student number is taken.
    async fn insert_pending(&self, record: &StudentRecord) -> Result<(), StudentStoreError>;

    /// Write a document at its key, replacing any existing one.
    async fn set(&self, record: &StudentRecord) -> Result<(), StudentStoreError>;

    /// Delete a document; deleting a missing key is not an error.
    async fn delete(
        &self,
        class_code: &ClassCode,
        key: &DocumentKey,
    ) -> Result<(), StudentStoreError>;

    /// Update the legacy `isActive` mirror on an existing document.
    async fn set_active_flag(
        &self,
        class_code: &ClassCode,
        key: &DocumentKey,
        is_active: bool,
    ) -> Result<(), StudentStoreError>;

    /// Apply a promotion as a single transaction.
    async fn promote(&self, write: &PromotionWrite) -> Result<(), StudentStoreError>;
}
