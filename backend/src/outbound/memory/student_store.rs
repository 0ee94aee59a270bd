//! Class-scoped student store held in process memory.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{PromotionWrite, StudentField, StudentStore, StudentStoreError};
use crate::domain::{ClassCode, DocumentKey, StudentRecord};

type Classes = BTreeMap<ClassCode, BTreeMap<DocumentKey, StudentRecord>>;

/// [`StudentStore`] backed by ordered maps.
///
/// Classes iterate in lexical order of their codes.
///
/// # Examples
/// ```
/// use classroom_onboarding::domain::ClassCode;
/// use classroom_onboarding::outbound::memory::InMemoryStudentStore;
///
/// let store = InMemoryStudentStore::with_classes([ClassCode::parse("CS101").expect("class")]);
/// assert_eq!(store.len(), 0);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStudentStore {
    classes: Mutex<Classes>,
}

impl InMemoryStudentStore {
    /// Create a store with the given (empty) classes.
    pub fn with_classes(codes: impl IntoIterator<Item = ClassCode>) -> Self {
        let classes = codes
            .into_iter()
            .map(|code| (code, BTreeMap::new()))
            .collect();
        Self {
            classes: Mutex::new(classes),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Classes>, StudentStoreError> {
        self.classes
            .lock()
            .map_err(|_| StudentStoreError::connection("student store lock poisoned"))
    }

    /// Add an empty class; existing classes are left untouched.
    ///
    /// # Errors
    /// Returns [`StudentStoreError::Connection`] if the lock is poisoned.
    pub fn add_class(&self, code: ClassCode) -> Result<(), StudentStoreError> {
        self.lock()?.entry(code).or_default();
        Ok(())
    }

    /// Write `record` directly, bypassing uniqueness checks. Used to load
    /// fixtures and records written by earlier clients.
    ///
    /// # Errors
    /// Returns [`StudentStoreError::Connection`] if the lock is poisoned.
    pub fn seed(&self, record: StudentRecord) -> Result<(), StudentStoreError> {
        self.lock()?
            .entry(record.class_code.clone())
            .or_default()
            .insert(record.document_key.clone(), record);
        Ok(())
    }

    /// Total number of student documents across all classes.
    pub fn len(&self) -> usize {
        self.lock()
            .map(|classes| classes.values().map(BTreeMap::len).sum())
            .unwrap_or_default()
    }

    /// Whether no class holds any document.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn class_not_found(code: &ClassCode) -> StudentStoreError {
    StudentStoreError::class_not_found(code.as_str())
}

fn uniqueness_violation(classes: &Classes, record: &StudentRecord) -> Option<StudentField> {
    let same_class = classes.get(&record.class_code);
    if same_class.is_some_and(|docs| {
        docs.contains_key(&record.document_key)
            || docs.values().any(|doc| doc.email == record.email)
    }) {
        return Some(StudentField::Email);
    }
    classes
        .values()
        .flat_map(BTreeMap::values)
        .any(|doc| doc.student_number == record.student_number)
        .then_some(StudentField::StudentNumber)
}

#[async_trait]
impl StudentStore for InMemoryStudentStore {
    async fn class_codes(&self) -> Result<Vec<ClassCode>, StudentStoreError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    async fn class_exists(&self, class_code: &ClassCode) -> Result<bool, StudentStoreError> {
        Ok(self.lock()?.contains_key(class_code))
    }

    async fn get(
        &self,
        class_code: &ClassCode,
        key: &DocumentKey,
    ) -> Result<Option<StudentRecord>, StudentStoreError> {
        Ok(self
            .lock()?
            .get(class_code)
            .and_then(|docs| docs.get(key))
            .cloned())
    }

    async fn find_by_field(
        &self,
        class_code: &ClassCode,
        field: StudentField,
        value: &str,
    ) -> Result<Vec<StudentRecord>, StudentStoreError> {
        Ok(self
            .lock()?
            .get(class_code)
            .map(|docs| {
                docs.values()
                    .filter(|doc| field.value_of(doc) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn students(
        &self,
        class_code: &ClassCode,
    ) -> Result<Vec<StudentRecord>, StudentStoreError> {
        Ok(self
            .lock()?
            .get(class_code)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_pending(&self, record: &StudentRecord) -> Result<(), StudentStoreError> {
        let mut classes = self.lock()?;
        if !classes.contains_key(&record.class_code) {
            return Err(class_not_found(&record.class_code));
        }
        if let Some(field) = uniqueness_violation(&classes, record) {
            return Err(StudentStoreError::duplicate(field));
        }
        classes
            .entry(record.class_code.clone())
            .or_default()
            .insert(record.document_key.clone(), record.clone());
        Ok(())
    }

    async fn set(&self, record: &StudentRecord) -> Result<(), StudentStoreError> {
        let mut classes = self.lock()?;
        let docs = classes
            .get_mut(&record.class_code)
            .ok_or_else(|| class_not_found(&record.class_code))?;
        docs.insert(record.document_key.clone(), record.clone());
        Ok(())
    }

    async fn delete(
        &self,
        class_code: &ClassCode,
        key: &DocumentKey,
    ) -> Result<(), StudentStoreError> {
        if let Some(docs) = self.lock()?.get_mut(class_code) {
            docs.remove(key);
        }
        Ok(())
    }

    async fn set_active_flag(
        &self,
        class_code: &ClassCode,
        key: &DocumentKey,
        is_active: bool,
    ) -> Result<(), StudentStoreError> {
        let mut classes = self.lock()?;
        let record = classes
            .get_mut(class_code)
            .ok_or_else(|| class_not_found(class_code))?
            .get_mut(key)
            .ok_or_else(|| StudentStoreError::stale(key.as_str()))?;
        record.is_active = is_active;
        Ok(())
    }

    async fn promote(&self, write: &PromotionWrite) -> Result<(), StudentStoreError> {
        let mut classes = self.lock()?;
        let docs = classes
            .get_mut(&write.class_code)
            .ok_or_else(|| class_not_found(&write.class_code))?;
        if docs.get(&write.pending_key) != Some(&write.expected) {
            return Err(StudentStoreError::stale(write.pending_key.as_str()));
        }
        let target = &write.active.document_key;
        if docs.contains_key(target) {
            return Err(StudentStoreError::target_occupied(target.as_str()));
        }
        docs.insert(target.clone(), write.active.clone());
        docs.remove(&write.pending_key);
        debug!(class_code = %write.class_code, "promotion committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::{
        CredentialHash, Email, FullName, NewStudent, StudentNumber, StudentStatus, Uid,
    };

    fn code(raw: &str) -> ClassCode {
        ClassCode::parse(raw).expect("class code")
    }

    fn pending_in(class_code: &str, email: &str, number: &str) -> StudentRecord {
        StudentRecord::pending(
            NewStudent {
                class_code: code(class_code),
                student_number: StudentNumber::parse(number).expect("number"),
                name: FullName::parse("Alice Example").expect("name"),
                email: Email::parse(email).expect("email"),
            },
            CredentialHash::new("digest"),
            Utc::now(),
        )
    }

    #[fixture]
    fn store() -> InMemoryStudentStore {
        InMemoryStudentStore::with_classes([code("CS101"), code("BIO2")])
    }

    fn promotion(record: &StudentRecord, uid: &str) -> PromotionWrite {
        PromotionWrite {
            class_code: record.class_code.clone(),
            pending_key: record.document_key.clone(),
            expected: record.clone(),
            active: record
                .clone()
                .into_active(Uid::parse(uid).expect("uid"), Utc::now()),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn class_codes_iterate_in_lexical_order(store: InMemoryStudentStore) {
        let codes = store.class_codes().await.expect("codes");
        assert_eq!(codes, vec![code("BIO2"), code("CS101")]);
    }

    #[rstest]
    #[tokio::test]
    async fn insert_pending_requires_an_existing_class(store: InMemoryStudentStore) {
        let err = store
            .insert_pending(&pending_in("MATH9", "alice@example.com", "2024-0001"))
            .await
            .expect_err("class missing");
        assert!(matches!(err, StudentStoreError::ClassNotFound { .. }));
    }

    #[rstest]
    #[case("alice@example.com", "2024-0002", StudentField::Email)]
    #[case("bob@example.com", "2024-0001", StudentField::StudentNumber)]
    #[tokio::test]
    async fn insert_pending_rechecks_uniqueness(
        store: InMemoryStudentStore,
        #[case] email: &str,
        #[case] number: &str,
        #[case] field: StudentField,
    ) {
        store
            .insert_pending(&pending_in("CS101", "alice@example.com", "2024-0001"))
            .await
            .expect("first insert");

        let err = store
            .insert_pending(&pending_in("CS101", email, number))
            .await
            .expect_err("duplicate");

        assert_eq!(err, StudentStoreError::duplicate(field));
    }

    #[rstest]
    #[tokio::test]
    async fn student_numbers_are_unique_across_classes(store: InMemoryStudentStore) {
        store
            .insert_pending(&pending_in("CS101", "alice@example.com", "2024-0001"))
            .await
            .expect("first insert");

        let err = store
            .insert_pending(&pending_in("BIO2", "alice@school.example", "2024-0001"))
            .await
            .expect_err("duplicate number");

        assert_eq!(err, StudentStoreError::duplicate(StudentField::StudentNumber));
    }

    #[rstest]
    #[tokio::test]
    async fn find_by_field_matches_uids(store: InMemoryStudentStore) {
        let record = pending_in("CS101", "alice@example.com", "2024-0001");
        store.seed(record.clone()).expect("seed");
        store.promote(&promotion(&record, "u123")).await.expect("promote");

        let found = store
            .find_by_field(&code("CS101"), StudentField::Uid, "u123")
            .await
            .expect("query");

        assert_eq!(found.len(), 1);
        assert_eq!(found.first().map(|r| r.status), Some(StudentStatus::Active));
    }

    #[rstest]
    #[tokio::test]
    async fn promote_moves_the_record_atomically(store: InMemoryStudentStore) {
        let record = pending_in("CS101", "alice@example.com", "2024-0001");
        store.seed(record.clone()).expect("seed");

        store.promote(&promotion(&record, "u123")).await.expect("promote");

        let cs101 = code("CS101");
        assert!(store.get(&cs101, &record.document_key).await.expect("get").is_none());
        let active = store
            .get(&cs101, &DocumentKey::from(&Uid::parse("u123").expect("uid")))
            .await
            .expect("get")
            .expect("active record");
        assert!(active.is_active);
        assert!(active.temp_credential_hash.is_none());
        assert_eq!(store.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn promote_rejects_changed_records(store: InMemoryStudentStore) {
        let record = pending_in("CS101", "alice@example.com", "2024-0001");
        let mut changed = record.clone();
        changed.temp_credential_hash = Some(CredentialHash::new("reissued"));
        store.seed(changed).expect("seed");

        let err = store
            .promote(&promotion(&record, "u123"))
            .await
            .expect_err("stale");

        assert!(matches!(err, StudentStoreError::Stale { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn concurrent_promotions_commit_exactly_once(store: InMemoryStudentStore) {
        let store = Arc::new(store);
        let record = pending_in("CS101", "alice@example.com", "2024-0001");
        store.seed(record.clone()).expect("seed");

        let first = promotion(&record, "u123");
        let second = promotion(&record, "u456");
        let (a, b) = tokio::join!(store.promote(&first), store.promote(&second));

        assert!(a.is_ok() ^ b.is_ok(), "exactly one promotion commits");
        assert_eq!(store.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn set_active_flag_updates_existing_records(store: InMemoryStudentStore) {
        let record = pending_in("CS101", "alice@example.com", "2024-0001");
        store.seed(record.clone()).expect("seed");

        store
            .set_active_flag(&record.class_code, &record.document_key, true)
            .await
            .expect("flag set");
        let nobody = DocumentKey::from(&Uid::parse("nobody").expect("uid"));
        let missing = store
            .set_active_flag(&record.class_code, &nobody, true)
            .await;

        let stored = store
            .get(&record.class_code, &record.document_key)
            .await
            .expect("get")
            .expect("record");
        assert!(stored.is_active);
        assert!(matches!(missing, Err(StudentStoreError::Stale { .. })));
    }

    #[rstest]
    #[tokio::test]
    async fn deleting_missing_documents_succeeds(store: InMemoryStudentStore) {
        let key = DocumentKey::from(&Email::parse("ghost@example.com").expect("email"));
        store.delete(&code("CS101"), &key).await.expect("idempotent delete");
    }
}
