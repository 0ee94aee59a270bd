//! Tests for the activation engine.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use mockall::Sequence;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{
    ActivityLogError, MockActivityLog, MockIdentityProvider, MockStudentStore,
};
use crate::domain::{
    ActivityAction, ClassCode, CredentialHash, FullName, NewStudent, StudentNumber,
    legacy_sha256_hex,
};

const TEMP: &str = "Ab3dEf9h";

type Engine = ActivationService<MockStudentStore, MockIdentityProvider, MockActivityLog>;

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

fn test_hasher() -> CredentialHasher {
    CredentialHasher::with_params(8, 1).expect("cheap test parameters")
}

fn engine(store: MockStudentStore, identity: MockIdentityProvider, log: MockActivityLog) -> Engine {
    ActivationService::new(
        Arc::new(store),
        Arc::new(identity),
        Arc::new(log),
        Arc::new(FixtureClock {
            utc_now: fixture_timestamp(),
        }),
    )
    .with_hasher(test_hasher())
}

fn quiet_log() -> MockActivityLog {
    let mut log = MockActivityLog::new();
    log.expect_append().returning(|_| Ok(()));
    log
}

fn pending_with_hash(email: &str, class_code: &str, hash: CredentialHash) -> StudentRecord {
    StudentRecord::pending(
        NewStudent {
            class_code: ClassCode::parse(class_code).expect("class code"),
            student_number: StudentNumber::parse("2024-0001").expect("student number"),
            name: FullName::parse("Alice Example").expect("name"),
            email: Email::parse(email).expect("email"),
        },
        hash,
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp"),
    )
}

#[fixture]
fn alice() -> StudentRecord {
    let hash = test_hasher().hash(TEMP).expect("hash");
    pending_with_hash("alice@example.com", "CS101", hash)
}

fn uid(raw: &str) -> Uid {
    Uid::parse(raw).expect("uid")
}

fn verified(record: &StudentRecord) -> VerifiedActivation {
    VerifiedActivation {
        record: record.clone(),
    }
}

// locate_activation_candidate

#[tokio::test]
async fn locate_rejects_malformed_email() {
    let service = engine(
        MockStudentStore::new(),
        MockIdentityProvider::new(),
        MockActivityLog::new(),
    );

    let err = service
        .locate_activation_candidate("alice example.com")
        .await
        .expect_err("invalid email");

    assert_eq!(err.category(), ErrorCategory::Validation);
}

#[rstest]
#[tokio::test]
async fn locate_scans_classes_until_a_match(alice: StudentRecord) {
    let mut store = MockStudentStore::new();
    store.expect_class_codes().times(1).returning(|| {
        Ok(vec![
            ClassCode::parse("BIO2").expect("class"),
            ClassCode::parse("CS101").expect("class"),
        ])
    });
    let found = alice.clone();
    store
        .expect_get()
        .withf(|class_code, key| {
            class_code.as_str() == "BIO2" && key.as_str() == "alice@example.com"
        })
        .times(1)
        .returning(|_, _| Ok(None));
    store
        .expect_get()
        .withf(|class_code, _| class_code.as_str() == "CS101")
        .times(1)
        .returning(move |_, _| Ok(Some(found.clone())));

    let service = engine(store, MockIdentityProvider::new(), MockActivityLog::new());
    let record = service
        .locate_activation_candidate("  Alice@Example.com ")
        .await
        .expect("lookup succeeds");

    assert_eq!(record, Some(alice));
}

#[tokio::test]
async fn locate_reports_absent_candidates() {
    let mut store = MockStudentStore::new();
    store
        .expect_class_codes()
        .returning(|| Ok(vec![ClassCode::parse("CS101").expect("class")]));
    store.expect_get().returning(|_, _| Ok(None));

    let service = engine(store, MockIdentityProvider::new(), MockActivityLog::new());
    let record = service
        .locate_activation_candidate("nobody@example.com")
        .await
        .expect("lookup succeeds");

    assert!(record.is_none());
}

#[tokio::test]
async fn locate_surfaces_store_outages_as_transient() {
    let mut store = MockStudentStore::new();
    store
        .expect_class_codes()
        .returning(|| Err(StudentStoreError::connection("refused")));

    let service = engine(store, MockIdentityProvider::new(), MockActivityLog::new());
    let err = service
        .locate_activation_candidate("alice@example.com")
        .await
        .expect_err("store offline");

    assert_eq!(err.category(), ErrorCategory::TransientStore);
}

// verify_activation

#[rstest]
fn verify_accepts_only_the_issued_credential(alice: StudentRecord) {
    let service = engine(
        MockStudentStore::new(),
        MockIdentityProvider::new(),
        MockActivityLog::new(),
    );

    assert_eq!(
        service.verify_activation(&alice, "wrong-one"),
        Err(ActivationError::CredentialMismatch)
    );
    let proof = service.verify_activation(&alice, TEMP).expect("match");
    assert_eq!(proof.record(), &alice);
    assert_eq!(service.matches_credential(&alice, TEMP), Ok(true));
    assert_eq!(service.matches_credential(&alice, "ab3def9h"), Ok(false));
}

#[rstest]
fn verify_accepts_legacy_digests() {
    let record = pending_with_hash(
        "bob@example.com",
        "CS101",
        CredentialHash::new(legacy_sha256_hex("Zx81Qw07")),
    );
    let service = engine(
        MockStudentStore::new(),
        MockIdentityProvider::new(),
        MockActivityLog::new(),
    );

    assert_eq!(service.matches_credential(&record, "Zx81Qw07"), Ok(true));
    assert_eq!(service.matches_credential(&record, "zx81qw07"), Ok(false));
}

#[rstest]
fn verify_rejects_active_records(alice: StudentRecord) {
    let service = engine(
        MockStudentStore::new(),
        MockIdentityProvider::new(),
        MockActivityLog::new(),
    );
    let active = alice.into_active(uid("u123"), fixture_timestamp());

    assert_eq!(
        service.verify_activation(&active, TEMP),
        Err(ActivationError::AccountNotPending)
    );
}

#[rstest]
#[case(None)]
#[case(Some(CredentialHash::new("")))]
#[case(Some(CredentialHash::new("not-a-hash")))]
#[case(Some(CredentialHash::new("$argon2id$broken")))]
fn verify_treats_missing_hashes_as_setup_errors(
    alice: StudentRecord,
    #[case] hash: Option<CredentialHash>,
) {
    let service = engine(
        MockStudentStore::new(),
        MockIdentityProvider::new(),
        MockActivityLog::new(),
    );
    let record = StudentRecord {
        temp_credential_hash: hash,
        ..alice
    };

    assert_eq!(
        service.verify_activation(&record, TEMP),
        Err(ActivationError::NoCredentialIssued)
    );
}

// promote_to_active (transactional)

#[rstest]
#[tokio::test]
async fn promotion_moves_the_record_in_one_transaction(alice: StudentRecord) {
    let mut store = MockStudentStore::new();
    store
        .expect_promote()
        .withf(|write| {
            write.pending_key.as_str() == "alice@example.com"
                && write.expected.is_pending()
                && write.active.document_key.as_str() == "u123"
                && write.active.status == StudentStatus::Active
                && write.active.is_active
                && !write.active.first_login
                && write.active.temp_credential_hash.is_none()
                && write.active.activated_at == Some(fixture_timestamp())
        })
        .times(1)
        .returning(|_| Ok(()));
    let mut log = MockActivityLog::new();
    log.expect_append()
        .withf(|entry| {
            entry.action == ActivityAction::AccountActivated
                && entry.performed_by_uid.as_ref().map(Uid::as_str) == Some("u123")
        })
        .times(1)
        .returning(|_| Ok(()));

    let service = engine(store, MockIdentityProvider::new(), log);
    let outcome = service
        .promote_to_active(&verified(&alice), uid("u123"))
        .await
        .expect("promotion succeeds");

    assert!(outcome.is_fresh());
    assert_eq!(outcome.record().uid, Some(uid("u123")));
    assert_eq!(outcome.record().email, alice.email);
}

#[rstest]
#[tokio::test]
async fn repeated_promotion_to_the_same_uid_is_idempotent(alice: StudentRecord) {
    let already = alice.clone().into_active(uid("u123"), fixture_timestamp());
    let mut store = MockStudentStore::new();
    store
        .expect_promote()
        .times(1)
        .returning(|write| Err(StudentStoreError::stale(write.pending_key.as_str())));
    store
        .expect_get()
        .withf(|_, key| key.as_str() == "u123")
        .times(1)
        .returning(move |_, _| Ok(Some(already.clone())));
    let mut log = MockActivityLog::new();
    log.expect_append().times(0);

    let service = engine(store, MockIdentityProvider::new(), log);
    let outcome = service
        .promote_to_active(&verified(&alice), uid("u123"))
        .await
        .expect("idempotent success");

    assert!(matches!(outcome, PromotionOutcome::AlreadyActive(_)));
}

#[rstest]
#[tokio::test]
async fn losing_a_promotion_race_is_a_stale_record(alice: StudentRecord) {
    let mut store = MockStudentStore::new();
    store
        .expect_promote()
        .returning(|write| Err(StudentStoreError::stale(write.pending_key.as_str())));
    store.expect_get().returning(|_, _| Ok(None));

    let service = engine(store, MockIdentityProvider::new(), MockActivityLog::new());
    let err = service
        .promote_to_active(&verified(&alice), uid("u999"))
        .await
        .expect_err("stale");

    assert_eq!(err, ActivationError::StaleRecord);
    assert_eq!(err.category(), ErrorCategory::Conflict);
}

#[rstest]
#[tokio::test]
async fn an_occupied_target_owned_by_someone_else_is_stale(alice: StudentRecord) {
    let stranger = pending_with_hash("mallory@example.com", "CS101", CredentialHash::new("x"))
        .into_active(uid("u123"), fixture_timestamp());
    let mut store = MockStudentStore::new();
    store
        .expect_promote()
        .returning(|write| Err(StudentStoreError::target_occupied(write.active.document_key.as_str())));
    store
        .expect_get()
        .returning(move |_, _| Ok(Some(stranger.clone())));

    let service = engine(store, MockIdentityProvider::new(), MockActivityLog::new());
    let err = service
        .promote_to_active(&verified(&alice), uid("u123"))
        .await
        .expect_err("stale");

    assert_eq!(err, ActivationError::StaleRecord);
}

#[rstest]
#[tokio::test]
async fn store_failures_during_promotion_are_write_failures(alice: StudentRecord) {
    let mut store = MockStudentStore::new();
    store
        .expect_promote()
        .returning(|_| Err(StudentStoreError::query("deadline exceeded")));

    let service = engine(store, MockIdentityProvider::new(), MockActivityLog::new());
    let err = service
        .promote_to_active(&verified(&alice), uid("u123"))
        .await
        .expect_err("write failed");

    assert!(matches!(err, ActivationError::WriteFailed { .. }));
    assert_eq!(err.category(), ErrorCategory::TransientStore);
}

#[rstest]
#[tokio::test]
async fn activity_log_failures_do_not_fail_promotion(alice: StudentRecord) {
    let mut store = MockStudentStore::new();
    store.expect_promote().returning(|_| Ok(()));
    let mut log = MockActivityLog::new();
    log.expect_append()
        .times(1)
        .returning(|_| Err(ActivityLogError::write("quota exceeded")));

    let service = engine(store, MockIdentityProvider::new(), log);
    let outcome = service
        .promote_to_active(&verified(&alice), uid("u123"))
        .await
        .expect("promotion still succeeds");

    assert!(outcome.is_fresh());
}

// promote_to_active (sequential)

#[rstest]
#[tokio::test]
async fn sequential_promotion_writes_before_deleting(alice: StudentRecord) {
    let mut seq = Sequence::new();
    let mut store = MockStudentStore::new();
    let current = alice.clone();
    store
        .expect_get()
        .withf(|_, key| key.as_str() == "alice@example.com")
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |_, _| Ok(Some(current.clone())));
    store
        .expect_get()
        .withf(|_, key| key.as_str() == "u123")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(None));
    store
        .expect_set()
        .withf(|record| record.document_key.as_str() == "u123")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    store
        .expect_delete()
        .withf(|_, key| key.as_str() == "alice@example.com")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));

    let service = engine(store, MockIdentityProvider::new(), quiet_log())
        .with_strategy(ActivationStrategy::Sequential);
    let outcome = service
        .promote_to_active(&verified(&alice), uid("u123"))
        .await
        .expect("promotion succeeds");

    assert!(outcome.is_fresh());
}

#[rstest]
#[tokio::test]
async fn sequential_delete_failure_is_a_partial_activation(alice: StudentRecord) {
    let mut store = MockStudentStore::new();
    let current = alice.clone();
    store
        .expect_get()
        .withf(|_, key| key.as_str() == "alice@example.com")
        .returning(move |_, _| Ok(Some(current.clone())));
    store
        .expect_get()
        .withf(|_, key| key.as_str() == "u123")
        .returning(|_, _| Ok(None));
    store.expect_set().times(1).returning(|_| Ok(()));
    store
        .expect_delete()
        .times(1)
        .returning(|_, _| Err(StudentStoreError::connection("reset")));
    let mut log = MockActivityLog::new();
    log.expect_append().times(0);

    let service = engine(store, MockIdentityProvider::new(), log)
        .with_strategy(ActivationStrategy::Sequential);
    let err = service
        .promote_to_active(&verified(&alice), uid("u123"))
        .await
        .expect_err("partial activation");

    assert_eq!(err.category(), ErrorCategory::PartialActivation);
    assert_eq!(
        err,
        ActivationError::PartialActivation {
            class_code: alice.class_code.clone(),
            email: alice.email.clone(),
            uid: uid("u123"),
        }
    );
}

#[rstest]
#[tokio::test]
async fn sequential_promotion_detects_changed_records(alice: StudentRecord) {
    let changed = StudentRecord {
        temp_credential_hash: Some(CredentialHash::new(legacy_sha256_hex("reissued"))),
        ..alice.clone()
    };
    let mut store = MockStudentStore::new();
    store
        .expect_get()
        .returning(move |_, _| Ok(Some(changed.clone())));
    store.expect_set().times(0);

    let service = engine(store, MockIdentityProvider::new(), MockActivityLog::new())
        .with_strategy(ActivationStrategy::Sequential);
    let err = service
        .promote_to_active(&verified(&alice), uid("u123"))
        .await
        .expect_err("stale");

    assert_eq!(err, ActivationError::StaleRecord);
}

// complete_first_login

fn store_holding(record: &StudentRecord) -> MockStudentStore {
    let mut store = MockStudentStore::new();
    let class_code = record.class_code.clone();
    store
        .expect_class_codes()
        .returning(move || Ok(vec![class_code.clone()]));
    let found = record.clone();
    store
        .expect_get()
        .withf(|_, key| key.as_str() == "alice@example.com")
        .returning(move |_, _| Ok(Some(found.clone())));
    store
}

fn request(temp: &str, new: &str, confirm: &str) -> ActivationRequest {
    ActivationRequest::new("alice@example.com", temp, new, confirm)
}

#[rstest]
#[case("", "secret1", "secret1", "Please fill in all fields.")]
#[case(TEMP, "secret1", "secret2", "Passwords do not match.")]
#[case(TEMP, "abc", "abc", "Password must be at least 6 characters long.")]
#[tokio::test]
async fn first_login_validates_inputs_before_any_io(
    #[case] temp: &str,
    #[case] new: &str,
    #[case] confirm: &str,
    #[case] message: &str,
) {
    let service = engine(
        MockStudentStore::new(),
        MockIdentityProvider::new(),
        MockActivityLog::new(),
    );

    let err = service
        .complete_first_login(&request(temp, new, confirm))
        .await
        .expect_err("invalid input");

    assert_eq!(err, ActivationError::invalid_input(message));
}

#[rstest]
#[tokio::test]
async fn first_login_creates_identity_and_promotes(alice: StudentRecord) {
    let mut store = store_holding(&alice);
    store
        .expect_promote()
        .withf(|write| write.active.document_key.as_str() == "u123")
        .times(1)
        .returning(|_| Ok(()));
    let mut identity = MockIdentityProvider::new();
    identity
        .expect_create_identity()
        .withf(|email, credential| {
            email.as_str() == "alice@example.com" && credential.expose() == "n3w-secret"
        })
        .times(1)
        .returning(|_, _| Ok(Uid::parse("u123").expect("uid")));

    let service = engine(store, identity, quiet_log());
    let account = service
        .complete_first_login(&request(TEMP, "n3w-secret", "n3w-secret"))
        .await
        .expect("activation succeeds");

    assert_eq!(account.uid, uid("u123"));
    assert_eq!(account.class_code.as_str(), "CS101");
    assert!(!account.already_active);
}

#[rstest]
#[tokio::test]
async fn first_login_with_wrong_temp_never_creates_an_identity(alice: StudentRecord) {
    let mut identity = MockIdentityProvider::new();
    identity.expect_create_identity().times(0);

    let service = engine(store_holding(&alice), identity, MockActivityLog::new());
    let err = service
        .complete_first_login(&request("zzzzzzzz", "n3w-secret", "n3w-secret"))
        .await
        .expect_err("mismatch");

    assert_eq!(err, ActivationError::CredentialMismatch);
}

#[rstest]
#[tokio::test]
async fn first_login_resumes_with_an_identity_from_an_earlier_attempt(alice: StudentRecord) {
    let mut store = store_holding(&alice);
    store.expect_promote().times(1).returning(|_| Ok(()));
    let mut identity = MockIdentityProvider::new();
    identity
        .expect_create_identity()
        .returning(|_, _| Err(IdentityProviderError::email_already_in_use()));
    identity
        .expect_sign_in()
        .withf(|_, password| password == "n3w-secret")
        .times(1)
        .returning(|_, _| Ok(Uid::parse("u123").expect("uid")));

    let service = engine(store, identity, quiet_log());
    let account = service
        .complete_first_login(&request(TEMP, "n3w-secret", "n3w-secret"))
        .await
        .expect("resumed activation");

    assert_eq!(account.uid, uid("u123"));
}

#[rstest]
#[tokio::test]
async fn first_login_conflicts_when_someone_else_owns_the_identity(alice: StudentRecord) {
    let mut identity = MockIdentityProvider::new();
    identity
        .expect_create_identity()
        .returning(|_, _| Err(IdentityProviderError::email_already_in_use()));
    identity
        .expect_sign_in()
        .returning(|_, _| Err(IdentityProviderError::wrong_credential()));

    let service = engine(store_holding(&alice), identity, MockActivityLog::new());
    let err = service
        .complete_first_login(&request(TEMP, "n3w-secret", "n3w-secret"))
        .await
        .expect_err("conflict");

    assert_eq!(err, ActivationError::StaleRecord);
}

#[rstest]
#[tokio::test]
async fn first_login_reports_weak_credentials(alice: StudentRecord) {
    let mut identity = MockIdentityProvider::new();
    identity
        .expect_create_identity()
        .returning(|_, _| Err(IdentityProviderError::weak_credential()));

    let service = engine(store_holding(&alice), identity, MockActivityLog::new());
    let err = service
        .complete_first_login(&request(TEMP, "123456", "123456"))
        .await
        .expect_err("weak");

    assert_eq!(err, ActivationError::WeakCredential);
    assert_eq!(err.category(), ErrorCategory::Credential);
}

#[tokio::test]
async fn first_login_without_a_pending_record_is_not_found() {
    let mut store = MockStudentStore::new();
    store.expect_class_codes().returning(|| Ok(Vec::new()));

    let mut identity = MockIdentityProvider::new();
    identity
        .expect_sign_in()
        .returning(|_, _| Err(IdentityProviderError::not_found()));

    let service = engine(store, identity, MockActivityLog::new());
    let err = service
        .complete_first_login(&request(TEMP, "n3w-secret", "n3w-secret"))
        .await
        .expect_err("not found");

    assert_eq!(err, ActivationError::CandidateNotFound);
}

fn store_after_activation(active: StudentRecord) -> MockStudentStore {
    let mut store = MockStudentStore::new();
    let class_code = active.class_code.clone();
    store
        .expect_class_codes()
        .returning(move || Ok(vec![class_code.clone()]));
    store
        .expect_get()
        .withf(|_, key| key.as_str() == "alice@example.com")
        .returning(|_, _| Ok(None));
    store
        .expect_get()
        .withf(|_, key| key.as_str() == "u123")
        .returning(move |_, _| Ok(Some(active.clone())));
    store.expect_promote().times(0);
    store
}

#[rstest]
#[tokio::test]
async fn repeating_a_completed_first_login_reports_the_active_account(alice: StudentRecord) {
    let active = alice.into_active(uid("u123"), fixture_timestamp());
    let mut identity = MockIdentityProvider::new();
    identity.expect_create_identity().times(0);
    identity
        .expect_sign_in()
        .withf(|email, password| email.as_str() == "alice@example.com" && password == "n3w-secret")
        .times(1)
        .returning(|_, _| Ok(Uid::parse("u123").expect("uid")));

    let service = engine(store_after_activation(active), identity, MockActivityLog::new());
    let account = service
        .complete_first_login(&request(TEMP, "n3w-secret", "n3w-secret"))
        .await
        .expect("idempotent success");

    assert_eq!(account.uid, uid("u123"));
    assert_eq!(account.class_code.as_str(), "CS101");
    assert!(account.already_active);
}

#[rstest]
#[tokio::test]
async fn repeating_first_login_with_another_credential_is_not_found(alice: StudentRecord) {
    let active = alice.into_active(uid("u123"), fixture_timestamp());
    let mut identity = MockIdentityProvider::new();
    identity
        .expect_sign_in()
        .returning(|_, _| Err(IdentityProviderError::wrong_credential()));

    let service = engine(store_after_activation(active), identity, MockActivityLog::new());
    let err = service
        .complete_first_login(&request(TEMP, "other-secret", "other-secret"))
        .await
        .expect_err("credential does not match the active identity");

    assert_eq!(err, ActivationError::CandidateNotFound);
}

// reconcile_partial_activations

#[rstest]
#[tokio::test]
async fn reconciliation_removes_only_shadowed_pending_records(alice: StudentRecord) {
    let leftover_active = alice.clone().into_active(uid("u123"), fixture_timestamp());
    let bob = pending_with_hash("bob@example.com", "CS101", CredentialHash::new("x"));
    let class_students = vec![alice.clone(), leftover_active, bob];

    let mut store = MockStudentStore::new();
    store
        .expect_class_codes()
        .returning(|| Ok(vec![ClassCode::parse("CS101").expect("class")]));
    store
        .expect_students()
        .returning(move |_| Ok(class_students.clone()));
    store
        .expect_delete()
        .withf(|_, key| key.as_str() == "alice@example.com")
        .times(1)
        .returning(|_, _| Ok(()));

    let service = engine(store, MockIdentityProvider::new(), MockActivityLog::new());
    let report = service
        .reconcile_partial_activations()
        .await
        .expect("reconciliation succeeds");

    assert_eq!(report.repaired.len(), 1);
    assert_eq!(report.repaired[0].email, alice.email);
    assert_eq!(report.repaired[0].uid, uid("u123"));
}

#[rstest]
fn onboarding_credentials_hash_and_verify_through_the_engine(alice: StudentRecord) {
    let service = engine(
        MockStudentStore::new(),
        MockIdentityProvider::new(),
        MockActivityLog::new(),
    );
    let credential = service.generate_onboarding_credential();
    let hash = service
        .hash_onboarding_credential(&credential)
        .expect("hash");
    let record = StudentRecord {
        temp_credential_hash: Some(hash),
        ..alice
    };

    assert_eq!(service.matches_credential(&record, credential.expose()), Ok(true));
}
