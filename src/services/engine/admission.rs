use std::time::Duration;

use time::OffsetDateTime;
use uuid::Uuid;

use super::{parse_id, ExamEngine, Principal};
use crate::core::security;
use crate::core::time::{format_offset, remaining_until};
use crate::db::models::Test;
use crate::schemas::test_definition::{AdmissionResponse, PublicTest};
use crate::services::cache::{
    read_projection, session_token_key, test_key, write_projection, CacheError,
};
use crate::services::errors::ExamError;

/// The (test, student) pair an answer-session token was verified for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionGrant {
    pub(crate) test_id: Uuid,
    pub(crate) student_id: Uuid,
}

const CLOSING_SESSION_LIFETIME: Duration = Duration::from_secs(1);

fn rejected(outcome: &'static str, err: ExamError) -> ExamError {
    metrics::counter!("test_admissions_total", "outcome" => outcome).increment(1);
    err
}

fn outside_window(test: &Test) -> ExamError {
    ExamError::OutsideWindow {
        start: format_offset(test.start_time),
        end: format_offset(test.end_time),
    }
}

impl ExamEngine {
    pub(crate) async fn start_test(
        &self,
        principal: &Principal,
        test_id: &str,
        pass_key: i32,
        now: OffsetDateTime,
    ) -> Result<AdmissionResponse, ExamError> {
        principal.require_student()?;
        let test_id = parse_id(test_id, "test")?;

        let attempted = self
            .answers
            .has_attempt(principal.id, test_id)
            .await
            .map_err(|e| ExamError::upstream(e, "Failed to check previous attempts"))?;
        if attempted {
            return Err(rejected("already_attempted", ExamError::AlreadyAttempted));
        }

        let test = self.load_test(test_id).await?;

        if !test.is_open_at(now) {
            return Err(rejected("outside_window", outside_window(&test)));
        }
        if pass_key != test.pass_key {
            tracing::info!(test_id = %test.id, student_id = %principal.id, "Wrong pass key");
            return Err(rejected("wrong_pass_key", ExamError::WrongPassKey));
        }
        // At the closing instant the token is still valid for that second.
        let lifetime = remaining_until(test.end_time, now).unwrap_or(CLOSING_SESSION_LIFETIME);

        let key = session_token_key(test.id, principal.id);
        let token = match self.cache.get(&key).await {
            Ok(Some(existing)) => existing,
            Ok(None) => self.mint_session(&key, &test, principal.id, lifetime).await?,
            Err(err) => {
                if !matches!(err, CacheError::Unavailable) {
                    tracing::warn!(key, error = %err, "Session token lookup failed");
                }
                self.sign_session(&test, principal.id)?
            }
        };

        metrics::counter!("test_admissions_total", "outcome" => "admitted").increment(1);
        tracing::info!(
            test_id = %test.id,
            student_id = %principal.id,
            token = %security::token_fingerprint(&token),
            "Student admitted to test"
        );

        Ok(AdmissionResponse { token, test: PublicTest::from(&test) })
    }

    /// Verifies an answer-session token and that it is still the live session for its pair.
    ///
    /// With the cache down only the signature and expiry are checked; the one-answer
    /// constraint in the store still guards against replays.
    pub(crate) async fn verify_session(&self, token: &str) -> Result<SessionGrant, ExamError> {
        let claims = security::verify_session_token(token, &self.settings)
            .map_err(|_| ExamError::access_denied("Invalid or expired answer session"))?;

        let key = session_token_key(claims.test, claims.student);
        match self.cache.get(&key).await {
            Ok(Some(stored)) if stored == token => {}
            Ok(_) => return Err(ExamError::access_denied("Answer session is no longer active")),
            Err(CacheError::Unavailable) => {
                tracing::debug!(key, "Session cache unavailable; accepting signed token");
            }
            Err(err) => {
                tracing::warn!(key, error = %err, "Session token check failed; accepting signed token");
            }
        }

        Ok(SessionGrant { test_id: claims.test, student_id: claims.student })
    }

    /// Read-through lookup of the short-lived test projection.
    pub(super) async fn load_test(&self, test_id: Uuid) -> Result<Test, ExamError> {
        let key = test_key(test_id);
        if let Some(test) = read_projection::<Test>(self.cache.as_ref(), &key).await {
            return Ok(test);
        }

        let test = self
            .tests
            .find_test(test_id)
            .await
            .map_err(|e| ExamError::upstream(e, "Failed to load test"))?
            .ok_or_else(|| ExamError::NotFound(format!("No test found for {test_id}")))?;

        write_projection(self.cache.as_ref(), &key, &test, self.session().test_cache_ttl()).await;
        Ok(test)
    }

    fn sign_session(&self, test: &Test, student_id: Uuid) -> Result<String, ExamError> {
        security::issue_session_token(test.id, student_id, test.end_time, &self.settings)
            .map_err(|e| ExamError::upstream(e, "Failed to sign answer session"))
    }

    async fn mint_session(
        &self,
        key: &str,
        test: &Test,
        student_id: Uuid,
        lifetime: Duration,
    ) -> Result<String, ExamError> {
        let token = self.sign_session(test, student_id)?;
        match self.cache.set_if_absent(key, &token, lifetime).await {
            Ok(winner) => Ok(winner),
            Err(CacheError::Unavailable) => Ok(token),
            Err(err) => {
                tracing::warn!(key, error = %err, "Failed to store answer session");
                Ok(token)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::DifficultyLevel;
    use crate::services::cache::SessionCache;
    use crate::test_support::{self, question, Harness, MemoryCache};
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use time::macros::datetime;

    const KEY: i32 = 482913;

    fn seed(harness: &Harness) -> Test {
        let first = harness.store.add_question(question(DifficultyLevel::Easy, 5, &["B"]));
        let test = test_support::test_definition(
            &[first],
            datetime!(2025-01-02 10:00 UTC),
            datetime!(2025-01-02 11:00 UTC),
            KEY,
        );
        harness.store.insert_test_row(test.clone());
        test
    }

    fn unverified_exp(token: &str, harness: &Harness) -> i64 {
        let mut validation = Validation::default();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        decode::<security::SessionClaims>(
            token,
            &DecodingKey::from_secret(harness.settings.security().secret_key.as_bytes()),
            &validation,
        )
        .expect("claims")
        .claims
        .exp
    }

    #[tokio::test]
    async fn admits_inside_window_with_correct_key() {
        let harness = Harness::new();
        let test = seed(&harness);
        let student = test_support::student();

        let admission = harness
            .engine
            .start_test(&student, &test.id.to_string(), KEY, datetime!(2025-01-02 10:30 UTC))
            .await
            .expect("admitted");

        assert_eq!(unverified_exp(&admission.token, &harness), test.end_time.unix_timestamp());
        assert_eq!(admission.test.id, test.id);
        assert!(admission.test.questions.iter().all(|snapshot| snapshot.answer.is_none()));

        let key = session_token_key(test.id, student.id);
        assert_eq!(harness.cache.ttl_of(&key), Some(Duration::from_secs(30 * 60)));
        assert_eq!(harness.cache.get(&key).await.expect("get"), Some(admission.token));
    }

    #[tokio::test]
    async fn rejects_outside_window_and_wrong_key() {
        let harness = Harness::new();
        let test = seed(&harness);
        let student = test_support::student();
        let id = test.id.to_string();

        let early = harness
            .engine
            .start_test(&student, &id, KEY, datetime!(2025-01-02 09:59 UTC))
            .await;
        assert!(matches!(early, Err(ExamError::OutsideWindow { .. })));

        let late = harness
            .engine
            .start_test(&student, &id, KEY, datetime!(2025-01-02 11:00:01 UTC))
            .await;
        assert!(matches!(late, Err(ExamError::OutsideWindow { .. })));

        let wrong = harness
            .engine
            .start_test(&student, &id, 0, datetime!(2025-01-02 10:30 UTC))
            .await;
        assert!(matches!(wrong, Err(ExamError::WrongPassKey)));
    }

    #[tokio::test]
    async fn window_bounds_are_inclusive() {
        let harness = Harness::new();
        let test = seed(&harness);
        let id = test.id.to_string();

        harness
            .engine
            .start_test(&test_support::student(), &id, KEY, test.start_time)
            .await
            .expect("admitted at opening");

        let closing = harness
            .engine
            .start_test(&test_support::student(), &id, KEY, test.end_time)
            .await
            .expect("admitted at closing");
        assert_eq!(unverified_exp(&closing.token, &harness), test.end_time.unix_timestamp());
    }

    #[tokio::test]
    async fn repeated_admission_returns_the_same_token() {
        let harness = Harness::new();
        let test = seed(&harness);
        let student = test_support::student();
        let id = test.id.to_string();

        let first = harness
            .engine
            .start_test(&student, &id, KEY, datetime!(2025-01-02 10:30 UTC))
            .await
            .expect("first");
        let second = harness
            .engine
            .start_test(&student, &id, KEY, datetime!(2025-01-02 10:45 UTC))
            .await
            .expect("second");

        assert_eq!(first.token, second.token);
    }

    #[tokio::test]
    async fn concurrent_admissions_agree_on_one_token() {
        let harness = Harness::new();
        let test = seed(&harness);
        let student = test_support::student();
        let id = test.id.to_string();
        let now = datetime!(2025-01-02 10:30 UTC);

        let (a, b) = tokio::join!(
            harness.engine.start_test(&student, &id, KEY, now),
            harness.engine.start_test(&student, &id, KEY, now + time::Duration::seconds(2)),
        );

        assert_eq!(a.expect("a").token, b.expect("b").token);
    }

    #[tokio::test]
    async fn prior_attempt_is_checked_first() {
        let harness = Harness::new();
        let test = seed(&harness);
        let student = test_support::student();
        harness.store.insert_answer_row(test_support::answer_for(&test, student.id));

        let result = harness
            .engine
            .start_test(&student, &test.id.to_string(), 0, datetime!(2025-01-02 09:00 UTC))
            .await;

        assert!(matches!(result, Err(ExamError::AlreadyAttempted)));
    }

    #[tokio::test]
    async fn unknown_or_malformed_tests_are_not_found() {
        let harness = Harness::new();
        let student = test_support::student();
        let now = datetime!(2025-01-02 10:30 UTC);

        let unknown =
            harness.engine.start_test(&student, &Uuid::new_v4().to_string(), KEY, now).await;
        assert!(matches!(unknown, Err(ExamError::NotFound(_))));

        let malformed = harness.engine.start_test(&student, "12", KEY, now).await;
        assert!(matches!(malformed, Err(ExamError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_projection_serves_reads_within_its_lifetime() {
        let harness = Harness::new();
        let test = seed(&harness);
        let now = datetime!(2025-01-02 10:30 UTC);

        harness
            .engine
            .start_test(&test_support::student(), &test.id.to_string(), KEY, now)
            .await
            .expect("first admission");
        assert_eq!(harness.cache.ttl_of(&test_key(test.id)), Some(Duration::from_secs(60)));

        harness.store.remove_test(test.id);
        harness
            .engine
            .start_test(&test_support::student(), &test.id.to_string(), KEY, now)
            .await
            .expect("served from projection");
    }

    #[tokio::test]
    async fn admission_survives_a_missing_cache() {
        let harness = Harness::with_cache(MemoryCache::unavailable());
        let test = seed(&harness);

        let admission = harness
            .engine
            .start_test(
                &test_support::student(),
                &test.id.to_string(),
                KEY,
                datetime!(2025-01-02 10:30 UTC),
            )
            .await
            .expect("admitted");

        assert!(!admission.token.is_empty());
    }

    #[tokio::test]
    async fn session_gate_requires_the_live_token() {
        let harness = Harness::new();
        let student = test_support::student();
        let (test, token) = harness.open_session(&student).await;

        let grant = harness.engine.verify_session(&token).await.expect("grant");
        assert_eq!(grant, SessionGrant { test_id: test.id, student_id: student.id });

        assert!(harness.engine.verify_session("garbage").await.is_err());

        harness.cache.delete(&session_token_key(test.id, student.id)).await.expect("delete");
        assert!(matches!(
            harness.engine.verify_session(&token).await,
            Err(ExamError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn session_gate_trusts_signature_without_cache() {
        let harness = Harness::with_cache(MemoryCache::unavailable());
        let student = test_support::student();
        let (test, token) = harness.open_session(&student).await;

        let grant = harness.engine.verify_session(&token).await.expect("grant");
        assert_eq!(grant.test_id, test.id);
    }
}
