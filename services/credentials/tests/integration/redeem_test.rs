use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};

use rollcall_credentials::domain::types::Credential;
use rollcall_credentials::error::CredentialServiceError;
use rollcall_credentials::usecase::issue::{IssueAttendanceInput, IssueLoginInput};
use rollcall_credentials::usecase::redeem::{RedeemAttendanceInput, RedeemLoginInput};
use rollcall_domain::id::{CredentialId, UserId};
use rollcall_domain::purpose::{MAX_LOGIN_ATTEMPTS, Outcome, Purpose};

use crate::helpers::{
    Harness, ScriptedSecrets, login_user, minutes, other_teacher, student, t0, teacher,
};

async fn issue_attendance(h: &Harness, issuer_id: UserId) -> Credential {
    h.issuer()
        .issue_attendance(IssueAttendanceInput {
            issuer_id,
            ttl_minutes: Some(10),
        })
        .await
        .unwrap()
}

async fn issue_login(h: &Harness, email: &str) -> String {
    h.issuer()
        .issue_login(IssueLoginInput {
            email: email.to_owned(),
        })
        .await
        .unwrap();
    h.last_login_code()
}

fn scan(redeemer_id: UserId, secret: &str) -> RedeemAttendanceInput {
    RedeemAttendanceInput {
        redeemer_id,
        secret: secret.to_owned(),
    }
}

fn submit(email: &str, code: &str) -> RedeemLoginInput {
    RedeemLoginInput {
        email: email.to_owned(),
        code: code.to_owned(),
    }
}

fn wrong_code(code: &str) -> &'static str {
    if code == "000000" { "999999" } else { "000000" }
}

// ── Attendance ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_follow_classroom_attendance_scenario() {
    let h = Harness::new();
    let s1 = student(1).id;
    let s2 = student(2).id;
    let credential = issue_attendance(&h, teacher().id).await;
    let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

    h.clock.advance(minutes(5));
    let record = h
        .validator()
        .redeem_attendance(scan(s1, &credential.secret))
        .await
        .unwrap();
    assert_eq!(record.redeemer_id, s1);
    assert_eq!(record.credential_id, credential.id);
    assert_eq!(record.subject_id, teacher().id);
    assert_eq!(record.effective_date, Some(today));
    assert_eq!(record.redeemed_at, t0() + minutes(5));
    assert_eq!(record.outcome, Outcome::Present);

    h.clock.advance(minutes(1));
    let result = h
        .validator()
        .redeem_attendance(scan(s1, &credential.secret))
        .await;
    assert!(
        matches!(result, Err(CredentialServiceError::AlreadyRedeemedToday)),
        "expected AlreadyRedeemedToday, got {result:?}"
    );

    h.clock.advance(minutes(1));
    h.validator()
        .redeem_attendance(scan(s2, &credential.secret))
        .await
        .unwrap();

    h.clock.advance(minutes(4));
    let result = h
        .validator()
        .redeem_attendance(scan(s2, &credential.secret))
        .await;
    assert!(
        matches!(result, Err(CredentialServiceError::Expired)),
        "expected Expired, got {result:?}"
    );

    assert_eq!(h.store.records().len(), 2);
}

#[tokio::test]
async fn should_accept_attendance_at_expiry_instant() {
    let h = Harness::new();
    let credential = issue_attendance(&h, teacher().id).await;

    h.clock.set(credential.expires_at);
    h.validator()
        .redeem_attendance(scan(student(1).id, &credential.secret))
        .await
        .unwrap();
}

#[tokio::test]
async fn should_allow_one_attendance_per_day_across_credentials() {
    let h = Harness::new();
    let s1 = student(1).id;
    let first = issue_attendance(&h, teacher().id).await;
    let second = issue_attendance(&h, other_teacher().id).await;

    h.validator()
        .redeem_attendance(scan(s1, &first.secret))
        .await
        .unwrap();
    let result = h.validator().redeem_attendance(scan(s1, &second.secret)).await;

    assert!(
        matches!(result, Err(CredentialServiceError::AlreadyRedeemedToday)),
        "expected AlreadyRedeemedToday, got {result:?}"
    );
    assert_eq!(h.store.records().len(), 1);
}

#[tokio::test]
async fn should_allow_attendance_again_on_next_day() {
    let h = Harness::new();
    let s1 = student(1).id;
    let monday = issue_attendance(&h, teacher().id).await;
    h.validator()
        .redeem_attendance(scan(s1, &monday.secret))
        .await
        .unwrap();

    h.clock.advance(chrono::Duration::days(1));
    let tuesday = issue_attendance(&h, teacher().id).await;
    let record = h
        .validator()
        .redeem_attendance(scan(s1, &tuesday.secret))
        .await
        .unwrap();

    assert_eq!(record.effective_date, NaiveDate::from_ymd_opt(2026, 3, 3));
}

#[tokio::test]
async fn should_derive_attendance_date_from_configured_offset() {
    let h = Harness::new();
    // 23:30 UTC is already the next morning in UTC+9.
    h.clock.set(Utc.with_ymd_and_hms(2026, 3, 2, 23, 30, 0).unwrap());
    let credential = issue_attendance(&h, teacher().id).await;

    let record = h
        .validator_at_offset(FixedOffset::east_opt(9 * 3600).unwrap())
        .redeem_attendance(scan(student(1).id, &credential.secret))
        .await
        .unwrap();

    assert_eq!(record.effective_date, NaiveDate::from_ymd_opt(2026, 3, 3));
}

#[tokio::test]
async fn should_reject_unknown_attendance_secret() {
    let h = Harness::new();

    for secret in ["ATTENDANCE_nope", "not-a-code", ""] {
        let result = h
            .validator()
            .redeem_attendance(scan(student(1).id, secret))
            .await;
        assert!(
            matches!(result, Err(CredentialServiceError::InvalidCredential)),
            "{secret:?}: expected InvalidCredential, got {result:?}"
        );
    }
}

#[tokio::test]
async fn should_not_accept_login_code_as_attendance() {
    let h = Harness::new();
    let code = issue_login(&h, &student(1).email).await;

    let result = h
        .validator()
        .redeem_attendance(scan(student(1).id, &code))
        .await;

    assert!(
        matches!(result, Err(CredentialServiceError::InvalidCredential)),
        "expected InvalidCredential, got {result:?}"
    );
    assert!(h.store.records().is_empty());
}

#[tokio::test]
async fn should_forbid_attendance_redemption_by_teacher() {
    let h = Harness::new();
    let credential = issue_attendance(&h, teacher().id).await;

    let result = h
        .validator()
        .redeem_attendance(scan(other_teacher().id, &credential.secret))
        .await;

    assert!(
        matches!(result, Err(CredentialServiceError::Forbidden)),
        "expected Forbidden, got {result:?}"
    );
}

#[tokio::test]
async fn should_forbid_attendance_redemption_by_unknown_identity() {
    let h = Harness::new();
    let credential = issue_attendance(&h, teacher().id).await;

    let result = h
        .validator()
        .redeem_attendance(scan(UserId::new(), &credential.secret))
        .await;

    assert!(
        matches!(result, Err(CredentialServiceError::Forbidden)),
        "expected Forbidden, got {result:?}"
    );
}

// ── Login ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_redeem_login_code_exactly_once() {
    let h = Harness::new();
    let code = issue_login(&h, &login_user().email).await;

    h.clock.advance(minutes(2));
    let record = h
        .validator()
        .redeem_login(submit("user@example.com", &code))
        .await
        .unwrap();
    assert_eq!(record.redeemer_id, login_user().id);
    assert_eq!(record.purpose, Purpose::Login);
    assert_eq!(record.effective_date, None);
    assert_eq!(record.outcome, Outcome::SignedIn);

    let stored = &h.store.credentials()[0];
    assert!(stored.consumed);
    assert_eq!(stored.consumed_at, Some(t0() + minutes(2)));

    let result = h
        .validator()
        .redeem_login(submit("user@example.com", &code))
        .await;
    assert!(
        matches!(result, Err(CredentialServiceError::AlreadyConsumed)),
        "expected AlreadyConsumed, got {result:?}"
    );
    assert_eq!(h.store.records().len(), 1);
}

#[tokio::test]
async fn should_expire_login_code_after_window() {
    let h = Harness::new();
    let code = issue_login(&h, &login_user().email).await;

    h.clock.advance(minutes(11));
    let result = h
        .validator()
        .redeem_login(submit("user@example.com", &code))
        .await;

    assert!(
        matches!(result, Err(CredentialServiceError::Expired)),
        "expected Expired, got {result:?}"
    );
}

#[tokio::test]
async fn should_not_accept_code_submitted_for_another_account() {
    let h = Harness::new();
    let code = issue_login(&h, &login_user().email).await;

    let result = h
        .validator()
        .redeem_login(submit(&student(1).email, &code))
        .await;

    assert!(
        matches!(result, Err(CredentialServiceError::InvalidCredential)),
        "expected InvalidCredential, got {result:?}"
    );
    assert!(!h.store.credentials()[0].consumed);
}

#[tokio::test]
async fn should_resolve_reused_code_value_per_account() {
    let h = Harness::new().with_secrets(ScriptedSecrets::new(["123456", "123456"]));
    issue_login(&h, &login_user().email).await;

    h.clock.advance(minutes(11));
    let code = issue_login(&h, &student(1).email).await;
    assert_eq!(code, "123456");

    let result = h
        .validator()
        .redeem_login(submit(&login_user().email, "123456"))
        .await;
    assert!(
        matches!(result, Err(CredentialServiceError::Expired)),
        "expected Expired, got {result:?}"
    );

    let record = h
        .validator()
        .redeem_login(submit(&student(1).email, "123456"))
        .await
        .unwrap();
    assert_eq!(record.redeemer_id, student(1).id);
}

#[tokio::test]
async fn should_reject_login_for_unknown_email() {
    let h = Harness::new();
    let code = issue_login(&h, &login_user().email).await;

    let result = h
        .validator()
        .redeem_login(submit("nobody@example.com", &code))
        .await;

    assert!(
        matches!(result, Err(CredentialServiceError::InvalidCredential)),
        "expected InvalidCredential, got {result:?}"
    );
}

#[tokio::test]
async fn should_not_accept_attendance_secret_as_login_code() {
    let h = Harness::new();
    let credential = issue_attendance(&h, teacher().id).await;

    let result = h
        .validator()
        .redeem_login(submit(&teacher().email, &credential.secret))
        .await;

    assert!(
        matches!(result, Err(CredentialServiceError::InvalidCredential)),
        "expected InvalidCredential, got {result:?}"
    );
}

#[tokio::test]
async fn should_lock_login_code_after_too_many_wrong_guesses() {
    let h = Harness::new();
    let code = issue_login(&h, &login_user().email).await;
    let wrong = wrong_code(&code);

    for _ in 0..MAX_LOGIN_ATTEMPTS {
        let result = h
            .validator()
            .redeem_login(submit("user@example.com", wrong))
            .await;
        assert!(
            matches!(result, Err(CredentialServiceError::InvalidCredential)),
            "expected InvalidCredential, got {result:?}"
        );
    }
    assert_eq!(h.store.credentials()[0].failed_attempts, MAX_LOGIN_ATTEMPTS);

    let result = h
        .validator()
        .redeem_login(submit("user@example.com", &code))
        .await;
    assert!(
        matches!(result, Err(CredentialServiceError::InvalidCredential)),
        "a locked code must not sign in, got {result:?}"
    );
    assert!(h.store.records().is_empty());
}

#[tokio::test]
async fn should_accept_correct_code_below_attempt_limit() {
    let h = Harness::new();
    let code = issue_login(&h, &login_user().email).await;
    let wrong = wrong_code(&code);

    for _ in 1..MAX_LOGIN_ATTEMPTS {
        let _ = h
            .validator()
            .redeem_login(submit("user@example.com", wrong))
            .await;
    }
    h.validator()
        .redeem_login(submit("user@example.com", &code))
        .await
        .unwrap();
}

// ── History ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_list_own_redemptions_newest_first() {
    let h = Harness::new();
    let s1 = student(1).id;
    let monday = issue_attendance(&h, teacher().id).await;
    h.validator()
        .redeem_attendance(scan(s1, &monday.secret))
        .await
        .unwrap();
    h.clock.advance(chrono::Duration::days(1));
    let tuesday = issue_attendance(&h, teacher().id).await;
    h.validator()
        .redeem_attendance(scan(s1, &tuesday.secret))
        .await
        .unwrap();

    let records = h.history().for_redeemer(s1).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].credential_id, tuesday.id);
    assert_eq!(records[1].credential_id, monday.id);
    assert!(h.history().for_redeemer(student(2).id).await.unwrap().is_empty());
}

#[tokio::test]
async fn should_list_credential_redemptions_for_issuer_only() {
    let h = Harness::new();
    let credential = issue_attendance(&h, teacher().id).await;
    for n in 1..=2 {
        h.validator()
            .redeem_attendance(scan(student(n).id, &credential.secret))
            .await
            .unwrap();
    }

    let records = h
        .history()
        .for_credential(credential.id, teacher().id)
        .await
        .unwrap();
    assert_eq!(records.len(), 2);

    let result = h
        .history()
        .for_credential(credential.id, other_teacher().id)
        .await;
    assert!(
        matches!(result, Err(CredentialServiceError::Forbidden)),
        "expected Forbidden, got {result:?}"
    );
}

#[tokio::test]
async fn should_treat_unknown_credential_history_as_invalid() {
    let h = Harness::new();
    let result = h
        .history()
        .for_credential(CredentialId::new(), teacher().id)
        .await;
    assert!(
        matches!(result, Err(CredentialServiceError::InvalidCredential)),
        "expected InvalidCredential, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_seeded_expired_credential_even_if_unconsumed() {
    let h = Harness::new();
    let stale = Credential::new(
        teacher().id,
        Purpose::Attendance,
        "ATTENDANCE_stale".to_owned(),
        t0() - minutes(30),
        minutes(10),
    );
    h.store.seed(stale);

    let result = h
        .validator()
        .redeem_attendance(scan(student(1).id, "ATTENDANCE_stale"))
        .await;

    assert!(
        matches!(result, Err(CredentialServiceError::Expired)),
        "expected Expired, got {result:?}"
    );
}
