use chrono::{DateTime, Duration, NaiveDate, Utc};

use rollcall_domain::id::{CredentialId, RedemptionId, UserId};
use rollcall_domain::purpose::{MAX_LOGIN_ATTEMPTS, Outcome, Purpose};
use rollcall_domain::user::UserRole;

/// Directory record for an identity (the capability source for issuance and redemption).
#[derive(Debug, Clone)]
pub struct Subject {
    pub id: UserId,
    pub email: String,
    pub role: UserRole,
}

/// One issued, potentially-redeemable secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub id: CredentialId,
    pub subject_id: UserId,
    pub purpose: Purpose,
    pub secret: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub consumed_at: Option<DateTime<Utc>>,
    pub failed_attempts: i32,
}

impl Credential {
    pub fn new(
        subject_id: UserId,
        purpose: Purpose,
        secret: String,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: CredentialId::new(),
            subject_id,
            purpose,
            secret,
            created_at: now,
            expires_at: now + ttl,
            consumed: false,
            consumed_at: None,
            failed_attempts: 0,
        }
    }

    /// Expiry is inclusive of `expires_at`: a credential is still valid at that instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// A login code that ran out of verification attempts.
    pub fn is_exhausted(&self) -> bool {
        self.purpose == Purpose::Login && self.failed_attempts >= MAX_LOGIN_ATTEMPTS
    }

    /// Still redeemable: unconsumed, unexpired and not locked by failed attempts.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.consumed && !self.is_expired(now) && !self.is_exhausted()
    }
}

/// One successful consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionRecord {
    pub id: RedemptionId,
    pub credential_id: CredentialId,
    /// Issuer of the redeemed credential (the teacher for attendance).
    pub subject_id: UserId,
    pub redeemer_id: UserId,
    pub purpose: Purpose,
    /// Calendar date the record counts for; attendance only.
    pub effective_date: Option<NaiveDate>,
    pub redeemed_at: DateTime<Utc>,
    pub outcome: Outcome,
}

impl RedemptionRecord {
    pub fn for_credential(
        credential: &Credential,
        redeemer_id: UserId,
        redeemed_at: DateTime<Utc>,
        effective_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id: RedemptionId::new(),
            credential_id: credential.id,
            subject_id: credential.subject_id,
            redeemer_id,
            purpose: credential.purpose,
            effective_date,
            redeemed_at,
            outcome: credential.purpose.outcome(),
        }
    }
}

/// Human-facing payload handed to the out-of-band dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn login_code(recipient: &str, code: &str, ttl_minutes: u32) -> Self {
        Self {
            recipient: recipient.to_owned(),
            subject: "Your Rollcall sign-in code".to_owned(),
            body: format!(
                "Your sign-in code is {code}.\n\
                 It is valid for {ttl_minutes} minutes and can be used once.\n\
                 If you did not request it, ignore this message."
            ),
        }
    }
}

/// Result of a conditional insert keyed by `(purpose, secret)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    SecretTaken,
}

/// Result of the conditional `consumed = false → true` transition of a login credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed,
    AlreadyConsumed,
    Exhausted,
}

/// Result of inserting an attendance record under the `(redeemer, date)` uniqueness rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    AlreadyRecorded,
}

/// Secret regenerations attempted before issuance gives up with a conflict.
pub const MAX_ISSUANCE_ATTEMPTS: usize = 5;
