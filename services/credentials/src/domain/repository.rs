#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};

use rollcall_domain::id::{CredentialId, UserId};
use rollcall_domain::purpose::Purpose;

use crate::domain::types::{
    ConsumeOutcome, Credential, InsertOutcome, Notification, RecordOutcome, RedemptionRecord,
    Subject,
};
use crate::error::{CredentialServiceError, DispatchError, GenerationError};

/// Source of the current time. Expiry is only ever compared against this.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Produces unpredictable secrets whose shape and strength depend on the purpose.
pub trait SecretGenerator: Send + Sync {
    fn generate(
        &self,
        purpose: Purpose,
        subject_id: UserId,
        issued_at: DateTime<Utc>,
    ) -> Result<String, GenerationError>;
}

/// Port for looking up identities in the external directory.
pub trait IdentityDirectory: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Subject>, CredentialServiceError>;
    async fn find_by_email(&self, email: &str)
    -> Result<Option<Subject>, CredentialServiceError>;
}

/// Out-of-band delivery of a credential's human-facing payload.
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError>;
}

/// Durable storage for credentials and redemption records.
///
/// Every method that decides an outcome does so with a single conditional write;
/// callers never get a check-then-act window.
pub trait CredentialStore: Send + Sync {
    /// Insert unless the secret is taken.
    ///
    /// Attendance secrets are unique across every stored row. A login code is only
    /// taken while another login credential holding it is live at `created_at`, so
    /// dead codes return to the pool.
    async fn insert(&self, credential: &Credential)
    -> Result<InsertOutcome, CredentialServiceError>;

    /// Remove a credential that was never delivered. No-op when absent or already consumed.
    async fn discard(&self, id: CredentialId) -> Result<(), CredentialServiceError>;

    async fn find_by_id(
        &self,
        id: CredentialId,
    ) -> Result<Option<Credential>, CredentialServiceError>;

    async fn find_by_secret(
        &self,
        purpose: Purpose,
        secret: &str,
    ) -> Result<Option<Credential>, CredentialServiceError>;

    /// The newest login credential of `subject_id` carrying `code`. Older rows with the
    /// same code are necessarily dead.
    async fn find_login_code(
        &self,
        subject_id: UserId,
        code: &str,
    ) -> Result<Option<Credential>, CredentialServiceError>;

    /// Count live credentials a subject holds for a purpose. Codes locked by failed
    /// attempts are not live.
    async fn count_active(
        &self,
        subject_id: UserId,
        purpose: Purpose,
        now: DateTime<Utc>,
    ) -> Result<u64, CredentialServiceError>;

    /// Insert an attendance record unless one exists for `(redeemer_id, effective_date)`.
    async fn record_attendance(
        &self,
        record: &RedemptionRecord,
    ) -> Result<RecordOutcome, CredentialServiceError>;

    /// Flip the record's login credential to consumed and insert the record, atomically.
    /// Fails over to `AlreadyConsumed`/`Exhausted` without writing anything.
    async fn consume(
        &self,
        record: &RedemptionRecord,
    ) -> Result<ConsumeOutcome, CredentialServiceError>;

    /// Bump `failed_attempts` on every live login credential of `subject_id`.
    /// Returns the number of credentials touched.
    async fn record_failed_attempt(
        &self,
        subject_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<u64, CredentialServiceError>;

    /// Redemptions made by `redeemer_id`, newest first.
    async fn list_by_redeemer(
        &self,
        redeemer_id: UserId,
    ) -> Result<Vec<RedemptionRecord>, CredentialServiceError>;

    /// Redemptions of one credential, newest first.
    async fn list_by_credential(
        &self,
        credential_id: CredentialId,
    ) -> Result<Vec<RedemptionRecord>, CredentialServiceError>;
}
