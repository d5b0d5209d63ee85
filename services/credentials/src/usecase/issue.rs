use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tracing::{error, info, warn};

use rollcall_domain::id::UserId;
use rollcall_domain::purpose::{MAX_ACTIVE_LOGIN_CODES, Purpose};

use crate::domain::repository::{
    Clock, CredentialStore, IdentityDirectory, NotificationDispatcher, SecretGenerator,
};
use crate::domain::types::{
    Credential, InsertOutcome, MAX_ISSUANCE_ATTEMPTS, Notification, Subject,
};
use crate::error::{CredentialServiceError, DispatchError};

pub struct IssueAttendanceInput {
    pub issuer_id: UserId,
    /// Falls back to the purpose default when absent.
    pub ttl_minutes: Option<u32>,
}

pub struct IssueLoginInput {
    pub email: String,
}

/// Creates credentials and persists them all-or-nothing.
pub struct CredentialIssuer<S, D, N>
where
    S: CredentialStore,
    D: IdentityDirectory,
    N: NotificationDispatcher,
{
    pub store: S,
    pub directory: D,
    pub dispatcher: N,
    pub clock: Arc<dyn Clock>,
    pub secrets: Arc<dyn SecretGenerator>,
    pub dispatch_timeout: StdDuration,
}

impl<S, D, N> CredentialIssuer<S, D, N>
where
    S: CredentialStore,
    D: IdentityDirectory,
    N: NotificationDispatcher,
{
    /// Issue a credential of `purpose` owned by `subject_id`.
    pub async fn issue(
        &self,
        subject_id: UserId,
        purpose: Purpose,
        ttl_minutes: u32,
    ) -> Result<Credential, CredentialServiceError> {
        if !purpose.accepts_ttl(ttl_minutes) {
            return Err(CredentialServiceError::InvalidTtl);
        }
        let subject = self
            .directory
            .find_by_id(subject_id)
            .await?
            .ok_or(CredentialServiceError::UnknownSubject)?;
        self.issue_for(&subject, purpose, ttl_minutes).await
    }

    /// Attendance codes are displayed by the issuing teacher, so the secret is returned.
    pub async fn issue_attendance(
        &self,
        input: IssueAttendanceInput,
    ) -> Result<Credential, CredentialServiceError> {
        let ttl = input
            .ttl_minutes
            .unwrap_or_else(|| Purpose::Attendance.default_ttl_minutes());
        self.issue(input.issuer_id, Purpose::Attendance, ttl).await
    }

    /// Login codes go only to the account's mailbox. Unknown addresses are rejected,
    /// never provisioned.
    pub async fn issue_login(
        &self,
        input: IssueLoginInput,
    ) -> Result<Credential, CredentialServiceError> {
        let subject = self
            .directory
            .find_by_email(&input.email)
            .await?
            .ok_or(CredentialServiceError::UnknownSubject)?;
        self.issue_for(&subject, Purpose::Login, Purpose::Login.default_ttl_minutes())
            .await
    }

    async fn issue_for(
        &self,
        subject: &Subject,
        purpose: Purpose,
        ttl_minutes: u32,
    ) -> Result<Credential, CredentialServiceError> {
        if !purpose.may_issue(subject.role) {
            return Err(CredentialServiceError::Forbidden);
        }

        let now = self.clock.now();
        if purpose == Purpose::Login {
            let active = self.store.count_active(subject.id, purpose, now).await?;
            if active >= MAX_ACTIVE_LOGIN_CODES {
                return Err(CredentialServiceError::TooManyActiveCredentials);
            }
        }

        let credential = self.persist(subject.id, purpose, ttl_minutes).await?;

        if purpose == Purpose::Login {
            let notification =
                Notification::login_code(&subject.email, &credential.secret, ttl_minutes);
            if let Err(e) = self.deliver(&notification).await {
                warn!(
                    credential_id = %credential.id,
                    subject_id = %subject.id,
                    error = %e,
                    "login code dispatch failed; discarding credential"
                );
                if let Err(discard_err) = self.store.discard(credential.id).await {
                    // Nobody holds the code, but it stays live until it expires.
                    error!(
                        credential_id = %credential.id,
                        error = ?discard_err,
                        "failed to discard undelivered login code"
                    );
                }
                return Err(CredentialServiceError::DispatchFailure(e));
            }
        }

        info!(
            credential_id = %credential.id,
            subject_id = %subject.id,
            purpose = %purpose,
            expires_at = %credential.expires_at,
            "credential issued"
        );
        Ok(credential)
    }

    /// Insert under the store's secret uniqueness rule, regenerating on collision.
    async fn persist(
        &self,
        subject_id: UserId,
        purpose: Purpose,
        ttl_minutes: u32,
    ) -> Result<Credential, CredentialServiceError> {
        for attempt in 1..=MAX_ISSUANCE_ATTEMPTS {
            let now = self.clock.now();
            let secret = self.secrets.generate(purpose, subject_id, now)?;
            let credential = Credential::new(
                subject_id,
                purpose,
                secret,
                now,
                Duration::minutes(i64::from(ttl_minutes)),
            );
            match self.store.insert(&credential).await? {
                InsertOutcome::Inserted => return Ok(credential),
                InsertOutcome::SecretTaken => {
                    warn!(attempt, purpose = %purpose, "secret collision; regenerating");
                }
            }
        }
        Err(CredentialServiceError::IssuanceConflict)
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), DispatchError> {
        match tokio::time::timeout(self.dispatch_timeout, self.dispatcher.dispatch(notification))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(DispatchError::TimedOut),
        }
    }
}
