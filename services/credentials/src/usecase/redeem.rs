use std::sync::Arc;

use chrono::FixedOffset;
use tracing::{debug, info};

use rollcall_domain::id::UserId;
use rollcall_domain::purpose::Purpose;

use crate::domain::repository::{Clock, CredentialStore, IdentityDirectory};
use crate::domain::types::{ConsumeOutcome, RecordOutcome, RedemptionRecord};
use crate::error::CredentialServiceError;

pub struct RedeemAttendanceInput {
    pub redeemer_id: UserId,
    pub secret: String,
}

pub struct RedeemLoginInput {
    pub email: String,
    pub code: String,
}

/// Validate-then-consume for presented secrets.
///
/// The duplicate check and the commit are a single conditional write in the store,
/// so concurrent presentations of one secret resolve to exactly one success.
pub struct RedemptionValidator<S, D>
where
    S: CredentialStore,
    D: IdentityDirectory,
{
    pub store: S,
    pub directory: D,
    pub clock: Arc<dyn Clock>,
    /// Offset used to turn the redemption instant into an attendance calendar date.
    pub attendance_offset: FixedOffset,
}

impl<S, D> RedemptionValidator<S, D>
where
    S: CredentialStore,
    D: IdentityDirectory,
{
    pub async fn redeem(
        &self,
        secret: &str,
        redeemer_id: UserId,
        purpose: Purpose,
    ) -> Result<RedemptionRecord, CredentialServiceError> {
        if !purpose.is_well_formed(secret) {
            return Err(CredentialServiceError::InvalidCredential);
        }

        // Unknown, purpose-mismatched, foreign and exhausted secrets are indistinguishable
        // to the caller. Login codes are only ever looked up among the redeemer's own.
        let found = match purpose {
            Purpose::Attendance => self.store.find_by_secret(purpose, secret).await?,
            Purpose::Login => self.store.find_login_code(redeemer_id, secret).await?,
        };
        let credential = found
            .filter(|c| c.purpose == purpose)
            .ok_or(CredentialServiceError::InvalidCredential)?;
        if credential.is_exhausted() {
            return Err(CredentialServiceError::InvalidCredential);
        }

        let now = self.clock.now();
        if credential.is_expired(now) {
            return Err(CredentialServiceError::Expired);
        }

        let redeemer = self
            .directory
            .find_by_id(redeemer_id)
            .await?
            .ok_or(CredentialServiceError::Forbidden)?;
        if !purpose.may_redeem(redeemer.role) {
            return Err(CredentialServiceError::Forbidden);
        }

        let effective_date = purpose
            .is_daily()
            .then(|| now.with_timezone(&self.attendance_offset).date_naive());
        let record =
            RedemptionRecord::for_credential(&credential, redeemer_id, now, effective_date);

        match purpose {
            Purpose::Attendance => match self.store.record_attendance(&record).await? {
                RecordOutcome::Recorded => {}
                RecordOutcome::AlreadyRecorded => {
                    return Err(CredentialServiceError::AlreadyRedeemedToday);
                }
            },
            Purpose::Login => match self.store.consume(&record).await? {
                ConsumeOutcome::Consumed => {}
                ConsumeOutcome::AlreadyConsumed => {
                    return Err(CredentialServiceError::AlreadyConsumed);
                }
                ConsumeOutcome::Exhausted => {
                    return Err(CredentialServiceError::InvalidCredential);
                }
            },
        }

        info!(
            redemption_id = %record.id,
            credential_id = %record.credential_id,
            redeemer_id = %redeemer_id,
            purpose = %purpose,
            "credential redeemed"
        );
        Ok(record)
    }

    pub async fn redeem_attendance(
        &self,
        input: RedeemAttendanceInput,
    ) -> Result<RedemptionRecord, CredentialServiceError> {
        self.redeem(&input.secret, input.redeemer_id, Purpose::Attendance).await
    }

    /// The redeemer is whoever owns `email`; a wrong code counts against that
    /// account's live login codes.
    pub async fn redeem_login(
        &self,
        input: RedeemLoginInput,
    ) -> Result<RedemptionRecord, CredentialServiceError> {
        let redeemer = self
            .directory
            .find_by_email(&input.email)
            .await?
            .ok_or(CredentialServiceError::InvalidCredential)?;

        let result = self.redeem(&input.code, redeemer.id, Purpose::Login).await;
        if matches!(result, Err(CredentialServiceError::InvalidCredential)) {
            let touched = self
                .store
                .record_failed_attempt(redeemer.id, self.clock.now())
                .await?;
            debug!(subject_id = %redeemer.id, touched, "failed login code attempt recorded");
        }
        result
    }
}
