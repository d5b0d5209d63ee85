use rollcall_domain::id::{CredentialId, UserId};

use crate::domain::repository::CredentialStore;
use crate::domain::types::RedemptionRecord;
use crate::error::CredentialServiceError;

/// Read-side views over redemption records.
pub struct RedemptionHistory<S: CredentialStore> {
    pub store: S,
}

impl<S: CredentialStore> RedemptionHistory<S> {
    /// The caller's own redemptions, newest first.
    pub async fn for_redeemer(
        &self,
        redeemer_id: UserId,
    ) -> Result<Vec<RedemptionRecord>, CredentialServiceError> {
        self.store.list_by_redeemer(redeemer_id).await
    }

    /// Every redemption of a credential. Only its issuer may look.
    pub async fn for_credential(
        &self,
        credential_id: CredentialId,
        caller_id: UserId,
    ) -> Result<Vec<RedemptionRecord>, CredentialServiceError> {
        let credential = self
            .store
            .find_by_id(credential_id)
            .await?
            .ok_or(CredentialServiceError::InvalidCredential)?;
        if credential.subject_id != caller_id {
            return Err(CredentialServiceError::Forbidden);
        }
        self.store.list_by_credential(credential_id).await
    }
}
