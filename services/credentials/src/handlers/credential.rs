use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rollcall_auth_types::identity::IdentityHeaders;
use rollcall_domain::id::CredentialId;

use crate::error::CredentialServiceError;
use crate::handlers::redemption::RedemptionRecordResponse;
use crate::state::AppState;
use crate::usecase::issue::{IssueAttendanceInput, IssueLoginInput};

// ── POST /credentials/attendance ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct IssueAttendanceRequest {
    pub ttl_minutes: Option<u32>,
}

#[derive(Serialize)]
pub struct IssueAttendanceResponse {
    pub credential_id: CredentialId,
    pub secret: String,
    #[serde(serialize_with = "rollcall_core::serde::to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
}

pub async fn issue_attendance(
    State(state): State<AppState>,
    identity: IdentityHeaders,
    Json(body): Json<IssueAttendanceRequest>,
) -> Result<(StatusCode, Json<IssueAttendanceResponse>), CredentialServiceError> {
    let credential = state
        .issuer()
        .issue_attendance(IssueAttendanceInput {
            issuer_id: identity.user_id,
            ttl_minutes: body.ttl_minutes,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(IssueAttendanceResponse {
            credential_id: credential.id,
            secret: credential.secret,
            expires_at: credential.expires_at,
        }),
    ))
}

// ── POST /credentials/login ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct IssueLoginRequest {
    pub email: String,
}

/// The code itself travels only by mail.
#[derive(Serialize)]
pub struct IssueLoginResponse {
    pub credential_id: CredentialId,
    #[serde(serialize_with = "rollcall_core::serde::to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
}

pub async fn issue_login(
    State(state): State<AppState>,
    Json(body): Json<IssueLoginRequest>,
) -> Result<(StatusCode, Json<IssueLoginResponse>), CredentialServiceError> {
    let credential = state
        .issuer()
        .issue_login(IssueLoginInput { email: body.email })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(IssueLoginResponse {
            credential_id: credential.id,
            expires_at: credential.expires_at,
        }),
    ))
}

// ── GET /credentials/{id}/redemptions ─────────────────────────────────────────

pub async fn list_credential_redemptions(
    State(state): State<AppState>,
    identity: IdentityHeaders,
    Path(credential_id): Path<CredentialId>,
) -> Result<Json<Vec<RedemptionRecordResponse>>, CredentialServiceError> {
    let records = state
        .history()
        .for_credential(credential_id, identity.user_id)
        .await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}
