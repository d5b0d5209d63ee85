use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use rollcall_auth_types::identity::IdentityHeaders;
use rollcall_domain::id::{CredentialId, RedemptionId};
use rollcall_domain::purpose::{Outcome, Purpose};

use crate::domain::types::RedemptionRecord;
use crate::error::CredentialServiceError;
use crate::state::AppState;
use crate::usecase::redeem::{RedeemAttendanceInput, RedeemLoginInput};

#[derive(Serialize)]
pub struct RedemptionRecordResponse {
    pub redemption_id: RedemptionId,
    pub credential_id: CredentialId,
    pub purpose: Purpose,
    pub effective_date: Option<NaiveDate>,
    #[serde(serialize_with = "rollcall_core::serde::to_rfc3339_ms")]
    pub redeemed_at: DateTime<Utc>,
    pub outcome: Outcome,
}

impl From<RedemptionRecord> for RedemptionRecordResponse {
    fn from(record: RedemptionRecord) -> Self {
        Self {
            redemption_id: record.id,
            credential_id: record.credential_id,
            purpose: record.purpose,
            effective_date: record.effective_date,
            redeemed_at: record.redeemed_at,
            outcome: record.outcome,
        }
    }
}

// ── POST /redemptions/attendance ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RedeemAttendanceRequest {
    pub secret: String,
}

#[derive(Serialize)]
pub struct RedeemAttendanceResponse {
    pub redemption_id: RedemptionId,
    pub effective_date: Option<NaiveDate>,
    pub outcome: Outcome,
}

pub async fn redeem_attendance(
    State(state): State<AppState>,
    identity: IdentityHeaders,
    Json(body): Json<RedeemAttendanceRequest>,
) -> Result<(StatusCode, Json<RedeemAttendanceResponse>), CredentialServiceError> {
    let record = state
        .validator()
        .redeem_attendance(RedeemAttendanceInput {
            redeemer_id: identity.user_id,
            secret: body.secret,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RedeemAttendanceResponse {
            redemption_id: record.id,
            effective_date: record.effective_date,
            outcome: record.outcome,
        }),
    ))
}

// ── POST /redemptions/login ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RedeemLoginRequest {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct RedeemLoginResponse {
    pub redemption_id: RedemptionId,
    #[serde(serialize_with = "rollcall_core::serde::to_rfc3339_ms")]
    pub consumed_at: DateTime<Utc>,
    pub outcome: Outcome,
}

pub async fn redeem_login(
    State(state): State<AppState>,
    Json(body): Json<RedeemLoginRequest>,
) -> Result<(StatusCode, Json<RedeemLoginResponse>), CredentialServiceError> {
    let record = state
        .validator()
        .redeem_login(RedeemLoginInput {
            email: body.email,
            code: body.code,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RedeemLoginResponse {
            redemption_id: record.id,
            consumed_at: record.redeemed_at,
            outcome: record.outcome,
        }),
    ))
}

// ── GET /redemptions ──────────────────────────────────────────────────────────

pub async fn list_my_redemptions(
    State(state): State<AppState>,
    identity: IdentityHeaders,
) -> Result<Json<Vec<RedemptionRecordResponse>>, CredentialServiceError> {
    let records = state.history().for_redeemer(identity.user_id).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}
