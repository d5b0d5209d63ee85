use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Secret generation failed because the entropy source is unavailable. Fatal.
#[derive(Debug, thiserror::Error)]
#[error("entropy source unavailable: {0}")]
pub struct GenerationError(pub String);

/// Out-of-band delivery did not complete.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("dispatch timed out")]
    TimedOut,
    #[error("dispatch rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("dispatch transport failed")]
    Transport(#[from] anyhow::Error),
}

/// Credential service domain error variants.
///
/// Every variant leaves the store either untouched or holding exactly one new
/// redemption record; none describes a half-committed state.
#[derive(Debug, thiserror::Error)]
pub enum CredentialServiceError {
    #[error("invalid credential")]
    InvalidCredential,
    #[error("credential expired")]
    Expired,
    #[error("forbidden")]
    Forbidden,
    #[error("attendance already recorded today")]
    AlreadyRedeemedToday,
    #[error("credential already consumed")]
    AlreadyConsumed,
    #[error("ttl out of range")]
    InvalidTtl,
    #[error("unknown subject")]
    UnknownSubject,
    #[error("could not allocate a unique secret")]
    IssuanceConflict,
    #[error("notification dispatch failed")]
    DispatchFailure(#[source] DispatchError),
    #[error("too many active credentials")]
    TooManyActiveCredentials,
    #[error("secret generation failed")]
    Generation(#[from] GenerationError),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl CredentialServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::Expired => "EXPIRED",
            Self::Forbidden => "FORBIDDEN",
            Self::AlreadyRedeemedToday => "ALREADY_REDEEMED_TODAY",
            Self::AlreadyConsumed => "ALREADY_CONSUMED",
            Self::InvalidTtl => "INVALID_TTL",
            Self::UnknownSubject => "UNKNOWN_SUBJECT",
            Self::IssuanceConflict => "ISSUANCE_CONFLICT",
            Self::DispatchFailure(_) => "DISPATCH_FAILURE",
            Self::TooManyActiveCredentials => "TOO_MANY_ACTIVE_CREDENTIALS",
            Self::Generation(_) => "GENERATION_FAILED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredential => StatusCode::BAD_REQUEST,
            Self::Expired => StatusCode::GONE,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::AlreadyRedeemedToday | Self::AlreadyConsumed => StatusCode::CONFLICT,
            Self::InvalidTtl => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UnknownSubject => StatusCode::NOT_FOUND,
            Self::IssuanceConflict => StatusCode::SERVICE_UNAVAILABLE,
            Self::DispatchFailure(_) => StatusCode::BAD_GATEWAY,
            Self::TooManyActiveCredentials => StatusCode::TOO_MANY_REQUESTS,
            Self::Generation(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CredentialServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        // TraceLayer already records every status; only server-side failures need the
        // cause chain here.
        match &self {
            Self::Internal(e) => tracing::error!(error = ?e, kind = self.kind(), "internal error"),
            Self::Generation(e) => tracing::error!(error = %e, kind = self.kind(), "secret generation failed"),
            Self::DispatchFailure(e) => tracing::error!(error = %e, kind = self.kind(), "notification dispatch failed"),
            Self::IssuanceConflict => tracing::warn!(kind = self.kind(), "issuance retries exhausted"),
            _ => {}
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
