use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use rollcall_core::health::{healthz, readiness};
use rollcall_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    credential::{issue_attendance, issue_login, list_credential_redemptions},
    redemption::{list_my_redemptions, redeem_attendance, redeem_login},
};
use crate::state::AppState;

async fn readyz(State(state): State<AppState>) -> StatusCode {
    readiness(state.db.ping().await)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Issuance
        .route("/credentials/attendance", post(issue_attendance))
        .route("/credentials/login", post(issue_login))
        .route(
            "/credentials/{credential_id}/redemptions",
            get(list_credential_redemptions),
        )
        // Redemption
        .route("/redemptions", get(list_my_redemptions))
        .route("/redemptions/attendance", post(redeem_attendance))
        .route("/redemptions/login", post(redeem_login))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
