use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use sea_orm::DatabaseConnection;

use crate::domain::repository::{Clock, SecretGenerator};
use crate::infra::db::DbCredentialStore;
use crate::infra::grpc::GrpcIdentityDirectory;
use crate::infra::mailer::HttpMailDispatcher;
use crate::usecase::history::RedemptionHistory;
use crate::usecase::issue::CredentialIssuer;
use crate::usecase::redeem::RedemptionValidator;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub directory: GrpcIdentityDirectory,
    pub mailer: HttpMailDispatcher,
    pub clock: Arc<dyn Clock>,
    pub secrets: Arc<dyn SecretGenerator>,
    pub dispatch_timeout: Duration,
    pub attendance_offset: FixedOffset,
}

impl AppState {
    pub fn credential_store(&self) -> DbCredentialStore {
        DbCredentialStore {
            db: self.db.clone(),
        }
    }

    pub fn issuer(
        &self,
    ) -> CredentialIssuer<DbCredentialStore, GrpcIdentityDirectory, HttpMailDispatcher> {
        CredentialIssuer {
            store: self.credential_store(),
            directory: self.directory.clone(),
            dispatcher: self.mailer.clone(),
            clock: self.clock.clone(),
            secrets: self.secrets.clone(),
            dispatch_timeout: self.dispatch_timeout,
        }
    }

    pub fn validator(&self) -> RedemptionValidator<DbCredentialStore, GrpcIdentityDirectory> {
        RedemptionValidator {
            store: self.credential_store(),
            directory: self.directory.clone(),
            clock: self.clock.clone(),
            attendance_offset: self.attendance_offset,
        }
    }

    pub fn history(&self) -> RedemptionHistory<DbCredentialStore> {
        RedemptionHistory {
            store: self.credential_store(),
        }
    }
}
