use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Statement, TransactionTrait,
    sea_query::{Expr, OnConflict},
};

use rollcall_credentials_schema::{credentials, redemption_records};
use rollcall_domain::id::{CredentialId, UserId};
use rollcall_domain::purpose::{MAX_LOGIN_ATTEMPTS, Purpose};

use crate::domain::repository::CredentialStore;
use crate::domain::types::{
    ConsumeOutcome, Credential, InsertOutcome, RecordOutcome, RedemptionRecord,
};
use crate::error::CredentialServiceError;

// ── Credential store ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbCredentialStore {
    pub db: DatabaseConnection,
}

impl CredentialStore for DbCredentialStore {
    async fn insert(
        &self,
        credential: &Credential,
    ) -> Result<InsertOutcome, CredentialServiceError> {
        let inserted = match credential.purpose {
            Purpose::Attendance => {
                // Only `uq_credentials_attendance_secret` can conflict; ids are fresh v7s.
                let rows = credentials::Entity::insert(credential_to_active_model(credential))
                    .on_conflict(OnConflict::new().do_nothing().to_owned())
                    .exec_without_returning(&self.db)
                    .await
                    .context("insert attendance credential")?;
                rows > 0
            }
            Purpose::Login => self.insert_login_code(credential).await?,
        };
        Ok(if inserted {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::SecretTaken
        })
    }

    async fn discard(&self, id: CredentialId) -> Result<(), CredentialServiceError> {
        credentials::Entity::delete_many()
            .filter(credentials::Column::Id.eq(id.0))
            .filter(credentials::Column::Consumed.eq(false))
            .exec(&self.db)
            .await
            .context("discard credential")?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: CredentialId,
    ) -> Result<Option<Credential>, CredentialServiceError> {
        let model = credentials::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .context("find credential by id")?;
        Ok(model.map(credential_from_model).transpose()?)
    }

    async fn find_by_secret(
        &self,
        purpose: Purpose,
        secret: &str,
    ) -> Result<Option<Credential>, CredentialServiceError> {
        let model = credentials::Entity::find()
            .filter(credentials::Column::Purpose.eq(purpose.as_str()))
            .filter(credentials::Column::Secret.eq(secret))
            .one(&self.db)
            .await
            .context("find credential by secret")?;
        Ok(model.map(credential_from_model).transpose()?)
    }

    async fn find_login_code(
        &self,
        subject_id: UserId,
        code: &str,
    ) -> Result<Option<Credential>, CredentialServiceError> {
        let model = credentials::Entity::find()
            .filter(credentials::Column::SubjectId.eq(subject_id.0))
            .filter(credentials::Column::Purpose.eq(Purpose::Login.as_str()))
            .filter(credentials::Column::Secret.eq(code))
            .order_by_desc(credentials::Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find login code")?;
        Ok(model.map(credential_from_model).transpose()?)
    }

    async fn count_active(
        &self,
        subject_id: UserId,
        purpose: Purpose,
        now: DateTime<Utc>,
    ) -> Result<u64, CredentialServiceError> {
        let count = credentials::Entity::find()
            .filter(credentials::Column::SubjectId.eq(subject_id.0))
            .filter(live_condition(purpose, now))
            .count(&self.db)
            .await
            .context("count active credentials")?;
        Ok(count)
    }

    async fn record_attendance(
        &self,
        record: &RedemptionRecord,
    ) -> Result<RecordOutcome, CredentialServiceError> {
        // The (redeemer_id, effective_date) unique index arbitrates concurrent scans.
        let rows = redemption_records::Entity::insert(record_to_active_model(record))
            .on_conflict(
                OnConflict::columns([
                    redemption_records::Column::RedeemerId,
                    redemption_records::Column::EffectiveDate,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .context("record attendance")?;
        Ok(if rows == 0 {
            RecordOutcome::AlreadyRecorded
        } else {
            RecordOutcome::Recorded
        })
    }

    async fn consume(
        &self,
        record: &RedemptionRecord,
    ) -> Result<ConsumeOutcome, CredentialServiceError> {
        let outcome = self
            .db
            .transaction::<_, ConsumeOutcome, sea_orm::DbErr>(|txn| {
                let record = record.clone();
                Box::pin(async move {
                    let updated = credentials::Entity::update_many()
                        .col_expr(credentials::Column::Consumed, Expr::value(true))
                        .col_expr(
                            credentials::Column::ConsumedAt,
                            Expr::value(record.redeemed_at),
                        )
                        .filter(credentials::Column::Id.eq(record.credential_id.0))
                        .filter(credentials::Column::Consumed.eq(false))
                        .filter(credentials::Column::FailedAttempts.lt(MAX_LOGIN_ATTEMPTS))
                        .exec(txn)
                        .await?;
                    if updated.rows_affected == 0 {
                        return losing_consume_outcome(txn, record.credential_id).await;
                    }
                    insert_redemption_record(txn, &record).await?;
                    Ok(ConsumeOutcome::Consumed)
                })
            })
            .await
            .context("consume login credential")?;
        Ok(outcome)
    }

    async fn record_failed_attempt(
        &self,
        subject_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<u64, CredentialServiceError> {
        let result = credentials::Entity::update_many()
            .col_expr(
                credentials::Column::FailedAttempts,
                Expr::col(credentials::Column::FailedAttempts).add(1),
            )
            .filter(credentials::Column::SubjectId.eq(subject_id.0))
            .filter(live_condition(Purpose::Login, now))
            .exec(&self.db)
            .await
            .context("record failed login attempt")?;
        Ok(result.rows_affected)
    }

    async fn list_by_redeemer(
        &self,
        redeemer_id: UserId,
    ) -> Result<Vec<RedemptionRecord>, CredentialServiceError> {
        let models = redemption_records::Entity::find()
            .filter(redemption_records::Column::RedeemerId.eq(redeemer_id.0))
            .order_by_desc(redemption_records::Column::RedeemedAt)
            .all(&self.db)
            .await
            .context("list redemptions by redeemer")?;
        Ok(models
            .into_iter()
            .map(record_from_model)
            .collect::<anyhow::Result<_>>()?)
    }

    async fn list_by_credential(
        &self,
        credential_id: CredentialId,
    ) -> Result<Vec<RedemptionRecord>, CredentialServiceError> {
        let models = redemption_records::Entity::find()
            .filter(redemption_records::Column::CredentialId.eq(credential_id.0))
            .order_by_desc(redemption_records::Column::RedeemedAt)
            .all(&self.db)
            .await
            .context("list redemptions by credential")?;
        Ok(models
            .into_iter()
            .map(record_from_model)
            .collect::<anyhow::Result<_>>()?)
    }
}

impl DbCredentialStore {
    /// Insert a login code unless a live login credential already holds it.
    ///
    /// The advisory lock serializes issuers racing for the same code until commit;
    /// dead rows keep their code but no longer block it.
    async fn insert_login_code(
        &self,
        credential: &Credential,
    ) -> Result<bool, CredentialServiceError> {
        let backend = self.db.get_database_backend();
        let inserted = self
            .db
            .transaction::<_, bool, sea_orm::DbErr>(|txn| {
                let credential = credential.clone();
                Box::pin(async move {
                    txn.execute(Statement::from_sql_and_values(
                        backend,
                        "SELECT pg_advisory_xact_lock(hashtext($1))",
                        [format!("login:{}", credential.secret).into()],
                    ))
                    .await?;
                    let live = credentials::Entity::find()
                        .filter(credentials::Column::Secret.eq(credential.secret.as_str()))
                        .filter(live_condition(Purpose::Login, credential.created_at))
                        .count(txn)
                        .await?;
                    if live > 0 {
                        return Ok(false);
                    }
                    credential_to_active_model(&credential).insert(txn).await?;
                    Ok(true)
                })
            })
            .await
            .context("insert login credential")?;
        Ok(inserted)
    }
}

/// Unconsumed, unexpired at `now`, and not locked by failed attempts.
fn live_condition(purpose: Purpose, now: DateTime<Utc>) -> Condition {
    Condition::all()
        .add(credentials::Column::Purpose.eq(purpose.as_str()))
        .add(credentials::Column::Consumed.eq(false))
        .add(credentials::Column::ExpiresAt.gte(now))
        .add(credentials::Column::FailedAttempts.lt(MAX_LOGIN_ATTEMPTS))
}

/// Explain why the conditional update matched no row. Runs in the same transaction.
async fn losing_consume_outcome(
    txn: &DatabaseTransaction,
    credential_id: CredentialId,
) -> Result<ConsumeOutcome, sea_orm::DbErr> {
    let current = credentials::Entity::find_by_id(credential_id.0).one(txn).await?;
    Ok(match current {
        Some(model) if model.consumed => ConsumeOutcome::AlreadyConsumed,
        // Locked by failed attempts, or discarded underneath us.
        _ => ConsumeOutcome::Exhausted,
    })
}

async fn insert_redemption_record(
    txn: &DatabaseTransaction,
    record: &RedemptionRecord,
) -> Result<(), sea_orm::DbErr> {
    record_to_active_model(record).insert(txn).await?;
    Ok(())
}

fn credential_to_active_model(credential: &Credential) -> credentials::ActiveModel {
    credentials::ActiveModel {
        id: Set(credential.id.0),
        subject_id: Set(credential.subject_id.0),
        purpose: Set(credential.purpose.as_str().to_owned()),
        secret: Set(credential.secret.clone()),
        created_at: Set(credential.created_at),
        expires_at: Set(credential.expires_at),
        consumed: Set(credential.consumed),
        consumed_at: Set(credential.consumed_at),
        failed_attempts: Set(credential.failed_attempts),
    }
}

fn credential_from_model(model: credentials::Model) -> anyhow::Result<Credential> {
    Ok(Credential {
        id: model.id.into(),
        subject_id: model.subject_id.into(),
        purpose: model.purpose.parse()?,
        secret: model.secret,
        created_at: model.created_at,
        expires_at: model.expires_at,
        consumed: model.consumed,
        consumed_at: model.consumed_at,
        failed_attempts: model.failed_attempts,
    })
}

fn record_to_active_model(record: &RedemptionRecord) -> redemption_records::ActiveModel {
    redemption_records::ActiveModel {
        id: Set(record.id.0),
        credential_id: Set(record.credential_id.0),
        subject_id: Set(record.subject_id.0),
        redeemer_id: Set(record.redeemer_id.0),
        purpose: Set(record.purpose.as_str().to_owned()),
        effective_date: Set(record.effective_date),
        redeemed_at: Set(record.redeemed_at),
        outcome: Set(record.outcome.as_str().to_owned()),
    }
}

fn record_from_model(model: redemption_records::Model) -> anyhow::Result<RedemptionRecord> {
    Ok(RedemptionRecord {
        id: model.id.into(),
        credential_id: model.credential_id.into(),
        subject_id: model.subject_id.into(),
        redeemer_id: model.redeemer_id.into(),
        purpose: model.purpose.parse()?,
        effective_date: model.effective_date,
        redeemed_at: model.redeemed_at,
        outcome: model.outcome.parse()?,
    })
}
