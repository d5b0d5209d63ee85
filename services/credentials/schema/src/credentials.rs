use sea_orm::entity::prelude::*;

/// An issued, time-bounded secret. `(purpose, secret)` is unique.
///
/// Rows are never deleted by redemption; expiry is evaluated at read time.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "credentials")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub subject_id: Uuid,
    /// `attendance` | `login`
    pub purpose: String,
    pub secret: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    /// Only ever set for login credentials.
    pub consumed: bool,
    pub consumed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub failed_attempts: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
