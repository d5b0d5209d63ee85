use sea_orm::entity::prelude::*;

/// One successful redemption.
///
/// Attendance rows carry `effective_date` and are unique per `(redeemer_id, effective_date)`.
/// Login rows leave it `NULL` and are unique per `credential_id`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "redemption_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Non-owning back-reference; no foreign key.
    pub credential_id: Uuid,
    pub subject_id: Uuid,
    pub redeemer_id: Uuid,
    pub purpose: String,
    pub effective_date: Option<chrono::NaiveDate>,
    pub redeemed_at: chrono::DateTime<chrono::Utc>,
    pub outcome: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
