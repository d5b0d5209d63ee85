use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RedemptionRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RedemptionRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RedemptionRecords::CredentialId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RedemptionRecords::SubjectId).uuid().not_null())
                    .col(
                        ColumnDef::new(RedemptionRecords::RedeemerId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RedemptionRecords::Purpose).string().not_null())
                    .col(ColumnDef::new(RedemptionRecords::EffectiveDate).date())
                    .col(
                        ColumnDef::new(RedemptionRecords::RedeemedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RedemptionRecords::Outcome).string().not_null())
                    .to_owned(),
            )
            .await?;

        // One attendance mark per student per day. NULL dates (login rows) never collide.
        manager
            .create_index(
                Index::create()
                    .table(RedemptionRecords::Table)
                    .col(RedemptionRecords::RedeemerId)
                    .col(RedemptionRecords::EffectiveDate)
                    .unique()
                    .name("uq_redemption_records_redeemer_id_effective_date")
                    .to_owned(),
            )
            .await?;

        // One consumption per login credential. Partial indexes are not expressible
        // through the index builder.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS uq_redemption_records_login_credential_id \
                 ON redemption_records (credential_id) WHERE effective_date IS NULL",
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(RedemptionRecords::Table)
                    .col(RedemptionRecords::CredentialId)
                    .name("idx_redemption_records_credential_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RedemptionRecords::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum RedemptionRecords {
    Table,
    Id,
    CredentialId,
    SubjectId,
    RedeemerId,
    Purpose,
    EffectiveDate,
    RedeemedAt,
    Outcome,
}
