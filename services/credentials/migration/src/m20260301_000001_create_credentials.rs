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
                    .table(Credentials::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Credentials::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Credentials::SubjectId).uuid().not_null())
                    .col(ColumnDef::new(Credentials::Purpose).string().not_null())
                    .col(ColumnDef::new(Credentials::Secret).string().not_null())
                    .col(
                        ColumnDef::new(Credentials::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Credentials::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Credentials::Consumed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Credentials::ConsumedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Credentials::FailedAttempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .check(Expr::col(Credentials::ExpiresAt).gt(Expr::col(Credentials::CreatedAt)))
                    .to_owned(),
            )
            .await?;

        // Attendance secrets never repeat. Login codes are only unique among live rows,
        // which the store checks under an advisory lock.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS uq_credentials_attendance_secret \
                 ON credentials (secret) WHERE purpose = 'attendance'",
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Credentials::Table)
                    .col(Credentials::SubjectId)
                    .col(Credentials::Purpose)
                    .col(Credentials::Secret)
                    .name("idx_credentials_subject_id_purpose_secret")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Credentials::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Credentials {
    Table,
    Id,
    SubjectId,
    Purpose,
    Secret,
    CreatedAt,
    ExpiresAt,
    Consumed,
    ConsumedAt,
    FailedAttempts,
}
