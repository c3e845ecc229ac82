use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Issues {
    Table,
    Id,
    Title,
    Description,
    Category,
    Latitude,
    Longitude,
    LocationName,
    StreetAddress,
    Landmark,
    ImageUrl,
    IsSpam,
    DuplicateOf,
    PriorityScore,
    UpvotesCount,
    Status,
    AssignedTo,
    ResponseTimeSeconds,
    PublicNotes,
    SubmitterFingerprint,
    CreatedAt,
    UpdatedAt,
    ResolvedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Issues::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Issues::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Issues::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Issues::Description).text().not_null())
                    .col(ColumnDef::new(Issues::Category).string_len(40).not_null())
                    .col(ColumnDef::new(Issues::Latitude).double().not_null())
                    .col(ColumnDef::new(Issues::Longitude).double().not_null())
                    .col(ColumnDef::new(Issues::LocationName).string_len(255).null())
                    .col(ColumnDef::new(Issues::StreetAddress).string_len(255).null())
                    .col(ColumnDef::new(Issues::Landmark).string_len(255).null())
                    .col(ColumnDef::new(Issues::ImageUrl).string_len(1024).null())
                    .col(
                        ColumnDef::new(Issues::IsSpam)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Issues::DuplicateOf).integer().null())
                    .col(
                        ColumnDef::new(Issues::PriorityScore)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Issues::UpvotesCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Issues::Status)
                            .string_len(20)
                            .not_null()
                            .default("new"),
                    )
                    .col(ColumnDef::new(Issues::AssignedTo).string_len(100).null())
                    .col(ColumnDef::new(Issues::ResponseTimeSeconds).big_integer().null())
                    .col(ColumnDef::new(Issues::PublicNotes).text().null())
                    .col(
                        ColumnDef::new(Issues::SubmitterFingerprint)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Issues::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Issues::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Issues::ResolvedAt).timestamp().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_issues_duplicate_of")
                            .from(Issues::Table, Issues::DuplicateOf)
                            .to(Issues::Table, Issues::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .check(Expr::col(Issues::UpvotesCount).gte(0))
                    .check(Expr::col(Issues::PriorityScore).gte(0.0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_issues_duplicate_of")
                    .table(Issues::Table)
                    .col(Issues::DuplicateOf)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_issues_status_spam")
                    .table(Issues::Table)
                    .col(Issues::Status)
                    .col(Issues::IsSpam)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Issues::Table).to_owned())
            .await
    }
}
