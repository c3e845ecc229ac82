use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum IssueUpvotes {
    Table,
    Id,
    IssueId,
    UserIp,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Issues {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IssueUpvotes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(IssueUpvotes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(IssueUpvotes::IssueId).integer().not_null())
                    .col(ColumnDef::new(IssueUpvotes::UserIp).string_len(128).not_null())
                    .col(
                        ColumnDef::new(IssueUpvotes::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_issue_upvotes_issue_id")
                            .from(IssueUpvotes::Table, IssueUpvotes::IssueId)
                            .to(Issues::Table, Issues::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One vote per (issue, fingerprint); toggling relies on this being enforced by the store.
        manager
            .create_index(
                Index::create()
                    .name("idx_issue_upvotes_unique")
                    .table(IssueUpvotes::Table)
                    .col(IssueUpvotes::IssueId)
                    .col(IssueUpvotes::UserIp)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IssueUpvotes::Table).to_owned())
            .await
    }
}
