use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // Spam rate window: recent submissions by one fingerprint.
        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_issues_fingerprint_created
             ON issues (submitter_fingerprint, created_at DESC)
             WHERE submitter_fingerprint IS NOT NULL",
        )
        .await?;

        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_issues_open_priority
             ON issues (priority_score DESC, created_at DESC)
             WHERE is_spam = FALSE AND status <> 'resolved'",
        )
        .await?;

        db.execute_unprepared(
            "ALTER TABLE issues DROP CONSTRAINT IF EXISTS chk_issues_not_self_duplicate",
        )
        .await?;
        db.execute_unprepared(
            "ALTER TABLE issues ADD CONSTRAINT chk_issues_not_self_duplicate
             CHECK (duplicate_of IS NULL OR duplicate_of <> id)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared("ALTER TABLE issues DROP CONSTRAINT IF EXISTS chk_issues_not_self_duplicate")
            .await?;
        db.execute_unprepared("DROP INDEX IF EXISTS idx_issues_open_priority")
            .await?;
        db.execute_unprepared("DROP INDEX IF EXISTS idx_issues_fingerprint_created")
            .await?;

        Ok(())
    }
}
