use sea_orm_migration::prelude::*;

mod m20250101_000001_create_issues_table;
mod m20250101_000002_create_issue_upvotes_table;
mod m20250101_000003_add_triage_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_issues_table::Migration),
            Box::new(m20250101_000002_create_issue_upvotes_table::Migration),
            Box::new(m20250101_000003_add_triage_indexes::Migration),
        ]
    }
}
