pub use sea_orm_migration::prelude::*;

mod m20260828_000001_auth_core;
mod m20260828_000002_document_workflow;

pub struct Migrator;
#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260828_000001_auth_core::Migration),
            Box::new(m20260828_000002_document_workflow::Migration),
        ]
    }
}
