//! Database migrations for the alert configuration service.

pub use sea_orm_migration::prelude::*;

mod m2026_10_01_000001_create_alert_configurations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(
            m2026_10_01_000001_create_alert_configurations::Migration,
        )]
    }
}
