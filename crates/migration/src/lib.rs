pub use sea_orm_migration::prelude::*;

mod m20260301_000000_add_lead_list_table;
mod m20260301_000001_add_lead_table;
mod m20260301_000002_add_verification_queue_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000000_add_lead_list_table::Migration),
            Box::new(m20260301_000001_add_lead_table::Migration),
            Box::new(m20260301_000002_add_verification_queue_table::Migration),
        ]
    }
}
