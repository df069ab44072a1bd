pub use sea_orm_migration::prelude::*;

mod m20250310_000001_create_reference_tables;
mod m20250310_000002_create_inventory_batches_table;
mod m20250310_000003_create_stock_movements_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250310_000001_create_reference_tables::Migration),
            Box::new(m20250310_000002_create_inventory_batches_table::Migration),
            Box::new(m20250310_000003_create_stock_movements_table::Migration),
        ]
    }
}
