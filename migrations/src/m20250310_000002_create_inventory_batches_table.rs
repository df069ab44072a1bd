use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per (product, warehouse, lot, expiry). Batches are never
        // deleted; a zero-quantity batch remains as a historical record.
        manager
            .create_table(
                Table::create()
                    .table(InventoryBatches::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryBatches::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::ProductId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::WarehouseId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryBatches::LocationId).uuid().null())
                    .col(ColumnDef::new(InventoryBatches::Sku).string().not_null())
                    .col(
                        ColumnDef::new(InventoryBatches::ProductName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::LotNumber)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::ExpiryDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::UnitCost)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::UnitPrice)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBatches::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_batches_product")
                            .from(InventoryBatches::Table, InventoryBatches::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_batches_warehouse")
                            .from(InventoryBatches::Table, InventoryBatches::WarehouseId)
                            .to(Warehouses::Table, Warehouses::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // FIFO selection scans (product, warehouse) ordered by expiry.
        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_batches_product_warehouse_expiry")
                    .table(InventoryBatches::Table)
                    .col(InventoryBatches::ProductId)
                    .col(InventoryBatches::WarehouseId)
                    .col(InventoryBatches::ExpiryDate)
                    .to_owned(),
            )
            .await?;

        // Destination matching key for transfers.
        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_batches_matching_key")
                    .table(InventoryBatches::Table)
                    .col(InventoryBatches::WarehouseId)
                    .col(InventoryBatches::ProductId)
                    .col(InventoryBatches::LotNumber)
                    .col(InventoryBatches::ExpiryDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryBatches::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum InventoryBatches {
    Table,
    Id,
    ProductId,
    WarehouseId,
    LocationId,
    Sku,
    ProductName,
    LotNumber,
    ExpiryDate,
    Quantity,
    UnitCost,
    UnitPrice,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Warehouses {
    Table,
    Id,
}
