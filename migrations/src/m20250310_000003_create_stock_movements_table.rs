use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Append-only audit trail of every quantity change.
        manager
            .create_table(
                Table::create()
                    .table(StockMovements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockMovements::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::BatchId).uuid().not_null())
                    .col(ColumnDef::new(StockMovements::Sku).string().not_null())
                    .col(
                        ColumnDef::new(StockMovements::ProductName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::LocationId).uuid().null())
                    .col(
                        ColumnDef::new(StockMovements::MovementType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::QuantityDelta)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::QuantityBefore)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::QuantityAfter)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::ReferenceId).uuid().null())
                    .col(
                        ColumnDef::new(StockMovements::ReferenceType)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(StockMovements::Reason).text().null())
                    .col(ColumnDef::new(StockMovements::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(StockMovements::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_movements_batch")
                            .from(StockMovements::Table, StockMovements::BatchId)
                            .to(InventoryBatches::Table, InventoryBatches::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_movements_batch_created")
                    .table(StockMovements::Table)
                    .col(StockMovements::BatchId)
                    .col(StockMovements::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Paired TRANSFER_OUT/TRANSFER_IN entries share a reference id.
        manager
            .create_index(
                Index::create()
                    .name("idx_stock_movements_reference")
                    .table(StockMovements::Table)
                    .col(StockMovements::ReferenceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockMovements::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum StockMovements {
    Table,
    Id,
    BatchId,
    Sku,
    ProductName,
    LocationId,
    MovementType,
    QuantityDelta,
    QuantityBefore,
    QuantityAfter,
    ReferenceId,
    ReferenceType,
    Reason,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum InventoryBatches {
    Table,
    Id,
}
