use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_suppliers_table::Migration),
            Box::new(m20240101_000002_create_products_table::Migration),
            Box::new(m20240101_000003_create_stock_ins_tables::Migration),
            Box::new(m20240101_000004_create_batch_lots_table::Migration),
            Box::new(m20240101_000005_create_stock_outs_tables::Migration),
            Box::new(m20240101_000006_create_inventory_checks_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_suppliers_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_suppliers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Suppliers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Suppliers::Code).string().not_null())
                        .col(ColumnDef::new(Suppliers::Name).string().not_null())
                        .col(ColumnDef::new(Suppliers::Phone).string().null())
                        .col(ColumnDef::new(Suppliers::Email).string().null())
                        .col(
                            ColumnDef::new(Suppliers::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Suppliers::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Suppliers::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_suppliers_code")
                        .table(Suppliers::Table)
                        .col(Suppliers::Code)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Suppliers {
        Table,
        Id,
        Code,
        Name,
        Phone,
        Email,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_products_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::Sku).string().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Unit).string().not_null())
                        .col(
                            ColumnDef::new(Products::CostPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::SellingPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::CurrentStock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::MinStock)
                                .integer()
                                .not_null()
                                .default(10),
                        )
                        .col(ColumnDef::new(Products::Status).string().not_null())
                        .col(ColumnDef::new(Products::DefaultSupplierId).uuid().null())
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_sku")
                        .table(Products::Table)
                        .col(Products::Sku)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_status")
                        .table(Products::Table)
                        .col(Products::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Sku,
        Name,
        Unit,
        CostPrice,
        SellingPrice,
        CurrentStock,
        MinStock,
        Status,
        DefaultSupplierId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_stock_ins_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_stock_ins_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockIns::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockIns::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockIns::Code).string().not_null())
                        .col(ColumnDef::new(StockIns::SupplierId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockIns::TotalAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockIns::ImportDate).timestamp().not_null())
                        .col(ColumnDef::new(StockIns::Status).string().not_null())
                        .col(ColumnDef::new(StockIns::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(StockIns::ApprovedBy).uuid().null())
                        .col(ColumnDef::new(StockIns::ApprovedAt).timestamp().null())
                        .col(ColumnDef::new(StockIns::CancelledBy).uuid().null())
                        .col(ColumnDef::new(StockIns::CancelledAt).timestamp().null())
                        .col(ColumnDef::new(StockIns::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(StockIns::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_ins_code")
                        .table(StockIns::Table)
                        .col(StockIns::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_ins_status")
                        .table(StockIns::Table)
                        .col(StockIns::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_ins_supplier_id")
                        .table(StockIns::Table)
                        .col(StockIns::SupplierId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockInItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockInItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockInItems::StockInId).uuid().not_null())
                        .col(ColumnDef::new(StockInItems::LineNo).integer().not_null())
                        .col(ColumnDef::new(StockInItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(StockInItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(StockInItems::UnitPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockInItems::TotalPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockInItems::BatchNumber).string().null())
                        .col(
                            ColumnDef::new(StockInItems::ManufacturingDate)
                                .date()
                                .null(),
                        )
                        .col(ColumnDef::new(StockInItems::ExpiryDate).date().null())
                        .col(ColumnDef::new(StockInItems::BatchLotId).uuid().null())
                        .col(
                            ColumnDef::new(StockInItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_in_items_stock_in_id")
                        .table(StockInItems::Table)
                        .col(StockInItems::StockInId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockInItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockIns::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockIns {
        Table,
        Id,
        Code,
        SupplierId,
        TotalAmount,
        ImportDate,
        Status,
        CreatedBy,
        ApprovedBy,
        ApprovedAt,
        CancelledBy,
        CancelledAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum StockInItems {
        Table,
        Id,
        StockInId,
        LineNo,
        ProductId,
        Quantity,
        UnitPrice,
        TotalPrice,
        BatchNumber,
        ManufacturingDate,
        ExpiryDate,
        BatchLotId,
        CreatedAt,
    }
}

mod m20240101_000004_create_batch_lots_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_batch_lots_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BatchLots::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BatchLots::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BatchLots::BatchNumber).string().not_null())
                        .col(ColumnDef::new(BatchLots::ProductId).uuid().not_null())
                        .col(ColumnDef::new(BatchLots::SupplierId).uuid().not_null())
                        .col(ColumnDef::new(BatchLots::StockInId).uuid().not_null())
                        .col(ColumnDef::new(BatchLots::ManufacturingDate).date().null())
                        .col(ColumnDef::new(BatchLots::ExpiryDate).date().null())
                        .col(
                            ColumnDef::new(BatchLots::InitialQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BatchLots::RemainingQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BatchLots::CostPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(BatchLots::ReceivedAt).timestamp().not_null())
                        .col(ColumnDef::new(BatchLots::Status).string().not_null())
                        .col(ColumnDef::new(BatchLots::Notes).string().null())
                        .col(ColumnDef::new(BatchLots::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(BatchLots::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            // One batch number per product
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_batch_lots_product_batch_number")
                        .table(BatchLots::Table)
                        .col(BatchLots::ProductId)
                        .col(BatchLots::BatchNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            // FIFO scan
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_batch_lots_fifo")
                        .table(BatchLots::Table)
                        .col(BatchLots::ProductId)
                        .col(BatchLots::Status)
                        .col(BatchLots::ReceivedAt)
                        .to_owned(),
                )
                .await?;

            // FEFO scan / expiry warnings
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_batch_lots_fefo")
                        .table(BatchLots::Table)
                        .col(BatchLots::ProductId)
                        .col(BatchLots::Status)
                        .col(BatchLots::ExpiryDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_batch_lots_stock_in_id")
                        .table(BatchLots::Table)
                        .col(BatchLots::StockInId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BatchLots::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum BatchLots {
        Table,
        Id,
        BatchNumber,
        ProductId,
        SupplierId,
        StockInId,
        ManufacturingDate,
        ExpiryDate,
        InitialQuantity,
        RemainingQuantity,
        CostPrice,
        ReceivedAt,
        Status,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_stock_outs_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_stock_outs_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockOuts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockOuts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockOuts::Code).string().not_null())
                        .col(ColumnDef::new(StockOuts::IssueType).string().not_null())
                        .col(
                            ColumnDef::new(StockOuts::TotalAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockOuts::IssueDate).timestamp().not_null())
                        .col(ColumnDef::new(StockOuts::Status).string().not_null())
                        .col(ColumnDef::new(StockOuts::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(StockOuts::ApprovedBy).uuid().null())
                        .col(ColumnDef::new(StockOuts::ApprovedAt).timestamp().null())
                        .col(ColumnDef::new(StockOuts::CancelledBy).uuid().null())
                        .col(ColumnDef::new(StockOuts::CancelledAt).timestamp().null())
                        .col(ColumnDef::new(StockOuts::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(StockOuts::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_outs_code")
                        .table(StockOuts::Table)
                        .col(StockOuts::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_outs_status")
                        .table(StockOuts::Table)
                        .col(StockOuts::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_outs_issue_type")
                        .table(StockOuts::Table)
                        .col(StockOuts::IssueType)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockOutItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockOutItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockOutItems::StockOutId).uuid().not_null())
                        .col(ColumnDef::new(StockOutItems::LineNo).integer().not_null())
                        .col(ColumnDef::new(StockOutItems::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockOutItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockOutItems::UnitPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockOutItems::TotalPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockOutItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_out_items_stock_out_id")
                        .table(StockOutItems::Table)
                        .col(StockOutItems::StockOutId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockOutAllocations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockOutAllocations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockOutAllocations::StockOutItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockOutAllocations::BatchLotId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockOutAllocations::BatchNumber)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockOutAllocations::Sequence)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockOutAllocations::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockOutAllocations::CostPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockOutAllocations::ExpiryDate)
                                .date()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockOutAllocations::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_out_allocations_item_id")
                        .table(StockOutAllocations::Table)
                        .col(StockOutAllocations::StockOutItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_out_allocations_batch_lot_id")
                        .table(StockOutAllocations::Table)
                        .col(StockOutAllocations::BatchLotId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockOutAllocations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockOutItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockOuts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockOuts {
        Table,
        Id,
        Code,
        IssueType,
        TotalAmount,
        IssueDate,
        Status,
        CreatedBy,
        ApprovedBy,
        ApprovedAt,
        CancelledBy,
        CancelledAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum StockOutItems {
        Table,
        Id,
        StockOutId,
        LineNo,
        ProductId,
        Quantity,
        UnitPrice,
        TotalPrice,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum StockOutAllocations {
        Table,
        Id,
        StockOutItemId,
        BatchLotId,
        BatchNumber,
        Sequence,
        Quantity,
        CostPrice,
        ExpiryDate,
        CreatedAt,
    }
}

mod m20240101_000006_create_inventory_checks_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_inventory_checks_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryChecks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryChecks::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryChecks::Code).string().not_null())
                        .col(ColumnDef::new(InventoryChecks::Title).string().not_null())
                        .col(
                            ColumnDef::new(InventoryChecks::CheckDate)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryChecks::Scope).string().not_null())
                        .col(ColumnDef::new(InventoryChecks::CategoryId).uuid().null())
                        .col(ColumnDef::new(InventoryChecks::Status).string().not_null())
                        .col(ColumnDef::new(InventoryChecks::Notes).string().null())
                        .col(
                            ColumnDef::new(InventoryChecks::TotalItems)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryChecks::MatchedCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryChecks::ExcessCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryChecks::ShortageCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryChecks::CreatedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryChecks::Assignee).uuid().null())
                        .col(ColumnDef::new(InventoryChecks::ApprovedBy).uuid().null())
                        .col(
                            ColumnDef::new(InventoryChecks::ApprovedAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryChecks::SubmittedAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryChecks::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryChecks::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_checks_code")
                        .table(InventoryChecks::Table)
                        .col(InventoryChecks::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_checks_status")
                        .table(InventoryChecks::Table)
                        .col(InventoryChecks::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InventoryCheckItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryCheckItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryCheckItems::InventoryCheckId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryCheckItems::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryCheckItems::BatchLotId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryCheckItems::BatchNumber)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryCheckItems::ManufacturingDate)
                                .date()
                                .null(),
                        )
                        .col(ColumnDef::new(InventoryCheckItems::ExpiryDate).date().null())
                        .col(
                            ColumnDef::new(InventoryCheckItems::SystemQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryCheckItems::ActualQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryCheckItems::Difference)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(InventoryCheckItems::Status)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryCheckItems::DiscrepancyReason)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InventoryCheckItems::CostPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(InventoryCheckItems::Notes).string().null())
                        .col(
                            ColumnDef::new(InventoryCheckItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryCheckItems::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_check_items_check_id")
                        .table(InventoryCheckItems::Table)
                        .col(InventoryCheckItems::InventoryCheckId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryCheckItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(InventoryChecks::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum InventoryChecks {
        Table,
        Id,
        Code,
        Title,
        CheckDate,
        Scope,
        CategoryId,
        Status,
        Notes,
        TotalItems,
        MatchedCount,
        ExcessCount,
        ShortageCount,
        CreatedBy,
        Assignee,
        ApprovedBy,
        ApprovedAt,
        SubmittedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum InventoryCheckItems {
        Table,
        Id,
        InventoryCheckId,
        ProductId,
        BatchLotId,
        BatchNumber,
        ManufacturingDate,
        ExpiryDate,
        SystemQuantity,
        ActualQuantity,
        Difference,
        Status,
        DiscrepancyReason,
        CostPrice,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}
