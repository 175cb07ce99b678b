use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_order_sheets_table::Migration),
            Box::new(m20240601_000002_create_sub_words_table::Migration),
            Box::new(m20240601_000003_create_listings_tables::Migration),
        ]
    }
}

mod m20240601_000001_create_order_sheets_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_order_sheets_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderSheets::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderSheets::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(OrderSheets::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderSheets::IdempotencyKey)
                                .string()
                                .null()
                                .unique_key(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderItems::SheetId).integer().not_null())
                        .col(ColumnDef::new(OrderItems::ItemId).big_integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_sheet_id")
                                .from(OrderItems::Table, OrderItems::SheetId)
                                .to(OrderSheets::Table, OrderSheets::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_sheet_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::SheetId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderSheets::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderSheets {
        Table,
        Id,
        CreatedAt,
        IdempotencyKey,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        SheetId,
        ItemId,
        CreatedAt,
    }
}

mod m20240601_000002_create_sub_words_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_sub_words_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SubWords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SubWords::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(SubWords::Start).string().not_null())
                        .col(ColumnDef::new(SubWords::End).string().not_null())
                        .col(
                            ColumnDef::new(SubWords::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SubWords::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SubWords {
        Table,
        Id,
        Start,
        End,
        CreatedAt,
    }
}

mod m20240601_000003_create_listings_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_listings_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Listings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Listings::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Listings::Title).string().not_null())
                        .col(ColumnDef::new(Listings::Description).text().not_null())
                        .col(ColumnDef::new(Listings::Price).big_integer().not_null())
                        .col(
                            ColumnDef::new(Listings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ListingImages::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ListingImages::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ListingImages::ListingId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ListingImages::Url).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_listing_images_listing_id")
                                .from(ListingImages::Table, ListingImages::ListingId)
                                .to(Listings::Table, Listings::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ListingImages::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Listings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Listings {
        Table,
        Id,
        Title,
        Description,
        Price,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ListingImages {
        Table,
        Id,
        ListingId,
        Url,
    }
}
