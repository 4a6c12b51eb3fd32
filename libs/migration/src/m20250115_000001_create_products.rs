use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

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
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string_len(Products::ProductCode, 50).unique_key())
                    .col(string_len(Products::Name, 100))
                    .col(string_len(Products::Category, 50))
                    .col(decimal_len(Products::Price, 12, 2))
                    .col(integer(Products::Quantity).default(0))
                    .col(text_null(Products::Description))
                    .col(string_len_null(Products::ImagePath, 255))
                    .col(
                        timestamp_with_time_zone(Products::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                ALTER TABLE products
                    ADD CONSTRAINT products_price_non_negative CHECK (price >= 0),
                    ADD CONSTRAINT products_quantity_non_negative CHECK (quantity >= 0)
                "#,
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_category")
                    .table(Products::Table)
                    .col(Products::Category)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_created_at")
                    .table(Products::Table)
                    .col(Products::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Low-stock lookups scan by quantity.
        manager
            .create_index(
                Index::create()
                    .name("idx_products_quantity")
                    .table(Products::Table)
                    .col(Products::Quantity)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Products::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    ProductCode,
    Name,
    Category,
    Price,
    Quantity,
    Description,
    ImagePath,
    CreatedAt,
}
