use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table("import_jobs")
                    .if_not_exists()
                    .col(
                        ColumnDef::new("id")
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new("job_key").string().not_null())
                    .col(ColumnDef::new("payload").text().not_null())
                    .col(
                        ColumnDef::new("deliveries")
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new("visible_at").big_integer().not_null())
                    .col(ColumnDef::new("created_at").big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Receivers scan for the oldest visible message
        manager
            .create_index(
                Index::create()
                    .name("idx_import_jobs_visible_at")
                    .table("import_jobs")
                    .col("visible_at")
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_import_jobs_visible_at")
                    .table("import_jobs")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table("import_jobs").to_owned())
            .await?;

        Ok(())
    }
}
