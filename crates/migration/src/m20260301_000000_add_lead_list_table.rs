use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LeadList::Table)
                    .if_not_exists()
                    .col(string(LeadList::Id).primary_key())
                    .col(string(LeadList::Name))
                    .col(
                        timestamp_with_time_zone(LeadList::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LeadList::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum LeadList {
    Table,
    Id,
    Name,
    CreatedAt,
}
