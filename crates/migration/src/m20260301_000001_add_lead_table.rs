use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Leads intentionally carry no foreign key to `lead_list`: a list may be
/// deleted while its leads are kept around.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Lead::Table)
                    .if_not_exists()
                    .col(string(Lead::Id).primary_key())
                    .col(string(Lead::Email))
                    .col(string(Lead::ListId))
                    .col(json_binary(Lead::LeadData))
                    .col(boolean(Lead::EmailVerified).default(false))
                    .col(string(Lead::EmailIsValid).default(""))
                    .col(json_binary_null(Lead::VerificationResult))
                    .col(
                        timestamp_with_time_zone(Lead::CreatedAt)
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_lead_list_id")
                    .table(Lead::Table)
                    .col(Lead::ListId)
                    .to_owned(),
            )
            .await?;

        // Serves the per-list validity counters
        manager
            .create_index(
                Index::create()
                    .name("idx_lead_list_id_email_is_valid")
                    .table(Lead::Table)
                    .col(Lead::ListId)
                    .col(Lead::EmailIsValid)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_lead_list_id_email_is_valid")
                    .table(Lead::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_lead_list_id")
                    .table(Lead::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Lead::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Lead {
    Table,
    Id,
    Email,
    ListId,
    LeadData,
    EmailVerified,
    EmailIsValid,
    VerificationResult,
    CreatedAt,
}
