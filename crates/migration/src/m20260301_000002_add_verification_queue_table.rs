use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Pending verification work. `lead_id` is deliberately not unique: enqueueing
/// the same list twice produces two entries per lead.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VerificationQueue::Table)
                    .if_not_exists()
                    .col(string(VerificationQueue::Id).primary_key())
                    .col(string(VerificationQueue::Email))
                    .col(string(VerificationQueue::LeadId))
                    .col(string(VerificationQueue::ListId))
                    .index(
                        Index::create()
                            .name("idx_verification_queue_list_id")
                            .col(VerificationQueue::ListId),
                    )
                    .index(
                        Index::create()
                            .name("idx_verification_queue_lead_id")
                            .col(VerificationQueue::LeadId),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VerificationQueue::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum VerificationQueue {
    Table,
    Id,
    Email,
    LeadId,
    ListId,
}
