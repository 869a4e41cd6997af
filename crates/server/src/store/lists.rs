use crate::entity::lead_list;
use sea_orm::{ActiveValue::Set, DatabaseConnection, DbErr, EntityTrait, QueryOrder};
use time::OffsetDateTime;

#[tracing::instrument(skip(db))]
pub async fn create_list(db: &DatabaseConnection, name: &str) -> Result<lead_list::Model, DbErr> {
    let model = lead_list::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        name: Set(name.to_string()),
        created_at: Set(OffsetDateTime::now_utc()),
    };
    lead_list::Entity::insert(model)
        .exec_with_returning(db)
        .await
}

#[tracing::instrument(skip(db))]
pub async fn get_list(
    db: &DatabaseConnection,
    id: &str,
) -> Result<Option<lead_list::Model>, DbErr> {
    lead_list::Entity::find_by_id(id.to_string()).one(db).await
}

#[tracing::instrument(skip(db))]
pub async fn all_lists(db: &DatabaseConnection) -> Result<Vec<lead_list::Model>, DbErr> {
    lead_list::Entity::find()
        .order_by_asc(lead_list::Column::CreatedAt)
        .all(db)
        .await
}

/// Returns whether a row was removed.
#[tracing::instrument(skip(db))]
pub async fn delete_list(db: &DatabaseConnection, id: &str) -> Result<bool, DbErr> {
    let res = lead_list::Entity::delete_by_id(id.to_string())
        .exec(db)
        .await?;
    Ok(res.rows_affected > 0)
}
