use crate::entity::lead;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Select,
};
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Rows per `INSERT` during batch import; eight bind parameters each.
pub const IMPORT_CHUNK_SIZE: usize = 500;

/// A lead as submitted for import.
#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct NewLead {
    pub email: String,
    /// Arbitrary attributes carried along with the lead.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub lead_data: Option<Value>,
}

impl NewLead {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            lead_data: None,
        }
    }

    fn into_active_model(self, list_id: &str, now: OffsetDateTime) -> lead::ActiveModel {
        lead::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            email: Set(self.email),
            list_id: Set(list_id.to_string()),
            lead_data: Set(self.lead_data.unwrap_or_else(|| Value::Object(Default::default()))),
            email_verified: Set(false),
            email_is_valid: Set(String::new()),
            verification_result: Set(None),
            created_at: Set(now),
        }
    }
}

/// Verification verdict filter used by the counting endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidityFilter {
    Valid,
    Invalid,
    Unknown,
}

impl ValidityFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidityFilter::Valid => "yes",
            ValidityFilter::Invalid => "no",
            ValidityFilter::Unknown => "unknown",
        }
    }
}

#[tracing::instrument(skip(db, lead), fields(email_len = lead.email.len()))]
pub async fn create_lead(
    db: &DatabaseConnection,
    list_id: &str,
    lead: NewLead,
) -> Result<lead::Model, DbErr> {
    lead::Entity::insert(lead.into_active_model(list_id, OffsetDateTime::now_utc()))
        .exec_with_returning(db)
        .await
}

/// Inserts all leads for `list_id` in batches of [`IMPORT_CHUNK_SIZE`].
/// Returns the row count. A failing batch leaves earlier batches in place.
#[tracing::instrument(skip(db, leads), fields(count = leads.len()))]
pub async fn import_leads(
    db: &DatabaseConnection,
    list_id: &str,
    leads: Vec<NewLead>,
) -> Result<u64, DbErr> {
    if leads.is_empty() {
        return Ok(0);
    }
    let now = OffsetDateTime::now_utc();
    let models: Vec<lead::ActiveModel> = leads
        .into_iter()
        .map(|l| l.into_active_model(list_id, now))
        .collect();

    let mut inserted = 0;
    for chunk in models.chunks(IMPORT_CHUNK_SIZE) {
        inserted += lead::Entity::insert_many(chunk.iter().cloned())
            .exec_without_returning(db)
            .await?;
    }
    Ok(inserted)
}

#[tracing::instrument(skip(db))]
pub async fn get_lead(db: &DatabaseConnection, id: &str) -> Result<Option<lead::Model>, DbErr> {
    lead::Entity::find_by_id(id.to_string()).one(db).await
}

/// All leads, or only the leads of one list.
#[tracing::instrument(skip(db))]
pub async fn list_leads(
    db: &DatabaseConnection,
    list_id: Option<&str>,
) -> Result<Vec<lead::Model>, DbErr> {
    let mut query = lead::Entity::find().order_by_asc(lead::Column::CreatedAt);
    if let Some(list_id) = list_id {
        query = query.filter(lead::Column::ListId.eq(list_id));
    }
    query.all(db).await
}

/// Returns whether a row was removed.
#[tracing::instrument(skip(db))]
pub async fn delete_lead(db: &DatabaseConnection, id: &str) -> Result<bool, DbErr> {
    let res = lead::Entity::delete_by_id(id.to_string()).exec(db).await?;
    Ok(res.rows_affected > 0)
}

/// Points a lead at a new address. The queue keeps whatever address it
/// captured at enqueue time.
#[tracing::instrument(skip(db, email))]
pub async fn update_lead_email(
    db: &DatabaseConnection,
    id: &str,
    email: &str,
) -> Result<Option<lead::Model>, DbErr> {
    let Some(existing) = get_lead(db, id).await? else {
        return Ok(None);
    };
    let mut active: lead::ActiveModel = existing.into();
    active.email = Set(email.to_string());
    Ok(Some(active.update(db).await?))
}

fn by_list(list_id: &str) -> Select<lead::Entity> {
    lead::Entity::find().filter(lead::Column::ListId.eq(list_id))
}

#[tracing::instrument(skip(db))]
pub async fn count_leads(db: &DatabaseConnection, list_id: &str) -> Result<u64, DbErr> {
    by_list(list_id).count(db).await
}

#[tracing::instrument(skip(db))]
pub async fn count_verified(db: &DatabaseConnection, list_id: &str) -> Result<u64, DbErr> {
    by_list(list_id)
        .filter(lead::Column::EmailVerified.eq(true))
        .count(db)
        .await
}

#[tracing::instrument(skip(db))]
pub async fn count_by_validity(
    db: &DatabaseConnection,
    list_id: &str,
    validity: ValidityFilter,
) -> Result<u64, DbErr> {
    by_list(list_id)
        .filter(lead::Column::EmailIsValid.eq(validity.as_str()))
        .count(db)
        .await
}

/// Counts leads across every list. An empty `email_is_valid` counts all leads.
#[tracing::instrument(skip(db))]
pub async fn count_all(db: &DatabaseConnection, email_is_valid: &str) -> Result<u64, DbErr> {
    let mut query = lead::Entity::find();
    if !email_is_valid.is_empty() {
        query = query.filter(lead::Column::EmailIsValid.eq(email_is_valid));
    }
    query.count(db).await
}
