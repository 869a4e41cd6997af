//! Lead list endpoints.
//!
//! - `/` - List and create lead lists
//! - `/{id}` - Fetch or delete a list
//! - `/{id}/leads` - Leads of a list, batch import
//! - `/{id}/leads/count*` - Per-list counters

use crate::AppResources;
use crate::api::CountResponse;
use crate::entity::{lead, lead_list};
use crate::error::ApiError;
use crate::store::{self, NewLead, ValidityFilter};
use axum::{Extension, Json, extract::Path, http::StatusCode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const LISTS_TAG: &str = "Lists API";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateList {
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImportLeads {
    pub leads: Vec<NewLead>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportResponse {
    pub inserted: u64,
}

pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(all_lists, create_list))
        .routes(routes!(get_list, delete_list))
        .routes(routes!(list_leads))
        .routes(routes!(import_leads))
        .routes(routes!(count_leads))
        .routes(routes!(count_verified))
        .routes(routes!(count_valid))
        .routes(routes!(count_invalid))
        .routes(routes!(count_unknown))
}

/// Fails with 404 unless the list exists.
pub(crate) async fn require_list(
    resources: &AppResources,
    id: &str,
) -> Result<lead_list::Model, ApiError> {
    store::lists::get_list(resources.db.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("list {id} not found")))
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "",
    tag = LISTS_TAG,
    operation_id = "List Lead Lists",
    responses((status = 200, description = "All lead lists, oldest first", body = Vec<lead_list::Model>))
)]
async fn all_lists(
    Extension(resources): Extension<AppResources>,
) -> Result<Json<Vec<lead_list::Model>>, ApiError> {
    Ok(Json(store::lists::all_lists(resources.db.as_ref()).await?))
}

#[tracing::instrument(skip(resources, payload))]
#[utoipa::path(
    post,
    path = "",
    tag = LISTS_TAG,
    operation_id = "Create Lead List",
    request_body = CreateList,
    responses(
        (status = 201, description = "List created", body = lead_list::Model),
        (status = 400, description = "Empty list name")
    )
)]
async fn create_list(
    Extension(resources): Extension<AppResources>,
    Json(payload): Json<CreateList>,
) -> Result<(StatusCode, Json<lead_list::Model>), ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("list name must not be empty".into()));
    }
    let list = store::lists::create_list(resources.db.as_ref(), name).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/{id}",
    tag = LISTS_TAG,
    operation_id = "Get Lead List",
    params(("id" = String, Path, description = "List id")),
    responses(
        (status = 200, description = "The list", body = lead_list::Model),
        (status = 404, description = "No such list")
    )
)]
async fn get_list(
    Extension(resources): Extension<AppResources>,
    Path(id): Path<String>,
) -> Result<Json<lead_list::Model>, ApiError> {
    Ok(Json(require_list(&resources, &id).await?))
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = LISTS_TAG,
    operation_id = "Delete Lead List",
    description = "Deletes the list record only. Its leads and any queued entries are left untouched.",
    params(("id" = String, Path, description = "List id")),
    responses(
        (status = 204, description = "List deleted"),
        (status = 404, description = "No such list")
    )
)]
async fn delete_list(
    Extension(resources): Extension<AppResources>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if store::lists::delete_list(resources.db.as_ref(), &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("list {id} not found")))
    }
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/{id}/leads",
    tag = LISTS_TAG,
    operation_id = "List Leads Of List",
    params(("id" = String, Path, description = "List id")),
    responses((status = 200, description = "Leads belonging to the list", body = Vec<lead::Model>))
)]
async fn list_leads(
    Extension(resources): Extension<AppResources>,
    Path(id): Path<String>,
) -> Result<Json<Vec<lead::Model>>, ApiError> {
    Ok(Json(
        store::leads::list_leads(resources.db.as_ref(), Some(&id)).await?,
    ))
}

#[tracing::instrument(skip(resources, payload), fields(count = payload.leads.len()))]
#[utoipa::path(
    post,
    path = "/{id}/leads/batch",
    tag = LISTS_TAG,
    operation_id = "Import Leads",
    summary = "Insert many leads into a list",
    params(("id" = String, Path, description = "List id")),
    request_body = ImportLeads,
    responses(
        (status = 201, description = "Leads inserted", body = ImportResponse),
        (status = 400, description = "A lead has no email"),
        (status = 404, description = "No such list")
    )
)]
async fn import_leads(
    Extension(resources): Extension<AppResources>,
    Path(id): Path<String>,
    Json(payload): Json<ImportLeads>,
) -> Result<(StatusCode, Json<ImportResponse>), ApiError> {
    require_list(&resources, &id).await?;
    if payload.leads.iter().any(|l| l.email.trim().is_empty()) {
        return Err(ApiError::BadRequest("every lead needs an email".into()));
    }
    let inserted = store::leads::import_leads(resources.db.as_ref(), &id, payload.leads).await?;
    Ok((StatusCode::CREATED, Json(ImportResponse { inserted })))
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/{id}/leads/count",
    tag = LISTS_TAG,
    operation_id = "Count Leads",
    params(("id" = String, Path, description = "List id")),
    responses((status = 200, body = CountResponse))
)]
async fn count_leads(
    Extension(resources): Extension<AppResources>,
    Path(id): Path<String>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = store::leads::count_leads(resources.db.as_ref(), &id).await?;
    Ok(Json(CountResponse { count }))
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/{id}/leads/count/email_verified",
    tag = LISTS_TAG,
    operation_id = "Count Verified Leads",
    params(("id" = String, Path, description = "List id")),
    responses((status = 200, body = CountResponse))
)]
async fn count_verified(
    Extension(resources): Extension<AppResources>,
    Path(id): Path<String>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = store::leads::count_verified(resources.db.as_ref(), &id).await?;
    Ok(Json(CountResponse { count }))
}

async fn count_with(
    resources: &AppResources,
    id: &str,
    filter: ValidityFilter,
) -> Result<Json<CountResponse>, ApiError> {
    let count = store::leads::count_by_validity(resources.db.as_ref(), id, filter).await?;
    Ok(Json(CountResponse { count }))
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/{id}/leads/count/valid_emails",
    tag = LISTS_TAG,
    operation_id = "Count Valid Emails",
    params(("id" = String, Path, description = "List id")),
    responses((status = 200, description = "Leads verified as `yes`", body = CountResponse))
)]
async fn count_valid(
    Extension(resources): Extension<AppResources>,
    Path(id): Path<String>,
) -> Result<Json<CountResponse>, ApiError> {
    count_with(&resources, &id, ValidityFilter::Valid).await
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/{id}/leads/count/invalid_emails",
    tag = LISTS_TAG,
    operation_id = "Count Invalid Emails",
    params(("id" = String, Path, description = "List id")),
    responses((status = 200, description = "Leads verified as `no`", body = CountResponse))
)]
async fn count_invalid(
    Extension(resources): Extension<AppResources>,
    Path(id): Path<String>,
) -> Result<Json<CountResponse>, ApiError> {
    count_with(&resources, &id, ValidityFilter::Invalid).await
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/{id}/leads/count/unknown_emails",
    tag = LISTS_TAG,
    operation_id = "Count Unknown Emails",
    params(("id" = String, Path, description = "List id")),
    responses((status = 200, description = "Leads verified as `unknown`", body = CountResponse))
)]
async fn count_unknown(
    Extension(resources): Extension<AppResources>,
    Path(id): Path<String>,
) -> Result<Json<CountResponse>, ApiError> {
    count_with(&resources, &id, ValidityFilter::Unknown).await
}
