//! Lead endpoints.

use crate::AppResources;
use crate::api::CountResponse;
use crate::api::lists::require_list;
use crate::entity::lead;
use crate::error::ApiError;
use crate::store::{self, NewLead};
use axum::{
    Extension, Json,
    extract::{Path, Query},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const LEADS_TAG: &str = "Leads API";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLead {
    pub list_id: String,
    pub email: String,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub lead_data: Option<Value>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CountAllParams {
    /// Verdict to count (`yes`, `no`, `unknown`); empty or absent counts all.
    #[serde(default)]
    pub email_is_valid: String,
}

pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(all_leads, create_lead))
        .routes(routes!(get_lead, delete_lead))
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "",
    tag = LEADS_TAG,
    operation_id = "List Leads",
    responses((status = 200, description = "Every lead", body = Vec<lead::Model>))
)]
async fn all_leads(
    Extension(resources): Extension<AppResources>,
) -> Result<Json<Vec<lead::Model>>, ApiError> {
    Ok(Json(store::leads::list_leads(resources.db.as_ref(), None).await?))
}

#[tracing::instrument(skip(resources, payload), fields(list_id = %payload.list_id))]
#[utoipa::path(
    post,
    path = "",
    tag = LEADS_TAG,
    operation_id = "Create Lead",
    request_body = CreateLead,
    responses(
        (status = 201, description = "Lead created", body = lead::Model),
        (status = 400, description = "Missing email"),
        (status = 404, description = "No such list")
    )
)]
async fn create_lead(
    Extension(resources): Extension<AppResources>,
    Json(payload): Json<CreateLead>,
) -> Result<(StatusCode, Json<lead::Model>), ApiError> {
    if payload.email.trim().is_empty() {
        return Err(ApiError::BadRequest("email must not be empty".into()));
    }
    require_list(&resources, &payload.list_id).await?;
    let new = NewLead {
        email: payload.email,
        lead_data: payload.lead_data,
    };
    let lead = store::leads::create_lead(resources.db.as_ref(), &payload.list_id, new).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/{id}",
    tag = LEADS_TAG,
    operation_id = "Get Lead",
    params(("id" = String, Path, description = "Lead id")),
    responses(
        (status = 200, description = "The lead, including its last verification result", body = lead::Model),
        (status = 404, description = "No such lead")
    )
)]
async fn get_lead(
    Extension(resources): Extension<AppResources>,
    Path(id): Path<String>,
) -> Result<Json<lead::Model>, ApiError> {
    store::leads::get_lead(resources.db.as_ref(), &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("lead {id} not found")))
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = LEADS_TAG,
    operation_id = "Delete Lead",
    params(("id" = String, Path, description = "Lead id")),
    responses(
        (status = 204, description = "Lead deleted"),
        (status = 404, description = "No such lead")
    )
)]
async fn delete_lead(
    Extension(resources): Extension<AppResources>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if store::leads::delete_lead(resources.db.as_ref(), &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("lead {id} not found")))
    }
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/api/count_all",
    tag = LEADS_TAG,
    operation_id = "Count All Leads",
    params(CountAllParams),
    responses((status = 200, body = CountResponse))
)]
pub async fn count_all(
    Extension(resources): Extension<AppResources>,
    Query(params): Query<CountAllParams>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = store::leads::count_all(resources.db.as_ref(), &params.email_is_valid).await?;
    Ok(Json(CountResponse { count }))
}
