//! Verification queue endpoints.

use crate::AppResources;
use crate::api::CountResponse;
use crate::api::lists::require_list;
use crate::error::ApiError;
use axum::{Extension, Json, extract::Path, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const QUEUE_TAG: &str = "Queue API";

#[derive(Debug, Serialize, ToSchema)]
pub struct EnqueueResponse {
    pub enqueued: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueueStatus {
    pub in_queue: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RemoveResponse {
    pub removed: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DrainStarted {
    pub drain_id: u64,
}

pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(enqueue_list, list_queue_status, remove_list))
        .routes(routes!(pending_count))
        .routes(routes!(process_queue))
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    post,
    path = "/api/lists/{id}/queue",
    tag = QUEUE_TAG,
    operation_id = "Enqueue List",
    description = "Queues every lead of the list for verification. Already verified or already \
                   queued leads are queued again.",
    params(("id" = String, Path, description = "List id")),
    responses(
        (status = 201, description = "Entries created", body = EnqueueResponse),
        (status = 404, description = "No such list")
    )
)]
async fn enqueue_list(
    Extension(resources): Extension<AppResources>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<EnqueueResponse>), ApiError> {
    require_list(&resources, &id).await?;
    let enqueued = resources.queue_manager().enqueue(&id).await?;
    Ok((StatusCode::CREATED, Json(EnqueueResponse { enqueued })))
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/api/lists/{id}/queue",
    tag = QUEUE_TAG,
    operation_id = "List Queue Status",
    params(("id" = String, Path, description = "List id")),
    responses((status = 200, description = "Whether any entry of the list is pending", body = QueueStatus))
)]
async fn list_queue_status(
    Extension(resources): Extension<AppResources>,
    Path(id): Path<String>,
) -> Result<Json<QueueStatus>, ApiError> {
    let in_queue = resources.queue_manager().is_list_queued(&id).await?;
    Ok(Json(QueueStatus { in_queue }))
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    delete,
    path = "/api/lists/{id}/queue",
    tag = QUEUE_TAG,
    operation_id = "Remove List From Queue",
    params(("id" = String, Path, description = "List id")),
    responses((status = 200, description = "Pending entries of the list removed", body = RemoveResponse))
)]
async fn remove_list(
    Extension(resources): Extension<AppResources>,
    Path(id): Path<String>,
) -> Result<Json<RemoveResponse>, ApiError> {
    let removed = resources.queue_manager().remove_list_from_queue(&id).await?;
    Ok(Json(RemoveResponse { removed }))
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    get,
    path = "/api/queue/count",
    tag = QUEUE_TAG,
    operation_id = "Pending Count",
    responses((status = 200, body = CountResponse))
)]
async fn pending_count(
    Extension(resources): Extension<AppResources>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = resources.queue_manager().pending_count().await?;
    Ok(Json(CountResponse { count }))
}

#[tracing::instrument(skip(resources))]
#[utoipa::path(
    post,
    path = "/api/queue/process",
    tag = QUEUE_TAG,
    operation_id = "Process Queue",
    summary = "Start draining the verification queue",
    description = "Starts a background drain over the entries pending right now and returns \
                   immediately. Results show up on the leads as they complete.",
    responses((status = 202, description = "Drain started", body = DrainStarted))
)]
async fn process_queue(
    Extension(resources): Extension<AppResources>,
) -> (StatusCode, Json<DrainStarted>) {
    let drain_id = resources.drains.spawn_drain(resources.dispatcher()).await;
    (StatusCode::ACCEPTED, Json(DrainStarted { drain_id }))
}
