//! HTTP API.
//!
//! - `health` - Health check endpoint (/healthz)
//! - `lists` - Lead lists and their leads (/api/lists/*)
//! - `leads` - Individual leads and global counts (/api/leads/*, /api/count_all)
//! - `queue` - Enqueue, queue status and drain trigger
//! - `openapi` - OpenAPI/Utoipa configuration

pub mod health;
pub mod leads;
pub mod lists;
pub mod openapi;
pub mod queue;

pub use health::MISC_TAG;
pub use leads::LEADS_TAG;
pub use lists::LISTS_TAG;
pub use queue::QUEUE_TAG;

use crate::AppResources;
use axum::Router;
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{OpenApi, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

/// Body of every counting endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct CountResponse {
    pub count: u64,
}

/// Builds the full application router, including the API docs.
pub fn router(app_resources: AppResources) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .nest("/api/lists", lists::router())
        .nest("/api/leads", leads::router())
        .merge(queue::router())
        .routes(routes!(leads::count_all))
        .routes(routes!(health::health))
        .layer(axum::Extension(app_resources))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    router.merge(Redoc::with_url("/api-docs", api))
}

/// Starts the web server with all configured routes.
#[tracing::instrument(skip(app_resources))]
pub async fn start_webserver(app_resources: AppResources) -> color_eyre::Result<()> {
    let addr = app_resources.config.listen_addr.clone();
    let router = router(app_resources);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server running");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
