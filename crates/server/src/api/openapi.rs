//! OpenAPI/Utoipa configuration.

use crate::api::{LEADS_TAG, LISTS_TAG, MISC_TAG, QUEUE_TAG};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lead Verifier API",
        version = "1.0.0",
        description = "Manage lead lists and queue their email addresses for deliverability verification."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = LISTS_TAG, description = "Lead list endpoints"),
        (name = LEADS_TAG, description = "Lead endpoints"),
        (name = QUEUE_TAG, description = "Verification queue endpoints")
    )
)]
pub struct ApiDoc;
