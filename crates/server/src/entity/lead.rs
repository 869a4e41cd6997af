//! A contact whose email address is to be verified.
//!
//! `email_is_valid` stays empty until the first verification lands, after
//! which it holds the provider's reachability tag (`yes`, `no`, `unknown`).

use sea_orm::entity::prelude::*;
use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, ToSchema)]
#[sea_orm(table_name = "lead")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub email: String,
    pub list_id: String,
    #[schema(value_type = Object)]
    pub lead_data: Json,
    pub email_verified: bool,
    pub email_is_valid: String,
    #[schema(value_type = Option<Object>)]
    pub verification_result: Option<Json>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
