//! Pending verification work, one row per (enqueue, lead) pair.
//!
//! `email` is copied from the lead at enqueue time and is what gets verified,
//! even if the lead's address changes before the entry is drained.

use sea_orm::entity::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, ToSchema)]
#[sea_orm(table_name = "verification_queue")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub email: String,
    pub lead_id: String,
    pub list_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Queue rows are referred to as entries throughout the crate.
pub type QueueEntry = Model;
