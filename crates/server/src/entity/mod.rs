//! SeaORM entities for the three persisted collections.

pub mod lead;
pub mod lead_list;
pub mod verification_queue;
