//! Plain CRUD over leads and lists.
//!
//! Nothing here enforces cross-table consistency: deleting a list leaves its
//! leads and queue entries in place.

pub mod leads;
pub mod lists;

pub use leads::{NewLead, ValidityFilter};
