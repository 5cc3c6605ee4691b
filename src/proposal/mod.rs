//! Proposal module
//!
//! Catalog change proposals and the builders that derive them from table
//! facts.

mod builders;
mod models;

pub use builders::ProposalBuilder;
pub use models::*;
