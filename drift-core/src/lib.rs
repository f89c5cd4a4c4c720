//! Drift Core
//!
//! Provider-agnostic resource model shared by Drift providers: attribute
//! values, desired and observed state, attribute schemas and the provider trait.

pub mod differ;
pub mod provider;
pub mod resource;
pub mod schema;
