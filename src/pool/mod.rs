//! Remote model for Managed DevOps Pools
//!
//! - [`id`] - Resource identity (parse/format/validate)
//! - [`model`] - Typed request/response tree
//! - [`client`] - The [`PoolsApi`] seam and its ARM implementation

pub mod client;
pub mod id;
pub mod model;

pub use client::{GetResponse, PoolsApi, PoolsClient, API_VERSION};
pub use id::{validate_pool_id, ParseIdError, PoolId};
pub use model::Pool;
