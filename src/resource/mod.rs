//! Resource layer for `azurerm_mdp_pool`
//!
//! The pool resource is driven by a declared schema and a pair of pure mapping
//! functions, wired into a fixed CRUD lifecycle.
//!
//! # Architecture
//!
//! - [`schema`] - Loads the embedded schema and validates configuration
//! - [`model`] - The configuration tree
//! - [`mapper`] - Expand (configuration to API model) and flatten (back)
//! - [`lifecycle`] - The four handlers, behind the [`Resource`] trait
//! - [`host`] - Resource data, decoding, state file and timeouts
//!
//! # Example
//!
//! ```ignore
//! use mdpool::resource::{run_operation, Operation, PoolResource, ResourceData, ResourceMetaData};
//!
//! async fn create(client: &mdpool::pool::PoolsClient, config: serde_json::Value) -> mdpool::resource::Result<()> {
//!     let mut data = ResourceData::default();
//!     let mut metadata = ResourceMetaData::new(client, client.subscription_id(), &mut data, Some(config));
//!     run_operation(&PoolResource, Operation::Create, &mut metadata).await
//! }
//! ```

pub mod error;
pub mod host;
pub mod lifecycle;
pub mod mapper;
pub mod model;
pub mod schema;

pub use error::{DecodeError, MappingError, PoolError, Result, RetrievalFailure};
pub use host::{decode_config, run_operation, Operation, ResourceData, ResourceMetaData};
pub use lifecycle::{PoolResource, Resource};
pub use mapper::{expand_pool, flatten_pool, flatten_present, FlattenedPool};
pub use model::PoolConfig;
