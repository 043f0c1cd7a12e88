//! mdpool - manage Azure Managed DevOps Pools declaratively
//!
//! - [`resource`] - Schema, configuration tree, mapping and the CRUD lifecycle
//! - [`pool`] - Pools wire model, resource identity and API client
//! - [`azure`] - Resource Manager transport (auth, HTTP, long-running operations)
//! - [`config`] - Persistent user settings

pub mod azure;
pub mod config;
pub mod pool;
pub mod resource;
