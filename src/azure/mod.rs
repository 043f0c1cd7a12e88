//! Azure Resource Manager interaction module
//!
//! This module provides the transport underneath the pools API client:
//! authentication, the HTTP wrapper, and long-running operation polling.
//!
//! # Module Structure
//!
//! - [`auth`] - Bearer tokens (static or service principal) and subscription discovery
//! - [`client`] - Main ARM client combining credentials and HTTP
//! - [`http`] - HTTP utilities for REST API calls
//! - [`lro`] - Polling of long-running PUT/DELETE operations
//!
//! # Example
//!
//! ```ignore
//! use mdpool::azure::{auth::AzureCredentials, client::ArmClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let credentials = AzureCredentials::from_token("...");
//!     let client = ArmClient::new(credentials, "00000000-0000-0000-0000-000000000000")?;
//!     let response = client.get(&client.resource_url("/subscriptions/...", "2024-10-19")).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod lro;

pub use error::ApiError;
