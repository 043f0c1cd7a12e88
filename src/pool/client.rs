//! Pools API client
//!
//! [`PoolsApi`] is the seam the resource lifecycle talks to; [`PoolsClient`]
//! implements it over Azure Resource Manager.

use super::id::PoolId;
use super::model::Pool;
use crate::azure::client::ArmClient;
use crate::azure::error::{ApiError, Result};
use crate::azure::lro::{self, LroKind};
use async_trait::async_trait;

/// API version of `Microsoft.DevOpsInfrastructure/pools` this crate speaks
pub const API_VERSION: &str = "2024-10-19";

/// Result of a GET. A 2xx with an empty body has no model.
#[derive(Debug, Clone, Default)]
pub struct GetResponse {
    pub model: Option<Pool>,
}

/// Operations on pools used by the resource lifecycle
#[async_trait]
pub trait PoolsApi: Send + Sync {
    /// Fetch a pool. A missing pool is `ApiError::NotFound`.
    async fn get(&self, id: &PoolId) -> Result<GetResponse>;

    /// PUT the pool and block until the operation is terminal
    async fn create_or_update_then_poll(&self, id: &PoolId, pool: &Pool) -> Result<()>;

    /// PUT the pool and return once the request is accepted
    async fn create_or_update(&self, id: &PoolId, pool: &Pool) -> Result<()>;

    /// DELETE the pool and block until the operation is terminal
    async fn delete_then_poll(&self, id: &PoolId) -> Result<()>;
}

/// ARM-backed pools client
#[derive(Clone)]
pub struct PoolsClient {
    client: ArmClient,
}

impl PoolsClient {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }

    pub fn subscription_id(&self) -> &str {
        &self.client.subscription_id
    }

    fn url(&self, id: &PoolId) -> String {
        self.client.resource_url(&id.path(), API_VERSION)
    }

    fn body(pool: &Pool) -> Result<serde_json::Value> {
        serde_json::to_value(pool).map_err(|source| ApiError::Decode {
            context: "pool payload",
            source,
        })
    }
}

#[async_trait]
impl PoolsApi for PoolsClient {
    async fn get(&self, id: &PoolId) -> Result<GetResponse> {
        let response = self.client.get(&self.url(id)).await?;
        let model = match response.json()? {
            None => None,
            Some(value) => Some(serde_json::from_value(value).map_err(|source| {
                ApiError::Decode {
                    context: "pool",
                    source,
                }
            })?),
        };
        Ok(GetResponse { model })
    }

    async fn create_or_update_then_poll(&self, id: &PoolId, pool: &Pool) -> Result<()> {
        let url = self.url(id);
        let initial = self.client.put(&url, &Self::body(pool)?).await?;
        tracing::info!("PUT {} accepted with {}", id, initial.status);
        lro::wait_for_completion(&self.client, &initial, &url, LroKind::Put).await
    }

    async fn create_or_update(&self, id: &PoolId, pool: &Pool) -> Result<()> {
        let initial = self.client.put(&self.url(id), &Self::body(pool)?).await?;
        tracing::info!("PUT {} accepted with {}", id, initial.status);
        Ok(())
    }

    async fn delete_then_poll(&self, id: &PoolId) -> Result<()> {
        let url = self.url(id);
        let initial = match self.client.delete(&url).await {
            Ok(r) => r,
            Err(ApiError::NotFound { .. }) => {
                tracing::info!("{} was already gone", id);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        tracing::info!("DELETE {} accepted with {}", id, initial.status);
        lro::wait_for_completion(&self.client, &initial, &url, LroKind::Delete).await
    }
}
