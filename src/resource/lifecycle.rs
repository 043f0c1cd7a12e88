//! Create / Read / Update / Delete for `azurerm_mdp_pool`

use super::error::{PoolError, Result, RetrievalFailure};
use super::host::{Operation, ResourceMetaData};
use super::mapper::{expand_pool, flatten_present, normalize_location};
use super::schema::{self, TimeoutsDef};
use crate::azure::ApiError;
use crate::pool::model::ProvisioningState;
use crate::pool::{validate_pool_id, Pool, PoolId};
use async_trait::async_trait;

/// A resource the host can drive through its lifecycle
#[async_trait]
pub trait Resource: Send + Sync {
    fn resource_type(&self) -> &'static str;

    fn timeouts(&self) -> TimeoutsDef;

    /// Problems with a user-supplied import ID, empty when valid
    fn validate_id(&self, value: &str, key: &str) -> Vec<String>;

    async fn create(&self, metadata: &mut ResourceMetaData<'_>) -> Result<()>;

    async fn read(&self, metadata: &mut ResourceMetaData<'_>) -> Result<()>;

    async fn update(&self, metadata: &mut ResourceMetaData<'_>) -> Result<()>;

    async fn delete(&self, metadata: &mut ResourceMetaData<'_>) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PoolResource;

fn retrieval_error(id: &PoolId, source: ApiError) -> PoolError {
    let source = if source.is_not_found() {
        RetrievalFailure::Missing
    } else {
        RetrievalFailure::Api(source)
    };
    PoolError::Retrieval {
        id: id.to_string(),
        source,
    }
}

#[async_trait]
impl Resource for PoolResource {
    fn resource_type(&self) -> &'static str {
        schema::resource_type()
    }

    fn timeouts(&self) -> TimeoutsDef {
        schema::schema().timeouts
    }

    fn validate_id(&self, value: &str, key: &str) -> Vec<String> {
        validate_pool_id(value, key)
    }

    async fn create(&self, metadata: &mut ResourceMetaData<'_>) -> Result<()> {
        let config = metadata.decode(Operation::Create)?;
        let id = PoolId::for_name(metadata.subscription_id.clone(), &config.name);

        match metadata.client.get(&id).await {
            Ok(_) => return Err(metadata.resource_requires_import(self.resource_type(), &id)),
            Err(e) if e.is_not_found() => {}
            Err(source) => {
                return Err(PoolError::Lookup {
                    id: id.to_string(),
                    source,
                })
            }
        }

        let mut payload = Pool::default();
        expand_pool(&config, &mut payload).map_err(|source| PoolError::Mapping {
            id: id.to_string(),
            source,
        })?;

        tracing::info!("Creating {}", id);
        metadata
            .client
            .create_or_update_then_poll(&id, &payload)
            .await
            .map_err(|source| PoolError::Create {
                id: id.to_string(),
                source,
            })?;

        metadata.set_id(&id);
        tracing::info!("Created {}", id);
        Ok(())
    }

    async fn read(&self, metadata: &mut ResourceMetaData<'_>) -> Result<()> {
        let id = metadata.pool_id()?;

        let response = match metadata.client.get(&id).await {
            Ok(r) => r,
            Err(e) if e.is_not_found() => {
                tracing::warn!("{} was not found, removing from state", id);
                metadata.mark_as_gone();
                return Ok(());
            }
            Err(source) => return Err(retrieval_error(&id, source)),
        };

        let Some(model) = response.model else {
            tracing::debug!("GET {} returned no model, leaving state as is", id);
            return Ok(());
        };

        match model.properties.as_ref() {
            None => tracing::warn!("GET {} returned no properties, keeping their state", id),
            Some(props) => {
                if props.state() == Some(ProvisioningState::Failed) {
                    tracing::warn!("{} is in provisioning state Failed", id);
                }
            }
        }

        let flat = flatten_present(&id.pool_name, &model).map_err(|source| PoolError::Mapping {
            id: id.to_string(),
            source,
        })?;
        metadata.encode(&flat)
    }

    async fn update(&self, metadata: &mut ResourceMetaData<'_>) -> Result<()> {
        let id = metadata.pool_id()?;
        let config = metadata.decode(Operation::Update)?;

        if config.name != id.pool_name {
            return Err(PoolError::RequiresReplacement {
                id: id.to_string(),
                field: "name",
            });
        }

        let existing = metadata
            .client
            .get(&id)
            .await
            .map_err(|source| retrieval_error(&id, source))?;

        let mut pool = existing.model.ok_or_else(|| PoolError::Retrieval {
            id: id.to_string(),
            source: RetrievalFailure::MissingModel,
        })?;
        if pool.properties.is_none() {
            return Err(PoolError::Retrieval {
                id: id.to_string(),
                source: RetrievalFailure::MissingProperties,
            });
        }

        if normalize_location(&config.location) != normalize_location(&pool.location) {
            return Err(PoolError::RequiresReplacement {
                id: id.to_string(),
                field: "location",
            });
        }

        expand_pool(&config, &mut pool).map_err(|source| PoolError::Mapping {
            id: id.to_string(),
            source,
        })?;

        tracing::info!("Updating {}", id);
        metadata
            .client
            .create_or_update(&id, &pool)
            .await
            .map_err(|source| PoolError::Update {
                id: id.to_string(),
                source,
            })?;
        Ok(())
    }

    async fn delete(&self, metadata: &mut ResourceMetaData<'_>) -> Result<()> {
        let id = metadata.pool_id()?;

        tracing::info!("Deleting {}", id);
        match metadata.client.delete_then_poll(&id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::info!("{} was already gone", id);
            }
            Err(source) => {
                return Err(PoolError::Delete {
                    id: id.to_string(),
                    source,
                })
            }
        }
        tracing::info!("Deleted {}", id);
        Ok(())
    }
}
