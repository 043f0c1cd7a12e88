//! Host surrogate
//!
//! The pieces of a plugin host the pool lifecycle needs: a resource-data
//! handle persisted as a state file, schema-checked decoding of the raw
//! configuration, removal and import signals, and per-operation timeouts.

use super::error::{DecodeError, PoolError, Result, SchemaViolation};
use super::lifecycle::Resource;
use super::mapper::FlattenedPool;
use super::model::PoolConfig;
use super::schema::{self, TimeoutsDef};
use crate::pool::{PoolId, PoolsApi};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetError {
    #[error("`{0}` is not an attribute of this resource")]
    UnknownAttribute(String),

    #[error(transparent)]
    Encode(#[from] serde_json::Error),
}

/// Tracked state of one resource instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Set when a Read found the remote resource missing
    #[serde(default)]
    pub gone: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResourceData {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Write a top-level attribute. Only arguments declared in the schema
    /// are accepted.
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
    ) -> std::result::Result<(), SetError> {
        if !schema::schema().arguments.contains_key(key) {
            return Err(SetError::UnknownAttribute(key.to_string()));
        }
        let value = serde_json::to_value(value)?;
        self.attributes.insert(key.to_string(), value);
        Ok(())
    }

    /// Load a state file. A missing file is an empty state.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading state file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing state file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("writing state file {}", path.display()))?;
        Ok(())
    }
}

/// Check raw configuration against the schema, then decode it
pub fn decode_config(config: &Value) -> std::result::Result<PoolConfig, DecodeError> {
    schema::validate(config).map_err(DecodeError::Schema)?;
    Ok(serde_json::from_value(config.clone())?)
}

/// Everything a lifecycle handler gets to work with
pub struct ResourceMetaData<'a> {
    pub client: &'a dyn PoolsApi,
    pub subscription_id: String,
    pub resource_data: &'a mut ResourceData,
    config: Option<Value>,
}

impl<'a> ResourceMetaData<'a> {
    pub fn new(
        client: &'a dyn PoolsApi,
        subscription_id: impl Into<String>,
        resource_data: &'a mut ResourceData,
        config: Option<Value>,
    ) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
            resource_data,
            config,
        }
    }

    /// Decode the configuration supplied for `operation`
    pub fn decode(&self, operation: Operation) -> Result<PoolConfig> {
        let decoded = match &self.config {
            Some(config) => decode_config(config),
            None => Err(DecodeError::Schema(vec![SchemaViolation {
                path: "<root>".to_string(),
                message: "no configuration supplied".to_string(),
            }])),
        };
        decoded.map_err(|source| PoolError::Decoding {
            operation: operation.as_str(),
            id: self.current_id(),
            source,
        })
    }

    pub fn set_id(&mut self, id: &PoolId) {
        self.resource_data.id = Some(id.to_string());
        self.resource_data.gone = false;
    }

    /// Parse the tracked identity
    pub fn pool_id(&self) -> Result<PoolId> {
        let raw = self.resource_data.id.as_deref().ok_or(PoolError::MissingId)?;
        Ok(PoolId::parse(raw)?)
    }

    /// The remote resource no longer exists; drop it from state
    pub fn mark_as_gone(&mut self) {
        self.resource_data.id = None;
        self.resource_data.attributes.clear();
        self.resource_data.gone = true;
    }

    pub fn resource_requires_import(&self, resource_type: &str, id: &PoolId) -> PoolError {
        PoolError::AlreadyExists {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }
    }

    pub fn set<T: Serialize + ?Sized>(&mut self, field: &str, value: &T) -> Result<()> {
        self.resource_data
            .set(field, value)
            .map_err(|e| self.setting_error(field, e))
    }

    /// Write what the service returned to state. Parts it left out keep
    /// their current value.
    pub fn encode(&mut self, flat: &FlattenedPool) -> Result<()> {
        self.set("name", &flat.name)?;
        self.set("location", &flat.location)?;
        self.set("tags", &flat.tags)?;
        self.set("identity", &flat.identity)?;
        if let Some(resource_type) = &flat.resource_type {
            self.set("type", resource_type)?;
        }
        if let Some(concurrency) = flat.maximum_concurrency {
            self.set("maximum_concurrency", &concurrency)?;
        }
        if let Some(project) = &flat.dev_center_project_id {
            self.set("dev_center_project_id", project)?;
        }
        if let Some(agent) = &flat.agent_profile {
            self.set("agent_profile", agent)?;
        }
        if let Some(fabric) = &flat.fabric_profile {
            self.set("fabric_profile", fabric)?;
        }
        if let Some(organization) = &flat.organization_profile {
            self.set("organization_profile", organization)?;
        }
        Ok(())
    }

    fn current_id(&self) -> String {
        self.resource_data
            .id
            .clone()
            .unwrap_or_else(|| "<new resource>".to_string())
    }

    fn setting_error(&self, field: &str, reason: impl ToString) -> PoolError {
        PoolError::Setting {
            id: self.current_id(),
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    pub fn timeout(&self, timeouts: &TimeoutsDef) -> Duration {
        match self {
            Operation::Create => timeouts.create(),
            Operation::Read => timeouts.read(),
            Operation::Update => timeouts.update(),
            Operation::Delete => timeouts.delete(),
        }
    }
}

/// Run one lifecycle operation within its declared time budget
pub async fn run_operation(
    resource: &dyn Resource,
    operation: Operation,
    metadata: &mut ResourceMetaData<'_>,
) -> Result<()> {
    let after = operation.timeout(&resource.timeouts());
    tracing::debug!(
        "Running {} of {} with a budget of {}s",
        operation.as_str(),
        resource.resource_type(),
        after.as_secs()
    );

    let work = async {
        match operation {
            Operation::Create => resource.create(metadata).await,
            Operation::Read => resource.read(metadata).await,
            Operation::Update => resource.update(metadata).await,
            Operation::Delete => resource.delete(metadata).await,
        }
    };

    let outcome = tokio::time::timeout(after, work).await;
    match outcome {
        Ok(result) => {
            if result.is_ok() {
                metadata.resource_data.updated_at = Some(Utc::now());
            }
            result
        }
        Err(_) => {
            tracing::error!("{} of {} timed out", operation.as_str(), resource.resource_type());
            Err(PoolError::Timeout {
                operation: operation.as_str(),
                resource: metadata
                    .resource_data
                    .id
                    .clone()
                    .unwrap_or_else(|| resource.resource_type().to_string()),
                after,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_rejects_unknown_attribute() {
        let mut data = ResourceData::default();
        assert!(data.set("location", "westeurope").is_ok());
        assert_eq!(data.get("location"), Some(&json!("westeurope")));
        assert!(matches!(
            data.set("colour", "blue"),
            Err(SetError::UnknownAttribute(key)) if key == "colour"
        ));
    }

    #[test]
    fn test_state_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        assert_eq!(ResourceData::load(&path).unwrap(), ResourceData::default());

        let mut data = ResourceData {
            id: Some("/subscriptions/s/resourceGroups/p/providers/Microsoft.DevOpsInfrastructure/pools/p".to_string()),
            ..Default::default()
        };
        data.set("tags", &json!({"env": "test"})).unwrap();
        data.save(&path).unwrap();

        assert_eq!(ResourceData::load(&path).unwrap(), data);
    }

    #[test]
    fn test_corrupt_state_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = ResourceData::load(&path).unwrap_err();
        assert!(err.to_string().contains("parsing state file"));
    }

    #[test]
    fn test_operation_timeouts_come_from_schema() {
        let timeouts = schema::schema().timeouts;
        assert_eq!(Operation::Read.timeout(&timeouts), Duration::from_secs(300));
        assert_eq!(Operation::Delete.timeout(&timeouts), Duration::from_secs(1800));
    }
}
