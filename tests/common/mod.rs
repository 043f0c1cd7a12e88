//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use mdpool::azure::error::{ApiError, Result};
use mdpool::pool::model::PoolProperties;
use mdpool::pool::{GetResponse, Pool, PoolId, PoolsApi};
use mdpool::resource::{run_operation, Operation, PoolError, PoolResource, ResourceData, ResourceMetaData};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const SUBSCRIPTION: &str = "11111111-2222-3333-4444-555555555555";

/// In-memory pools service
#[derive(Default)]
pub struct FakePools {
    pub pools: Mutex<HashMap<String, Pool>>,
    pub calls: Mutex<Vec<String>>,
    /// Fail every GET with this status
    pub get_status: Mutex<Option<u16>>,
    /// Fail every PUT and DELETE with this status
    pub write_status: Mutex<Option<u16>>,
    /// Answer GETs of existing pools without a body
    pub empty_model: AtomicBool,
    /// Never answer GETs
    pub hang: AtomicBool,
}

impl FakePools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: &PoolId, pool: Pool) {
        self.pools.lock().unwrap().insert(id.to_string(), pool);
    }

    pub fn stored(&self, id: &PoolId) -> Option<Pool> {
        self.pools.lock().unwrap().get(&id.to_string()).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn failure(status: u16) -> ApiError {
        ApiError::Status {
            status,
            code: Some("InternalError".to_string()),
            message: "the fake was told to fail".to_string(),
        }
    }

    fn store(&self, id: &PoolId, pool: &Pool) -> Result<()> {
        if let Some(status) = *self.write_status.lock().unwrap() {
            return Err(Self::failure(status));
        }
        let mut stored = pool.clone();
        stored.id = Some(id.to_string());
        stored.name = Some(id.pool_name.clone());
        stored.resource_type = Some("Microsoft.DevOpsInfrastructure/pools".to_string());
        let properties = stored.properties.get_or_insert_with(PoolProperties::default);
        properties.provisioning_state = Some("Succeeded".to_string());
        self.insert(id, stored);
        Ok(())
    }
}

#[async_trait]
impl PoolsApi for FakePools {
    async fn get(&self, id: &PoolId) -> Result<GetResponse> {
        self.record("get");
        if self.hang.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
        }
        if let Some(status) = *self.get_status.lock().unwrap() {
            return Err(Self::failure(status));
        }
        match self.stored(id) {
            None => Err(ApiError::NotFound {
                url: id.path(),
            }),
            Some(_) if self.empty_model.load(Ordering::SeqCst) => Ok(GetResponse { model: None }),
            Some(pool) => Ok(GetResponse { model: Some(pool) }),
        }
    }

    async fn create_or_update_then_poll(&self, id: &PoolId, pool: &Pool) -> Result<()> {
        self.record("put_then_poll");
        self.store(id, pool)
    }

    async fn create_or_update(&self, id: &PoolId, pool: &Pool) -> Result<()> {
        self.record("put");
        self.store(id, pool)
    }

    async fn delete_then_poll(&self, id: &PoolId) -> Result<()> {
        self.record("delete_then_poll");
        if let Some(status) = *self.write_status.lock().unwrap() {
            return Err(Self::failure(status));
        }
        match self.pools.lock().unwrap().remove(&id.to_string()) {
            Some(_) => Ok(()),
            None => Err(ApiError::NotFound {
                url: id.path(),
            }),
        }
    }
}

/// The pool1 configuration
pub fn pool1_config() -> Value {
    json!({
        "name": "pool1",
        "location": "West Europe",
        "dev_center_project_id": "/subscriptions/11111111-2222-3333-4444-555555555555/resourceGroups/rg/providers/Microsoft.DevCenter/projects/proj",
        "maximum_concurrency": 1,
        "tags": {"env": "test"},
        "agent_profile": {"kind": "Stateless"},
        "fabric_profile": {
            "kind": "Vmss",
            "sku": {"name": "Standard_D2"},
            "image": [{"well_known_image_name": "ubuntu-22.04/latest", "buffer": "*"}]
        },
        "organization_profile": {
            "kind": "AzureDevOps",
            "organizations": [{"url": "https://dev.azure.com/org", "parallelism": 1}]
        }
    })
}

pub fn pool_id(name: &str) -> PoolId {
    PoolId::for_name(SUBSCRIPTION, name)
}

pub fn pool1_id() -> PoolId {
    pool_id("pool1")
}

pub async fn run(
    api: &FakePools,
    operation: Operation,
    data: &mut ResourceData,
    config: Option<Value>,
) -> std::result::Result<(), PoolError> {
    let mut metadata = ResourceMetaData::new(api, SUBSCRIPTION, data, config);
    run_operation(&PoolResource, operation, &mut metadata).await
}
