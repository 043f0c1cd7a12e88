//! Configuration tree
//!
//! The user-facing shape of a pool, field for field as declared in the
//! schema. `Option` marks blocks and attributes that may be absent; an absent
//! block stays absent through mapping, a present-but-empty one stays present.

use crate::pool::model::string_enum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

string_enum! {
    AgentProfileKind {
        Stateless => "Stateless",
        Stateful => "Stateful",
    }
}

string_enum! {
    FabricProfileKind {
        Vmss => "Vmss",
    }
}

string_enum! {
    OrganizationProfileKind {
        AzureDevOps => "AzureDevOps",
        GitHub => "GitHub",
    }
}

/// Root of the configuration tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub name: String,
    pub location: String,
    pub dev_center_project_id: String,
    pub maximum_concurrency: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityConfig>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Computed: the ARM resource type
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    pub agent_profile: AgentProfileConfig,
    pub fabric_profile: FabricProfileConfig,
    pub organization_profile: OrganizationProfileConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(rename = "type")]
    pub identity_type: String,
    #[serde(default)]
    pub identity_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentProfileConfig {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period_time_span: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_agent_lifetime: Option<String>,
    /// Computed: JSON text of the service's current predictions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_predictions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_predictions_profile: Option<PredictionsProfileConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionsProfileConfig {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_preference: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FabricProfileConfig {
    pub kind: String,
    #[serde(default)]
    pub image: Vec<ImageConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_profile: Option<NetworkProfileConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_profile: Option<OsProfileConfig>,
    pub sku: SkuConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_profile: Option<StorageProfileConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub well_known_image_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkProfileConfig {
    pub subnet_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsProfileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logon_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets_management_settings: Option<SecretsManagementSettingsConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretsManagementSettingsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_store_location: Option<String>,
    #[serde(default)]
    pub key_exportable: bool,
    #[serde(default)]
    pub observed_certificates: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkuConfig {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageProfileConfig {
    /// Required in configuration; the service may omit it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_disk_storage_account_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_disks: Option<Vec<DataDiskConfig>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataDiskConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_letter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_account_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationProfileConfig {
    pub kind: String,
    pub organizations: Vec<OrganizationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_profile: Option<PermissionProfileConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repositories: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionProfileConfig {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
}
