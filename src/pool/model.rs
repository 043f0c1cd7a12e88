//! Wire model for `Microsoft.DevOpsInfrastructure/pools` (API version 2024-10-19)
//!
//! Every `kind`-tagged object in the API is an internally tagged enum here, so
//! a payload can only ever carry one variant of each profile.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Returned when a string does not name a variant of one of the API enums
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{value:?} is not a valid {type_name}, expected one of: {}", .allowed.join(", "))]
pub struct UnknownVariant {
    pub type_name: &'static str,
    pub value: String,
    pub allowed: &'static [&'static str],
}

/// Declares a closed string enum with its wire spelling, `possible_values()`,
/// `FromStr` (case-sensitive) and `Display`.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            const VALUES: &'static [&'static str] = &[$($wire),+];

            pub fn possible_values() -> &'static [&'static str] {
                Self::VALUES
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::pool::model::UnknownVariant;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err($crate::pool::model::UnknownVariant {
                        type_name: stringify!($name),
                        value: other.to_string(),
                        allowed: Self::VALUES,
                    }),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use string_enum;

string_enum! {
    /// Logon type for agents on Windows images
    LogonType {
        Service => "Service",
        Interactive => "Interactive",
    }
}

string_enum! {
    CachingType {
        None => "None",
        ReadOnly => "ReadOnly",
        ReadWrite => "ReadWrite",
    }
}

string_enum! {
    /// Storage account type of a data disk
    StorageAccountType {
        StandardLrs => "Standard_LRS",
        PremiumLrs => "Premium_LRS",
        StandardSsdLrs => "StandardSSD_LRS",
        PremiumZrs => "Premium_ZRS",
        StandardSsdZrs => "StandardSSD_ZRS",
    }
}

string_enum! {
    OsDiskStorageAccountType {
        Standard => "Standard",
        Premium => "Premium",
        StandardSsd => "StandardSSD",
    }
}

string_enum! {
    /// How aggressively automatic standby agents trade cost for performance
    PredictionPreference {
        Balanced => "Balanced",
        MostCostEffective => "MostCostEffective",
        MoreCostEffective => "MoreCostEffective",
        MorePerformance => "MorePerformance",
        BestPerformance => "BestPerformance",
    }
}

string_enum! {
    AzureDevOpsPermissionType {
        Inherit => "Inherit",
        CreatorOnly => "CreatorOnly",
        SpecificAccounts => "SpecificAccounts",
    }
}

string_enum! {
    ResourcePredictionsProfileType {
        Automatic => "Automatic",
        Manual => "Manual",
    }
}

string_enum! {
    ManagedServiceIdentityType {
        None => "None",
        SystemAssigned => "SystemAssigned",
        UserAssigned => "UserAssigned",
        SystemAndUserAssigned => "SystemAssigned, UserAssigned",
    }
}

string_enum! {
    ProvisioningState {
        Succeeded => "Succeeded",
        Failed => "Failed",
        Canceled => "Canceled",
        Provisioning => "Provisioning",
        Updating => "Updating",
        Deleting => "Deleting",
        Accepted => "Accepted",
    }
}

impl ProvisioningState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

/// Top-level pool resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<ManagedServiceIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<PoolProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedServiceIdentity {
    #[serde(rename = "type")]
    pub identity_type: ManagedServiceIdentityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_assigned_identities: Option<BTreeMap<String, UserAssignedIdentity>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAssignedIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Pool properties. Fields this crate does not model are kept in `additional`
/// so that a read-modify-write cycle sends them back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub maximum_concurrency: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_profile: Option<OrganizationProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_profile: Option<AgentProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fabric_profile: Option<FabricProfile>,
    #[serde(default)]
    pub dev_center_project_resource_id: String,
    #[serde(flatten)]
    pub additional: BTreeMap<String, Value>,
}

impl PoolProperties {
    /// Typed provisioning state, `None` when absent or not a known value
    pub fn state(&self) -> Option<ProvisioningState> {
        self.provisioning_state.as_deref()?.parse().ok()
    }
}

// =========================================================================
// Agent profile
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AgentProfile {
    Stateful(StatefulAgentProfile),
    Stateless(StatelessAgentProfile),
}

impl AgentProfile {
    pub fn kind(&self) -> &'static str {
        match self {
            AgentProfile::Stateful(_) => "Stateful",
            AgentProfile::Stateless(_) => "Stateless",
        }
    }

    pub fn resource_predictions(&self) -> Option<&Value> {
        match self {
            AgentProfile::Stateful(p) => p.resource_predictions.as_ref(),
            AgentProfile::Stateless(p) => p.resource_predictions.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatefulAgentProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_agent_lifetime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period_time_span: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_predictions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_predictions_profile: Option<ResourcePredictionsProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatelessAgentProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_predictions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_predictions_profile: Option<ResourcePredictionsProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ResourcePredictionsProfile {
    Automatic(AutomaticResourcePredictionsProfile),
    Manual(ManualResourcePredictionsProfile),
}

impl ResourcePredictionsProfile {
    pub fn kind(&self) -> ResourcePredictionsProfileType {
        match self {
            ResourcePredictionsProfile::Automatic(_) => ResourcePredictionsProfileType::Automatic,
            ResourcePredictionsProfile::Manual(_) => ResourcePredictionsProfileType::Manual,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomaticResourcePredictionsProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_preference: Option<PredictionPreference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualResourcePredictionsProfile {}

// =========================================================================
// Fabric profile
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FabricProfile {
    Vmss(VmssFabricProfile),
}

impl FabricProfile {
    pub fn kind(&self) -> &'static str {
        match self {
            FabricProfile::Vmss(_) => "Vmss",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmssFabricProfile {
    pub sku: DevOpsAzureSku,
    #[serde(default)]
    pub images: Vec<PoolImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_profile: Option<OsProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_profile: Option<StorageProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_profile: Option<NetworkProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DevOpsAzureSku {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub well_known_image_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets_management_settings: Option<SecretsManagementSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logon_type: Option<LogonType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretsManagementSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_store_location: Option<String>,
    #[serde(default)]
    pub observed_certificates: Vec<String>,
    #[serde(default)]
    pub key_exportable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_disk_storage_account_type: Option<OsDiskStorageAccountType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_disks: Option<Vec<DataDisk>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDisk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching: Option<CachingType>,
    #[serde(default, rename = "diskSizeGiB", skip_serializing_if = "Option::is_none")]
    pub disk_size_gib: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_account_type: Option<StorageAccountType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_letter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    pub subnet_id: String,
}

// =========================================================================
// Organization profile
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum OrganizationProfile {
    AzureDevOps(AzureDevOpsOrganizationProfile),
    GitHub(GitHubOrganizationProfile),
}

impl OrganizationProfile {
    pub fn kind(&self) -> &'static str {
        match self {
            OrganizationProfile::AzureDevOps(_) => "AzureDevOps",
            OrganizationProfile::GitHub(_) => "GitHub",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureDevOpsOrganizationProfile {
    pub organizations: Vec<Organization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_profile: Option<AzureDevOpsPermissionProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureDevOpsPermissionProfile {
    pub kind: AzureDevOpsPermissionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubOrganizationProfile {
    pub organizations: Vec<GitHubOrganization>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubOrganization {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repositories: Option<Vec<String>>,
}
