//! Mapping between the configuration tree and the pools wire model
//!
//! `expand_*` turns configuration into the API model, `flatten_*` goes the
//! other way. Every `kind` string is parsed into a closed enum and matched
//! exhaustively, so a profile can only ever produce one variant. Nothing in
//! here performs I/O.

use super::error::MappingError;
use super::model::{
    AgentProfileConfig, AgentProfileKind, DataDiskConfig, FabricProfileConfig, FabricProfileKind,
    IdentityConfig, ImageConfig, NetworkProfileConfig, OrganizationConfig,
    OrganizationProfileConfig, OrganizationProfileKind, OsProfileConfig, PermissionProfileConfig,
    PoolConfig, PredictionsProfileConfig, SecretsManagementSettingsConfig, SkuConfig,
    StorageProfileConfig,
};
use crate::pool::model::{
    AgentProfile, AutomaticResourcePredictionsProfile, AzureDevOpsOrganizationProfile,
    AzureDevOpsPermissionProfile, DataDisk, DevOpsAzureSku, FabricProfile, GitHubOrganization,
    GitHubOrganizationProfile, ManagedServiceIdentity, ManagedServiceIdentityType,
    ManualResourcePredictionsProfile, NetworkProfile, Organization, OrganizationProfile,
    OsProfile, Pool, PoolImage, PoolProperties, ResourcePredictionsProfile,
    ResourcePredictionsProfileType, SecretsManagementSettings, StatefulAgentProfile,
    StatelessAgentProfile, StorageProfile, UnknownVariant, UserAssignedIdentity,
    VmssFabricProfile,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Canonical Azure location: lower-case with spaces removed
pub fn normalize_location(input: &str) -> String {
    input.replace(' ', "").to_lowercase()
}

fn parse_value<T>(field: &'static str, value: &str) -> Result<T, MappingError>
where
    T: FromStr<Err = UnknownVariant>,
{
    value
        .parse()
        .map_err(|source| MappingError::InvalidValue { field, source })
}

fn parse_optional<T>(field: &'static str, value: Option<&str>) -> Result<Option<T>, MappingError>
where
    T: FromStr<Err = UnknownVariant>,
{
    value.map(|v| parse_value(field, v)).transpose()
}

fn parse_kind<T: FromStr>(field: &'static str, value: &str) -> Result<T, MappingError> {
    value.parse().map_err(|_| MappingError::UnknownKind {
        field,
        value: value.to_string(),
    })
}

fn unsupported(block: &'static str, kind: &'static str, field: &'static str) -> MappingError {
    MappingError::UnsupportedField { block, kind, field }
}

// =========================================================================
// Configuration -> API model
// =========================================================================

/// Overlay the configuration onto `output`. Everything is computed before
/// anything is assigned, so on error `output` is left untouched.
pub fn expand_pool(input: &PoolConfig, output: &mut Pool) -> Result<(), MappingError> {
    let identity = expand_identity(input.identity.as_ref())?;

    let existing_predictions = output
        .properties
        .as_ref()
        .and_then(|p| p.agent_profile.as_ref())
        .and_then(|a| a.resource_predictions())
        .cloned();
    let agent_profile = expand_agent_profile(&input.agent_profile, existing_predictions.as_ref())?;
    let fabric_profile = expand_fabric_profile(&input.fabric_profile)?;
    let organization_profile = expand_organization_profile(&input.organization_profile)?;

    output.identity = identity;
    output.location = normalize_location(&input.location);
    output.tags = Some(input.tags.clone());

    let properties = output.properties.get_or_insert_with(PoolProperties::default);
    properties.maximum_concurrency = input.maximum_concurrency;
    properties.dev_center_project_resource_id = input.dev_center_project_id.clone();
    properties.agent_profile = Some(agent_profile);
    properties.fabric_profile = Some(fabric_profile);
    properties.organization_profile = Some(organization_profile);

    Ok(())
}

pub fn expand_identity(
    input: Option<&IdentityConfig>,
) -> Result<Option<ManagedServiceIdentity>, MappingError> {
    let Some(input) = input else {
        return Ok(None);
    };

    let identity_type: ManagedServiceIdentityType =
        parse_value("identity.type", &input.identity_type)?;

    let user_assigned = match identity_type {
        ManagedServiceIdentityType::None => {
            return Err(MappingError::Identity(
                "type `None` is not supported, omit the identity block instead".to_string(),
            ))
        }
        ManagedServiceIdentityType::SystemAssigned => {
            if !input.identity_ids.is_empty() {
                return Err(MappingError::Identity(
                    "`identity_ids` can only be specified when `type` includes `UserAssigned`"
                        .to_string(),
                ));
            }
            None
        }
        ManagedServiceIdentityType::UserAssigned
        | ManagedServiceIdentityType::SystemAndUserAssigned => {
            if input.identity_ids.is_empty() {
                return Err(MappingError::Identity(
                    "`identity_ids` must be specified when `type` includes `UserAssigned`"
                        .to_string(),
                ));
            }
            Some(
                input
                    .identity_ids
                    .iter()
                    .map(|id| (id.clone(), UserAssignedIdentity::default()))
                    .collect(),
            )
        }
    };

    Ok(Some(ManagedServiceIdentity {
        identity_type,
        principal_id: None,
        tenant_id: None,
        user_assigned_identities: user_assigned,
    }))
}

/// `existing_predictions` is what the service last reported; it is kept when
/// the configuration carries no value of its own.
pub fn expand_agent_profile(
    input: &AgentProfileConfig,
    existing_predictions: Option<&Value>,
) -> Result<AgentProfile, MappingError> {
    let kind: AgentProfileKind = parse_kind("agent_profile.kind", &input.kind)?;

    let resource_predictions = match &input.resource_predictions {
        Some(text) => Some(serde_json::from_str(text).map_err(|e| MappingError::InvalidJson {
            field: "agent_profile.resource_predictions",
            reason: e.to_string(),
        })?),
        None => existing_predictions.cloned(),
    };
    let resource_predictions_profile = input
        .resource_predictions_profile
        .as_ref()
        .map(expand_predictions_profile)
        .transpose()?;

    match kind {
        AgentProfileKind::Stateful => Ok(AgentProfile::Stateful(StatefulAgentProfile {
            max_agent_lifetime: input.max_agent_lifetime.clone(),
            grace_period_time_span: input.grace_period_time_span.clone(),
            resource_predictions,
            resource_predictions_profile,
        })),
        AgentProfileKind::Stateless => {
            if input.grace_period_time_span.is_some() {
                return Err(unsupported("agent_profile", "Stateless", "grace_period_time_span"));
            }
            if input.max_agent_lifetime.is_some() {
                return Err(unsupported("agent_profile", "Stateless", "max_agent_lifetime"));
            }
            Ok(AgentProfile::Stateless(StatelessAgentProfile {
                resource_predictions,
                resource_predictions_profile,
            }))
        }
    }
}

fn expand_predictions_profile(
    input: &PredictionsProfileConfig,
) -> Result<ResourcePredictionsProfile, MappingError> {
    let kind: ResourcePredictionsProfileType =
        parse_kind("agent_profile.resource_predictions_profile.kind", &input.kind)?;

    match kind {
        ResourcePredictionsProfileType::Automatic => {
            let prediction_preference = input
                .prediction_preference
                .as_deref()
                .map(|p| {
                    parse_value(
                        "agent_profile.resource_predictions_profile.prediction_preference",
                        p,
                    )
                })
                .transpose()?;
            Ok(ResourcePredictionsProfile::Automatic(
                AutomaticResourcePredictionsProfile {
                    prediction_preference,
                },
            ))
        }
        ResourcePredictionsProfileType::Manual => {
            if input.prediction_preference.is_some() {
                return Err(unsupported(
                    "resource_predictions_profile",
                    "Manual",
                    "prediction_preference",
                ));
            }
            Ok(ResourcePredictionsProfile::Manual(
                ManualResourcePredictionsProfile {},
            ))
        }
    }
}

pub fn expand_fabric_profile(input: &FabricProfileConfig) -> Result<FabricProfile, MappingError> {
    let kind: FabricProfileKind = parse_kind("fabric_profile.kind", &input.kind)?;

    match kind {
        FabricProfileKind::Vmss => Ok(FabricProfile::Vmss(VmssFabricProfile {
            sku: DevOpsAzureSku {
                name: input.sku.name.clone(),
            },
            images: input.image.iter().map(expand_image).collect(),
            os_profile: input.os_profile.as_ref().map(expand_os_profile).transpose()?,
            storage_profile: input
                .storage_profile
                .as_ref()
                .map(expand_storage_profile)
                .transpose()?,
            network_profile: input.network_profile.as_ref().map(|n| NetworkProfile {
                subnet_id: n.subnet_id.clone(),
            }),
        })),
    }
}

fn expand_image(input: &ImageConfig) -> PoolImage {
    PoolImage {
        resource_id: input.resource_id.clone(),
        well_known_image_name: input.well_known_image_name.clone(),
        aliases: input.aliases.clone(),
        buffer: input.buffer.clone(),
    }
}

fn expand_os_profile(input: &OsProfileConfig) -> Result<OsProfile, MappingError> {
    Ok(OsProfile {
        logon_type: parse_optional(
            "fabric_profile.os_profile.logon_type",
            input.logon_type.as_deref(),
        )?,
        secrets_management_settings: input.secrets_management_settings.as_ref().map(|s| {
            SecretsManagementSettings {
                certificate_store_location: s.certificate_store_location.clone(),
                observed_certificates: s.observed_certificates.clone(),
                key_exportable: s.key_exportable,
            }
        }),
    })
}

fn expand_storage_profile(input: &StorageProfileConfig) -> Result<StorageProfile, MappingError> {
    let data_disks = match &input.data_disks {
        None => None,
        Some(disks) => Some(
            disks
                .iter()
                .map(expand_data_disk)
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };

    Ok(StorageProfile {
        os_disk_storage_account_type: parse_optional(
            "fabric_profile.storage_profile.os_disk_storage_account_type",
            input.os_disk_storage_account_type.as_deref(),
        )?,
        data_disks,
    })
}

fn expand_data_disk(input: &DataDiskConfig) -> Result<DataDisk, MappingError> {
    Ok(DataDisk {
        caching: parse_optional(
            "fabric_profile.storage_profile.data_disks.caching",
            input.caching.as_deref(),
        )?,
        disk_size_gib: input.disk_size,
        storage_account_type: parse_optional(
            "fabric_profile.storage_profile.data_disks.storage_account_type",
            input.storage_account_type.as_deref(),
        )?,
        drive_letter: input.drive_letter.clone(),
    })
}

pub fn expand_organization_profile(
    input: &OrganizationProfileConfig,
) -> Result<OrganizationProfile, MappingError> {
    let kind: OrganizationProfileKind = parse_kind("organization_profile.kind", &input.kind)?;

    match kind {
        OrganizationProfileKind::AzureDevOps => {
            let organizations = input
                .organizations
                .iter()
                .map(|org| {
                    if org.repositories.is_some() {
                        return Err(unsupported("organization_profile", "AzureDevOps", "repositories"));
                    }
                    Ok(Organization {
                        url: org.url.clone(),
                        projects: org.projects.clone(),
                        parallelism: org.parallelism,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let permission_profile = input
                .permission_profile
                .as_ref()
                .map(|p| -> Result<_, MappingError> {
                    Ok(AzureDevOpsPermissionProfile {
                        kind: parse_value("organization_profile.permission_profile.kind", &p.kind)?,
                        users: p.users.clone(),
                        groups: p.groups.clone(),
                    })
                })
                .transpose()?;

            Ok(OrganizationProfile::AzureDevOps(
                AzureDevOpsOrganizationProfile {
                    organizations,
                    permission_profile,
                },
            ))
        }
        OrganizationProfileKind::GitHub => {
            if input.permission_profile.is_some() {
                return Err(unsupported("organization_profile", "GitHub", "permission_profile"));
            }
            let organizations = input
                .organizations
                .iter()
                .map(|org| {
                    if org.projects.is_some() {
                        return Err(unsupported("organization_profile", "GitHub", "projects"));
                    }
                    if org.parallelism.is_some() {
                        return Err(unsupported("organization_profile", "GitHub", "parallelism"));
                    }
                    Ok(GitHubOrganization {
                        url: org.url.clone(),
                        repositories: org.repositories.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(OrganizationProfile::GitHub(GitHubOrganizationProfile {
                organizations,
            }))
        }
    }
}

// =========================================================================
// API model -> configuration
// =========================================================================

/// What a remote model says about each part of the configuration. Parts the
/// service did not return are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedPool {
    pub name: String,
    pub location: String,
    pub tags: BTreeMap<String, String>,
    pub identity: Option<IdentityConfig>,
    pub resource_type: Option<String>,
    pub maximum_concurrency: Option<i64>,
    pub dev_center_project_id: Option<String>,
    pub agent_profile: Option<AgentProfileConfig>,
    pub fabric_profile: Option<FabricProfileConfig>,
    pub organization_profile: Option<OrganizationProfileConfig>,
}

/// Flatten whatever the remote model carries. Missing substructure is not
/// an error here.
pub fn flatten_present(name: &str, pool: &Pool) -> Result<FlattenedPool, MappingError> {
    let properties = pool.properties.as_ref();

    Ok(FlattenedPool {
        name: name.to_string(),
        location: pool.location.clone(),
        tags: pool.tags.clone().unwrap_or_default(),
        identity: flatten_identity(pool.identity.as_ref()),
        resource_type: pool.resource_type.clone(),
        maximum_concurrency: properties.map(|p| p.maximum_concurrency),
        dev_center_project_id: properties.map(|p| p.dev_center_project_resource_id.clone()),
        agent_profile: properties
            .and_then(|p| p.agent_profile.as_ref())
            .map(flatten_agent_profile)
            .transpose()?,
        fabric_profile: properties
            .and_then(|p| p.fabric_profile.as_ref())
            .map(flatten_fabric_profile),
        organization_profile: properties
            .and_then(|p| p.organization_profile.as_ref())
            .map(flatten_organization_profile),
    })
}

/// Rebuild the full configuration tree, computed values included. Every
/// profile must be present.
pub fn flatten_pool(name: &str, pool: &Pool) -> Result<PoolConfig, MappingError> {
    if pool.properties.is_none() {
        return Err(MappingError::MissingField("properties"));
    }
    let flat = flatten_present(name, pool)?;

    Ok(PoolConfig {
        name: flat.name,
        location: flat.location,
        dev_center_project_id: flat.dev_center_project_id.unwrap_or_default(),
        maximum_concurrency: flat.maximum_concurrency.unwrap_or_default(),
        identity: flat.identity,
        tags: flat.tags,
        resource_type: flat.resource_type,
        agent_profile: flat
            .agent_profile
            .ok_or(MappingError::MissingField("properties.agentProfile"))?,
        fabric_profile: flat
            .fabric_profile
            .ok_or(MappingError::MissingField("properties.fabricProfile"))?,
        organization_profile: flat
            .organization_profile
            .ok_or(MappingError::MissingField("properties.organizationProfile"))?,
    })
}

pub fn flatten_identity(input: Option<&ManagedServiceIdentity>) -> Option<IdentityConfig> {
    let input = input?;
    if input.identity_type == ManagedServiceIdentityType::None {
        return None;
    }
    Some(IdentityConfig {
        identity_type: input.identity_type.to_string(),
        identity_ids: input
            .user_assigned_identities
            .as_ref()
            .map(|ids| ids.keys().cloned().collect())
            .unwrap_or_default(),
        principal_id: input.principal_id.clone(),
        tenant_id: input.tenant_id.clone(),
    })
}

pub fn flatten_agent_profile(input: &AgentProfile) -> Result<AgentProfileConfig, MappingError> {
    let resource_predictions = input
        .resource_predictions()
        .map(|v| {
            serde_json::to_string(v).map_err(|e| MappingError::InvalidJson {
                field: "agent_profile.resource_predictions",
                reason: e.to_string(),
            })
        })
        .transpose()?;

    let config = match input {
        AgentProfile::Stateful(p) => AgentProfileConfig {
            kind: AgentProfileKind::Stateful.to_string(),
            grace_period_time_span: p.grace_period_time_span.clone(),
            max_agent_lifetime: p.max_agent_lifetime.clone(),
            resource_predictions,
            resource_predictions_profile: p
                .resource_predictions_profile
                .as_ref()
                .map(flatten_predictions_profile),
        },
        AgentProfile::Stateless(p) => AgentProfileConfig {
            kind: AgentProfileKind::Stateless.to_string(),
            grace_period_time_span: None,
            max_agent_lifetime: None,
            resource_predictions,
            resource_predictions_profile: p
                .resource_predictions_profile
                .as_ref()
                .map(flatten_predictions_profile),
        },
    };
    Ok(config)
}

fn flatten_predictions_profile(input: &ResourcePredictionsProfile) -> PredictionsProfileConfig {
    match input {
        ResourcePredictionsProfile::Automatic(p) => PredictionsProfileConfig {
            kind: input.kind().to_string(),
            prediction_preference: p.prediction_preference.map(|v| v.to_string()),
        },
        ResourcePredictionsProfile::Manual(_) => PredictionsProfileConfig {
            kind: input.kind().to_string(),
            prediction_preference: None,
        },
    }
}

pub fn flatten_fabric_profile(input: &FabricProfile) -> FabricProfileConfig {
    match input {
        FabricProfile::Vmss(p) => FabricProfileConfig {
            kind: FabricProfileKind::Vmss.to_string(),
            image: p
                .images
                .iter()
                .map(|i| ImageConfig {
                    aliases: i.aliases.clone(),
                    buffer: i.buffer.clone(),
                    resource_id: i.resource_id.clone(),
                    well_known_image_name: i.well_known_image_name.clone(),
                })
                .collect(),
            network_profile: p.network_profile.as_ref().map(|n| NetworkProfileConfig {
                subnet_id: n.subnet_id.clone(),
            }),
            os_profile: p.os_profile.as_ref().map(|o| OsProfileConfig {
                logon_type: o.logon_type.map(|t| t.to_string()),
                secrets_management_settings: o.secrets_management_settings.as_ref().map(|s| {
                    SecretsManagementSettingsConfig {
                        certificate_store_location: s.certificate_store_location.clone(),
                        key_exportable: s.key_exportable,
                        observed_certificates: s.observed_certificates.clone(),
                    }
                }),
            }),
            sku: SkuConfig {
                name: p.sku.name.clone(),
            },
            storage_profile: p.storage_profile.as_ref().map(|s| StorageProfileConfig {
                os_disk_storage_account_type: s.os_disk_storage_account_type.map(|t| t.to_string()),
                data_disks: s.data_disks.as_ref().map(|disks| {
                    disks
                        .iter()
                        .map(|d| DataDiskConfig {
                            caching: d.caching.map(|c| c.to_string()),
                            disk_size: d.disk_size_gib,
                            drive_letter: d.drive_letter.clone(),
                            storage_account_type: d.storage_account_type.map(|t| t.to_string()),
                        })
                        .collect()
                }),
            }),
        },
    }
}

pub fn flatten_organization_profile(input: &OrganizationProfile) -> OrganizationProfileConfig {
    match input {
        OrganizationProfile::AzureDevOps(p) => OrganizationProfileConfig {
            kind: OrganizationProfileKind::AzureDevOps.to_string(),
            organizations: p
                .organizations
                .iter()
                .map(|o| OrganizationConfig {
                    url: o.url.clone(),
                    parallelism: o.parallelism,
                    projects: o.projects.clone(),
                    repositories: None,
                })
                .collect(),
            permission_profile: p.permission_profile.as_ref().map(|pp| PermissionProfileConfig {
                kind: pp.kind.to_string(),
                users: pp.users.clone(),
                groups: pp.groups.clone(),
            }),
        },
        OrganizationProfile::GitHub(p) => OrganizationProfileConfig {
            kind: OrganizationProfileKind::GitHub.to_string(),
            organizations: p
                .organizations
                .iter()
                .map(|o| OrganizationConfig {
                    url: o.url.clone(),
                    parallelism: None,
                    projects: None,
                    repositories: o.repositories.clone(),
                })
                .collect(),
            permission_profile: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::id::PoolId;
    use crate::pool::model::{CachingType, LogonType, PredictionPreference};
    use serde_json::json;

    fn pool1() -> PoolConfig {
        PoolConfig {
            name: "pool1".to_string(),
            location: "West Europe".to_string(),
            dev_center_project_id: "/subscriptions/s/resourceGroups/rg/providers/Microsoft.DevCenter/projects/p"
                .to_string(),
            maximum_concurrency: 2,
            agent_profile: AgentProfileConfig {
                kind: "Stateless".to_string(),
                ..Default::default()
            },
            fabric_profile: FabricProfileConfig {
                kind: "Vmss".to_string(),
                sku: SkuConfig {
                    name: "Standard_D2".to_string(),
                },
                ..Default::default()
            },
            organization_profile: OrganizationProfileConfig {
                kind: "AzureDevOps".to_string(),
                organizations: vec![OrganizationConfig {
                    url: "https://dev.azure.com/org".to_string(),
                    parallelism: Some(1),
                    ..Default::default()
                }],
                permission_profile: None,
            },
            ..Default::default()
        }
    }

    fn expand(config: &PoolConfig) -> Pool {
        let mut pool = Pool::default();
        expand_pool(config, &mut pool).unwrap();
        pool
    }

    #[test]
    fn test_pool1_scenario() {
        let config = pool1();
        let pool = expand(&config);
        let props = pool.properties.as_ref().unwrap();

        assert!(matches!(props.agent_profile, Some(AgentProfile::Stateless(_))));
        match props.fabric_profile.as_ref().unwrap() {
            FabricProfile::Vmss(vmss) => assert_eq!(vmss.sku.name, "Standard_D2"),
        }
        match props.organization_profile.as_ref().unwrap() {
            OrganizationProfile::AzureDevOps(org) => {
                assert_eq!(org.organizations[0].url, "https://dev.azure.com/org");
                assert_eq!(org.organizations[0].parallelism, Some(1));
            }
            other => panic!("unexpected organization profile {:?}", other),
        }
        assert_eq!(pool.location, "westeurope");
        assert_eq!(pool.tags, Some(Default::default()));
        assert_eq!(pool.resource_type, None);

        let id = PoolId::for_name("00000000-0000-0000-0000-000000000000", &config.name);
        assert_eq!(id.resource_group_name, "pool1");
        assert_eq!(id.pool_name, "pool1");
    }

    #[test]
    fn test_expanded_payload_wire_shape() {
        let pool = expand(&pool1());
        let body = serde_json::to_value(&pool).unwrap();
        assert_eq!(body["properties"]["agentProfile"], json!({"kind": "Stateless"}));
        assert_eq!(body["properties"]["fabricProfile"]["kind"], json!("Vmss"));
        assert_eq!(body["properties"]["maximumConcurrency"], json!(2));
        assert!(body.get("type").is_none());
        assert!(body.get("identity").is_none());
    }

    #[test]
    fn test_manual_predictions_profile_is_tagged_manual() {
        let mut config = pool1();
        config.agent_profile.resource_predictions_profile = Some(PredictionsProfileConfig {
            kind: "Manual".to_string(),
            prediction_preference: None,
        });
        let pool = expand(&config);
        let body = serde_json::to_value(&pool).unwrap();
        assert_eq!(
            body["properties"]["agentProfile"]["resourcePredictionsProfile"],
            json!({"kind": "Manual"})
        );
    }

    #[test]
    fn test_automatic_predictions_profile_carries_preference() {
        let profile = expand_predictions_profile(&PredictionsProfileConfig {
            kind: "Automatic".to_string(),
            prediction_preference: Some("BestPerformance".to_string()),
        })
        .unwrap();
        assert_eq!(
            profile,
            ResourcePredictionsProfile::Automatic(AutomaticResourcePredictionsProfile {
                prediction_preference: Some(PredictionPreference::BestPerformance),
            })
        );
    }

    #[test]
    fn test_unknown_fabric_kind_names_the_value() {
        let mut config = pool1();
        config.fabric_profile.kind = "Aks".to_string();
        let mut pool = Pool::default();
        let err = expand_pool(&config, &mut pool).unwrap_err();
        assert_eq!(
            err,
            MappingError::UnknownKind {
                field: "fabric_profile.kind",
                value: "Aks".to_string(),
            }
        );
        assert!(err.to_string().contains("Aks"));
        assert_eq!(pool, Pool::default());
    }

    #[test]
    fn test_kind_is_case_sensitive() {
        let mut config = pool1();
        config.agent_profile.kind = "stateless".to_string();
        let err = expand_pool(&config, &mut Pool::default()).unwrap_err();
        assert!(matches!(err, MappingError::UnknownKind { field: "agent_profile.kind", .. }));
    }

    #[test]
    fn test_stateful_populates_only_stateful() {
        let mut config = pool1();
        config.agent_profile.kind = "Stateful".to_string();
        config.agent_profile.max_agent_lifetime = Some("7.00:00:00".to_string());
        config.agent_profile.grace_period_time_span = Some("00:30:00".to_string());
        let pool = expand(&config);
        match pool.properties.unwrap().agent_profile.unwrap() {
            AgentProfile::Stateful(p) => {
                assert_eq!(p.max_agent_lifetime.as_deref(), Some("7.00:00:00"));
                assert_eq!(p.grace_period_time_span.as_deref(), Some("00:30:00"));
            }
            other => panic!("expected Stateful, got {:?}", other),
        }
    }

    #[test]
    fn test_stateless_rejects_stateful_only_fields() {
        let mut config = pool1();
        config.agent_profile.grace_period_time_span = Some("00:30:00".to_string());
        let err = expand_pool(&config, &mut Pool::default()).unwrap_err();
        assert_eq!(
            err,
            MappingError::UnsupportedField {
                block: "agent_profile",
                kind: "Stateless",
                field: "grace_period_time_span",
            }
        );
    }

    #[test]
    fn test_github_rejects_azure_devops_fields() {
        let mut config = pool1();
        config.organization_profile.kind = "GitHub".to_string();
        let err = expand_pool(&config, &mut Pool::default()).unwrap_err();
        assert!(matches!(
            err,
            MappingError::UnsupportedField { field: "parallelism", .. }
        ));

        config.organization_profile.organizations[0].parallelism = None;
        config.organization_profile.organizations[0].repositories = Some(vec!["app".to_string()]);
        let pool = expand(&config);
        match pool.properties.unwrap().organization_profile.unwrap() {
            OrganizationProfile::GitHub(p) => {
                assert_eq!(p.organizations[0].repositories, Some(vec!["app".to_string()]))
            }
            other => panic!("expected GitHub, got {:?}", other),
        }
    }

    #[test]
    fn test_absent_and_empty_blocks_stay_distinct() {
        let mut config = pool1();
        config.fabric_profile.storage_profile = Some(StorageProfileConfig {
            os_disk_storage_account_type: Some("Premium".to_string()),
            data_disks: Some(vec![]),
        });
        let pool = expand(&config);
        let FabricProfile::Vmss(vmss) = pool.properties.as_ref().unwrap().fabric_profile.clone().unwrap();
        assert_eq!(vmss.os_profile, None);
        assert_eq!(vmss.network_profile, None);
        assert_eq!(vmss.storage_profile.as_ref().unwrap().data_disks, Some(vec![]));

        let back = flatten_pool("pool1", &pool).unwrap();
        assert_eq!(back.fabric_profile.os_profile, None);
        assert_eq!(
            back.fabric_profile.storage_profile.unwrap().data_disks,
            Some(vec![])
        );
    }

    #[test]
    fn test_data_disks_and_os_profile_parse_enums() {
        let mut config = pool1();
        config.fabric_profile.os_profile = Some(OsProfileConfig {
            logon_type: Some("Interactive".to_string()),
            secrets_management_settings: None,
        });
        config.fabric_profile.storage_profile = Some(StorageProfileConfig {
            os_disk_storage_account_type: Some("StandardSSD".to_string()),
            data_disks: Some(vec![DataDiskConfig {
                caching: Some("ReadWrite".to_string()),
                disk_size: Some(128),
                drive_letter: Some("F".to_string()),
                storage_account_type: Some("Premium_ZRS".to_string()),
            }]),
        });
        let pool = expand(&config);
        let FabricProfile::Vmss(vmss) = pool.properties.unwrap().fabric_profile.unwrap();
        assert_eq!(vmss.os_profile.unwrap().logon_type, Some(LogonType::Interactive));
        let disk = &vmss.storage_profile.unwrap().data_disks.unwrap()[0];
        assert_eq!(disk.caching, Some(CachingType::ReadWrite));
        assert_eq!(disk.disk_size_gib, Some(128));

        config.fabric_profile.storage_profile.as_mut().unwrap().data_disks.as_mut().unwrap()[0]
            .caching = Some("Sometimes".to_string());
        let err = expand_pool(&config, &mut Pool::default()).unwrap_err();
        assert!(matches!(
            err,
            MappingError::InvalidValue { field: "fabric_profile.storage_profile.data_disks.caching", .. }
        ));
    }

    #[test]
    fn test_service_omitted_disk_fields_stay_absent() {
        let remote = FabricProfile::Vmss(VmssFabricProfile {
            sku: DevOpsAzureSku {
                name: "Standard_D2".to_string(),
            },
            images: vec![],
            os_profile: None,
            storage_profile: Some(StorageProfile {
                os_disk_storage_account_type: None,
                data_disks: Some(vec![DataDisk::default()]),
            }),
            network_profile: None,
        });

        let flattened = flatten_fabric_profile(&remote);
        let storage = flattened.storage_profile.as_ref().unwrap();
        assert_eq!(storage.os_disk_storage_account_type, None);
        assert_eq!(storage.data_disks, Some(vec![DataDiskConfig::default()]));

        assert_eq!(expand_fabric_profile(&flattened), Ok(remote));
    }

    #[test]
    fn test_identity_rules() {
        assert_eq!(expand_identity(None), Ok(None));

        let system = IdentityConfig {
            identity_type: "SystemAssigned".to_string(),
            ..Default::default()
        };
        let expanded = expand_identity(Some(&system)).unwrap().unwrap();
        assert_eq!(expanded.identity_type, ManagedServiceIdentityType::SystemAssigned);
        assert_eq!(expanded.user_assigned_identities, None);

        let user_without_ids = IdentityConfig {
            identity_type: "UserAssigned".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            expand_identity(Some(&user_without_ids)),
            Err(MappingError::Identity(_))
        ));

        let both = IdentityConfig {
            identity_type: "SystemAssigned, UserAssigned".to_string(),
            identity_ids: vec!["/id/b".to_string(), "/id/a".to_string()],
            ..Default::default()
        };
        let expanded = expand_identity(Some(&both)).unwrap();
        let flattened = flatten_identity(expanded.as_ref()).unwrap();
        assert_eq!(flattened.identity_ids, vec!["/id/a", "/id/b"]);
        assert_eq!(flattened.identity_type, "SystemAssigned, UserAssigned");
    }

    #[test]
    fn test_overlay_keeps_remote_only_fields() {
        let mut existing: Pool = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/pool1/providers/Microsoft.DevOpsInfrastructure/pools/pool1",
            "name": "pool1",
            "type": "Microsoft.DevOpsInfrastructure/pools",
            "location": "westeurope",
            "systemData": {"createdBy": "someone"},
            "properties": {
                "provisioningState": "Succeeded",
                "maximumConcurrency": 1,
                "devCenterProjectResourceId": "/old",
                "runtimeConfiguration": {"mode": "x"},
                "agentProfile": {"kind": "Stateless", "resourcePredictions": {"daysData": []}},
                "fabricProfile": {"kind": "Vmss", "sku": {"name": "old"}},
                "organizationProfile": {"kind": "GitHub", "organizations": []}
            }
        }))
        .unwrap();

        expand_pool(&pool1(), &mut existing).unwrap();

        assert!(existing.id.is_some());
        assert_eq!(existing.system_data, Some(json!({"createdBy": "someone"})));
        let props = existing.properties.as_ref().unwrap();
        assert_eq!(props.provisioning_state.as_deref(), Some("Succeeded"));
        assert_eq!(props.additional["runtimeConfiguration"], json!({"mode": "x"}));
        assert_eq!(props.maximum_concurrency, 2);
        assert_eq!(
            props.agent_profile.as_ref().unwrap().resource_predictions(),
            Some(&json!({"daysData": []}))
        );
        assert_eq!(props.organization_profile.as_ref().unwrap().kind(), "AzureDevOps");
    }

    #[test]
    fn test_flatten_reconstructs_configuration() {
        let mut config = pool1();
        config.location = "westeurope".to_string();
        config.tags.insert("env".to_string(), "test".to_string());
        config.agent_profile = AgentProfileConfig {
            kind: "Stateful".to_string(),
            max_agent_lifetime: Some("1.00:00:00".to_string()),
            resource_predictions_profile: Some(PredictionsProfileConfig {
                kind: "Automatic".to_string(),
                prediction_preference: Some("Balanced".to_string()),
            }),
            ..Default::default()
        };
        config.organization_profile.permission_profile = Some(PermissionProfileConfig {
            kind: "SpecificAccounts".to_string(),
            users: Some(vec!["a@contoso.com".to_string()]),
            groups: None,
        });

        let pool = expand(&config);
        assert_eq!(flatten_pool("pool1", &pool).unwrap(), config);
    }

    #[test]
    fn test_flatten_requires_properties() {
        let pool = Pool::default();
        assert_eq!(
            flatten_pool("pool1", &pool),
            Err(MappingError::MissingField("properties"))
        );
    }

    #[test]
    fn test_flatten_present_tolerates_partial_models() {
        let bare = Pool {
            location: "westeurope".to_string(),
            ..Default::default()
        };
        let flat = flatten_present("pool1", &bare).unwrap();
        assert_eq!(flat.location, "westeurope");
        assert_eq!(flat.maximum_concurrency, None);
        assert_eq!(flat.agent_profile, None);

        let mut pool = expand(&pool1());
        let props = pool.properties.as_mut().unwrap();
        props.agent_profile = None;
        props.organization_profile = None;
        let flat = flatten_present("pool1", &pool).unwrap();
        assert_eq!(flat.maximum_concurrency, Some(2));
        assert_eq!(flat.agent_profile, None);
        assert_eq!(flat.organization_profile, None);
        assert_eq!(flat.fabric_profile.unwrap().sku.name, "Standard_D2");
    }

    #[test]
    fn test_normalize_location() {
        assert_eq!(normalize_location("West Europe"), "westeurope");
        assert_eq!(normalize_location("eastus2"), "eastus2");
    }
}
