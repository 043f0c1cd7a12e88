//! Resource schema - the declared shape of `azurerm_mdp_pool`
//!
//! The schema is embedded JSON, parsed once on first access. Configuration is
//! checked against it before it is decoded into the typed tree, so every
//! violation can be reported with its full attribute path in one pass.

use super::error::SchemaViolation;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;
use std::time::Duration;

/// Raw schema document (compiled into the binary)
pub const SCHEMA_JSON: &str = include_str!("../resources/mdp_pool.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Int,
    Bool,
    List,
    Set,
    Map,
    /// A single nested block, written as an object
    Block,
    /// A list of nested blocks, written as an array of objects
    BlockList,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Validation {
    OneOf { values: Vec<String> },
    HttpsUrl,
}

/// One argument of a block
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub computed: bool,
    /// Changing the value requires replacing the resource
    #[serde(default)]
    pub force_new: bool,
    #[serde(default)]
    pub max_items: Option<usize>,
    #[serde(default)]
    pub elem_type: Option<FieldType>,
    #[serde(default)]
    pub block: Option<BTreeMap<String, FieldDef>>,
    #[serde(default)]
    pub validation: Option<Validation>,
}

impl FieldDef {
    /// Set by the service only; configuration may not supply it
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.required && !self.optional
    }

    pub fn allowed_values(&self) -> Option<&[String]> {
        match &self.validation {
            Some(Validation::OneOf { values }) => Some(values),
            _ => None,
        }
    }
}

/// Operation timeouts, in minutes
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TimeoutsDef {
    pub create: u64,
    pub read: u64,
    pub update: u64,
    pub delete: u64,
}

impl TimeoutsDef {
    pub fn create(&self) -> Duration {
        minutes(self.create)
    }

    pub fn read(&self) -> Duration {
        minutes(self.read)
    }

    pub fn update(&self) -> Duration {
        minutes(self.update)
    }

    pub fn delete(&self) -> Duration {
        minutes(self.delete)
    }
}

fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

/// Root of the schema document
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub timeouts: TimeoutsDef,
    pub arguments: BTreeMap<String, FieldDef>,
}

impl ResourceSchema {
    /// Look up an argument by dotted path, e.g. `fabric_profile.sku.name`.
    /// List indexes are not part of the path.
    pub fn field(&self, path: &str) -> Option<&FieldDef> {
        let mut segments = path.split('.');
        let mut def = self.arguments.get(segments.next()?)?;
        for segment in segments {
            def = def.block.as_ref()?.get(segment)?;
        }
        Some(def)
    }
}

static SCHEMA: OnceLock<ResourceSchema> = OnceLock::new();

/// Get the resource schema (parses the embedded JSON on first access)
pub fn schema() -> &'static ResourceSchema {
    SCHEMA.get_or_init(|| {
        serde_json::from_str(SCHEMA_JSON)
            .unwrap_or_else(|e| panic!("Failed to parse embedded schema JSON: {}", e))
    })
}

pub fn resource_type() -> &'static str {
    &schema().resource_type
}

/// Check a configuration document against the schema. Returns every
/// violation found, not just the first.
pub fn validate(config: &Value) -> Result<(), Vec<SchemaViolation>> {
    let mut violations = Vec::new();
    match config.as_object() {
        Some(obj) => validate_block(&schema().arguments, obj, "", &mut violations),
        None => violations.push(violation("", "configuration must be an object")),
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn violation(path: &str, message: impl Into<String>) -> SchemaViolation {
    SchemaViolation {
        path: if path.is_empty() {
            "<root>".to_string()
        } else {
            path.to_string()
        },
        message: message.into(),
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn validate_block(
    fields: &BTreeMap<String, FieldDef>,
    obj: &Map<String, Value>,
    prefix: &str,
    out: &mut Vec<SchemaViolation>,
) {
    for key in obj.keys() {
        if !fields.contains_key(key) {
            out.push(violation(&join(prefix, key), "is not a supported argument"));
        }
    }

    for (name, def) in fields {
        let path = join(prefix, name);
        match obj.get(name) {
            None | Some(Value::Null) => {
                if def.required {
                    out.push(violation(&path, "is required"));
                }
            }
            Some(_) if def.is_computed_only() => {
                out.push(violation(&path, "is computed and cannot be set"));
            }
            Some(value) => validate_value(def, value, &path, out),
        }
    }
}

fn validate_value(def: &FieldDef, value: &Value, path: &str, out: &mut Vec<SchemaViolation>) {
    match def.field_type {
        FieldType::String | FieldType::Int | FieldType::Bool => {
            if check_scalar(def.field_type, value, path, out) {
                if let (Some(validation), Some(s)) = (&def.validation, value.as_str()) {
                    check_validation(validation, s, path, out);
                }
            }
        }
        FieldType::List | FieldType::Set => {
            let Some(items) = value.as_array() else {
                out.push(violation(path, "must be a list"));
                return;
            };
            check_max_items(def, items.len(), path, out);
            let elem = def.elem_type.unwrap_or(FieldType::String);
            for (i, item) in items.iter().enumerate() {
                check_scalar(elem, item, &format!("{}[{}]", path, i), out);
            }
            if def.field_type == FieldType::Set {
                let mut seen = HashSet::new();
                for item in items {
                    if !seen.insert(item.to_string()) {
                        out.push(violation(path, format!("contains duplicate value {}", item)));
                    }
                }
            }
        }
        FieldType::Map => {
            let Some(entries) = value.as_object() else {
                out.push(violation(path, "must be a map"));
                return;
            };
            let elem = def.elem_type.unwrap_or(FieldType::String);
            for (key, item) in entries {
                check_scalar(elem, item, &join(path, key), out);
            }
        }
        FieldType::Block => {
            let Some(obj) = value.as_object() else {
                out.push(violation(path, "must be a block"));
                return;
            };
            if let Some(block) = &def.block {
                validate_block(block, obj, path, out);
            }
        }
        FieldType::BlockList => {
            let Some(items) = value.as_array() else {
                out.push(violation(path, "must be a list of blocks"));
                return;
            };
            check_max_items(def, items.len(), path, out);
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{}[{}]", path, i);
                match (item.as_object(), &def.block) {
                    (Some(obj), Some(block)) => validate_block(block, obj, &item_path, out),
                    (Some(_), None) => {}
                    (None, _) => out.push(violation(&item_path, "must be a block")),
                }
            }
        }
    }
}

/// Returns whether the value has the expected scalar type
fn check_scalar(ty: FieldType, value: &Value, path: &str, out: &mut Vec<SchemaViolation>) -> bool {
    let (ok, expected) = match ty {
        FieldType::String => (value.is_string(), "a string"),
        FieldType::Int => (value.is_i64(), "an integer"),
        FieldType::Bool => (value.is_boolean(), "a boolean"),
        _ => (true, ""),
    };
    if !ok {
        out.push(violation(path, format!("must be {}", expected)));
    }
    ok
}

fn check_max_items(def: &FieldDef, len: usize, path: &str, out: &mut Vec<SchemaViolation>) {
    if let Some(max) = def.max_items {
        if len > max {
            out.push(violation(
                path,
                format!("must have at most {} item(s), got {}", max, len),
            ));
        }
    }
}

fn check_validation(validation: &Validation, value: &str, path: &str, out: &mut Vec<SchemaViolation>) {
    match validation {
        Validation::OneOf { values } => {
            if !values.iter().any(|v| v == value) {
                out.push(violation(
                    path,
                    format!("must be one of [{}], got {:?}", values.join(", "), value),
                ));
            }
        }
        Validation::HttpsUrl => {
            let ok = url::Url::parse(value)
                .map(|u| u.scheme() == "https" && u.host_str().is_some())
                .unwrap_or(false);
            if !ok {
                out.push(violation(path, format!("must be an https URL, got {:?}", value)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::model::{
        AzureDevOpsPermissionType, CachingType, LogonType, OsDiskStorageAccountType,
        PredictionPreference, ResourcePredictionsProfileType, StorageAccountType,
    };
    use crate::resource::model::{AgentProfileKind, FabricProfileKind, OrganizationProfileKind};
    use serde_json::json;

    fn allowed(path: &str) -> Vec<&'static str> {
        schema()
            .field(path)
            .and_then(|f| f.allowed_values())
            .unwrap_or_else(|| panic!("{} has no allowed values", path))
            .iter()
            .map(|s| s.as_str())
            .collect()
    }

    fn minimal() -> Value {
        json!({
            "name": "pool1",
            "location": "West Europe",
            "dev_center_project_id": "/subscriptions/x/project",
            "maximum_concurrency": 1,
            "agent_profile": {"kind": "Stateless"},
            "fabric_profile": {"kind": "Vmss", "sku": {"name": "Standard_D2ads_v5"}},
            "organization_profile": {
                "kind": "AzureDevOps",
                "organizations": [{"url": "https://dev.azure.com/contoso"}]
            }
        })
    }

    fn paths(config: &Value) -> Vec<String> {
        validate(config)
            .unwrap_err()
            .into_iter()
            .map(|v| v.path)
            .collect()
    }

    #[test]
    fn test_schema_loads_successfully() {
        let s = schema();
        assert_eq!(s.resource_type, "azurerm_mdp_pool");
        assert_eq!(s.timeouts.create(), Duration::from_secs(30 * 60));
        assert_eq!(s.timeouts.read(), Duration::from_secs(5 * 60));
        assert!(s.field("name").unwrap().force_new);
        assert!(s.field("location").unwrap().force_new);
    }

    #[test]
    fn test_allowed_values_match_model_enums() {
        assert_eq!(allowed("agent_profile.kind"), AgentProfileKind::possible_values());
        assert_eq!(
            allowed("agent_profile.resource_predictions_profile.kind"),
            ResourcePredictionsProfileType::possible_values()
        );
        assert_eq!(
            allowed("agent_profile.resource_predictions_profile.prediction_preference"),
            PredictionPreference::possible_values()
        );
        assert_eq!(allowed("fabric_profile.kind"), FabricProfileKind::possible_values());
        assert_eq!(allowed("fabric_profile.os_profile.logon_type"), LogonType::possible_values());
        assert_eq!(
            allowed("fabric_profile.storage_profile.os_disk_storage_account_type"),
            OsDiskStorageAccountType::possible_values()
        );
        assert_eq!(
            allowed("fabric_profile.storage_profile.data_disks.caching"),
            CachingType::possible_values()
        );
        assert_eq!(
            allowed("fabric_profile.storage_profile.data_disks.storage_account_type"),
            StorageAccountType::possible_values()
        );
        assert_eq!(
            allowed("organization_profile.kind"),
            OrganizationProfileKind::possible_values()
        );
        assert_eq!(
            allowed("organization_profile.permission_profile.kind"),
            AzureDevOpsPermissionType::possible_values()
        );
    }

    #[test]
    fn test_minimal_config_is_valid() {
        assert_eq!(validate(&minimal()), Ok(()));
    }

    #[test]
    fn test_missing_required_fields_are_all_reported() {
        let mut config = minimal();
        let obj = config.as_object_mut().unwrap();
        obj.remove("name");
        obj.remove("fabric_profile");
        let mut got = paths(&config);
        got.sort();
        assert_eq!(got, vec!["fabric_profile", "name"]);
    }

    #[test]
    fn test_unknown_argument_is_rejected() {
        let mut config = minimal();
        config["agent_profile"]["max_agents"] = json!(3);
        assert_eq!(paths(&config), vec!["agent_profile.max_agents"]);
    }

    #[test]
    fn test_nested_paths_include_list_index() {
        let mut config = minimal();
        config["fabric_profile"]["storage_profile"] = json!({
            "os_disk_storage_account_type": "Standard",
            "data_disks": [
                {"caching": "ReadOnly", "disk_size": 10, "storage_account_type": "Standard_LRS"},
                {"caching": "Sometimes", "disk_size": 10, "storage_account_type": "Standard_LRS"}
            ]
        });
        assert_eq!(
            paths(&config),
            vec!["fabric_profile.storage_profile.data_disks[1].caching"]
        );
    }

    #[test]
    fn test_computed_only_field_cannot_be_set() {
        let mut config = minimal();
        config["agent_profile"]["resource_predictions"] = json!("{}");
        config["type"] = json!("Microsoft.DevOpsInfrastructure/pools");
        let mut got = paths(&config);
        got.sort();
        assert_eq!(got, vec!["agent_profile.resource_predictions", "type"]);
    }

    #[test]
    fn test_set_rejects_duplicates() {
        let mut config = minimal();
        config["organization_profile"]["organizations"][0]["projects"] = json!(["a", "b", "a"]);
        let violations = validate(&config).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("duplicate"));
    }

    #[test]
    fn test_organization_url_must_be_https() {
        let mut config = minimal();
        config["organization_profile"]["organizations"][0]["url"] = json!("http://dev.azure.com/x");
        assert_eq!(paths(&config), vec!["organization_profile.organizations[0].url"]);
    }

    #[test]
    fn test_type_mismatches() {
        let mut config = minimal();
        config["maximum_concurrency"] = json!("four");
        config["tags"] = json!({"env": 1});
        config["agent_profile"] = json!([{"kind": "Stateless"}]);
        let mut got = paths(&config);
        got.sort();
        assert_eq!(got, vec!["agent_profile", "maximum_concurrency", "tags.env"]);
    }
}
