//! Pool resource identity
//!
//! ARM addresses a pool as
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.DevOpsInfrastructure/pools/{name}`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const PROVIDER_NAMESPACE: &str = "Microsoft.DevOpsInfrastructure";
const RESOURCE_TYPE: &str = "pools";

/// Error returned when a string is not a valid pool ID
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseIdError {
    #[error("parsing {input:?}: expected segment {expected:?}, found {found:?}")]
    UnexpectedSegment {
        input: String,
        expected: &'static str,
        found: String,
    },

    #[error("parsing {input:?}: missing value for segment {segment:?}")]
    MissingValue { input: String, segment: &'static str },

    #[error("parsing {input:?}: unexpected trailing segments")]
    TrailingSegments { input: String },

    #[error("parsing {input:?}: ID must start with \"/\"")]
    NotAbsolute { input: String },
}

/// Identity of a Managed DevOps Pool
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub pool_name: String,
}

impl PoolId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        pool_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            pool_name: pool_name.into(),
        }
    }

    /// Build the ID for a pool named `name`. The pool lives in a resource
    /// group of the same name, so the name appears twice in the ID.
    pub fn for_name(subscription_id: impl Into<String>, name: &str) -> Self {
        Self::new(subscription_id, name, name)
    }

    /// Parse an ID. Static segments are matched case-insensitively, the way
    /// ARM itself treats them.
    pub fn parse(input: &str) -> Result<Self, ParseIdError> {
        let Some(rest) = input.strip_prefix('/') else {
            return Err(ParseIdError::NotAbsolute {
                input: input.to_string(),
            });
        };

        let mut segments = rest.split('/');
        let mut next_value = |key: &'static str| -> Result<String, ParseIdError> {
            match segments.next() {
                Some(found) if found.eq_ignore_ascii_case(key) => {}
                found => {
                    return Err(ParseIdError::UnexpectedSegment {
                        input: input.to_string(),
                        expected: key,
                        found: found.unwrap_or_default().to_string(),
                    })
                }
            }
            match segments.next() {
                Some(value) if !value.is_empty() => Ok(decode_segment(value)),
                _ => Err(ParseIdError::MissingValue {
                    input: input.to_string(),
                    segment: key,
                }),
            }
        };

        let subscription_id = next_value("subscriptions")?;
        let resource_group_name = next_value("resourceGroups")?;
        let provider = next_value("providers")?;
        if !provider.eq_ignore_ascii_case(PROVIDER_NAMESPACE) {
            return Err(ParseIdError::UnexpectedSegment {
                input: input.to_string(),
                expected: PROVIDER_NAMESPACE,
                found: provider,
            });
        }
        let pool_name = next_value(RESOURCE_TYPE)?;

        if segments.any(|s| !s.is_empty()) {
            return Err(ParseIdError::TrailingSegments {
                input: input.to_string(),
            });
        }

        Ok(Self {
            subscription_id,
            resource_group_name,
            pool_name,
        })
    }

    /// Resource ID path, with each value percent-encoded
    pub fn path(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            urlencoding::encode(&self.subscription_id),
            urlencoding::encode(&self.resource_group_name),
            PROVIDER_NAMESPACE,
            RESOURCE_TYPE,
            urlencoding::encode(&self.pool_name),
        )
    }
}

fn decode_segment(value: &str) -> String {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            self.subscription_id,
            self.resource_group_name,
            PROVIDER_NAMESPACE,
            RESOURCE_TYPE,
            self.pool_name
        )
    }
}

impl FromStr for PoolId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// ID validation hook for the host: returns every problem found in `value`
pub fn validate_pool_id(value: &str, key: &str) -> Vec<String> {
    match PoolId::parse(value) {
        Ok(_) => Vec::new(),
        Err(e) => vec![format!("{}: {}", key, e)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUB: &str = "00000000-0000-0000-0000-000000000000";

    #[test]
    fn test_for_name_repeats_name() {
        let id = PoolId::for_name(SUB, "pool1");
        assert_eq!(id.resource_group_name, "pool1");
        assert_eq!(id.pool_name, "pool1");
        assert_eq!(
            id.to_string(),
            format!(
                "/subscriptions/{}/resourceGroups/pool1/providers/Microsoft.DevOpsInfrastructure/pools/pool1",
                SUB
            )
        );
    }

    #[test]
    fn test_parse_display_roundtrip() {
        let id = PoolId::new(SUB, "rg-a", "pool-b");
        let parsed = PoolId::parse(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_is_case_insensitive_on_static_segments() {
        let input = format!(
            "/SUBSCRIPTIONS/{}/resourcegroups/rg/PROVIDERS/microsoft.devopsinfrastructure/Pools/p",
            SUB
        );
        let id: PoolId = input.parse().unwrap();
        assert_eq!(id.resource_group_name, "rg");
        assert_eq!(id.pool_name, "p");
    }

    #[test]
    fn test_parse_rejects_wrong_provider() {
        let input = format!(
            "/subscriptions/{}/resourceGroups/rg/providers/Microsoft.Compute/pools/p",
            SUB
        );
        assert!(matches!(
            PoolId::parse(&input),
            Err(ParseIdError::UnexpectedSegment { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_missing_name_and_trailing() {
        let missing = format!(
            "/subscriptions/{}/resourceGroups/rg/providers/Microsoft.DevOpsInfrastructure/pools/",
            SUB
        );
        assert!(matches!(
            PoolId::parse(&missing),
            Err(ParseIdError::MissingValue { segment: "pools", .. })
        ));

        let trailing = format!(
            "/subscriptions/{}/resourceGroups/rg/providers/Microsoft.DevOpsInfrastructure/pools/p/extra",
            SUB
        );
        assert!(matches!(
            PoolId::parse(&trailing),
            Err(ParseIdError::TrailingSegments { .. })
        ));
    }

    #[test]
    fn test_validate_pool_id() {
        assert!(validate_pool_id(&PoolId::for_name(SUB, "x").to_string(), "id").is_empty());
        let errors = validate_pool_id("not-an-id", "id");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("id: "));
    }

    #[test]
    fn test_path_encodes_values() {
        let id = PoolId::new(SUB, "rg one", "p");
        assert!(id.path().contains("/resourceGroups/rg%20one/"));
    }
}
