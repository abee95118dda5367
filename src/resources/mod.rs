//! Resource implementations.
//!
//! Each module owns the schema of one resource type, the serde model of its
//! state document and the async operations the provider dispatches to.
//! State documents use Terraform's conventions: snake_case names, nested
//! blocks as lists, `null` or a missing key for "not set".

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ProviderError;

pub mod freeze_project;
pub mod freeze_tenant;
pub mod lifecycle;
pub mod variable;

/// Prefix shared by every resource type name.
pub const PROVIDER_NAME: &str = "octopusdeploy";

/// Resource type of [`lifecycle`].
pub const LIFECYCLE: &str = "octopusdeploy_lifecycle";
/// Resource type of [`freeze_project`].
pub const DEPLOYMENT_FREEZE_PROJECT: &str = "octopusdeploy_deployment_freeze_project";
/// Resource type of [`freeze_tenant`].
pub const DEPLOYMENT_FREEZE_TENANT: &str = "octopusdeploy_deployment_freeze_tenant";
/// Resource type of [`variable`].
pub const VARIABLE: &str = "octopusdeploy_variable";

/// Decode a state or plan document.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ProviderError> {
    Ok(serde_json::from_value(value)?)
}

/// Encode a state document.
pub(crate) fn encode<T: Serialize>(model: &T) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(model)?)
}

/// Treat an explicit `null` like a missing key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The resource id stored in a state document.
pub(crate) fn require_id<'a>(id: &'a Option<String>, what: &str) -> Result<&'a str, ProviderError> {
    match id.as_deref() {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(ProviderError::Validation(format!("{} state has no id", what))),
    }
}

/// Pick the space from the resource, falling back to the provider's.
pub(crate) fn space_or<'a>(space_id: &'a Option<String>, fallback: &'a str) -> &'a str {
    match space_id.as_deref() {
        Some(space) if !space.is_empty() => space,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "null_as_default")]
        items: Vec<String>,
    }

    #[test]
    fn test_null_and_missing_are_default() {
        let a: Sample = decode(json!({"items": null})).unwrap();
        let b: Sample = decode(json!({})).unwrap();
        assert!(a.items.is_empty());
        assert!(b.items.is_empty());
    }

    #[test]
    fn test_require_id() {
        assert_eq!(require_id(&Some("Lifecycles-1".to_string()), "lifecycle").unwrap(), "Lifecycles-1");
        assert!(require_id(&Some(String::new()), "lifecycle").is_err());
        assert!(require_id(&None, "lifecycle").is_err());
    }

    #[test]
    fn test_space_fallback() {
        assert_eq!(space_or(&None, "Spaces-1"), "Spaces-1");
        assert_eq!(space_or(&Some(String::new()), "Spaces-1"), "Spaces-1");
        assert_eq!(space_or(&Some("Spaces-2".to_string()), "Spaces-1"), "Spaces-2");
    }
}
