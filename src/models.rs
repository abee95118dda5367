//! Entities as the remote API sees them.
//!
//! These mirror the server's JSON documents (PascalCase field names) and carry
//! no behaviour beyond construction helpers. The resource modules translate
//! between these and the provider's state documents.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Unit a retention quantity is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RetentionUnit {
    /// Keep artifacts for a number of days.
    #[default]
    Days,
    /// Keep a number of artifacts.
    Items,
}

impl RetentionUnit {
    /// The name the server uses for this unit.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Days => "Days",
            Self::Items => "Items",
        }
    }
}

impl fmt::Display for RetentionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetentionUnit {
    type Err = ProviderError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("Days") {
            Ok(Self::Days)
        } else if s.eq_ignore_ascii_case("Items") {
            Ok(Self::Items)
        } else {
            Err(ProviderError::Validation(format!(
                "unit must be either 'Days' or 'Items', got '{}'",
                s
            )))
        }
    }
}

/// How much deployment history to keep.
///
/// `should_keep_forever = true` conventionally comes with a quantity of 0, but
/// nothing here enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RetentionPolicy {
    /// How many units to keep.
    pub quantity_to_keep: u32,
    /// Keep everything, ignoring the quantity.
    pub should_keep_forever: bool,
    /// Unit of `quantity_to_keep`.
    pub unit: RetentionUnit,
}

impl RetentionPolicy {
    /// Create a policy.
    pub fn new(quantity_to_keep: u32, unit: RetentionUnit, should_keep_forever: bool) -> Self {
        Self {
            quantity_to_keep,
            should_keep_forever,
            unit,
        }
    }

    /// The policy the server applies when a lifecycle leaves one unset.
    pub fn server_default() -> Self {
        Self::new(30, RetentionUnit::Days, false)
    }

    /// Keep everything.
    pub fn keep_forever() -> Self {
        Self::new(0, RetentionUnit::Items, true)
    }

    /// Whether this is exactly the server default.
    pub fn is_server_default(&self) -> bool {
        *self == Self::server_default()
    }
}

/// One stage of a lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Phase {
    /// Server-assigned id, empty before creation.
    #[serde(rename = "Id", default)]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Environments deployed to automatically.
    #[serde(default)]
    pub automatic_deployment_targets: Vec<String>,
    /// Environments deployed to on demand.
    #[serde(default)]
    pub optional_deployment_targets: Vec<String>,
    /// Successful environments required before the next phase unlocks.
    #[serde(default)]
    pub minimum_environments_before_promotion: u32,
    /// Whether the phase may be skipped.
    #[serde(default)]
    pub is_optional_phase: bool,
    /// Whether deployments in this phase jump the task queue.
    #[serde(default)]
    pub is_priority_phase: bool,
    /// Override of the lifecycle's release retention.
    #[serde(default)]
    pub release_retention_policy: Option<RetentionPolicy>,
    /// Override of the lifecycle's tentacle retention.
    #[serde(default)]
    pub tentacle_retention_policy: Option<RetentionPolicy>,
}

/// An ordered set of phases a release moves through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Lifecycle {
    /// Server-assigned id, empty before creation.
    #[serde(rename = "Id", default)]
    pub id: String,
    /// Owning space.
    #[serde(rename = "SpaceId", default)]
    pub space_id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Phases, in promotion order.
    #[serde(default)]
    pub phases: Vec<Phase>,
    /// Release retention; absent means "server default".
    #[serde(default)]
    pub release_retention_policy: Option<RetentionPolicy>,
    /// Tentacle retention; absent means "server default".
    #[serde(default)]
    pub tentacle_retention_policy: Option<RetentionPolicy>,
}

impl Lifecycle {
    /// Create an empty lifecycle with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// One tenant/project/environment triple a freeze applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TenantProjectEnvironment {
    /// Tenant id.
    pub tenant_id: String,
    /// Project id.
    pub project_id: String,
    /// Environment id.
    pub environment_id: String,
}

/// A window during which deployments are blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentFreeze {
    /// Server-assigned id.
    #[serde(rename = "Id", default)]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Project id to frozen environment ids.
    #[serde(default)]
    pub project_environment_scope: BTreeMap<String, Vec<String>>,
    /// Frozen tenant triples.
    #[serde(default)]
    pub tenant_project_environment_scope: Vec<TenantProjectEnvironment>,
}

/// Dimensions narrowing where a variable applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct VariableScope {
    /// Deployment step ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "Action")]
    pub actions: Vec<String>,
    /// Channel ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "Channel")]
    pub channels: Vec<String>,
    /// Environment ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "Environment")]
    pub environments: Vec<String>,
    /// Deployment target ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "Machine")]
    pub machines: Vec<String>,
    /// Process owner ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "ProcessOwner")]
    pub processes: Vec<String>,
    /// Target roles.
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "Role")]
    pub roles: Vec<String>,
    /// Tenant tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "TenantTag")]
    pub tenant_tags: Vec<String>,
}

impl VariableScope {
    /// Whether no dimension is constrained.
    pub fn is_empty(&self) -> bool {
        self.dimensions().iter().all(|(_, values)| values.is_empty())
    }

    /// Every dimension paired with its name, in a fixed order.
    pub fn dimensions(&self) -> [(&'static str, &[String]); 7] {
        [
            ("actions", self.actions.as_slice()),
            ("channels", self.channels.as_slice()),
            ("environments", self.environments.as_slice()),
            ("machines", self.machines.as_slice()),
            ("processes", self.processes.as_slice()),
            ("roles", self.roles.as_slice()),
            ("tenant_tags", self.tenant_tags.as_slice()),
        ]
    }
}

/// Variable type reserved for secret values.
pub const SENSITIVE_VARIABLE_TYPE: &str = "Sensitive";

/// Every variable type the server accepts.
pub const VARIABLE_TYPES: [&str; 8] = [
    "AmazonWebServicesAccount",
    "AzureAccount",
    "GoogleCloudAccount",
    "UsernamePasswordAccount",
    "Certificate",
    SENSITIVE_VARIABLE_TYPE,
    "String",
    "WorkerPool",
];

/// A named value attached to an owner's variable set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Variable {
    /// Server-assigned id, empty before creation.
    #[serde(rename = "Id", default)]
    pub id: String,
    /// Variable name.
    pub name: String,
    /// Value; the server never returns it for sensitive variables.
    #[serde(default)]
    pub value: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Value type, e.g. `String` or `Sensitive`.
    #[serde(rename = "Type")]
    pub variable_type: String,
    /// Whether the value is secret.
    #[serde(default)]
    pub is_sensitive: bool,
    /// Whether the value can be edited in the UI.
    #[serde(default)]
    pub is_editable: bool,
    /// Where the variable applies.
    #[serde(default)]
    pub scope: VariableScope,
    /// Owning space.
    #[serde(rename = "SpaceId", default)]
    pub space_id: String,
}

impl Variable {
    /// Create a plain string variable.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variable_type: "String".to_string(),
            is_editable: true,
            ..Default::default()
        }
    }
}

/// Every variable belonging to one owner (project or library set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct VariableSet {
    /// Owning project or library variable set.
    #[serde(rename = "OwnerId")]
    pub owner_id: String,
    /// Version, bumped by the server on each write.
    #[serde(default)]
    pub version: u32,
    /// Members, in server order.
    #[serde(default)]
    pub variables: Vec<Variable>,
}
