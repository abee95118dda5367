//! Values exchanged between the provider and its host.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A change to a single top-level attribute or block during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Name of the attribute or block.
    pub path: String,
    /// Value before the change, `None` when the attribute was absent.
    pub before: Option<Value>,
    /// Value after the change, `None` when the attribute is removed.
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// An attribute that did not exist before.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// An attribute that goes away.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// An attribute whose value changes.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self::new(path, Some(before), Some(after))
    }
}

/// The result of planning a resource change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// State expected after apply.
    pub planned_state: Value,
    /// Changed attributes, sorted by path.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource must be destroyed and created again.
    pub requires_replace: bool,
}

impl PlanResult {
    /// A plan with nothing to do.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// A plan with changes.
    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }

    /// Whether applying this plan would do anything.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// State produced by importing an existing remote entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: Value,
}

impl ImportedResource {
    /// Create an imported resource.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// What the provider offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Provider name as used in resource type prefixes.
    pub name: String,
    /// Resource type names, sorted.
    pub resources: Vec<String>,
}
