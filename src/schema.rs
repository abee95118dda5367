//! Schema types describing provider configuration and resource state.
//!
//! A schema lists the attributes and nested blocks of a resource together with
//! how each may be used (required, optional, computed). The provider uses
//! schemas to validate configuration and to drive planning: which attributes
//! are carried over from prior state and which force a replacement.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The type of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string value.
    String,
    /// A 64-bit integer.
    Int64,
    /// A boolean value.
    Bool,
    /// An ordered list of values of a single type.
    List(Box<AttributeType>),
}

impl AttributeType {
    /// Create a list type.
    pub fn list(element_type: AttributeType) -> Self {
        Self::List(Box::new(element_type))
    }
}

/// Describes how an attribute can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// The attribute is required in configuration.
    pub required: bool,
    /// The attribute is optional in configuration.
    pub optional: bool,
    /// The attribute is computed by the provider.
    pub computed: bool,
    /// The attribute holds a secret.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Flags for a required attribute.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Flags for an optional attribute.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    /// Flags for a computed, read-only attribute.
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    /// Flags for an attribute the user may set and the provider otherwise fills in.
    pub fn optional_computed() -> Self {
        Self {
            optional: true,
            computed: true,
            ..Default::default()
        }
    }

    /// Whether only the provider sets this attribute.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// Describes a single attribute in a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// The type of the attribute.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Usage flags.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Changing this attribute forces the resource to be replaced.
    #[serde(default)]
    pub force_new: bool,
    /// Value assumed when configuration leaves the attribute unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// String values differing only in ASCII case are the same value.
    #[serde(default)]
    pub case_insensitive: bool,
}

impl Attribute {
    /// Create an attribute.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            default: None,
            case_insensitive: false,
        }
    }

    /// The server-assigned `id` attribute every resource has.
    pub fn id() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
            .with_description("The unique ID for this resource.")
    }

    /// Create a required string attribute.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    /// Create an optional string attribute.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    /// Create an optional string attribute the provider fills in when absent.
    pub fn optional_computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional_computed())
    }

    /// Create an optional int64 attribute.
    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional())
    }

    /// Create an optional bool attribute.
    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional())
    }

    /// Create an optional list-of-strings attribute.
    pub fn optional_string_list() -> Self {
        Self::new(
            AttributeType::list(AttributeType::String),
            AttributeFlags::optional(),
        )
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark this attribute as forcing replacement when changed.
    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Set a default value for this attribute.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Compare string values of this attribute ignoring ASCII case.
    pub fn with_case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Mark this attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }
}

/// How a nested block repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockNestingMode {
    /// At most one block, stored as a list of zero or one element.
    #[default]
    Single,
    /// Zero or more blocks, ordered.
    List,
}

/// A group of attributes and nested blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Block {
    /// Attributes, by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Attribute>,
    /// Nested blocks, by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub blocks: BTreeMap<String, NestedBlock>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Block {
    /// Create an empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A nested block with its nesting mode and item limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedBlock {
    /// The block definition.
    #[serde(flatten)]
    pub block: Block,
    /// How the block repeats.
    #[serde(default)]
    pub nesting_mode: BlockNestingMode,
    /// Minimum number of blocks.
    #[serde(default)]
    pub min_items: u32,
    /// Maximum number of blocks (0 = unlimited).
    #[serde(default)]
    pub max_items: u32,
}

impl NestedBlock {
    /// Zero or one block.
    pub fn single(block: Block) -> Self {
        Self {
            block,
            nesting_mode: BlockNestingMode::Single,
            min_items: 0,
            max_items: 1,
        }
    }

    /// Any number of ordered blocks.
    pub fn list(block: Block) -> Self {
        Self {
            block,
            nesting_mode: BlockNestingMode::List,
            min_items: 0,
            max_items: 0,
        }
    }

    /// Set the minimum number of blocks.
    pub fn with_min_items(mut self, min: u32) -> Self {
        self.min_items = min;
        self
    }

    /// Set the maximum number of blocks.
    pub fn with_max_items(mut self, max: u32) -> Self {
        self.max_items = max;
        self
    }
}

/// Schema for a resource or the provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Schema {
    /// Version of the state layout, for upgrades.
    #[serde(default)]
    pub version: u64,
    /// The root block.
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    /// Create a schema with the given version.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            block: Block::new(),
        }
    }

    /// Create a schema at version 0.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block.blocks.insert(name.into(), block);
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.block.description = Some(description.into());
        self
    }

    /// Top-level attribute and block names, sorted.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .block
            .attributes
            .keys()
            .chain(self.block.blocks.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

/// Schemas of everything the provider offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// Provider configuration schema.
    #[serde(default)]
    pub provider: Schema,
    /// Resource schemas, by type name.
    #[serde(default)]
    pub resources: BTreeMap<String, Schema>,
}

impl ProviderSchema {
    /// Create an empty provider schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider configuration schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Add a resource schema.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// Prevents the operation from completing.
    Error,
    /// Reported, but the operation continues.
    Warning,
}

/// A message attached to a provider response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity.
    pub severity: DiagnosticSeverity,
    /// Short summary.
    pub summary: String,
    /// Longer explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Attribute path the message is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Add detail.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the attribute path.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Whether this is an error.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// Whether any diagnostic is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
