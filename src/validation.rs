//! Checking configuration values against a [`Schema`].
//!
//! ```
//! use octopus_provider_core::schema::{Attribute, Schema};
//! use octopus_provider_core::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("environment_ids", Attribute::optional_string_list());
//!
//! assert!(validate(&schema, &json!({"name": "Default"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "Default", "environment_ids": "Environments-1"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("environment_ids".to_string()));
//! ```

use serde_json::Value;

use crate::schema::{Attribute, AttributeType, Block, Diagnostic, NestedBlock, Schema};

/// Validate a configuration value.
///
/// - required attributes must be present and non-null
/// - computed-only attributes are ignored
/// - values must have the declared type
/// - nested blocks are lists whose length respects `min_items`/`max_items`
/// - names the schema does not declare are rejected
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// [`validate`], as a `Result`.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        other => {
            diagnostics.push(at_path(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(other))),
                path,
            ));
            return;
        },
    };

    for (name, attr) in &block.attributes {
        validate_attribute(attr, obj.get(name), &join_path(path, name), diagnostics);
    }

    for (name, nested) in &block.blocks {
        validate_nested_block(nested, obj.get(name), &join_path(path, name), diagnostics);
    }

    for name in obj.keys() {
        if !block.attributes.contains_key(name) && !block.blocks.contains_key(name) {
            let attr_path = join_path(path, name);
            diagnostics.push(
                Diagnostic::error(format!("Unsupported argument '{}'", attr_path))
                    .with_detail("An argument with this name is not expected here")
                    .with_attribute(attr_path),
            );
        }
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => validate_attribute_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if value.as_i64().is_none() {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, item, &item_path, diagnostics);
                }
            },
            None => diagnostics.push(type_error(path, "list", value)),
        },
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let items: &[Value] = match value {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(other) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(other)))
                    .with_attribute(path),
            );
            return;
        },
    };

    let len = items.len() as u32;
    if len < nested.min_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' requires at least {} item(s), got {}",
                path, nested.min_items, len
            ))
            .with_attribute(path),
        );
    }
    if nested.max_items > 0 && len > nested.max_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' allows at most {} item(s), got {}",
                path, nested.max_items, len
            ))
            .with_attribute(path),
        );
    }

    for (i, item) in items.iter().enumerate() {
        validate_block(&nested.block, item, &format!("{}.{}", path, i), diagnostics);
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn at_path(diagnostic: Diagnostic, path: &str) -> Diagnostic {
    if path.is_empty() {
        diagnostic
    } else {
        diagnostic.with_attribute(path)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}
