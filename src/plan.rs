//! Computing a plan from prior state and proposed configuration.
//!
//! Values are compared after canonicalisation: `null`, a missing key and an
//! empty list all mean "not set", at every depth. Before comparing, unset
//! attributes take their schema default (or their prior value when computed)
//! and case-insensitive strings keep the prior spelling.

use serde_json::{Map, Value};

use crate::schema::{Block, Schema};
use crate::types::{AttributeChange, PlanResult};

/// Diff `proposed` against `prior` for a resource described by `schema`.
///
/// - `prior = None`: create.
/// - `proposed = null`: delete.
/// - otherwise an update; computed attributes left unset in `proposed` keep
///   their prior value, and a change to a `force_new` attribute requires
///   replacement.
///
/// Schema defaults are filled in for create and update alike, inside nested
/// blocks too.
pub fn diff(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let prior = prior.filter(|p| !p.is_null());

    if proposed.is_null() {
        let changes = match prior {
            Some(prior) => changes_between(schema, Some(prior), &Value::Null),
            None => Vec::new(),
        };
        return PlanResult::with_changes(Value::Null, changes, false);
    }

    let mut planned = proposed.clone();
    fill(&schema.block, prior, &mut planned);

    let changes = changes_between(schema, prior, &planned);
    let requires_replace = prior.is_some()
        && changes.iter().any(|change| {
            schema
                .block
                .attributes
                .get(&change.path)
                .is_some_and(|attr| attr.force_new)
        });

    PlanResult::with_changes(planned, changes, requires_replace)
}

fn changes_between(schema: &Schema, prior: Option<&Value>, planned: &Value) -> Vec<AttributeChange> {
    schema
        .field_names()
        .into_iter()
        .filter_map(|name| {
            let before = prior.and_then(|p| p.get(name)).and_then(canonical);
            let after = planned.get(name).and_then(canonical);
            if before == after {
                None
            } else {
                Some(AttributeChange::new(name, before, after))
            }
        })
        .collect()
}

/// Complete `planned` from the schema and `prior`, descending into nested
/// blocks index by index.
///
/// - unset computed attributes take their prior value
/// - other unset attributes take their default
/// - a case-insensitive string equal to the prior one keeps the prior spelling
fn fill(block: &Block, prior: Option<&Value>, planned: &mut Value) {
    let Some(map) = planned.as_object_mut() else {
        return;
    };

    for (name, attr) in &block.attributes {
        let before = prior.and_then(|p| p.get(name)).and_then(canonical);
        match map.get(name).and_then(canonical) {
            None => {
                let value = if attr.flags.computed {
                    before.or_else(|| attr.default.clone())
                } else {
                    attr.default.clone()
                };
                if let Some(value) = value {
                    map.insert(name.clone(), value);
                }
            },
            Some(Value::String(after)) if attr.case_insensitive => {
                if let Some(Value::String(before)) = before {
                    if before != after && before.eq_ignore_ascii_case(&after) {
                        map.insert(name.clone(), Value::String(before));
                    }
                }
            },
            Some(_) => {},
        }
    }

    for (name, nested) in &block.blocks {
        let Some(Value::Array(items)) = map.get_mut(name) else {
            continue;
        };
        let before = prior.and_then(|p| p.get(name)).and_then(Value::as_array);
        for (i, item) in items.iter_mut().enumerate() {
            fill(&nested.block, before.and_then(|b| b.get(i)), item);
        }
    }
}

/// The value with every "not set" spelling removed, or `None` if nothing is left.
fn canonical(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .map(|item| canonical(item).unwrap_or(Value::Null))
                .collect(),
        )),
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .iter()
                .filter_map(|(k, v)| canonical(v).map(|v| (k.clone(), v)))
                .collect();
            Some(Value::Object(cleaned))
        },
        other => Some(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, NestedBlock};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::id())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("owner_id", Attribute::required_string().with_force_new())
            .with_attribute("tags", Attribute::optional_string_list())
            .with_block(
                "phase",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("id", Attribute::id())
                        .with_attribute("name", Attribute::required_string()),
                ),
            )
    }

    #[test]
    fn test_create() {
        let plan = diff(&schema(), None, &json!({"name": "a", "owner_id": "Projects-1"}));
        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "owner_id"]);
        assert!(!plan.requires_replace);
        assert!(plan.changes.iter().all(|c| c.before.is_none()));
    }

    #[test]
    fn test_unset_spellings_are_equivalent() {
        let prior = json!({"id": "X-1", "name": "a", "owner_id": "Projects-1", "tags": []});
        let proposed = json!({"name": "a", "owner_id": "Projects-1", "tags": null, "phase": []});
        let plan = diff(&schema(), Some(&prior), &proposed);
        assert!(!plan.has_changes());
        assert_eq!(plan.planned_state["id"], "X-1");
    }

    #[test]
    fn test_nested_computed_ids_are_carried() {
        let prior = json!({
            "id": "X-1", "name": "a", "owner_id": "Projects-1",
            "phase": [{"id": "Phases-1", "name": "Dev"}, {"id": "Phases-2", "name": "Test"}]
        });
        let proposed = json!({
            "name": "a", "owner_id": "Projects-1",
            "phase": [{"name": "Dev"}, {"name": "Prod"}]
        });
        let plan = diff(&schema(), Some(&prior), &proposed);

        assert_eq!(plan.planned_state["phase"][0]["id"], "Phases-1");
        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["phase"]);
        assert!(!plan.requires_replace);
    }

    fn schema_with_defaults() -> Schema {
        let policy = Block::new()
            .with_attribute("quantity_to_keep", Attribute::optional_int64().with_default(json!(30)))
            .with_attribute(
                "unit",
                Attribute::optional_string()
                    .with_default(json!("Days"))
                    .with_case_insensitive(),
            );
        Schema::v0()
            .with_attribute("id", Attribute::id())
            .with_attribute("name", Attribute::required_string())
            .with_block("policy", NestedBlock::single(policy.clone()))
            .with_block(
                "phase",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("name", Attribute::required_string())
                        .with_attribute("is_optional_phase", Attribute::optional_bool().with_default(json!(false)))
                        .with_block("policy", NestedBlock::single(policy)),
                ),
            )
    }

    #[test]
    fn test_defaults_fill_unset_attributes() {
        let plan = diff(
            &schema_with_defaults(),
            None,
            &json!({"name": "a", "policy": [{"quantity_to_keep": 60}], "phase": [{"name": "Dev", "policy": [{}]}]}),
        );

        assert_eq!(plan.planned_state["policy"], json!([{"quantity_to_keep": 60, "unit": "Days"}]));
        assert_eq!(plan.planned_state["phase"][0]["is_optional_phase"], json!(false));
        assert_eq!(
            plan.planned_state["phase"][0]["policy"],
            json!([{"quantity_to_keep": 30, "unit": "Days"}])
        );
        // Absent blocks stay absent.
        assert!(diff(&schema_with_defaults(), None, &json!({"name": "a"}))
            .planned_state
            .get("policy")
            .is_none());
    }

    #[test]
    fn test_defaulted_values_match_stored_state() {
        let prior = json!({
            "id": "X-1", "name": "a",
            "policy": [{"quantity_to_keep": 60, "unit": "Days"}],
            "phase": [{"name": "Dev", "is_optional_phase": false}]
        });
        let proposed = json!({"name": "a", "policy": [{"quantity_to_keep": 60}], "phase": [{"name": "Dev"}]});
        assert!(!diff(&schema_with_defaults(), Some(&prior), &proposed).has_changes());

        // An explicit value differing from the stored one is still a change.
        let proposed = json!({"name": "a", "policy": [{"quantity_to_keep": 60}], "phase": [{"name": "Dev", "is_optional_phase": true}]});
        let plan = diff(&schema_with_defaults(), Some(&prior), &proposed);
        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["phase"]);
    }

    #[test]
    fn test_case_insensitive_strings_keep_prior_spelling() {
        let prior = json!({"id": "X-1", "name": "a", "policy": [{"quantity_to_keep": 30, "unit": "Days"}]});

        let plan = diff(&schema_with_defaults(), Some(&prior), &json!({"name": "a", "policy": [{"unit": "days"}]}));
        assert!(!plan.has_changes());
        assert_eq!(plan.planned_state["policy"][0]["unit"], "Days");

        let plan = diff(&schema_with_defaults(), Some(&prior), &json!({"name": "a", "policy": [{"unit": "items"}]}));
        assert!(plan.has_changes());

        // Case still matters where the schema does not say otherwise.
        let plan = diff(&schema_with_defaults(), Some(&prior), &json!({"name": "A", "policy": [{}]}));
        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["name"]);
    }

    #[test]
    fn test_force_new_requires_replace() {
        let prior = json!({"id": "X-1", "name": "a", "owner_id": "Projects-1"});
        let plan = diff(&schema(), Some(&prior), &json!({"name": "b", "owner_id": "Projects-2"}));
        assert!(plan.requires_replace);
        assert_eq!(plan.changes.len(), 2);
    }

    #[test]
    fn test_delete() {
        let prior = json!({"id": "X-1", "name": "a", "owner_id": "Projects-1"});
        let plan = diff(&schema(), Some(&prior), &Value::Null);
        assert!(plan.planned_state.is_null());
        assert_eq!(plan.changes.len(), 3);
        assert!(plan.changes.iter().all(|c| c.after.is_none()));
        assert!(!plan.requires_replace);
    }
}
