//! `octopusdeploy_variable`: one variable in a project's or library set's
//! variable set.
//!
//! The server answers every mutation with the owner's whole set, so create
//! and update find their entry again with the [`locator`](crate::locator).
//! All mutations of a set run under the
//! [`MutationGuard`](crate::guard::MutationGuard).

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::VariableClient;
use crate::error::ProviderError;
use crate::guard::MutationGuard;
use crate::identity;
use crate::locator::{locate, ScopeMatcher, SetScopeMatcher, VariableCriteria};
use crate::models::{Variable, VariableScope, VariableSet, SENSITIVE_VARIABLE_TYPE, VARIABLE_TYPES};
use crate::resources::{decode, encode, null_as_default, require_id, space_or, VARIABLE};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, Diagnostic, NestedBlock, Schema};
use crate::types::ImportedResource;

/// A `scope` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeBlock {
    /// Deployment step ids.
    #[serde(default, deserialize_with = "null_as_default")]
    pub actions: Vec<String>,
    /// Channel ids.
    #[serde(default, deserialize_with = "null_as_default")]
    pub channels: Vec<String>,
    /// Environment ids.
    #[serde(default, deserialize_with = "null_as_default")]
    pub environments: Vec<String>,
    /// Deployment target ids.
    #[serde(default, deserialize_with = "null_as_default")]
    pub machines: Vec<String>,
    /// Process owner ids.
    #[serde(default, deserialize_with = "null_as_default")]
    pub processes: Vec<String>,
    /// Target roles.
    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: Vec<String>,
    /// Tenant tags.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tenant_tags: Vec<String>,
}

impl From<&ScopeBlock> for VariableScope {
    fn from(block: &ScopeBlock) -> Self {
        Self {
            actions: block.actions.clone(),
            channels: block.channels.clone(),
            environments: block.environments.clone(),
            machines: block.machines.clone(),
            processes: block.processes.clone(),
            roles: block.roles.clone(),
            tenant_tags: block.tenant_tags.clone(),
        }
    }
}

impl From<&VariableScope> for ScopeBlock {
    fn from(scope: &VariableScope) -> Self {
        Self {
            actions: scope.actions.clone(),
            channels: scope.channels.clone(),
            environments: scope.environments.clone(),
            machines: scope.machines.clone(),
            processes: scope.processes.clone(),
            roles: scope.roles.clone(),
            tenant_tags: scope.tenant_tags.clone(),
        }
    }
}

/// State of an `octopusdeploy_variable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableState {
    /// Variable id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Variable name.
    pub name: String,
    /// Description.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Owning space; falls back to the provider's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    /// Project or library variable set owning the variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Deprecated alias of `owner_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Value type, one of [`VARIABLE_TYPES`].
    #[serde(rename = "type")]
    pub variable_type: String,
    /// Plain value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Secret value; only ever taken from configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitive_value: Option<String>,
    /// Whether the value is secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_sensitive: Option<bool>,
    /// Whether the value can be edited in the UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_editable: Option<bool>,
    /// Zero or one scope block.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<ScopeBlock>,
}

impl VariableState {
    /// The owner the variable belongs to; `project_id` wins when both are set.
    pub fn owner(&self) -> Result<&str, ProviderError> {
        fn pick(id: &Option<String>) -> Option<&str> {
            id.as_deref().filter(|s| !s.is_empty())
        }
        pick(&self.project_id)
            .or_else(|| pick(&self.owner_id))
            .ok_or_else(|| {
                ProviderError::Validation("one of project_id or owner_id must be configured".to_string())
            })
    }

    fn is_sensitive(&self) -> bool {
        self.is_sensitive.unwrap_or(false)
    }
}

/// Schema of `octopusdeploy_variable`.
pub fn schema() -> Schema {
    let list = |description: &str| Attribute::optional_string_list().with_description(description);
    let scope = Block::new()
        .with_attribute("actions", list("A list of actions that are scoped to this variable value."))
        .with_attribute("channels", list("A list of channels that are scoped to this variable value."))
        .with_attribute("environments", list("A list of environments that are scoped to this variable value."))
        .with_attribute("machines", list("A list of machines that are scoped to this variable value."))
        .with_attribute("processes", list("A list of processes that are scoped to this variable value."))
        .with_attribute("roles", list("A list of roles that are scoped to this variable value."))
        .with_attribute("tenant_tags", list("A list of tenant tags that are scoped to this variable value."));

    Schema::v0()
        .with_description("This resource manages variables in Octopus Deploy.")
        .with_attribute("id", Attribute::id())
        .with_attribute("name", Attribute::required_string().with_description("The name of this variable."))
        .with_attribute(
            "description",
            Attribute::optional_computed_string().with_description("The description of this variable."),
        )
        .with_attribute(
            "space_id",
            Attribute::optional_computed_string()
                .with_description("The space ID associated with this variable."),
        )
        .with_attribute(
            "owner_id",
            Attribute::optional_string()
                .with_description("Owner ID for the variable (e.g., project ID or library variable set ID).")
                .with_force_new(),
        )
        .with_attribute(
            "project_id",
            Attribute::optional_string()
                .with_description("Deprecated; please use owner_id instead.")
                .with_force_new(),
        )
        .with_attribute(
            "type",
            Attribute::required_string().with_description(format!(
                "The type of variable represented by this resource. Valid types are {}.",
                VARIABLE_TYPES
                    .iter()
                    .map(|t| format!("`{}`", t))
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        )
        .with_attribute("value", Attribute::optional_string())
        .with_attribute("sensitive_value", Attribute::optional_string().sensitive())
        .with_attribute(
            "is_sensitive",
            Attribute::optional_bool().with_description(
                "Indicates whether or not this resource is considered sensitive and should be kept secret.",
            ),
        )
        .with_attribute(
            "is_editable",
            Attribute::new(AttributeType::Bool, AttributeFlags::optional_computed())
            .with_description("Indicates whether or not this variable is considered editable."),
        )
        .with_block("scope", NestedBlock::single(scope))
}

/// Checks spanning several attributes.
pub fn validate(config: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let text = |name: &str| config.get(name).and_then(Value::as_str);
    let is_set = |name: &str| config.get(name).is_some_and(|v| !v.is_null());

    let variable_type = text("type");
    let is_sensitive = config
        .get("is_sensitive")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if let Some(t) = variable_type {
        if !VARIABLE_TYPES.contains(&t) {
            diagnostics.push(
                Diagnostic::error("Invalid variable type")
                    .with_detail(format!("type must be one of {}", VARIABLE_TYPES.join(", ")))
                    .with_attribute("type"),
            );
        }
    }

    let sensitive_type = variable_type == Some(SENSITIVE_VARIABLE_TYPE);
    if is_sensitive && !sensitive_type {
        diagnostics.push(
            Diagnostic::error("Invalid variable configuration")
                .with_detail(format!(
                    "when is_sensitive is set to true, type needs to be '{}'",
                    SENSITIVE_VARIABLE_TYPE
                ))
                .with_attribute("type"),
        );
    }
    if !is_sensitive && sensitive_type {
        diagnostics.push(
            Diagnostic::error("Invalid variable configuration")
                .with_detail(format!(
                    "when type is set to '{}', is_sensitive needs to be true",
                    SENSITIVE_VARIABLE_TYPE
                ))
                .with_attribute("is_sensitive"),
        );
    }

    match (is_set("owner_id"), is_set("project_id")) {
        (false, false) => diagnostics.push(
            Diagnostic::error("invalid resource configuration")
                .with_detail("one of project_id or owner_id must be configured")
                .with_attribute("owner_id"),
        ),
        (true, true) => diagnostics.push(
            Diagnostic::error("Invalid attribute combination")
                .with_detail("owner_id cannot be specified when project_id is specified")
                .with_attribute("owner_id"),
        ),
        (false, true) => diagnostics.push(
            Diagnostic::warning("Deprecated attribute")
                .with_detail("project_id is deprecated; please use owner_id instead")
                .with_attribute("project_id"),
        ),
        (true, false) => {},
    }

    if is_set("value") && is_set("sensitive_value") {
        diagnostics.push(
            Diagnostic::error("Invalid attribute combination")
                .with_detail("value cannot be specified when sensitive_value is specified")
                .with_attribute("sensitive_value"),
        );
    }

    diagnostics
}

/// Build the remote variable described by `state`.
pub fn expand(state: &VariableState, space_id: &str) -> Variable {
    let mut variable = Variable::new(state.name.clone());
    variable.id = state.id.clone().unwrap_or_default();
    variable.description = state.description.clone();
    variable.is_editable = state.is_editable.unwrap_or(true);
    variable.is_sensitive = state.is_sensitive();
    variable.variable_type = state.variable_type.clone();
    variable.scope = state.scope.first().map(VariableScope::from).unwrap_or_default();
    variable.space_id = space_or(&state.space_id, space_id).to_string();

    if variable.is_sensitive {
        variable.variable_type = SENSITIVE_VARIABLE_TYPE.to_string();
        variable.value = state.sensitive_value.clone();
    } else {
        variable.value = state.value.clone();
    }
    variable
}

/// Fold a remote variable into `state`.
///
/// Attributes the configuration left out stay out; the secret value is never
/// taken from the server.
pub fn flatten(mut state: VariableState, variable: &Variable) -> VariableState {
    state.id = Some(variable.id.clone());
    if !variable.space_id.is_empty() {
        state.space_id = Some(variable.space_id.clone());
    }
    state.name = variable.name.clone();
    state.description = variable.description.clone();
    if state.is_editable.is_some() {
        state.is_editable = Some(variable.is_editable);
    }
    if state.is_sensitive.is_some() {
        state.is_sensitive = Some(variable.is_sensitive);
    }
    state.variable_type = variable.variable_type.clone();

    if variable.is_sensitive {
        state.value = None;
    } else if state.value.is_some() {
        state.value = variable.value.clone();
    }

    if !state.scope.is_empty() {
        state.scope = vec![ScopeBlock::from(&variable.scope)];
    }
    state
}

/// Write under the guard, then find `wanted` in the set the server returned.
async fn mutate_and_locate<F, Fut>(
    guard: &MutationGuard,
    owner: &str,
    wanted: &Variable,
    matcher: &dyn ScopeMatcher,
    write: F,
) -> Result<Variable, ProviderError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<VariableSet, ProviderError>>,
{
    guard
        .with_lock(|| async {
            let set = write().await?;
            let found = locate(&set.variables, &VariableCriteria::new(wanted, owner, matcher))?;
            Ok::<_, ProviderError>(found.clone())
        })
        .await
}

/// Add a variable to its owner's set.
pub async fn create<C>(
    client: &C,
    guard: &MutationGuard,
    space_id: &str,
    planned: Value,
) -> Result<Value, ProviderError>
where
    C: VariableClient + ?Sized,
{
    let state: VariableState = decode(planned)?;
    let owner = state.owner()?.to_string();
    let mut variable = expand(&state, space_id);
    variable.id.clear();
    let space = variable.space_id.clone();

    debug!(name = %variable.name, owner_id = %owner, "creating variable");
    let found = mutate_and_locate(guard, &owner, &variable, &SetScopeMatcher, || {
        client.add_variable(&space, &owner, variable.clone())
    })
    .await
    .map_err(|e| e.context("create variable failed"))?;
    info!(id = %found.id, owner_id = %owner, "variable created");

    encode(&flatten(state, &found))
}

/// Refresh a variable; [`Value::Null`] when it no longer exists.
pub async fn read<C>(client: &C, space_id: &str, current: Value) -> Result<Value, ProviderError>
where
    C: VariableClient + ?Sized,
{
    let state: VariableState = decode(current)?;
    let id = require_id(&state.id, "variable")?.to_string();
    let owner = state.owner()?.to_string();
    let space = space_or(&state.space_id, space_id).to_string();

    debug!(%id, owner_id = %owner, "reading variable");
    let variable = match client.get_variable(&space, &owner, &id).await {
        Ok(variable) => variable,
        Err(err) if err.is_not_found() => {
            warn!(%id, owner_id = %owner, "variable not found, removing from state");
            return Ok(Value::Null);
        },
        Err(err) => return Err(err.context("unable to load variable")),
    };

    encode(&flatten(state, &variable))
}

/// Replace a variable in its owner's set.
pub async fn update<C>(
    client: &C,
    guard: &MutationGuard,
    space_id: &str,
    prior: Value,
    planned: Value,
) -> Result<Value, ProviderError>
where
    C: VariableClient + ?Sized,
{
    let prior: VariableState = decode(prior)?;
    let state: VariableState = decode(planned)?;
    let id = require_id(&prior.id, "variable")?.to_string();
    let owner = state.owner()?.to_string();

    let mut variable = expand(&state, space_id);
    variable.id = id;
    let space = variable.space_id.clone();

    debug!(id = %variable.id, owner_id = %owner, "updating variable");
    let found = mutate_and_locate(guard, &owner, &variable, &SetScopeMatcher, || {
        client.update_variable(&space, &owner, variable.clone())
    })
    .await
    .map_err(|e| e.context("update variable failed"))?;
    info!(id = %found.id, "variable updated");

    encode(&flatten(state, &found))
}

/// Remove a variable from its owner's set. Already gone counts as removed.
pub async fn delete<C>(
    client: &C,
    guard: &MutationGuard,
    space_id: &str,
    current: Value,
) -> Result<(), ProviderError>
where
    C: VariableClient + ?Sized,
{
    let state: VariableState = decode(current)?;
    let id = require_id(&state.id, "variable")?;
    let owner = state.owner()?;
    let space = space_or(&state.space_id, space_id);

    debug!(id, owner_id = owner, "deleting variable");
    let outcome = guard
        .with_lock(|| client.delete_variable(space, owner, id))
        .await;
    match outcome {
        Ok(_) => {
            info!(id, "variable deleted");
            Ok(())
        },
        Err(err) if err.is_not_found() => {
            warn!(id, "variable already deleted");
            Ok(())
        },
        Err(err) => Err(err.context("unable to delete variable")),
    }
}

/// Import by `OwnerID:VariableID`.
pub async fn import<C>(client: &C, space_id: &str, import_id: &str) -> Result<ImportedResource, ProviderError>
where
    C: VariableClient + ?Sized,
{
    let (owner, id) = identity::parse(import_id).map_err(|_| {
        ProviderError::MalformedIdentity(format!(
            "{} import must be in the form of OwnerID:VariableID (e.g. Projects-62:0906031f-68ba-4a15-afaa-657c1564e07b), got '{}'",
            VARIABLE, import_id
        ))
    })?;

    let seed = serde_json::json!({
        "id": id,
        "owner_id": owner,
        "name": "",
        "type": "String",
        "value": "",
        "scope": [{}]
    });
    let state = read(client, space_id, seed).await?;
    if state.is_null() {
        return Err(ProviderError::NotFound(format!(
            "cannot import non-existent variable '{}'",
            import_id
        )));
    }
    Ok(ImportedResource::new(VARIABLE, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryOctopus;
    use serde_json::json;

    fn config(name: &str, value: &str) -> Value {
        json!({
            "owner_id": "Projects-1",
            "name": name,
            "type": "String",
            "value": value
        })
    }

    #[tokio::test]
    async fn test_create_locates_new_entry() {
        let octopus = InMemoryOctopus::new();
        let guard = MutationGuard::new();
        create(&octopus, &guard, "Spaces-1", config("Greeting", "hello")).await.unwrap();

        let state = create(&octopus, &guard, "Spaces-1", config("Farewell", "bye"))
            .await
            .unwrap();

        let stored = octopus.variables("Projects-1");
        let farewell = stored.iter().find(|v| v.name == "Farewell").unwrap();
        assert_eq!(state["id"], json!(farewell.id));
        assert_eq!(state["value"], "bye");
        assert_eq!(state["space_id"], "Spaces-1");
    }

    #[tokio::test]
    async fn test_sensitive_value_comes_from_config() {
        let octopus = InMemoryOctopus::new();
        let state = create(
            &octopus,
            &MutationGuard::new(),
            "Spaces-1",
            json!({
                "owner_id": "Projects-1",
                "name": "Password",
                "type": "Sensitive",
                "is_sensitive": true,
                "sensitive_value": "s3cret"
            }),
        )
        .await
        .unwrap();

        assert_eq!(state["sensitive_value"], "s3cret");
        assert!(state.get("value").is_none());
        assert_eq!(state["is_sensitive"], true);

        let refreshed = read(&octopus, "Spaces-1", state.clone()).await.unwrap();
        assert_eq!(refreshed, state);
    }

    #[tokio::test]
    async fn test_scoped_duplicates_are_told_apart() {
        let octopus = InMemoryOctopus::new();
        let guard = MutationGuard::new();
        let mut dev = config("Url", "http://example");
        dev["scope"] = json!([{"environments": ["Environments-1"]}]);
        let mut prod = config("Url", "http://example");
        prod["scope"] = json!([{"environments": ["Environments-2"]}]);

        let dev_state = create(&octopus, &guard, "Spaces-1", dev).await.unwrap();
        let prod_state = create(&octopus, &guard, "Spaces-1", prod).await.unwrap();

        assert_ne!(dev_state["id"], prod_state["id"]);
        assert_eq!(prod_state["scope"], json!([{
            "actions": [], "channels": [], "environments": ["Environments-2"],
            "machines": [], "processes": [], "roles": [], "tenant_tags": []
        }]));
    }

    #[tokio::test]
    async fn test_unscoped_duplicate_is_ambiguous() {
        let octopus = InMemoryOctopus::new();
        let guard = MutationGuard::new();
        create(&octopus, &guard, "Spaces-1", config("Dup", "same")).await.unwrap();

        let err = create(&octopus, &guard, "Spaces-1", config("Dup", "same"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AmbiguousMatch(_)));
    }

    #[tokio::test]
    async fn test_update_keeps_id_among_duplicates() {
        let octopus = InMemoryOctopus::new();
        let guard = MutationGuard::new();
        let first = create(&octopus, &guard, "Spaces-1", config("Dup", "one")).await.unwrap();
        create(&octopus, &guard, "Spaces-1", config("Dup", "two")).await.unwrap();

        // Both now share name and value; the known id settles it.
        let updated = update(&octopus, &guard, "Spaces-1", first.clone(), config("Dup", "two"))
            .await
            .unwrap();
        assert_eq!(updated["id"], first["id"]);
        assert_eq!(updated["value"], "two");
    }

    #[tokio::test]
    async fn test_project_id_is_accepted() {
        let octopus = InMemoryOctopus::new();
        let state = create(
            &octopus,
            &MutationGuard::new(),
            "Spaces-1",
            json!({"project_id": "Projects-7", "name": "Legacy", "type": "String", "value": "x"}),
        )
        .await
        .unwrap();
        assert_eq!(octopus.variables("Projects-7").len(), 1);
        assert_eq!(state["project_id"], "Projects-7");
    }

    #[tokio::test]
    async fn test_missing_owner_is_rejected() {
        let octopus = InMemoryOctopus::new();
        let err = create(
            &octopus,
            &MutationGuard::new(),
            "Spaces-1",
            json!({"name": "Orphan", "type": "String"}),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_read_and_delete_of_missing_variable() {
        let octopus = InMemoryOctopus::new();
        let guard = MutationGuard::new();
        let state = create(&octopus, &guard, "Spaces-1", config("Temp", "1")).await.unwrap();

        delete(&octopus, &guard, "Spaces-1", state.clone()).await.unwrap();
        assert!(octopus.variables("Projects-1").is_empty());
        assert!(read(&octopus, "Spaces-1", state.clone()).await.unwrap().is_null());
        delete(&octopus, &guard, "Spaces-1", state).await.unwrap();
    }

    #[tokio::test]
    async fn test_import() {
        let octopus = InMemoryOctopus::new();
        let state = create(&octopus, &MutationGuard::new(), "Spaces-1", config("Greeting", "hello"))
            .await
            .unwrap();
        let id = state["id"].as_str().unwrap();

        let imported = import(&octopus, "Spaces-1", &format!("Projects-1:{}", id))
            .await
            .unwrap();
        assert_eq!(imported.state["name"], "Greeting");
        assert_eq!(imported.state["value"], "hello");
        assert_eq!(imported.state["owner_id"], "Projects-1");

        let err = import(&octopus, "Spaces-1", id).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedIdentity(_)));
        assert!(err.message().contains("OwnerID:VariableID"));
    }

    #[test]
    fn test_owner_resolution() {
        let state = |owner: Option<&str>, project: Option<&str>| VariableState {
            id: None,
            name: "a".to_string(),
            description: String::new(),
            space_id: None,
            owner_id: owner.map(str::to_string),
            project_id: project.map(str::to_string),
            variable_type: "String".to_string(),
            value: None,
            sensitive_value: None,
            is_sensitive: None,
            is_editable: None,
            scope: Vec::new(),
        };

        assert_eq!(state(Some("LibraryVariableSets-1"), None).owner().unwrap(), "LibraryVariableSets-1");
        assert_eq!(state(Some("LibraryVariableSets-1"), Some("Projects-1")).owner().unwrap(), "Projects-1");
        assert_eq!(state(Some("LibraryVariableSets-1"), Some("")).owner().unwrap(), "LibraryVariableSets-1");
        assert!(matches!(state(Some(""), None).owner(), Err(ProviderError::Validation(_))));
    }

    #[test]
    fn test_validate_sensitive_type_pairing() {
        let diags = validate(&json!({
            "owner_id": "Projects-1", "name": "a", "type": "String", "is_sensitive": true
        }));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.as_deref().unwrap().contains("type needs to be 'Sensitive'"));

        let diags = validate(&json!({
            "owner_id": "Projects-1", "name": "a", "type": "Sensitive"
        }));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("is_sensitive"));

        assert!(validate(&json!({
            "owner_id": "Projects-1", "name": "a", "type": "Sensitive", "is_sensitive": true
        }))
        .is_empty());
    }

    #[test]
    fn test_validate_owner_and_values() {
        let diags = validate(&json!({"name": "a", "type": "String"}));
        assert!(diags[0].detail.as_deref().unwrap().contains("project_id or owner_id"));

        let diags = validate(&json!({
            "owner_id": "Projects-1", "project_id": "Projects-1", "name": "a", "type": "Bogus",
            "value": "x", "sensitive_value": "y"
        }));
        let attributes: Vec<_> = diags.iter().filter_map(|d| d.attribute.as_deref()).collect();
        assert_eq!(attributes, vec!["type", "owner_id", "sensitive_value"]);

        let diags = validate(&json!({"project_id": "Projects-1", "name": "a", "type": "String"}));
        assert_eq!(diags.len(), 1);
        assert!(!diags[0].is_error());
    }
}
