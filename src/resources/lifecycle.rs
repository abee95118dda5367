//! `octopusdeploy_lifecycle`: lifecycles and their phases.
//!
//! Both top-level retention policies are optional in configuration, but the
//! server always fills them in. They go through the
//! [`DefaultReconciler`](crate::reconcile::DefaultReconciler) on every
//! create, read and update so that an unconfigured policy never shows up in
//! state as `{30, false, Days}`. Phase-level policies pass through as-is.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::LifecycleClient;
use crate::error::ProviderError;
use crate::models::{Lifecycle, Phase, RetentionPolicy, RetentionUnit};
use crate::reconcile::{retention_reconciler, FieldState};
use crate::resources::{decode, encode, null_as_default, require_id, space_or};
use crate::schema::{Attribute, Block, Diagnostic, NestedBlock, Schema};
use crate::types::ImportedResource;

use super::LIFECYCLE;

const DEFAULT_QUANTITY: i64 = 30;
const DEFAULT_UNIT: &str = "Days";

fn default_quantity() -> i64 {
    DEFAULT_QUANTITY
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

/// A `release_retention_policy` or `tentacle_retention_policy` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicyBlock {
    /// Days or items to keep; 0 keeps everything.
    #[serde(default = "default_quantity")]
    pub quantity_to_keep: i64,
    /// Never delete anything.
    #[serde(default)]
    pub should_keep_forever: bool,
    /// `Days` or `Items`.
    #[serde(default = "default_unit")]
    pub unit: String,
}

impl TryFrom<&RetentionPolicyBlock> for RetentionPolicy {
    type Error = ProviderError;

    fn try_from(block: &RetentionPolicyBlock) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(block.quantity_to_keep).map_err(|_| {
            ProviderError::Validation(format!(
                "quantity_to_keep must be at least 0, got {}",
                block.quantity_to_keep
            ))
        })?;
        let unit: RetentionUnit = block.unit.parse()?;
        Ok(RetentionPolicy::new(quantity, unit, block.should_keep_forever))
    }
}

impl From<&RetentionPolicy> for RetentionPolicyBlock {
    fn from(policy: &RetentionPolicy) -> Self {
        Self {
            quantity_to_keep: i64::from(policy.quantity_to_keep),
            should_keep_forever: policy.should_keep_forever,
            unit: policy.unit.to_string(),
        }
    }
}

/// A `phase` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseBlock {
    /// Server-assigned phase id.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Phase name.
    pub name: String,
    /// Environments deployed to automatically.
    #[serde(default, deserialize_with = "null_as_default")]
    pub automatic_deployment_targets: Vec<String>,
    /// Environments deployed to on demand.
    #[serde(default, deserialize_with = "null_as_default")]
    pub optional_deployment_targets: Vec<String>,
    /// Environments required before promotion; 0 means all.
    #[serde(default, deserialize_with = "null_as_default")]
    pub minimum_environments_before_promotion: i64,
    /// Whether the phase can be skipped.
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_optional_phase: bool,
    /// Whether deployments in this phase are prioritised.
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_priority_phase: bool,
    /// Phase release retention override.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub release_retention_policy: Vec<RetentionPolicyBlock>,
    /// Phase tentacle retention override.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub tentacle_retention_policy: Vec<RetentionPolicyBlock>,
}

/// State of an `octopusdeploy_lifecycle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleState {
    /// Lifecycle id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Owning space; falls back to the provider's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    /// Lifecycle name.
    pub name: String,
    /// Description.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Phases, in promotion order.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub phase: Vec<PhaseBlock>,
    /// Zero or one release retention policy.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub release_retention_policy: Vec<RetentionPolicyBlock>,
    /// Zero or one tentacle retention policy.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub tentacle_retention_policy: Vec<RetentionPolicyBlock>,
}

fn retention_policy_block() -> NestedBlock {
    NestedBlock::single(
        Block::new()
            .with_attribute(
                "quantity_to_keep",
                Attribute::optional_int64()
                    .with_default(Value::from(DEFAULT_QUANTITY))
                    .with_description(
                        "The number of days/releases to keep. The default value is 30. If 0 then all are kept.",
                    ),
            )
            .with_attribute(
                "should_keep_forever",
                Attribute::optional_bool()
                    .with_default(Value::Bool(false))
                    .with_description("Indicates if items should never be deleted. The default value is false."),
            )
            .with_attribute(
                "unit",
                Attribute::optional_string()
                    .with_default(Value::from(DEFAULT_UNIT))
                    .with_case_insensitive()
                    .with_description(
                        "The unit of quantity to keep. Valid units are Days or Items. The default value is Days.",
                    ),
            )
            .with_description("Defines the retention policy for releases or tentacles."),
    )
}

/// Schema of `octopusdeploy_lifecycle`.
pub fn schema() -> Schema {
    let phase = Block::new()
        .with_attribute("id", Attribute::optional_computed_string())
        .with_attribute("name", Attribute::required_string())
        .with_attribute("automatic_deployment_targets", Attribute::optional_string_list())
        .with_attribute("optional_deployment_targets", Attribute::optional_string_list())
        .with_attribute(
            "minimum_environments_before_promotion",
            Attribute::optional_int64().with_default(Value::from(0)),
        )
        .with_attribute("is_optional_phase", Attribute::optional_bool().with_default(Value::Bool(false)))
        .with_attribute("is_priority_phase", Attribute::optional_bool().with_default(Value::Bool(false)))
        .with_block("release_retention_policy", retention_policy_block())
        .with_block("tentacle_retention_policy", retention_policy_block())
        .with_description("Defines a phase in the lifecycle.");

    Schema::v0()
        .with_description("This resource manages lifecycles in Octopus Deploy.")
        .with_attribute("id", Attribute::id())
        .with_attribute(
            "space_id",
            Attribute::optional_computed_string()
                .with_description("The space ID associated with this resource."),
        )
        .with_attribute(
            "name",
            Attribute::required_string().with_description("The name of this resource."),
        )
        .with_attribute(
            "description",
            Attribute::optional_computed_string()
                .with_description("The description of this lifecycle."),
        )
        .with_block("phase", NestedBlock::list(phase))
        .with_block("release_retention_policy", retention_policy_block())
        .with_block("tentacle_retention_policy", retention_policy_block())
}

/// Checks the schema cannot express: consistency of each retention policy.
///
/// `should_keep_forever` must be true exactly when `quantity_to_keep` is 0.
pub fn validate(config: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    check_policies(config, "", &mut diagnostics);
    if let Some(phases) = config.get("phase").and_then(Value::as_array) {
        for (i, phase) in phases.iter().enumerate() {
            check_policies(phase, &format!("phase.{}.", i), &mut diagnostics);
        }
    }
    diagnostics
}

fn check_policies(block: &Value, prefix: &str, diagnostics: &mut Vec<Diagnostic>) {
    for name in ["release_retention_policy", "tentacle_retention_policy"] {
        let Some(policies) = block.get(name).and_then(Value::as_array) else {
            continue;
        };
        for (i, policy) in policies.iter().enumerate() {
            let path = format!("{}{}.{}", prefix, name, i);
            let quantity = policy.get("quantity_to_keep").and_then(Value::as_i64);
            let forever = policy.get("should_keep_forever").and_then(Value::as_bool);

            if let (Some(quantity), Some(forever)) = (quantity, forever) {
                let detail = if quantity == 0 && !forever {
                    Some("should_keep_forever must be true when quantity_to_keep is 0")
                } else if quantity != 0 && forever {
                    Some("should_keep_forever must be false when quantity_to_keep is not 0")
                } else {
                    None
                };
                if let Some(detail) = detail {
                    diagnostics.push(
                        Diagnostic::error("Invalid retention policy configuration")
                            .with_detail(detail)
                            .with_attribute(format!("{}.should_keep_forever", path)),
                    );
                }
            }
            if quantity.is_some_and(|q| q < 0) {
                diagnostics.push(
                    Diagnostic::error("Invalid retention policy configuration")
                        .with_detail("quantity_to_keep must be at least 0")
                        .with_attribute(format!("{}.quantity_to_keep", path)),
                );
            }
            if let Some(unit) = policy.get("unit").and_then(Value::as_str) {
                if unit.parse::<RetentionUnit>().is_err() {
                    diagnostics.push(
                        Diagnostic::error("Invalid retention policy unit")
                            .with_detail("Unit must be either 'Days' or 'Items' (case insensitive)")
                            .with_attribute(format!("{}.unit", path)),
                    );
                }
            }
        }
    }
}

fn expand_policy(blocks: &[RetentionPolicyBlock]) -> Result<Option<RetentionPolicy>, ProviderError> {
    blocks.first().map(RetentionPolicy::try_from).transpose()
}

fn flatten_policy(policy: Option<&RetentionPolicy>) -> Vec<RetentionPolicyBlock> {
    policy.map(RetentionPolicyBlock::from).into_iter().collect()
}

fn expand_phase(block: &PhaseBlock) -> Result<Phase, ProviderError> {
    let minimum = u32::try_from(block.minimum_environments_before_promotion).map_err(|_| {
        ProviderError::Validation(format!(
            "minimum_environments_before_promotion must be at least 0 in phase '{}'",
            block.name
        ))
    })?;
    Ok(Phase {
        id: block.id.clone(),
        name: block.name.clone(),
        automatic_deployment_targets: block.automatic_deployment_targets.clone(),
        optional_deployment_targets: block.optional_deployment_targets.clone(),
        minimum_environments_before_promotion: minimum,
        is_optional_phase: block.is_optional_phase,
        is_priority_phase: block.is_priority_phase,
        release_retention_policy: expand_policy(&block.release_retention_policy)?,
        tentacle_retention_policy: expand_policy(&block.tentacle_retention_policy)?,
    })
}

fn flatten_phase(phase: &Phase) -> PhaseBlock {
    PhaseBlock {
        id: phase.id.clone(),
        name: phase.name.clone(),
        automatic_deployment_targets: phase.automatic_deployment_targets.clone(),
        optional_deployment_targets: phase.optional_deployment_targets.clone(),
        minimum_environments_before_promotion: i64::from(phase.minimum_environments_before_promotion),
        is_optional_phase: phase.is_optional_phase,
        is_priority_phase: phase.is_priority_phase,
        release_retention_policy: flatten_policy(phase.release_retention_policy.as_ref()),
        tentacle_retention_policy: flatten_policy(phase.tentacle_retention_policy.as_ref()),
    }
}

/// Build the remote lifecycle described by `state`, without touching defaults.
pub fn expand(state: &LifecycleState, space_id: &str) -> Result<Lifecycle, ProviderError> {
    Ok(Lifecycle {
        id: state.id.clone().unwrap_or_default(),
        space_id: space_or(&state.space_id, space_id).to_string(),
        name: state.name.clone(),
        description: state.description.clone(),
        phases: state
            .phase
            .iter()
            .map(expand_phase)
            .collect::<Result<_, _>>()?,
        release_retention_policy: expand_policy(&state.release_retention_policy)?,
        tentacle_retention_policy: expand_policy(&state.tentacle_retention_policy)?,
    })
}

/// Describe a remote lifecycle as state, exactly as returned.
pub fn flatten(lifecycle: &Lifecycle) -> LifecycleState {
    LifecycleState {
        id: Some(lifecycle.id.clone()),
        space_id: Some(lifecycle.space_id.clone()),
        name: lifecycle.name.clone(),
        description: lifecycle.description.clone(),
        phase: lifecycle.phases.iter().map(flatten_phase).collect(),
        release_retention_policy: flatten_policy(lifecycle.release_retention_policy.as_ref()),
        tentacle_retention_policy: flatten_policy(lifecycle.tentacle_retention_policy.as_ref()),
    }
}

/// Where each top-level policy stood when a request was built.
struct Retention {
    release: FieldState<RetentionPolicy>,
    tentacle: FieldState<RetentionPolicy>,
}

impl Retention {
    fn from_state(state: &LifecycleState) -> Result<Self, ProviderError> {
        Ok(Self {
            release: FieldState::from_config(expand_policy(&state.release_retention_policy)?),
            tentacle: FieldState::from_config(expand_policy(&state.tentacle_retention_policy)?),
        })
    }

    /// Fill unset policies with the server default before sending.
    fn outgoing(self) -> Self {
        let reconciler = retention_reconciler();
        Self {
            release: reconciler.outgoing(self.release),
            tentacle: reconciler.outgoing(self.tentacle),
        }
    }

    fn apply(&self, lifecycle: &mut Lifecycle) {
        lifecycle.release_retention_policy = self.release.request_value().cloned();
        lifecycle.tentacle_retention_policy = self.tentacle.request_value().cloned();
    }

    /// State for what the server answered, with injected defaults removed again.
    fn settle(&self, mut lifecycle: Lifecycle) -> LifecycleState {
        let reconciler = retention_reconciler();
        lifecycle.release_retention_policy =
            reconciler.incoming(&self.release, lifecycle.release_retention_policy.take());
        lifecycle.tentacle_retention_policy =
            reconciler.incoming(&self.tentacle, lifecycle.tentacle_retention_policy.take());
        flatten(&lifecycle)
    }
}

fn prepare(state: &LifecycleState, space_id: &str) -> Result<(Lifecycle, Retention), ProviderError> {
    let retention = Retention::from_state(state)?.outgoing();
    let mut lifecycle = expand(state, space_id)?;
    retention.apply(&mut lifecycle);
    Ok((lifecycle, retention))
}

/// Create a lifecycle.
pub async fn create<C>(client: &C, space_id: &str, planned: Value) -> Result<Value, ProviderError>
where
    C: LifecycleClient + ?Sized,
{
    let state: LifecycleState = decode(planned)?;
    let (lifecycle, retention) = prepare(&state, space_id)?;

    debug!(name = %lifecycle.name, space_id = %lifecycle.space_id, "creating lifecycle");
    let created = client
        .add_lifecycle(lifecycle)
        .await
        .map_err(|e| e.context("unable to create lifecycle"))?;
    info!(id = %created.id, "lifecycle created");

    encode(&retention.settle(created))
}

/// Refresh a lifecycle; [`Value::Null`] when it no longer exists.
pub async fn read<C>(client: &C, space_id: &str, current: Value) -> Result<Value, ProviderError>
where
    C: LifecycleClient + ?Sized,
{
    let state: LifecycleState = decode(current)?;
    let id = require_id(&state.id, "lifecycle")?;
    let space = space_or(&state.space_id, space_id);
    // Nothing is sent, so an absent policy stays Unset and a returned default is dropped.
    let retention = Retention::from_state(&state)?;

    debug!(id, space_id = space, "reading lifecycle");
    let lifecycle = match client.get_lifecycle(space, id).await {
        Ok(lifecycle) => lifecycle,
        Err(err) if err.is_not_found() => {
            warn!(id, "lifecycle not found, removing from state");
            return Ok(Value::Null);
        },
        Err(err) => return Err(err.context("unable to load lifecycle")),
    };

    encode(&retention.settle(lifecycle))
}

/// Update a lifecycle in place.
pub async fn update<C>(
    client: &C,
    space_id: &str,
    prior: Value,
    planned: Value,
) -> Result<Value, ProviderError>
where
    C: LifecycleClient + ?Sized,
{
    let prior: LifecycleState = decode(prior)?;
    let planned: LifecycleState = decode(planned)?;
    let id = require_id(&prior.id, "lifecycle")?;

    let (mut lifecycle, retention) = prepare(&planned, space_id)?;
    lifecycle.id = id.to_string();

    debug!(id, "updating lifecycle");
    let updated = client
        .update_lifecycle(lifecycle)
        .await
        .map_err(|e| e.context("unable to update lifecycle"))?;
    info!(id = %updated.id, "lifecycle updated");

    encode(&retention.settle(updated))
}

/// Delete a lifecycle. Already gone counts as deleted.
pub async fn delete<C>(client: &C, space_id: &str, current: Value) -> Result<(), ProviderError>
where
    C: LifecycleClient + ?Sized,
{
    let state: LifecycleState = decode(current)?;
    let id = require_id(&state.id, "lifecycle")?;
    let space = space_or(&state.space_id, space_id);

    debug!(id, "deleting lifecycle");
    match client.delete_lifecycle(space, id).await {
        Ok(()) => {
            info!(id, "lifecycle deleted");
            Ok(())
        },
        Err(err) if err.is_not_found() => {
            warn!(id, "lifecycle already deleted");
            Ok(())
        },
        Err(err) => Err(err.context("unable to delete lifecycle")),
    }
}

/// Import by `Lifecycles-1` or `Spaces-1/Lifecycles-1`.
pub async fn import<C>(client: &C, space_id: &str, import_id: &str) -> Result<ImportedResource, ProviderError>
where
    C: LifecycleClient + ?Sized,
{
    let mut segments = import_id.rsplit('/');
    let id = segments.next().unwrap_or_default();
    if id.is_empty() {
        return Err(ProviderError::MalformedIdentity(format!(
            "lifecycle import id '{}' must end with the lifecycle ID",
            import_id
        )));
    }
    let space = segments.next().filter(|s| !s.is_empty()).unwrap_or(space_id);

    let seed = serde_json::json!({"id": id, "space_id": space, "name": ""});
    let state = read(client, space_id, seed).await?;
    if state.is_null() {
        return Err(ProviderError::NotFound(format!(
            "cannot import non-existent lifecycle '{}'",
            id
        )));
    }
    Ok(ImportedResource::new(LIFECYCLE, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryOctopus;
    use serde_json::json;

    fn phase(name: &str, env: &str) -> Value {
        json!({
            "name": name,
            "automatic_deployment_targets": [env],
            "minimum_environments_before_promotion": 1
        })
    }

    #[tokio::test]
    async fn test_create_without_policies_stores_none() {
        let octopus = InMemoryOctopus::new();

        let state = create(&octopus, "Spaces-1", json!({"name": "Default"}))
            .await
            .unwrap();

        assert!(state.get("release_retention_policy").is_none());
        assert!(state.get("tentacle_retention_policy").is_none());

        // The server itself holds the injected default.
        let id = state["id"].as_str().unwrap();
        let stored = octopus.lifecycle(id).unwrap();
        assert_eq!(stored.release_retention_policy, Some(RetentionPolicy::server_default()));
        assert_eq!(stored.tentacle_retention_policy, Some(RetentionPolicy::server_default()));
    }

    #[tokio::test]
    async fn test_create_sends_default_for_unset_policy() {
        let octopus = InMemoryOctopus::new().without_server_defaults();

        let state = create(&octopus, "Spaces-1", json!({"name": "Default"}))
            .await
            .unwrap();

        let stored = octopus.lifecycle(state["id"].as_str().unwrap()).unwrap();
        assert_eq!(stored.release_retention_policy, Some(RetentionPolicy::server_default()));
        assert!(state.get("release_retention_policy").is_none());
    }

    #[tokio::test]
    async fn test_explicit_default_is_kept() {
        let octopus = InMemoryOctopus::new();

        let state = create(
            &octopus,
            "Spaces-1",
            json!({
                "name": "Default",
                "release_retention_policy": [{"quantity_to_keep": 30, "should_keep_forever": false, "unit": "Days"}]
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            state["release_retention_policy"],
            json!([{"quantity_to_keep": 30, "should_keep_forever": false, "unit": "Days"}])
        );
        assert!(state.get("tentacle_retention_policy").is_none());
    }

    #[tokio::test]
    async fn test_phases_round_trip_in_order() {
        let octopus = InMemoryOctopus::new();

        let state = create(
            &octopus,
            "Spaces-1",
            json!({
                "name": "Promotion",
                "phase": [
                    phase("Dev", "Environments-1"),
                    phase("Test", "Environments-2"),
                    {
                        "name": "Prod",
                        "optional_deployment_targets": ["Environments-3"],
                        "is_optional_phase": true,
                        "release_retention_policy": [{"quantity_to_keep": 30, "should_keep_forever": false, "unit": "Days"}]
                    }
                ]
            }),
        )
        .await
        .unwrap();

        let phases = state["phase"].as_array().unwrap();
        let names: Vec<_> = phases.iter().map(|p| p["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Dev", "Test", "Prod"]);
        assert_eq!(phases[0]["automatic_deployment_targets"], json!(["Environments-1"]));
        assert_eq!(phases[2]["optional_deployment_targets"], json!(["Environments-3"]));
        assert_eq!(phases[2]["is_optional_phase"], json!(true));
        // Phase policies are never reconciled, even when equal to the default.
        assert_eq!(
            phases[2]["release_retention_policy"],
            json!([{"quantity_to_keep": 30, "should_keep_forever": false, "unit": "Days"}])
        );
        assert!(phases.iter().all(|p| !p["id"].as_str().unwrap().is_empty()));

        // Reading back gives the same document.
        let refreshed = read(&octopus, "Spaces-1", state.clone()).await.unwrap();
        assert_eq!(refreshed, state);
    }

    #[tokio::test]
    async fn test_update_with_explicit_release_policy() {
        let octopus = InMemoryOctopus::new();
        let created = create(&octopus, "Spaces-1", json!({"name": "Default"}))
            .await
            .unwrap();

        let mut planned = created.clone();
        planned["release_retention_policy"] =
            json!([{"quantity_to_keep": 60, "should_keep_forever": false, "unit": "Days"}]);

        let updated = update(&octopus, "Spaces-1", created, planned).await.unwrap();
        assert_eq!(
            updated["release_retention_policy"],
            json!([{"quantity_to_keep": 60, "should_keep_forever": false, "unit": "Days"}])
        );
        assert!(updated.get("tentacle_retention_policy").is_none());
    }

    #[tokio::test]
    async fn test_read_missing_lifecycle_removes_state() {
        let octopus = InMemoryOctopus::new();
        let state = read(&octopus, "Spaces-1", json!({"id": "Lifecycles-404", "name": "Gone"}))
            .await
            .unwrap();
        assert!(state.is_null());
    }

    #[tokio::test]
    async fn test_read_surfaces_other_errors() {
        let octopus = InMemoryOctopus::new();
        let created = create(&octopus, "Spaces-1", json!({"name": "Default"}))
            .await
            .unwrap();

        octopus.fail_next("get_lifecycle", 500);
        let err = read(&octopus, "Spaces-1", created).await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 500, .. }));
        assert!(err.message().starts_with("unable to load lifecycle"));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let octopus = InMemoryOctopus::new();
        let created = create(&octopus, "Spaces-1", json!({"name": "Default"}))
            .await
            .unwrap();

        delete(&octopus, "Spaces-1", created.clone()).await.unwrap();
        assert!(octopus.lifecycle(created["id"].as_str().unwrap()).is_none());
        delete(&octopus, "Spaces-1", created).await.unwrap();
    }

    #[tokio::test]
    async fn test_import_takes_last_path_segment() {
        let octopus = InMemoryOctopus::new();
        let created = create(&octopus, "Spaces-1", json!({"name": "Default"}))
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap();

        let imported = import(&octopus, "Spaces-1", &format!("Spaces-1/{}", id))
            .await
            .unwrap();
        assert_eq!(imported.resource_type, LIFECYCLE);
        assert_eq!(imported.state, created);

        let imported = import(&octopus, "Spaces-1", id).await.unwrap();
        assert_eq!(imported.state["name"], "Default");

        let err = import(&octopus, "Spaces-1", "Lifecycles-999").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(import(&octopus, "Spaces-1", "Spaces-1/").await.is_err());
    }

    #[test]
    fn test_validate_retention_rules() {
        let diags = validate(&json!({
            "name": "Default",
            "release_retention_policy": [{"quantity_to_keep": 0, "should_keep_forever": false}],
            "tentacle_retention_policy": [{"quantity_to_keep": 5, "should_keep_forever": true, "unit": "Weeks"}],
            "phase": [{
                "name": "Dev",
                "release_retention_policy": [{"quantity_to_keep": -1, "unit": "items"}]
            }]
        }));

        let paths: Vec<_> = diags.iter().filter_map(|d| d.attribute.clone()).collect();
        assert_eq!(
            paths,
            vec![
                "release_retention_policy.0.should_keep_forever",
                "tentacle_retention_policy.0.should_keep_forever",
                "tentacle_retention_policy.0.unit",
                "phase.0.release_retention_policy.0.quantity_to_keep",
            ]
        );

        assert!(validate(&json!({
            "name": "Default",
            "release_retention_policy": [{"quantity_to_keep": 0, "should_keep_forever": true, "unit": "Items"}]
        }))
        .is_empty());
    }

    #[test]
    fn test_phase_mapping_is_lossless() {
        let targets = |ids: &[&str]| ids.iter().map(|id| id.to_string()).collect::<Vec<_>>();
        let phases = vec![
            Phase {
                id: "Phases-1".to_string(),
                name: "Empty".to_string(),
                ..Default::default()
            },
            Phase {
                id: "Phases-2".to_string(),
                name: "Single".to_string(),
                automatic_deployment_targets: targets(&["Environments-1"]),
                optional_deployment_targets: targets(&["Environments-2"]),
                minimum_environments_before_promotion: 1,
                is_priority_phase: true,
                release_retention_policy: Some(RetentionPolicy::keep_forever()),
                ..Default::default()
            },
            Phase {
                id: "Phases-3".to_string(),
                name: "Multi".to_string(),
                automatic_deployment_targets: targets(&["Environments-3", "Environments-4"]),
                optional_deployment_targets: targets(&["Environments-5", "Environments-6", "Environments-7"]),
                minimum_environments_before_promotion: 3,
                is_optional_phase: true,
                is_priority_phase: true,
                release_retention_policy: Some(RetentionPolicy::new(7, RetentionUnit::Days, false)),
                tentacle_retention_policy: Some(RetentionPolicy::new(3, RetentionUnit::Items, false)),
            },
        ];

        for phase in phases {
            let block = flatten_phase(&phase);
            assert_eq!(expand_phase(&block).unwrap(), phase);
        }
    }

    #[test]
    fn test_negative_minimum_is_rejected() {
        let block = PhaseBlock {
            minimum_environments_before_promotion: -1,
            ..flatten_phase(&Phase {
                name: "Dev".to_string(),
                ..Default::default()
            })
        };
        assert!(matches!(expand_phase(&block), Err(ProviderError::Validation(_))));
    }

    #[test]
    fn test_block_defaults_match_server_default() {
        let block: RetentionPolicyBlock = serde_json::from_value(json!({})).unwrap();
        let policy = RetentionPolicy::try_from(&block).unwrap();
        assert!(policy.is_server_default());
    }
}
