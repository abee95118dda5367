//! `octopusdeploy_deployment_freeze_project`: one project's entry in a
//! deployment freeze's project scope.
//!
//! The entry lives inside the freeze document, so every write is a
//! fetch-mutate-write of the whole freeze under the
//! [`MutationGuard`](crate::guard::MutationGuard). The resource id is the
//! composite `freezeID:projectID`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::DeploymentFreezeClient;
use crate::error::ProviderError;
use crate::guard::MutationGuard;
use crate::identity;
use crate::models::DeploymentFreeze;
use crate::resources::{decode, encode, null_as_default, DEPLOYMENT_FREEZE_PROJECT};
use crate::schema::{Attribute, Schema};
use crate::types::ImportedResource;

/// State of an `octopusdeploy_deployment_freeze_project`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeProjectState {
    /// `freezeID:projectID`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The freeze this scope belongs to.
    pub deploymentfreeze_id: String,
    /// The frozen project.
    pub project_id: String,
    /// Frozen environments of the project.
    #[serde(default, deserialize_with = "null_as_default")]
    pub environment_ids: Vec<String>,
}

impl FreezeProjectState {
    fn from_id(id: &str) -> Result<Self, ProviderError> {
        let (freeze_id, project_id) = identity::parse(id)?;
        Ok(Self {
            id: Some(id.to_string()),
            deploymentfreeze_id: freeze_id,
            project_id,
            environment_ids: Vec::new(),
        })
    }

    fn with_composite_id(mut self) -> Result<Self, ProviderError> {
        let id = identity::build(&self.deploymentfreeze_id, &self.project_id)?;
        self.id = Some(id.into_string());
        Ok(self)
    }
}

/// Schema of `octopusdeploy_deployment_freeze_project`.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("Manages the project scope of a deployment freeze.")
        .with_attribute("id", Attribute::id())
        .with_attribute(
            "deploymentfreeze_id",
            Attribute::required_string()
                .with_description("The deployment freeze ID associated with this freeze scope.")
                .with_force_new(),
        )
        .with_attribute(
            "project_id",
            Attribute::required_string()
                .with_description("The project ID associated with this freeze scope.")
                .with_force_new(),
        )
        .with_attribute(
            "environment_ids",
            Attribute::optional_string_list()
                .with_description("The environment IDs associated with this project deployment freeze scope."),
        )
}

async fn load_freeze<C>(client: &C, freeze_id: &str) -> Result<DeploymentFreeze, ProviderError>
where
    C: DeploymentFreezeClient + ?Sized,
{
    client
        .get_deployment_freeze(freeze_id)
        .await
        .map_err(|e| e.context("cannot load deployment freeze"))
}

async fn write_freeze<C>(client: &C, freeze: DeploymentFreeze) -> Result<DeploymentFreeze, ProviderError>
where
    C: DeploymentFreezeClient + ?Sized,
{
    client
        .update_deployment_freeze(freeze)
        .await
        .map_err(|e| e.context("error while updating deployment freeze"))
}

/// Set the project's environments on the freeze and write it back.
async fn put_scope<C>(
    client: &C,
    guard: &MutationGuard,
    plan: &FreezeProjectState,
) -> Result<Vec<String>, ProviderError>
where
    C: DeploymentFreezeClient + ?Sized,
{
    guard
        .with_lock(|| async {
            let mut freeze = load_freeze(client, &plan.deploymentfreeze_id).await?;
            freeze
                .project_environment_scope
                .insert(plan.project_id.clone(), plan.environment_ids.clone());
            let written = write_freeze(client, freeze).await?;
            Ok::<_, ProviderError>(
                written
                    .project_environment_scope
                    .get(&plan.project_id)
                    .cloned()
                    .unwrap_or_else(|| plan.environment_ids.clone()),
            )
        })
        .await
}

/// Add the project scope to its freeze.
pub async fn create<C>(client: &C, guard: &MutationGuard, planned: Value) -> Result<Value, ProviderError>
where
    C: DeploymentFreezeClient + ?Sized,
{
    let plan: FreezeProjectState = decode(planned)?;
    debug!(
        project_id = %plan.project_id,
        freeze_id = %plan.deploymentfreeze_id,
        "adding project to deployment freeze"
    );

    let environment_ids = put_scope(client, guard, &plan).await?;
    let state = FreezeProjectState {
        environment_ids,
        ..plan
    }
    .with_composite_id()?;

    info!(id = state.id.as_deref().unwrap_or_default(), "project scope added to deployment freeze");
    encode(&state)
}

/// Refresh the project scope; [`Value::Null`] when the freeze or the entry is gone.
pub async fn read<C>(client: &C, current: Value) -> Result<Value, ProviderError>
where
    C: DeploymentFreezeClient + ?Sized,
{
    let state: FreezeProjectState = decode(current)?;
    let id = match state.id.as_deref() {
        Some(id) => id.to_string(),
        None => identity::build(&state.deploymentfreeze_id, &state.project_id)?.into_string(),
    };
    let (freeze_id, project_id) = identity::parse(&id)?;

    debug!(%id, "reading deployment freeze project scope");
    let freeze = match client.get_deployment_freeze(&freeze_id).await {
        Ok(freeze) => freeze,
        Err(err) if err.is_not_found() => {
            warn!(%freeze_id, "deployment freeze not found, removing project scope from state");
            return Ok(Value::Null);
        },
        Err(err) => return Err(err.context("unable to load deployment freeze")),
    };

    let Some(environment_ids) = freeze.project_environment_scope.get(&project_id) else {
        warn!(%freeze_id, %project_id, "project no longer in deployment freeze, removing from state");
        return Ok(Value::Null);
    };

    encode(&FreezeProjectState {
        id: Some(id.clone()),
        deploymentfreeze_id: freeze_id,
        project_id,
        environment_ids: environment_ids.clone(),
    })
}

/// Replace the project's environments.
///
/// A missing freeze is an error here: there is nothing to update.
pub async fn update<C>(
    client: &C,
    guard: &MutationGuard,
    prior: Value,
    planned: Value,
) -> Result<Value, ProviderError>
where
    C: DeploymentFreezeClient + ?Sized,
{
    let prior: FreezeProjectState = decode(prior)?;
    let mut plan: FreezeProjectState = decode(planned)?;
    // Both ids force replacement, so the prior ones still address the entry.
    plan.deploymentfreeze_id = prior.deploymentfreeze_id;
    plan.project_id = prior.project_id;

    debug!(
        project_id = %plan.project_id,
        freeze_id = %plan.deploymentfreeze_id,
        "updating project in deployment freeze"
    );
    let environment_ids = put_scope(client, guard, &plan).await?;
    let state = FreezeProjectState {
        environment_ids,
        ..plan
    }
    .with_composite_id()?;

    info!(id = state.id.as_deref().unwrap_or_default(), "deployment freeze project scope updated");
    encode(&state)
}

/// Remove the project from its freeze. A missing freeze counts as removed.
pub async fn delete<C>(client: &C, guard: &MutationGuard, current: Value) -> Result<(), ProviderError>
where
    C: DeploymentFreezeClient + ?Sized,
{
    let state: FreezeProjectState = decode(current)?;
    let freeze_id = state.deploymentfreeze_id.as_str();
    let project_id = state.project_id.as_str();

    guard
        .with_lock(|| async {
            let mut freeze = match client.get_deployment_freeze(freeze_id).await {
                Ok(freeze) => freeze,
                Err(err) if err.is_not_found() => {
                    warn!(freeze_id, "deployment freeze already deleted");
                    return Ok(());
                },
                Err(err) => return Err(err.context("unable to load deployment freeze")),
            };

            if freeze.project_environment_scope.remove(project_id).is_none() {
                debug!(freeze_id, project_id, "project already absent from deployment freeze");
                return Ok(());
            }
            client.update_deployment_freeze(freeze).await.map_err(|e| {
                e.context(format!(
                    "cannot remove project scope ({}) from deployment freeze ({})",
                    project_id, freeze_id
                ))
            })?;
            info!(freeze_id, project_id, "project scope removed from deployment freeze");
            Ok::<_, ProviderError>(())
        })
        .await
}

/// Import by `freezeID:projectID`.
pub async fn import<C>(client: &C, import_id: &str) -> Result<ImportedResource, ProviderError>
where
    C: DeploymentFreezeClient + ?Sized,
{
    let seed = encode(&FreezeProjectState::from_id(import_id)?)?;
    let state = read(client, seed).await?;
    if state.is_null() {
        return Err(ProviderError::NotFound(format!(
            "deployment freeze project scope '{}' does not exist",
            import_id
        )));
    }
    Ok(ImportedResource::new(DEPLOYMENT_FREEZE_PROJECT, state))
}
