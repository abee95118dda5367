//! `octopusdeploy_deployment_freeze_tenant`: one tenant/project/environment
//! triple in a deployment freeze.
//!
//! Same shape as [`freeze_project`](super::freeze_project), over the freeze's
//! tenant list. The id is `freezeID:tenantID:projectID:environmentID`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::DeploymentFreezeClient;
use crate::error::ProviderError;
use crate::guard::MutationGuard;
use crate::identity;
use crate::locator::{contains, TenantScopeCriteria};
use crate::models::TenantProjectEnvironment;
use crate::resources::{decode, encode, DEPLOYMENT_FREEZE_TENANT};
use crate::schema::{Attribute, Schema};
use crate::types::ImportedResource;

const ID_PARTS: usize = 4;

/// State of an `octopusdeploy_deployment_freeze_tenant`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeTenantState {
    /// `freezeID:tenantID:projectID:environmentID`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The freeze this scope belongs to.
    pub deploymentfreeze_id: String,
    /// Tenant.
    pub tenant_id: String,
    /// Project.
    pub project_id: String,
    /// Environment.
    pub environment_id: String,
}

impl FreezeTenantState {
    fn from_id(id: &str) -> Result<Self, ProviderError> {
        let mut parts = identity::parse_parts(id, ID_PARTS)?.into_iter();
        let mut next = || parts.next().unwrap_or_default();
        Ok(Self {
            id: Some(id.to_string()),
            deploymentfreeze_id: next(),
            tenant_id: next(),
            project_id: next(),
            environment_id: next(),
        })
    }

    fn triple(&self) -> TenantProjectEnvironment {
        TenantProjectEnvironment {
            tenant_id: self.tenant_id.clone(),
            project_id: self.project_id.clone(),
            environment_id: self.environment_id.clone(),
        }
    }

    fn with_composite_id(mut self) -> Result<Self, ProviderError> {
        let id = identity::build_parts(&[
            &self.deploymentfreeze_id,
            &self.tenant_id,
            &self.project_id,
            &self.environment_id,
        ])?;
        self.id = Some(id.into_string());
        Ok(self)
    }
}

/// Schema of `octopusdeploy_deployment_freeze_tenant`.
pub fn schema() -> Schema {
    let part = |description: &str| {
        Attribute::required_string()
            .with_description(description)
            .with_force_new()
    };
    Schema::v0()
        .with_description("Manages a tenant scope of a deployment freeze.")
        .with_attribute("id", Attribute::id())
        .with_attribute("deploymentfreeze_id", part("The deployment freeze ID."))
        .with_attribute("tenant_id", part("The tenant ID."))
        .with_attribute("project_id", part("The project ID."))
        .with_attribute("environment_id", part("The environment ID."))
}

/// Add the triple to its freeze. An identical triple is not added twice.
pub async fn create<C>(client: &C, guard: &MutationGuard, planned: Value) -> Result<Value, ProviderError>
where
    C: DeploymentFreezeClient + ?Sized,
{
    let plan: FreezeTenantState = decode(planned)?;
    let wanted = plan.triple();
    debug!(
        tenant_id = %plan.tenant_id,
        freeze_id = %plan.deploymentfreeze_id,
        "adding tenant to deployment freeze"
    );

    guard
        .with_lock(|| async {
            let mut freeze = client
                .get_deployment_freeze(&plan.deploymentfreeze_id)
                .await
                .map_err(|e| e.context("cannot load deployment freeze"))?;

            let criteria = TenantScopeCriteria::new(&wanted);
            if contains(&freeze.tenant_project_environment_scope, &criteria)? {
                debug!("tenant scope already present");
                return Ok(());
            }

            freeze.tenant_project_environment_scope.push(wanted.clone());
            debug!(
                total = freeze.tenant_project_environment_scope.len(),
                "updating deployment freeze with new tenant scope"
            );
            client
                .update_deployment_freeze(freeze)
                .await
                .map_err(|e| e.context("error while updating deployment freeze"))?;
            Ok::<_, ProviderError>(())
        })
        .await?;

    let state = plan.with_composite_id()?;
    info!(id = state.id.as_deref().unwrap_or_default(), "tenant scope added to deployment freeze");
    encode(&state)
}

/// Refresh the triple; [`Value::Null`] when the freeze or the triple is gone.
pub async fn read<C>(client: &C, current: Value) -> Result<Value, ProviderError>
where
    C: DeploymentFreezeClient + ?Sized,
{
    let state: FreezeTenantState = decode(current)?;
    let state = match state.id.as_deref() {
        Some(id) => FreezeTenantState::from_id(id)?,
        None => state.with_composite_id()?,
    };
    let freeze_id = state.deploymentfreeze_id.as_str();

    debug!(id = state.id.as_deref().unwrap_or_default(), "reading deployment freeze tenant scope");
    let freeze = match client.get_deployment_freeze(freeze_id).await {
        Ok(freeze) => freeze,
        Err(err) if err.is_not_found() => {
            warn!(freeze_id, "deployment freeze not found, removing tenant scope from state");
            return Ok(Value::Null);
        },
        Err(err) => return Err(err.context("unable to load deployment freeze")),
    };

    let wanted = state.triple();
    if contains(&freeze.tenant_project_environment_scope, &TenantScopeCriteria::new(&wanted))? {
        encode(&state)
    } else {
        warn!(freeze_id, tenant_id = %wanted.tenant_id, "tenant scope no longer in deployment freeze, removing from state");
        Ok(Value::Null)
    }
}

/// Refresh the stored id.
///
/// Every attribute forces replacement, so an update never changes the triple
/// and nothing is sent to the server.
pub fn update(prior: Value, planned: Value) -> Result<Value, ProviderError> {
    let prior: FreezeTenantState = decode(prior)?;
    let plan: FreezeTenantState = decode(planned)?;
    if prior.triple() != plan.triple() || prior.deploymentfreeze_id != plan.deploymentfreeze_id {
        return Err(ProviderError::InvalidArgument(
            "a deployment freeze tenant scope cannot change in place; it must be replaced".to_string(),
        ));
    }

    let state = plan.with_composite_id()?;
    debug!(id = state.id.as_deref().unwrap_or_default(), "deployment freeze tenant scope unchanged");
    encode(&state)
}

/// Remove the triple from its freeze. A missing freeze counts as removed.
pub async fn delete<C>(client: &C, guard: &MutationGuard, current: Value) -> Result<(), ProviderError>
where
    C: DeploymentFreezeClient + ?Sized,
{
    let state: FreezeTenantState = decode(current)?;
    let freeze_id = state.deploymentfreeze_id.as_str();
    let triple = state.triple();

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

            let before = freeze.tenant_project_environment_scope.len();
            freeze
                .tenant_project_environment_scope
                .retain(|scope| *scope != triple);
            if freeze.tenant_project_environment_scope.len() == before {
                debug!(freeze_id, "tenant scope already absent from deployment freeze");
                return Ok(());
            }

            client
                .update_deployment_freeze(freeze)
                .await
                .map_err(|e| e.context("cannot remove tenant scope from deployment freeze"))?;
            info!(freeze_id, tenant_id = %triple.tenant_id, "tenant scope removed from deployment freeze");
            Ok::<_, ProviderError>(())
        })
        .await
}

/// Import by `freezeID:tenantID:projectID:environmentID`.
pub async fn import<C>(client: &C, import_id: &str) -> Result<ImportedResource, ProviderError>
where
    C: DeploymentFreezeClient + ?Sized,
{
    let seed = encode(&FreezeTenantState::from_id(import_id)?)?;
    let state = read(client, seed).await?;
    if state.is_null() {
        return Err(ProviderError::NotFound(format!(
            "deployment freeze tenant scope '{}' does not exist",
            import_id
        )));
    }
    Ok(ImportedResource::new(DEPLOYMENT_FREEZE_TENANT, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeploymentFreeze;
    use crate::testing::InMemoryOctopus;
    use serde_json::json;

    fn octopus_with_freeze() -> InMemoryOctopus {
        let octopus = InMemoryOctopus::new();
        octopus.insert_freeze(DeploymentFreeze {
            id: "DeploymentFreezes-1".to_string(),
            name: "Xmas".to_string(),
            ..Default::default()
        });
        octopus
    }

    fn plan(tenant: &str, env: &str) -> Value {
        json!({
            "deploymentfreeze_id": "DeploymentFreezes-1",
            "tenant_id": tenant,
            "project_id": "Projects-1",
            "environment_id": env
        })
    }

    fn scopes(octopus: &InMemoryOctopus) -> Vec<TenantProjectEnvironment> {
        octopus
            .freeze("DeploymentFreezes-1")
            .unwrap()
            .tenant_project_environment_scope
    }

    #[tokio::test]
    async fn test_create_builds_four_part_id() {
        let octopus = octopus_with_freeze();
        let state = create(&octopus, &MutationGuard::new(), plan("Tenants-1", "Environments-1"))
            .await
            .unwrap();

        assert_eq!(
            state["id"],
            "DeploymentFreezes-1:Tenants-1:Projects-1:Environments-1"
        );
        assert_eq!(scopes(&octopus).len(), 1);
    }

    #[tokio::test]
    async fn test_create_does_not_duplicate() {
        let octopus = octopus_with_freeze();
        let guard = MutationGuard::new();
        create(&octopus, &guard, plan("Tenants-1", "Environments-1")).await.unwrap();
        create(&octopus, &guard, plan("Tenants-1", "Environments-1")).await.unwrap();
        assert_eq!(scopes(&octopus).len(), 1);
    }

    #[tokio::test]
    async fn test_read_removes_missing_triple() {
        let octopus = octopus_with_freeze();
        let guard = MutationGuard::new();
        let state = create(&octopus, &guard, plan("Tenants-1", "Environments-1")).await.unwrap();

        assert_eq!(read(&octopus, state.clone()).await.unwrap(), state);

        delete(&octopus, &guard, state.clone()).await.unwrap();
        assert!(read(&octopus, state.clone()).await.unwrap().is_null());

        octopus.remove_freeze("DeploymentFreezes-1");
        assert!(read(&octopus, state).await.unwrap().is_null());
    }

    #[tokio::test]
    async fn test_read_rejects_short_id() {
        let octopus = octopus_with_freeze();
        let mut state = plan("Tenants-1", "Environments-1");
        state["id"] = json!("DeploymentFreezes-1:Tenants-1");

        let err = read(&octopus, state).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedIdentity(_)));
    }

    #[tokio::test]
    async fn test_update_only_refreshes_id() {
        let octopus = octopus_with_freeze();
        let created = create(&octopus, &MutationGuard::new(), plan("Tenants-1", "Environments-1"))
            .await
            .unwrap();
        let mut prior = created.clone();
        prior.as_object_mut().unwrap().remove("id");

        let updated = update(prior, plan("Tenants-1", "Environments-1")).unwrap();
        assert_eq!(updated, created);
        assert_eq!(scopes(&octopus).len(), 1);

        let err = update(created, plan("Tenants-1", "Environments-2")).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_duplicate_triples_are_still_present() {
        let octopus = InMemoryOctopus::new();
        let triple = TenantProjectEnvironment {
            tenant_id: "Tenants-1".to_string(),
            project_id: "Projects-1".to_string(),
            environment_id: "Environments-1".to_string(),
        };
        octopus.insert_freeze(DeploymentFreeze {
            id: "DeploymentFreezes-1".to_string(),
            tenant_project_environment_scope: vec![triple.clone(), triple],
            ..Default::default()
        });
        let guard = MutationGuard::new();

        let state = create(&octopus, &guard, plan("Tenants-1", "Environments-1")).await.unwrap();
        assert_eq!(scopes(&octopus).len(), 2);
        assert_eq!(read(&octopus, state.clone()).await.unwrap(), state);

        delete(&octopus, &guard, state.clone()).await.unwrap();
        assert!(scopes(&octopus).is_empty());
        assert!(read(&octopus, state).await.unwrap().is_null());
    }

    #[tokio::test]
    async fn test_delete_keeps_other_triples() {
        let octopus = octopus_with_freeze();
        let guard = MutationGuard::new();
        let one = create(&octopus, &guard, plan("Tenants-1", "Environments-1")).await.unwrap();
        create(&octopus, &guard, plan("Tenants-2", "Environments-1")).await.unwrap();

        delete(&octopus, &guard, one).await.unwrap();
        let remaining = scopes(&octopus);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].tenant_id, "Tenants-2");
    }

    #[tokio::test]
    async fn test_import() {
        let octopus = octopus_with_freeze();
        create(&octopus, &MutationGuard::new(), plan("Tenants-1", "Environments-1"))
            .await
            .unwrap();

        let imported = import(&octopus, "DeploymentFreezes-1:Tenants-1:Projects-1:Environments-1")
            .await
            .unwrap();
        assert_eq!(imported.resource_type, DEPLOYMENT_FREEZE_TENANT);
        assert_eq!(imported.state["tenant_id"], "Tenants-1");

        assert!(import(&octopus, "DeploymentFreezes-1:Tenants-9:Projects-1:Environments-1")
            .await
            .unwrap_err()
            .is_not_found());
    }
}
