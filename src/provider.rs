//! The `octopusdeploy` provider: configuration plus dispatch to resources.

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::client::OctopusClient;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::guard::MutationGuard;
use crate::plan;
use crate::resources::{
    freeze_project, freeze_tenant, lifecycle, variable, DEPLOYMENT_FREEZE_PROJECT,
    DEPLOYMENT_FREEZE_TENANT, LIFECYCLE, PROVIDER_NAME, VARIABLE,
};
use crate::schema::{has_errors, Diagnostic, ProviderSchema, Schema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult, ProviderMetadata};
use crate::validation;

/// Provider over any [`OctopusClient`].
///
/// Resource operations need [`ProviderService::configure`] to have succeeded
/// first; the configured space is the fallback for resources without one.
pub struct OctopusProvider<C> {
    client: C,
    guard: &'static MutationGuard,
    config: RwLock<Option<ProviderConfig>>,
}

impl<C> OctopusProvider<C>
where
    C: OctopusClient + 'static,
{
    /// Create a provider serialising mutations on the process-wide guard.
    pub fn new(client: C) -> Self {
        Self::with_guard(client, MutationGuard::global())
    }

    /// Create a provider serialising mutations on `guard`.
    pub fn with_guard(client: C, guard: &'static MutationGuard) -> Self {
        Self {
            client,
            guard,
            config: RwLock::new(None),
        }
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The active configuration, if configured.
    pub async fn config(&self) -> Option<ProviderConfig> {
        self.config.read().await.clone()
    }

    async fn space_id(&self) -> Result<String, ProviderError> {
        self.config
            .read()
            .await
            .as_ref()
            .map(|config| config.space_id().to_string())
            .ok_or_else(|| ProviderError::Configuration("provider has not been configured".to_string()))
    }
}

fn resource_schema(resource_type: &str) -> Result<Schema, ProviderError> {
    match resource_type {
        LIFECYCLE => Ok(lifecycle::schema()),
        DEPLOYMENT_FREEZE_PROJECT => Ok(freeze_project::schema()),
        DEPLOYMENT_FREEZE_TENANT => Ok(freeze_tenant::schema()),
        VARIABLE => Ok(variable::schema()),
        other => Err(ProviderError::UnknownResource(other.to_string())),
    }
}

fn load_config(config: Value) -> Result<(ProviderConfig, Vec<Diagnostic>), ProviderError> {
    let config = if config.is_null() {
        Value::Object(Default::default())
    } else {
        config
    };
    let mut diagnostics = validation::validate(&ProviderConfig::schema(), &config);
    let parsed = ProviderConfig::from_value(config)?.with_env_fallbacks();
    diagnostics.extend(parsed.validate());
    Ok((parsed, diagnostics))
}

#[async_trait::async_trait]
impl<C> ProviderService for OctopusProvider<C>
where
    C: OctopusClient + 'static,
{
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(ProviderConfig::schema())
            .with_resource(LIFECYCLE, lifecycle::schema())
            .with_resource(DEPLOYMENT_FREEZE_PROJECT, freeze_project::schema())
            .with_resource(DEPLOYMENT_FREEZE_TENANT, freeze_tenant::schema())
            .with_resource(VARIABLE, variable::schema())
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: PROVIDER_NAME.to_string(),
            resources: self.schema().resources.keys().cloned().collect(),
        }
    }

    #[instrument(skip(self, config), name = "provider.validate_provider_config")]
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let (_, diagnostics) = load_config(config)?;
        debug!(count = diagnostics.len(), "provider config validated");
        Ok(diagnostics)
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let (parsed, diagnostics) = load_config(config)?;
        if has_errors(&diagnostics) {
            warn!(count = diagnostics.len(), "provider configuration rejected");
            return Ok(diagnostics);
        }

        info!(address = %parsed.address, space_id = %parsed.space_id(), "provider configured");
        *self.config.write().await = Some(parsed);
        Ok(diagnostics)
    }

    #[instrument(skip(self), name = "provider.stop")]
    async fn stop(&self) -> Result<(), ProviderError> {
        *self.config.write().await = None;
        info!("provider stopped");
        Ok(())
    }

    #[instrument(skip(self, config), name = "provider.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = resource_schema(resource_type)?;
        let mut diagnostics = validation::validate(&schema, &config);
        match resource_type {
            LIFECYCLE => diagnostics.extend(lifecycle::validate(&config)),
            VARIABLE => diagnostics.extend(variable::validate(&config)),
            _ => {},
        }
        debug!(count = diagnostics.len(), "resource config validated");
        Ok(diagnostics)
    }

    #[instrument(skip(self, state), name = "provider.upgrade_resource_state")]
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: u64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let schema = resource_schema(resource_type)?;
        if version > schema.version {
            return Err(ProviderError::Validation(format!(
                "state version {} of {} is newer than schema version {}",
                version, resource_type, schema.version
            )));
        }
        Ok(state)
    }

    #[instrument(skip(self, prior_state, proposed_state, _config), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = resource_schema(resource_type)?;
        let result = plan::diff(&schema, prior_state.as_ref(), &proposed_state);
        debug!(
            changes = result.changes.len(),
            requires_replace = result.requires_replace,
            "plan computed"
        );
        Ok(result)
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let space = self.space_id().await?;
        let result = match resource_type {
            LIFECYCLE => lifecycle::create(&self.client, &space, planned_state).await,
            DEPLOYMENT_FREEZE_PROJECT => freeze_project::create(&self.client, self.guard, planned_state).await,
            DEPLOYMENT_FREEZE_TENANT => freeze_tenant::create(&self.client, self.guard, planned_state).await,
            VARIABLE => variable::create(&self.client, self.guard, &space, planned_state).await,
            other => Err(ProviderError::UnknownResource(other.to_string())),
        };
        if let Err(err) = &result {
            error!(error = %err, "create failed");
        }
        result
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let space = self.space_id().await?;
        match resource_type {
            LIFECYCLE => lifecycle::read(&self.client, &space, current_state).await,
            DEPLOYMENT_FREEZE_PROJECT => freeze_project::read(&self.client, current_state).await,
            DEPLOYMENT_FREEZE_TENANT => freeze_tenant::read(&self.client, current_state).await,
            VARIABLE => variable::read(&self.client, &space, current_state).await,
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let space = self.space_id().await?;
        let result = match resource_type {
            LIFECYCLE => lifecycle::update(&self.client, &space, prior_state, planned_state).await,
            DEPLOYMENT_FREEZE_PROJECT => {
                freeze_project::update(&self.client, self.guard, prior_state, planned_state).await
            },
            DEPLOYMENT_FREEZE_TENANT => freeze_tenant::update(prior_state, planned_state),
            VARIABLE => variable::update(&self.client, self.guard, &space, prior_state, planned_state).await,
            other => Err(ProviderError::UnknownResource(other.to_string())),
        };
        if let Err(err) = &result {
            error!(error = %err, "update failed");
        }
        result
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let space = self.space_id().await?;
        match resource_type {
            LIFECYCLE => lifecycle::delete(&self.client, &space, current_state).await,
            DEPLOYMENT_FREEZE_PROJECT => freeze_project::delete(&self.client, self.guard, current_state).await,
            DEPLOYMENT_FREEZE_TENANT => freeze_tenant::delete(&self.client, self.guard, current_state).await,
            VARIABLE => variable::delete(&self.client, self.guard, &space, current_state).await,
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    #[instrument(skip(self), name = "provider.import_resource")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let space = self.space_id().await?;
        let imported = match resource_type {
            LIFECYCLE => lifecycle::import(&self.client, &space, id).await?,
            DEPLOYMENT_FREEZE_PROJECT => freeze_project::import(&self.client, id).await?,
            DEPLOYMENT_FREEZE_TENANT => freeze_tenant::import(&self.client, id).await?,
            VARIABLE => variable::import(&self.client, &space, id).await?,
            other => return Err(ProviderError::UnknownResource(other.to_string())),
        };
        info!(%id, "resource imported");
        Ok(vec![imported])
    }
}
