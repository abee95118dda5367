//! The operations a provider host drives.
//!
//! The host (plugin protocol, CLI, or a test harness) calls these with JSON
//! documents shaped by the resource schemas. Transport is someone else's job.

use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata};

/// Resource lifecycle operations, keyed by resource type name.
///
/// `read` returning [`Value::Null`] means the remote entity is gone and the
/// resource must be removed from state.
///
/// # Example
///
/// ```ignore
/// use octopus_provider_core::{OctopusProvider, ProviderService};
///
/// let provider = OctopusProvider::new(client);
/// provider.configure(serde_json::json!({"address": "https://octopus.example.com", "api_key": "API-XXXX"})).await?;
/// let state = provider.create("octopusdeploy_lifecycle", serde_json::json!({"name": "Default"})).await?;
/// ```
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    /// Schemas of the provider configuration and every resource.
    fn schema(&self) -> ProviderSchema;

    /// Names of what the provider offers, derived from [`ProviderService::schema`].
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        ProviderMetadata {
            name: String::new(),
            resources: schema.resources.keys().cloned().collect(),
        }
    }

    /// Check the provider configuration before [`ProviderService::configure`].
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Apply the provider configuration.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Release anything held by the provider.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Check a resource configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Bring state written by an older schema version up to date.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: u64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let _ = (resource_type, version);
        Ok(state)
    }

    /// Compute the changes needed to go from `prior_state` to `proposed_state`.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create the remote entity and return its state.
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError>;

    /// Refresh state from the server; [`Value::Null`] when gone.
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError>;

    /// Apply `planned_state` to an existing entity.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the remote entity.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    /// Adopt an existing remote entity by its import id.
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let _ = id;
        Err(ProviderError::Unimplemented(format!(
            "import not supported for resource type: {}",
            resource_type
        )))
    }
}
