//! Testing utilities.
//!
//! [`ProviderTester`] drives any [`ProviderService`] the way the host would,
//! with helpers for whole plan/apply cycles. [`InMemoryOctopus`] stands in for
//! the server: it assigns ids, fills in server-side defaults, answers variable
//! mutations with the whole set and can be told to fail the next call.
//!
//! # Example
//!
//! ```ignore
//! use octopus_provider_core::testing::{InMemoryOctopus, ProviderTester};
//! use octopus_provider_core::OctopusProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_lifecycle() {
//!     let tester = ProviderTester::new(OctopusProvider::new(InMemoryOctopus::new()));
//!     tester
//!         .configure(json!({"address": "https://octopus.example.com", "api_key": "API-TEST"}))
//!         .await
//!         .unwrap();
//!
//!     let state = tester
//!         .lifecycle_create("octopusdeploy_lifecycle", json!({"name": "Default"}))
//!         .await
//!         .unwrap();
//!     assert!(state.get("release_retention_policy").is_none());
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::client::{ApiError, DeploymentFreezeClient, LifecycleClient, VariableClient};
use crate::error::ProviderError;
use crate::models::{DeploymentFreeze, Lifecycle, RetentionPolicy, Variable, VariableSet};
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// A test harness for provider implementations.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Validate provider configuration; `Err` carries the error diagnostics.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider; `Err` carries the error diagnostics.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Full plan operation with explicit config.
    pub async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, prior_state, proposed_state, config)
            .await
    }

    /// Create a new resource.
    pub async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Upgrade resource state from an older schema version.
    pub async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: u64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .upgrade_resource_state(resource_type, version, state)
            .await
    }

    /// Plan, create, then read back. Returns the state after read.
    pub async fn lifecycle_create(&self, resource_type: &str, config: Value) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// Plan, update, then read back. Returns the state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read(resource_type, updated).await
    }

    /// Plan the deletion, then delete.
    pub async fn lifecycle_delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.plan_delete(resource_type, current_state.clone()).await?;
        self.delete(resource_type, current_state).await
    }

    /// Create, update, delete. Returns the state after the update.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created = self.lifecycle_create(resource_type, initial_config).await?;
        let updated = self
            .lifecycle_update(resource_type, created, updated_config)
            .await?;
        self.lifecycle_delete(resource_type, updated.clone()).await?;
        Ok(updated)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Assert that a plan creates without replacing.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(!plan.requires_replace, "Expected plan to create, not replace");
}

/// Assert that a plan has no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan requires replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan updates in place.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan changes the given top-level attribute or block.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error whose summary or detail mentions `substring`.
///
/// # Panics
///
/// Panics if no error diagnostic matches.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let matches = diagnostics.iter().any(|d| {
        d.is_error()
            && (d.summary.contains(substring)
                || d.detail.as_deref().is_some_and(|detail| detail.contains(substring)))
    });

    assert!(
        matches,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[derive(Debug, Default)]
struct Store {
    next_id: u64,
    lifecycles: BTreeMap<String, Lifecycle>,
    freezes: BTreeMap<String, DeploymentFreeze>,
    variables: BTreeMap<String, VariableSet>,
    failures: BTreeMap<String, u16>,
}

impl Store {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

/// An in-process stand-in for the Octopus server.
#[derive(Debug)]
pub struct InMemoryOctopus {
    store: Mutex<Store>,
    server_defaults: bool,
}

impl Default for InMemoryOctopus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOctopus {
    /// An empty server that fills unset lifecycle retention with
    /// [`RetentionPolicy::server_default`].
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store::default()),
            server_defaults: true,
        }
    }

    /// Store lifecycles exactly as sent.
    pub fn without_server_defaults(mut self) -> Self {
        self.server_defaults = false;
        self
    }

    /// Make the next call to `operation` (a client method name) fail with `status`.
    pub fn fail_next(&self, operation: &str, status: u16) {
        self.lock().failures.insert(operation.to_string(), status);
    }

    /// Seed a deployment freeze.
    pub fn insert_freeze(&self, freeze: DeploymentFreeze) {
        self.lock().freezes.insert(freeze.id.clone(), freeze);
    }

    /// Remove a deployment freeze behind the provider's back.
    pub fn remove_freeze(&self, id: &str) {
        self.lock().freezes.remove(id);
    }

    /// The stored deployment freeze.
    pub fn freeze(&self, id: &str) -> Option<DeploymentFreeze> {
        self.lock().freezes.get(id).cloned()
    }

    /// The stored lifecycle.
    pub fn lifecycle(&self, id: &str) -> Option<Lifecycle> {
        self.lock().lifecycles.get(id).cloned()
    }

    /// The stored variables of `owner_id`, sensitive values included.
    pub fn variables(&self, owner_id: &str) -> Vec<Variable> {
        self.lock()
            .variables
            .get(owner_id)
            .map(|set| set.variables.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the store, failing first if a failure was queued for `operation`.
    fn enter(&self, operation: &str) -> Result<MutexGuard<'_, Store>, ProviderError> {
        let mut store = self.lock();
        match store.failures.remove(operation) {
            Some(status) => Err(ApiError {
                status_code: status,
                error_message: format!("{} failed", operation),
                errors: Vec::new(),
            }
            .into()),
            None => Ok(store),
        }
    }

    fn settle_lifecycle(&self, store: &mut Store, lifecycle: &mut Lifecycle) {
        for phase in &mut lifecycle.phases {
            if phase.id.is_empty() {
                phase.id = store.next("Phases");
            }
        }
        if self.server_defaults {
            lifecycle
                .release_retention_policy
                .get_or_insert_with(RetentionPolicy::server_default);
            lifecycle
                .tentacle_retention_policy
                .get_or_insert_with(RetentionPolicy::server_default);
        }
    }
}

fn not_found(what: &str, id: &str) -> ProviderError {
    ApiError {
        status_code: 404,
        error_message: format!("The {} '{}' was not found.", what, id),
        errors: Vec::new(),
    }
    .into()
}

fn redacted(set: &VariableSet) -> VariableSet {
    let mut set = set.clone();
    for variable in &mut set.variables {
        redact(variable);
    }
    set
}

fn redact(variable: &mut Variable) {
    if variable.is_sensitive {
        variable.value = None;
    }
}

#[async_trait::async_trait]
impl LifecycleClient for InMemoryOctopus {
    async fn add_lifecycle(&self, mut lifecycle: Lifecycle) -> Result<Lifecycle, ProviderError> {
        let mut store = self.enter("add_lifecycle")?;
        lifecycle.id = store.next("Lifecycles");
        self.settle_lifecycle(&mut store, &mut lifecycle);
        store.lifecycles.insert(lifecycle.id.clone(), lifecycle.clone());
        Ok(lifecycle)
    }

    async fn get_lifecycle(&self, _space_id: &str, id: &str) -> Result<Lifecycle, ProviderError> {
        let store = self.enter("get_lifecycle")?;
        store
            .lifecycles
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("lifecycle", id))
    }

    async fn update_lifecycle(&self, mut lifecycle: Lifecycle) -> Result<Lifecycle, ProviderError> {
        let mut store = self.enter("update_lifecycle")?;
        if !store.lifecycles.contains_key(&lifecycle.id) {
            return Err(not_found("lifecycle", &lifecycle.id));
        }
        self.settle_lifecycle(&mut store, &mut lifecycle);
        store.lifecycles.insert(lifecycle.id.clone(), lifecycle.clone());
        Ok(lifecycle)
    }

    async fn delete_lifecycle(&self, _space_id: &str, id: &str) -> Result<(), ProviderError> {
        let mut store = self.enter("delete_lifecycle")?;
        store
            .lifecycles
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("lifecycle", id))
    }
}

#[async_trait::async_trait]
impl DeploymentFreezeClient for InMemoryOctopus {
    async fn get_deployment_freeze(&self, id: &str) -> Result<DeploymentFreeze, ProviderError> {
        let freeze = {
            let store = self.enter("get_deployment_freeze")?;
            store.freezes.get(id).cloned()
        };
        // Let other tasks run between a read and the write that follows it.
        tokio::task::yield_now().await;
        freeze.ok_or_else(|| not_found("deployment freeze", id))
    }

    async fn update_deployment_freeze(&self, freeze: DeploymentFreeze) -> Result<DeploymentFreeze, ProviderError> {
        let mut store = self.enter("update_deployment_freeze")?;
        if !store.freezes.contains_key(&freeze.id) {
            return Err(not_found("deployment freeze", &freeze.id));
        }
        store.freezes.insert(freeze.id.clone(), freeze.clone());
        Ok(freeze)
    }
}

#[async_trait::async_trait]
impl VariableClient for InMemoryOctopus {
    async fn get_variable(&self, _space_id: &str, owner_id: &str, id: &str) -> Result<Variable, ProviderError> {
        let store = self.enter("get_variable")?;
        let mut variable = store
            .variables
            .get(owner_id)
            .and_then(|set| set.variables.iter().find(|v| v.id == id))
            .cloned()
            .ok_or_else(|| not_found("variable", id))?;
        redact(&mut variable);
        Ok(variable)
    }

    async fn add_variable(
        &self,
        space_id: &str,
        owner_id: &str,
        mut variable: Variable,
    ) -> Result<VariableSet, ProviderError> {
        let mut store = self.enter("add_variable")?;
        variable.id = store.next("Variables");
        if variable.space_id.is_empty() {
            variable.space_id = space_id.to_string();
        }
        let set = store
            .variables
            .entry(owner_id.to_string())
            .or_insert_with(|| VariableSet {
                owner_id: owner_id.to_string(),
                ..Default::default()
            });
        set.variables.push(variable);
        set.version += 1;
        Ok(redacted(set))
    }

    async fn update_variable(
        &self,
        _space_id: &str,
        owner_id: &str,
        variable: Variable,
    ) -> Result<VariableSet, ProviderError> {
        let mut store = self.enter("update_variable")?;
        let set = store
            .variables
            .get_mut(owner_id)
            .ok_or_else(|| not_found("variable set", owner_id))?;
        let slot = set
            .variables
            .iter_mut()
            .find(|v| v.id == variable.id)
            .ok_or_else(|| not_found("variable", &variable.id))?;
        *slot = variable;
        set.version += 1;
        Ok(redacted(set))
    }

    async fn delete_variable(&self, _space_id: &str, owner_id: &str, id: &str) -> Result<VariableSet, ProviderError> {
        let mut store = self.enter("delete_variable")?;
        let set = store
            .variables
            .get_mut(owner_id)
            .ok_or_else(|| not_found("variable set", owner_id))?;
        let before = set.variables.len();
        set.variables.retain(|v| v.id != id);
        if set.variables.len() == before {
            return Err(not_found("variable", id));
        }
        set.version += 1;
        Ok(redacted(set))
    }
}
