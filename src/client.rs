//! Interfaces to the remote deployment server.
//!
//! The HTTP client itself lives outside this crate. Resources only depend on
//! these traits, so any SDK binding (or the in-memory fake in
//! [`crate::testing`]) can be plugged in.
//!
//! Implementations must map a 404 from the server to
//! [`ProviderError::NotFound`] (or an [`ProviderError::Api`] with status 404) so
//! that resources can tell "gone" apart from other failures.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::models::{DeploymentFreeze, Lifecycle, Variable, VariableSet};

/// An error document as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiError {
    /// HTTP status code.
    #[serde(default)]
    pub status_code: u16,
    /// Summary message.
    pub error_message: String,
    /// Additional detail lines.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl From<ApiError> for ProviderError {
    fn from(err: ApiError) -> Self {
        let mut message = err.error_message;
        if !err.errors.is_empty() {
            message = format!("{} ({})", message, err.errors.join("; "));
        }
        if err.status_code == 404 {
            ProviderError::NotFound(message)
        } else {
            ProviderError::Api {
                status: err.status_code,
                message,
            }
        }
    }
}

/// CRUD operations on lifecycles.
#[async_trait::async_trait]
pub trait LifecycleClient: Send + Sync {
    /// Create a lifecycle; the server assigns ids and fills in defaults.
    async fn add_lifecycle(&self, lifecycle: Lifecycle) -> Result<Lifecycle, ProviderError>;

    /// Fetch a lifecycle.
    async fn get_lifecycle(&self, space_id: &str, id: &str) -> Result<Lifecycle, ProviderError>;

    /// Replace a lifecycle.
    async fn update_lifecycle(&self, lifecycle: Lifecycle) -> Result<Lifecycle, ProviderError>;

    /// Delete a lifecycle.
    async fn delete_lifecycle(&self, space_id: &str, id: &str) -> Result<(), ProviderError>;
}

/// Operations on deployment freezes.
///
/// Scopes embedded in a freeze have no endpoints of their own; they are
/// changed by writing the whole freeze back.
#[async_trait::async_trait]
pub trait DeploymentFreezeClient: Send + Sync {
    /// Fetch a freeze.
    async fn get_deployment_freeze(&self, id: &str) -> Result<DeploymentFreeze, ProviderError>;

    /// Replace a freeze.
    async fn update_deployment_freeze(
        &self,
        freeze: DeploymentFreeze,
    ) -> Result<DeploymentFreeze, ProviderError>;
}

/// Operations on an owner's variable set.
///
/// Mutations answer with the complete set; the caller has to find its own
/// entry again (see [`crate::locator`]).
#[async_trait::async_trait]
pub trait VariableClient: Send + Sync {
    /// Fetch one variable.
    async fn get_variable(
        &self,
        space_id: &str,
        owner_id: &str,
        id: &str,
    ) -> Result<Variable, ProviderError>;

    /// Append a variable to the owner's set.
    async fn add_variable(
        &self,
        space_id: &str,
        owner_id: &str,
        variable: Variable,
    ) -> Result<VariableSet, ProviderError>;

    /// Replace the variable with the same id.
    async fn update_variable(
        &self,
        space_id: &str,
        owner_id: &str,
        variable: Variable,
    ) -> Result<VariableSet, ProviderError>;

    /// Remove a variable from the owner's set.
    async fn delete_variable(
        &self,
        space_id: &str,
        owner_id: &str,
        id: &str,
    ) -> Result<VariableSet, ProviderError>;
}

/// Everything the provider needs from the server.
pub trait OctopusClient: LifecycleClient + DeploymentFreezeClient + VariableClient {}

impl<T> OctopusClient for T where T: LifecycleClient + DeploymentFreezeClient + VariableClient {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_error_not_found_maps_to_not_found() {
        let err: ApiError = serde_json::from_value(json!({
            "StatusCode": 404,
            "ErrorMessage": "The resource 'DeploymentFreezes-9' was not found."
        }))
        .unwrap();
        let err: ProviderError = err.into();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[test]
    fn test_api_error_keeps_details() {
        let err: ProviderError = ApiError {
            status_code: 400,
            error_message: "There was a problem with your request.".to_string(),
            errors: vec!["Name must be unique".to_string()],
        }
        .into();

        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("Name must be unique"));
            },
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
