//! Octopus Provider Core
//!
//! Resource handling for an Octopus Deploy infrastructure provider: lifecycles,
//! deployment freeze scopes and variables, plus the plumbing those resources
//! share.
//!
//! # Overview
//!
//! - **Identity**: [`identity`] builds and parses `parent:member` ids for
//!   resources that live inside a parent entity
//! - **Defaults**: [`reconcile`] keeps server-injected default values out of
//!   state unless the user asked for them
//! - **Locating**: [`locator`] finds a freshly written member in the whole
//!   collection a mutation returns
//! - **Serialising**: [`guard`] runs read-modify-write sequences on shared
//!   parent collections one at a time
//! - **Provider**: [`OctopusProvider`] implements [`ProviderService`] over any
//!   [`OctopusClient`]
//!
//! The HTTP client and the plugin protocol live elsewhere; this crate talks to
//! the server only through the traits in [`client`].
//!
//! # Quick Start
//!
//! ```ignore
//! use octopus_provider_core::{init_logging, OctopusProvider, ProviderService};
//! use serde_json::json;
//!
//! init_logging();
//!
//! let provider = OctopusProvider::new(my_client);
//! provider
//!     .configure(json!({"address": "https://octopus.example.com", "api_key": "API-XXXX"}))
//!     .await?;
//!
//! let plan = provider
//!     .plan("octopusdeploy_lifecycle", None, json!({"name": "Default"}), json!({"name": "Default"}))
//!     .await?;
//! let state = provider.create("octopusdeploy_lifecycle", plan.planned_state).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod identity;
pub mod locator;
pub mod logging;
pub mod models;
pub mod plan;
pub mod provider;
pub mod reconcile;
pub mod resources;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::{ApiError, DeploymentFreezeClient, LifecycleClient, OctopusClient, VariableClient};
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use guard::{KeyedGuard, MutationGuard};
pub use identity::CompositeId;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::OctopusProvider;
pub use schema::{Diagnostic, ProviderSchema};
pub use service::ProviderService;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
