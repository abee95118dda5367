//! Provider-level configuration: where the server is and how to authenticate.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::resources::null_as_default;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Environment variable consulted when `address` is not configured.
pub const ENV_ADDRESS: &str = "OCTOPUS_URL";
/// Environment variables consulted, in order, when `api_key` is not configured.
pub const ENV_API_KEY: [&str; 2] = ["OCTOPUS_APIKEY", "OCTOPUS_API_KEY"];
/// Environment variable consulted when `access_token` is not configured.
pub const ENV_ACCESS_TOKEN: &str = "OCTOPUS_ACCESS_TOKEN";

/// Space used when neither the provider nor a resource names one.
pub const DEFAULT_SPACE_ID: &str = "Spaces-1";

/// Settings from the `provider "octopusdeploy"` block.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the Octopus REST API.
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    /// API key credential.
    #[serde(default, deserialize_with = "null_as_default")]
    pub api_key: String,
    /// OIDC access token credential.
    #[serde(default, deserialize_with = "null_as_default")]
    pub access_token: String,
    /// Space targeted by resources that don't set their own.
    #[serde(default, deserialize_with = "null_as_default")]
    pub space_id: String,
}

impl ProviderConfig {
    /// Decode the provider configuration document.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
            .map_err(|e| ProviderError::Configuration(format!("invalid provider configuration: {}", e)))
    }

    /// Fill unset settings from the process environment.
    pub fn with_env_fallbacks(self) -> Self {
        self.with_env(|name| std::env::var(name).ok())
    }

    /// Fill unset settings through `lookup`.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(name))
                .find(|value| !value.is_empty())
        };

        if self.address.is_empty() {
            self.address = first(&[ENV_ADDRESS]).unwrap_or_default();
        }
        if self.api_key.is_empty() {
            self.api_key = first(&ENV_API_KEY).unwrap_or_default();
        }
        if self.access_token.is_empty() {
            self.access_token = first(&[ENV_ACCESS_TOKEN]).unwrap_or_default();
        }
        self
    }

    /// The configured space, or [`DEFAULT_SPACE_ID`].
    pub fn space_id(&self) -> &str {
        if self.space_id.is_empty() {
            DEFAULT_SPACE_ID
        } else {
            &self.space_id
        }
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        if self.address.is_empty() {
            diagnostics.push(
                Diagnostic::error("Missing Octopus address")
                    .with_detail(format!(
                        "set the address attribute or the {} environment variable",
                        ENV_ADDRESS
                    ))
                    .with_attribute("address"),
            );
        } else if !(self.address.starts_with("http://") || self.address.starts_with("https://")) {
            diagnostics.push(
                Diagnostic::error("Invalid Octopus address")
                    .with_detail(format!("expected an http(s) URL, got '{}'", self.address))
                    .with_attribute("address"),
            );
        }

        if self.api_key.is_empty() && self.access_token.is_empty() {
            diagnostics.push(
                Diagnostic::error("Missing credentials")
                    .with_detail(format!(
                        "set api_key or access_token (or the {} / {} environment variables)",
                        ENV_API_KEY[0], ENV_ACCESS_TOKEN
                    ))
                    .with_attribute("api_key"),
            );
        }

        diagnostics
    }

    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "address",
                Attribute::optional_string().with_description("The endpoint of the Octopus REST API"),
            )
            .with_attribute(
                "api_key",
                Attribute::optional_string()
                    .with_description("The API key to use with the Octopus REST API")
                    .sensitive(),
            )
            .with_attribute(
                "access_token",
                Attribute::optional_string()
                    .with_description("The OIDC Access Token to use with the Octopus REST API")
                    .sensitive(),
            )
            .with_attribute(
                "space_id",
                Attribute::optional_string().with_description("The space ID to target"),
            )
    }
}

// Credentials stay out of logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("ProviderConfig")
            .field("address", &self.address)
            .field("api_key", &redact(&self.api_key))
            .field("access_token", &redact(&self.access_token))
            .field("space_id", &self.space_id)
            .finish()
    }
}
