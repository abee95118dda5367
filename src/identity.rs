//! Composite identifiers for relationship resources.
//!
//! Some resources describe a relationship rather than a standalone remote
//! entity, e.g. "project X is frozen by freeze Y". The server has no id for
//! such a relationship, so the provider joins the ids of the participants
//! into one string and stores it as the resource id.
//!
//! ```
//! use octopus_provider_core::identity::{build, parse};
//!
//! let id = build("DeploymentFreezes-1", "Projects-7").unwrap();
//! assert_eq!(id.as_str(), "DeploymentFreezes-1:Projects-7");
//!
//! let (freeze, project) = parse(id.as_str()).unwrap();
//! assert_eq!(freeze, "DeploymentFreezes-1");
//! assert_eq!(project, "Projects-7");
//! ```

use std::fmt;

use crate::error::ProviderError;

/// The character joining the parts of a composite id.
pub const SEPARATOR: char = ':';

/// An identifier made of two or more independent entity ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeId(String);

impl CompositeId {
    /// The joined string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the id, returning the joined string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CompositeId> for String {
    fn from(id: CompositeId) -> Self {
        id.0
    }
}

/// Join a parent id and a member id.
pub fn build(parent_id: &str, member_id: &str) -> Result<CompositeId, ProviderError> {
    build_parts(&[parent_id, member_id])
}

/// Join any number of ids.
///
/// Fails with [`ProviderError::InvalidArgument`] if fewer than two parts are
/// given, or if any part is empty or contains [`SEPARATOR`].
pub fn build_parts(parts: &[&str]) -> Result<CompositeId, ProviderError> {
    if parts.len() < 2 {
        return Err(ProviderError::InvalidArgument(format!(
            "a composite id needs at least 2 parts, got {}",
            parts.len()
        )));
    }

    for (position, part) in parts.iter().enumerate() {
        if part.is_empty() {
            return Err(ProviderError::InvalidArgument(format!(
                "part {} of the composite id is empty",
                position
            )));
        }
        if part.contains(SEPARATOR) {
            return Err(ProviderError::InvalidArgument(format!(
                "'{}' contains the reserved separator '{}'",
                part, SEPARATOR
            )));
        }
    }

    let mut joined = String::with_capacity(parts.iter().map(|p| p.len() + 1).sum());
    for (position, part) in parts.iter().enumerate() {
        if position > 0 {
            joined.push(SEPARATOR);
        }
        joined.push_str(part);
    }
    Ok(CompositeId(joined))
}

/// Split a two-part id on the first separator.
pub fn parse(id: &str) -> Result<(String, String), ProviderError> {
    let (parent, member) = id
        .split_once(SEPARATOR)
        .ok_or_else(|| malformed(id, "the separator is missing"))?;

    if parent.is_empty() || member.is_empty() {
        return Err(malformed(id, "one of the parts is empty"));
    }

    Ok((parent.to_string(), member.to_string()))
}

/// Split an id into exactly `expected` parts.
pub fn parse_parts(id: &str, expected: usize) -> Result<Vec<String>, ProviderError> {
    let parts: Vec<&str> = id.split(SEPARATOR).collect();

    if parts.len() != expected {
        return Err(malformed(
            id,
            &format!("expected {} parts, found {}", expected, parts.len()),
        ));
    }
    if parts.iter().any(|p| p.is_empty()) {
        return Err(malformed(id, "one of the parts is empty"));
    }

    Ok(parts.into_iter().map(str::to_string).collect())
}

fn malformed(id: &str, reason: &str) -> ProviderError {
    ProviderError::MalformedIdentity(format!("'{}': {}", id, reason))
}
