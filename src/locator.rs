//! Finding a freshly written member inside a collection.
//!
//! Several endpoints answer a mutation with the whole parent collection (for
//! example every variable of a project) instead of the entity that was just
//! written. The provider has to find its own entry again by comparing fields.

use std::collections::BTreeSet;

use crate::error::ProviderError;
use crate::models::{TenantProjectEnvironment, Variable, VariableScope};

/// Outcome of comparing two scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScopeMatch {
    /// The scopes are equivalent.
    pub matches: bool,
    /// The comparison could not be decided with certainty.
    pub ambiguous: bool,
}

/// Decides whether two variable scopes are equivalent.
pub trait ScopeMatcher: Send + Sync {
    /// Compare `existing` (from the server) with `wanted` (from the request).
    fn matches_scope(
        &self,
        existing: &VariableScope,
        wanted: &VariableScope,
    ) -> Result<ScopeMatch, ProviderError>;
}

/// Compares each scope dimension as a set: order and duplicates are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetScopeMatcher;

impl ScopeMatcher for SetScopeMatcher {
    fn matches_scope(
        &self,
        existing: &VariableScope,
        wanted: &VariableScope,
    ) -> Result<ScopeMatch, ProviderError> {
        let mut result = ScopeMatch {
            matches: true,
            ambiguous: false,
        };

        for ((name, ours), (_, theirs)) in existing
            .dimensions()
            .into_iter()
            .zip(wanted.dimensions())
        {
            if ours.iter().any(String::is_empty) || theirs.iter().any(String::is_empty) {
                return Err(ProviderError::InvalidArgument(format!(
                    "scope dimension '{}' contains an empty id",
                    name
                )));
            }

            let a: BTreeSet<&String> = ours.iter().collect();
            let b: BTreeSet<&String> = theirs.iter().collect();
            if a != b {
                result.matches = false;
                // One side unscoped on this dimension; the server may have widened it.
                if a.is_empty() != b.is_empty() {
                    result.ambiguous = true;
                }
            }
        }

        Ok(result)
    }
}

/// A predicate selecting members of a collection.
pub trait MatchCriteria<M> {
    /// Whether `member` is the one being looked for.
    fn matches(&self, member: &M) -> Result<bool, ProviderError>;

    /// An id that breaks ties between several matches, if known.
    fn preferred_id(&self) -> Option<&str> {
        None
    }

    /// The id of a member, used for tie-breaking.
    fn member_id<'m>(&self, member: &'m M) -> Option<&'m str> {
        let _ = member;
        None
    }

    /// Human-readable description used in error messages.
    fn describe(&self) -> String;
}

/// Find the single member of `collection` matching `criteria`.
///
/// - no match: [`ProviderError::LocatorMiss`]
/// - one match: that member
/// - several matches: the one whose id equals [`MatchCriteria::preferred_id`],
///   otherwise [`ProviderError::AmbiguousMatch`]
pub fn locate<'a, M, C>(collection: &'a [M], criteria: &C) -> Result<&'a M, ProviderError>
where
    C: MatchCriteria<M>,
{
    let mut found = Vec::new();
    for member in collection {
        if criteria.matches(member)? {
            found.push(member);
        }
    }

    match found.len() {
        0 => Err(ProviderError::LocatorMiss(criteria.describe())),
        1 => Ok(found[0]),
        n => {
            if let Some(preferred) = criteria.preferred_id() {
                if let Some(member) = found
                    .iter()
                    .copied()
                    .find(|m| criteria.member_id(m) == Some(preferred))
                {
                    return Ok(member);
                }
            }
            Err(ProviderError::AmbiguousMatch(format!(
                "{} matched {} entries",
                criteria.describe(),
                n
            )))
        },
    }
}

/// Whether any member of `collection` matches `criteria`.
///
/// Unlike [`locate`], several matches are not an error: use this where only
/// presence matters and identical members cannot be told apart anyway.
pub fn contains<M, C>(collection: &[M], criteria: &C) -> Result<bool, ProviderError>
where
    C: MatchCriteria<M>,
{
    for member in collection {
        if criteria.matches(member)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Locates a variable that was just added or updated.
pub struct VariableCriteria<'a> {
    wanted: &'a Variable,
    owner_id: &'a str,
    matcher: &'a dyn ScopeMatcher,
}

impl<'a> VariableCriteria<'a> {
    /// Look for `wanted` in the variable set of `owner_id`.
    pub fn new(wanted: &'a Variable, owner_id: &'a str, matcher: &'a dyn ScopeMatcher) -> Self {
        Self {
            wanted,
            owner_id,
            matcher,
        }
    }
}

impl MatchCriteria<Variable> for VariableCriteria<'_> {
    fn matches(&self, candidate: &Variable) -> Result<bool, ProviderError> {
        let wanted = self.wanted;
        // Sensitive values never come back from the server.
        let value_matches = candidate.is_sensitive || candidate.value == wanted.value;

        if candidate.name != wanted.name
            || candidate.variable_type != wanted.variable_type
            || !value_matches
            || candidate.description != wanted.description
            || candidate.is_sensitive != wanted.is_sensitive
        {
            return Ok(false);
        }

        let scope = self
            .matcher
            .matches_scope(&candidate.scope, &wanted.scope)?;
        Ok(scope.matches)
    }

    fn preferred_id(&self) -> Option<&str> {
        if self.wanted.id.is_empty() {
            None
        } else {
            Some(self.wanted.id.as_str())
        }
    }

    fn member_id<'m>(&self, member: &'m Variable) -> Option<&'m str> {
        Some(member.id.as_str())
    }

    fn describe(&self) -> String {
        format!(
            "variable '{}' for owner ID {}",
            self.wanted.name, self.owner_id
        )
    }
}

/// Locates one tenant/project/environment entry of a deployment freeze.
pub struct TenantScopeCriteria<'a> {
    wanted: &'a TenantProjectEnvironment,
}

impl<'a> TenantScopeCriteria<'a> {
    /// Look for exactly this triple.
    pub fn new(wanted: &'a TenantProjectEnvironment) -> Self {
        Self { wanted }
    }
}

impl MatchCriteria<TenantProjectEnvironment> for TenantScopeCriteria<'_> {
    fn matches(&self, member: &TenantProjectEnvironment) -> Result<bool, ProviderError> {
        Ok(member == self.wanted)
    }

    fn describe(&self) -> String {
        format!(
            "tenant scope ({}, {}, {})",
            self.wanted.tenant_id, self.wanted.project_id, self.wanted.environment_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(id: &str, name: &str, value: &str) -> Variable {
        let mut v = Variable::new(name);
        v.id = id.to_string();
        v.value = Some(value.to_string());
        v
    }

    fn env_scope(envs: &[&str]) -> VariableScope {
        VariableScope {
            environments: envs.iter().map(|e| e.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_locates_single_match() {
        let set = vec![
            variable("v1", "Greeting", "hello"),
            variable("v2", "Farewell", "bye"),
        ];
        let wanted = variable("", "Farewell", "bye");

        let found = locate(&set, &VariableCriteria::new(&wanted, "Projects-1", &SetScopeMatcher))
            .unwrap();
        assert_eq!(found.id, "v2");
    }

    #[test]
    fn test_no_match_is_locator_miss() {
        let set = vec![variable("v1", "Greeting", "hello")];
        let wanted = variable("", "Greeting", "hi");

        let err = locate(&set, &VariableCriteria::new(&wanted, "Projects-1", &SetScopeMatcher))
            .unwrap_err();
        assert!(matches!(err, ProviderError::LocatorMiss(_)));
        assert!(err.message().contains("Projects-1"));
    }

    #[test]
    fn test_sensitive_values_match_without_echo() {
        let mut stored = variable("v1", "Password", "");
        stored.value = None;
        stored.is_sensitive = true;
        stored.variable_type = "Sensitive".to_string();

        let mut wanted = variable("", "Password", "s3cret");
        wanted.is_sensitive = true;
        wanted.variable_type = "Sensitive".to_string();

        let set = vec![stored];
        let found = locate(&set, &VariableCriteria::new(&wanted, "Projects-1", &SetScopeMatcher))
            .unwrap();
        assert_eq!(found.id, "v1");
    }

    #[test]
    fn test_scope_must_match() {
        let mut dev = variable("v1", "Url", "http://dev");
        dev.scope = env_scope(&["Environments-1"]);
        let mut prod = variable("v2", "Url", "http://dev");
        prod.scope = env_scope(&["Environments-2", "Environments-3"]);

        let mut wanted = variable("", "Url", "http://dev");
        wanted.scope = env_scope(&["Environments-3", "Environments-2"]);

        let set = vec![dev, prod];
        let found = locate(&set, &VariableCriteria::new(&wanted, "Projects-1", &SetScopeMatcher))
            .unwrap();
        assert_eq!(found.id, "v2");
    }

    #[test]
    fn test_duplicates_are_ambiguous_without_an_id() {
        let set = vec![
            variable("v1", "Dup", "same"),
            variable("v2", "Dup", "same"),
        ];
        let wanted = variable("", "Dup", "same");

        let err = locate(&set, &VariableCriteria::new(&wanted, "Projects-1", &SetScopeMatcher))
            .unwrap_err();
        assert!(matches!(err, ProviderError::AmbiguousMatch(_)));
    }

    #[test]
    fn test_duplicates_resolved_by_known_id() {
        let set = vec![
            variable("v1", "Dup", "same"),
            variable("v2", "Dup", "same"),
        ];
        let wanted = variable("v2", "Dup", "same");

        let found = locate(&set, &VariableCriteria::new(&wanted, "Projects-1", &SetScopeMatcher))
            .unwrap();
        assert_eq!(found.id, "v2");
    }

    #[test]
    fn test_matcher_errors_propagate() {
        let mut broken = variable("v1", "Url", "x");
        broken.scope = env_scope(&[""]);
        let wanted = variable("", "Url", "x");

        let set = vec![broken];
        let err = locate(&set, &VariableCriteria::new(&wanted, "Projects-1", &SetScopeMatcher))
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidArgument(_)));
    }

    #[test]
    fn test_set_scope_matcher_flags_widening() {
        let result = SetScopeMatcher
            .matches_scope(&env_scope(&[]), &env_scope(&["Environments-1"]))
            .unwrap();
        assert!(!result.matches);
        assert!(result.ambiguous);

        let result = SetScopeMatcher
            .matches_scope(&env_scope(&["Environments-2"]), &env_scope(&["Environments-1"]))
            .unwrap();
        assert!(!result.matches);
        assert!(!result.ambiguous);
    }

    #[test]
    fn test_tenant_scope_criteria() {
        let scopes = vec![
            TenantProjectEnvironment {
                tenant_id: "Tenants-1".to_string(),
                project_id: "Projects-1".to_string(),
                environment_id: "Environments-1".to_string(),
            },
            TenantProjectEnvironment {
                tenant_id: "Tenants-2".to_string(),
                project_id: "Projects-1".to_string(),
                environment_id: "Environments-1".to_string(),
            },
        ];
        let wanted = scopes[1].clone();
        let found = locate(&scopes, &TenantScopeCriteria::new(&wanted)).unwrap();
        assert_eq!(found.tenant_id, "Tenants-2");
    }

    #[test]
    fn test_contains_tolerates_duplicates() {
        let triple = TenantProjectEnvironment {
            tenant_id: "Tenants-1".to_string(),
            project_id: "Projects-1".to_string(),
            environment_id: "Environments-1".to_string(),
        };
        let scopes = vec![triple.clone(), triple.clone()];
        let criteria = TenantScopeCriteria::new(&triple);

        assert!(matches!(locate(&scopes, &criteria), Err(ProviderError::AmbiguousMatch(_))));
        assert!(contains(&scopes, &criteria).unwrap());
        assert!(!contains(&scopes[..0], &criteria).unwrap());
    }
}
