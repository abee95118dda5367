//! Reconciliation of fields the server always fills in.
//!
//! Some fields (retention policies on a lifecycle) are optional in
//! configuration but always populated by the server, which applies its own
//! default. Storing that default back into state would make every plan show a
//! diff against a configuration that never mentioned the field. The
//! [`DefaultReconciler`] injects the default on the way out and strips it again
//! on the way back, but only when the user never set the field.
//!
//! ```
//! use octopus_provider_core::models::RetentionPolicy;
//! use octopus_provider_core::reconcile::{DefaultReconciler, FieldState};
//!
//! let reconciler = DefaultReconciler::new(RetentionPolicy::server_default());
//!
//! let state = reconciler.outgoing(FieldState::from_config(None));
//! assert_eq!(state.request_value(), Some(&RetentionPolicy::server_default()));
//!
//! // The server echoes the default back: nothing is stored.
//! let stored = reconciler.incoming(&state, Some(RetentionPolicy::server_default()));
//! assert_eq!(stored, None);
//! ```

use crate::models::RetentionPolicy;

/// Where a defaulted field stands relative to the user's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldState<T> {
    /// The user configured nothing.
    Unset,
    /// The user configured this value explicitly.
    UserSet(T),
    /// The user configured nothing and the default was injected for the request.
    Reconciled(T),
}

impl<T> FieldState<T> {
    /// Classify a configured value.
    pub fn from_config(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::UserSet(v),
            None => Self::Unset,
        }
    }

    /// Whether the user asked for a value.
    pub fn is_user_set(&self) -> bool {
        matches!(self, Self::UserSet(_))
    }

    /// The value to send to the server, if any.
    pub fn request_value(&self) -> Option<&T> {
        match self {
            Self::Unset => None,
            Self::UserSet(v) | Self::Reconciled(v) => Some(v),
        }
    }
}

/// Injects and suppresses a known server default for one field.
#[derive(Debug, Clone)]
pub struct DefaultReconciler<T> {
    default: T,
}

impl<T: Clone + PartialEq> DefaultReconciler<T> {
    /// Create a reconciler for the given canonical default.
    pub fn new(default: T) -> Self {
        Self { default }
    }

    /// Prepare a field for an outgoing request.
    ///
    /// `Unset` becomes `Reconciled(default)`; anything else passes through.
    pub fn outgoing(&self, state: FieldState<T>) -> FieldState<T> {
        match state {
            FieldState::Unset => FieldState::Reconciled(self.default.clone()),
            other => other,
        }
    }

    /// Decide what to store once the server has answered.
    ///
    /// `prior` is the state the request was built from. The returned value is
    /// dropped only when it is structurally equal to the default *and* the user
    /// did not set the field; an explicit user value is always kept.
    pub fn incoming(&self, prior: &FieldState<T>, returned: Option<T>) -> Option<T> {
        if prior.is_user_set() {
            return returned;
        }
        match returned {
            Some(value) if value == self.default => None,
            other => other,
        }
    }
}

/// Reconciler for lifecycle-level retention policies.
pub fn retention_reconciler() -> DefaultReconciler<RetentionPolicy> {
    DefaultReconciler::new(RetentionPolicy::server_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RetentionUnit;

    #[test]
    fn test_outgoing_injects_default_only_when_unset() {
        let reconciler = retention_reconciler();

        let state = reconciler.outgoing(FieldState::Unset);
        assert_eq!(
            state,
            FieldState::Reconciled(RetentionPolicy::server_default())
        );

        let explicit = RetentionPolicy::new(5, RetentionUnit::Items, false);
        let state = reconciler.outgoing(FieldState::UserSet(explicit.clone()));
        assert_eq!(state, FieldState::UserSet(explicit));
    }

    #[test]
    fn test_unset_default_is_suppressed() {
        let reconciler = retention_reconciler();
        let prior = reconciler.outgoing(FieldState::Unset);

        let stored = reconciler.incoming(&prior, Some(RetentionPolicy::server_default()));
        assert_eq!(stored, None);
    }

    #[test]
    fn test_unset_non_default_is_kept() {
        let reconciler = retention_reconciler();
        let prior = reconciler.outgoing(FieldState::Unset);

        let returned = RetentionPolicy::new(15, RetentionUnit::Days, false);
        let stored = reconciler.incoming(&prior, Some(returned.clone()));
        assert_eq!(stored, Some(returned));
    }

    #[test]
    fn test_explicit_default_is_kept() {
        let reconciler = retention_reconciler();
        let prior = reconciler.outgoing(FieldState::UserSet(RetentionPolicy::server_default()));

        let stored = reconciler.incoming(&prior, Some(RetentionPolicy::server_default()));
        assert_eq!(stored, Some(RetentionPolicy::server_default()));
    }

    #[test]
    fn test_comparison_uses_every_field() {
        let reconciler = retention_reconciler();
        let prior = FieldState::Unset;

        // Shares quantity and unit with the default, differs in keep-forever.
        let forever_30 = RetentionPolicy::new(30, RetentionUnit::Days, true);
        assert_eq!(
            reconciler.incoming(&prior, Some(forever_30.clone())),
            Some(forever_30)
        );

        // Shares quantity and keep-forever, differs in unit.
        let items_30 = RetentionPolicy::new(30, RetentionUnit::Items, false);
        assert_eq!(
            reconciler.incoming(&prior, Some(items_30.clone())),
            Some(items_30)
        );
    }

    #[test]
    fn test_absent_response_stays_absent() {
        let reconciler = retention_reconciler();
        assert_eq!(reconciler.incoming(&FieldState::Unset, None), None);
        assert_eq!(
            reconciler.incoming(&FieldState::UserSet(RetentionPolicy::keep_forever()), None),
            None
        );
    }

    #[test]
    fn test_works_for_other_field_types() {
        let reconciler = DefaultReconciler::new("Default".to_string());
        let prior = reconciler.outgoing(FieldState::from_config(None));
        assert_eq!(prior.request_value().map(String::as_str), Some("Default"));
        assert_eq!(reconciler.incoming(&prior, Some("Default".to_string())), None);
    }
}
