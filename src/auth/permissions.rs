//! Capability gating against the operator-controlled permission matrix.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::PermissionError;

/// A named permission gating one manager action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    HealthCheck,
    ListUpdates,
    PerformUpdates,
    AccessAnalytics,
}

impl Capability {
    /// Map a wire action string to its capability.
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "health_check" => Some(Capability::HealthCheck),
            "list_updates" => Some(Capability::ListUpdates),
            "perform_updates" => Some(Capability::PerformUpdates),
            "access_analytics" => Some(Capability::AccessAnalytics),
            _ => None,
        }
    }

    /// Wire action string for this capability.
    pub fn as_action(&self) -> &'static str {
        match self {
            Capability::HealthCheck => "health_check",
            Capability::ListUpdates => "list_updates",
            Capability::PerformUpdates => "perform_updates",
            Capability::AccessAnalytics => "access_analytics",
        }
    }
}

/// Site-operator-controlled capability grants.
///
/// Health checks and update listing are baseline, read-only capabilities
/// required for the connector to be useful at all; they have no flags
/// here, so no persisted state or admin action can ever disable them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionMatrix {
    /// Whether the manager may install plugin/theme/core updates.
    #[serde(default)]
    pub perform_updates: bool,
    /// Whether the manager may read opt-in analytics.
    #[serde(default)]
    pub access_analytics: bool,
}

impl PermissionMatrix {
    /// Whether a capability is granted under this matrix.
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::HealthCheck | Capability::ListUpdates => true,
            Capability::PerformUpdates => self.perform_updates,
            Capability::AccessAnalytics => self.access_analytics,
        }
    }

    /// All granted capabilities, baseline first.
    pub fn granted(&self) -> Vec<Capability> {
        [
            Capability::HealthCheck,
            Capability::ListUpdates,
            Capability::PerformUpdates,
            Capability::AccessAnalytics,
        ]
        .into_iter()
        .filter(|c| self.allows(*c))
        .collect()
    }
}

/// Provider of the persisted permission matrix, mutated by the site's
/// administrative UI.
pub trait MatrixProvider: Send + Sync {
    fn get_matrix(&self, site_id: &str) -> PermissionMatrix;
}

/// In-memory matrix provider; unknown sites get the baseline matrix.
pub struct InMemoryMatrixProvider {
    matrices: Mutex<HashMap<String, PermissionMatrix>>,
}

impl InMemoryMatrixProvider {
    pub fn new() -> Self {
        Self {
            matrices: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_matrix(&self, site_id: &str, matrix: PermissionMatrix) {
        let mut matrices = self.matrices.lock().unwrap_or_else(|e| e.into_inner());
        matrices.insert(site_id.to_string(), matrix);
    }
}

impl Default for InMemoryMatrixProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixProvider for InMemoryMatrixProvider {
    fn get_matrix(&self, site_id: &str) -> PermissionMatrix {
        let matrices = self.matrices.lock().unwrap_or_else(|e| e.into_inner());
        matrices.get(site_id).cloned().unwrap_or_default()
    }
}

/// Resolve an action against the matrix.
///
/// The denial is reported as such, never downgraded to a generic
/// "unauthorized": the manager-side operator must be able to tell a
/// capability that needs enabling from a failed authentication.
pub fn authorize_action(
    action: &str,
    matrix: &PermissionMatrix,
) -> Result<Capability, PermissionError> {
    let capability = Capability::from_action(action).ok_or_else(|| PermissionError::Denied {
        action: action.to_string(),
    })?;

    if !matrix.allows(capability) {
        return Err(PermissionError::Denied {
            action: action.to_string(),
        });
    }

    Ok(capability)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_actions_pass_under_every_matrix() {
        let locked_down = PermissionMatrix::default();
        assert_eq!(
            authorize_action("health_check", &locked_down),
            Ok(Capability::HealthCheck)
        );
        assert_eq!(
            authorize_action("list_updates", &locked_down),
            Ok(Capability::ListUpdates)
        );
    }

    #[test]
    fn test_operator_controlled_actions_require_explicit_grant() {
        let matrix = PermissionMatrix::default();
        assert_eq!(
            authorize_action("perform_updates", &matrix),
            Err(PermissionError::Denied {
                action: "perform_updates".to_string()
            })
        );

        let matrix = PermissionMatrix {
            perform_updates: true,
            ..Default::default()
        };
        assert_eq!(
            authorize_action("perform_updates", &matrix),
            Ok(Capability::PerformUpdates)
        );
        assert!(authorize_action("access_analytics", &matrix).is_err());
    }

    #[test]
    fn test_unknown_action_denied() {
        let matrix = PermissionMatrix {
            perform_updates: true,
            access_analytics: true,
        };
        assert_eq!(
            authorize_action("drop_database", &matrix),
            Err(PermissionError::Denied {
                action: "drop_database".to_string()
            })
        );
    }

    #[test]
    fn test_granted_lists_baseline_first() {
        let matrix = PermissionMatrix {
            access_analytics: true,
            ..Default::default()
        };
        assert_eq!(
            matrix.granted(),
            vec![
                Capability::HealthCheck,
                Capability::ListUpdates,
                Capability::AccessAnalytics
            ]
        );
    }

    #[test]
    fn test_action_round_trip() {
        for capability in [
            Capability::HealthCheck,
            Capability::ListUpdates,
            Capability::PerformUpdates,
            Capability::AccessAnalytics,
        ] {
            assert_eq!(Capability::from_action(capability.as_action()), Some(capability));
        }
    }

    #[test]
    fn test_provider_defaults_to_baseline() {
        let provider = InMemoryMatrixProvider::new();
        let matrix = provider.get_matrix("unknown-site");
        assert!(!matrix.perform_updates);
        assert!(!matrix.access_analytics);

        provider.set_matrix(
            "site-1",
            PermissionMatrix {
                perform_updates: true,
                ..Default::default()
            },
        );
        assert!(provider.get_matrix("site-1").perform_updates);
    }

    #[test]
    fn test_matrix_deserializes_from_admin_settings() {
        let matrix: PermissionMatrix =
            serde_json::from_str(r#"{"perform_updates": true}"#).unwrap();
        assert!(matrix.perform_updates);
        assert!(!matrix.access_analytics);
        // Baseline capabilities exist regardless of what was persisted.
        assert!(matrix.allows(Capability::HealthCheck));
    }
}
