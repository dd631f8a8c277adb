//! Role and user permission resolution.
//!
//! Abilities are keyed by a (feature, action) pair. A role carries the
//! default mapping; individual users may carry overrides. Resolution starts
//! from the role map and overlays the user's entries, so a user row wins
//! whenever both exist.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// One feature/action grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Ability {
    /// Feature identifier (e.g., "clients", "reports").
    pub feature: String,
    /// Action on the feature (e.g., "read", "write", "delete").
    pub action: String,
    /// Whether the action is allowed.
    pub allowed: bool,
}

/// Merges role defaults with per-user overrides.
///
/// Output is sorted by (feature, action) so the result is deterministic
/// regardless of fetch order.
#[must_use]
pub fn effective_abilities(role: &[Ability], user: &[Ability]) -> Vec<Ability> {
    let mut merged: BTreeMap<(String, String), bool> = BTreeMap::new();

    for ability in role {
        merged.insert(
            (ability.feature.clone(), ability.action.clone()),
            ability.allowed,
        );
    }
    // User rows overlay role defaults.
    for ability in user {
        merged.insert(
            (ability.feature.clone(), ability.action.clone()),
            ability.allowed,
        );
    }

    merged
        .into_iter()
        .map(|((feature, action), allowed)| Ability {
            feature,
            action,
            allowed,
        })
        .collect()
}

/// Fetches a role's default abilities.
///
/// # Errors
/// Returns the database error.
pub async fn fetch_role_abilities(pool: &PgPool, role: &str) -> Result<Vec<Ability>, sqlx::Error> {
    sqlx::query_as("SELECT feature, action, allowed FROM role_abilities WHERE role = $1")
        .bind(role)
        .fetch_all(pool)
        .await
}

/// Fetches a user's ability overrides.
///
/// # Errors
/// Returns the database error.
pub async fn fetch_user_abilities(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<Ability>, sqlx::Error> {
    sqlx::query_as("SELECT feature, action, allowed FROM user_abilities WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

/// Resolves the effective ability set for a user's role plus overrides.
///
/// # Errors
/// Returns the database error.
pub async fn resolve_user_abilities(
    pool: &PgPool,
    role: &str,
    user_id: i64,
) -> Result<Vec<Ability>, sqlx::Error> {
    let (role_abilities, user_abilities) = tokio::try_join!(
        fetch_role_abilities(pool, role),
        fetch_user_abilities(pool, user_id),
    )?;
    Ok(effective_abilities(&role_abilities, &user_abilities))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ability(feature: &str, action: &str, allowed: bool) -> Ability {
        Ability {
            feature: feature.to_string(),
            action: action.to_string(),
            allowed,
        }
    }

    #[test]
    fn test_role_defaults_pass_through() {
        let role = vec![
            ability("clients", "read", true),
            ability("clients", "write", false),
        ];
        let merged = effective_abilities(&role, &[]);
        assert_eq!(merged, role);
    }

    #[test]
    fn test_user_override_wins() {
        let role = vec![
            ability("clients", "read", true),
            ability("clients", "write", false),
        ];
        let user = vec![ability("clients", "write", true)];

        let merged = effective_abilities(&role, &user);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().any(|a| a.action == "write" && a.allowed));
        assert!(merged.iter().any(|a| a.action == "read" && a.allowed));
    }

    #[test]
    fn test_user_only_entries_added() {
        let role = vec![ability("clients", "read", true)];
        let user = vec![ability("reports", "export", true)];

        let merged = effective_abilities(&role, &user);
        assert_eq!(merged.len(), 2);
        // Sorted by (feature, action)
        assert_eq!(merged[0].feature, "clients");
        assert_eq!(merged[1].feature, "reports");
    }

    #[test]
    fn test_user_can_revoke_role_grant() {
        let role = vec![ability("reports", "export", true)];
        let user = vec![ability("reports", "export", false)];

        let merged = effective_abilities(&role, &user);
        assert_eq!(merged.len(), 1);
        assert!(!merged[0].allowed);
    }

    #[test]
    fn test_merge_is_deterministic() {
        let role = vec![
            ability("b", "y", true),
            ability("a", "z", false),
            ability("a", "x", true),
        ];
        let first = effective_abilities(&role, &[]);
        let second = effective_abilities(&role, &[]);
        assert_eq!(first, second);
        assert_eq!(first[0].feature, "a");
        assert_eq!(first[0].action, "x");
    }
}
