//! Role model - named bundles of scopes.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Role entity. Principals reference roles by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub scopes: BTreeSet<String>,
}

impl Role {
    pub fn new<I, S>(name: &str, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Role definitions known to the gateway, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    roles: HashMap<String, Role>,
}

impl RoleRegistry {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: roles
                .into_iter()
                .map(|role| (role.name.clone(), role))
                .collect(),
        }
    }

    /// `user` can read and write the catalog and manage its own API keys; `admin` can also
    /// manage other principals' keys and read principals.
    pub fn default_roles() -> Vec<Role> {
        let user_scopes = [
            "read:metadata",
            "read:data",
            "write:metadata",
            "write:data",
            "create",
            "apikeys",
        ];
        let admin_scopes = user_scopes
            .iter()
            .copied()
            .chain(["admin:apikeys", "read:principals", "metrics"]);

        vec![Role::new("user", user_scopes), Role::new("admin", admin_scopes)]
    }

    pub fn with_defaults() -> Self {
        Self::new(Self::default_roles())
    }

    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    pub fn insert(&mut self, role: Role) {
        self.roles.insert(role.name.clone(), role);
    }

    /// Union of the scopes of all named roles. Unknown names contribute nothing.
    pub fn scopes_for(&self, role_names: &[String]) -> BTreeSet<String> {
        role_names
            .iter()
            .filter_map(|name| {
                let role = self.roles.get(name);
                if role.is_none() {
                    tracing::debug!(role = %name, "Principal references an undefined role");
                }
                role
            })
            .flat_map(|role| role.scopes.iter().cloned())
            .collect()
    }
}
