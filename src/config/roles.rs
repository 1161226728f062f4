//! Process-wide role table.
//!
//! Roles are immutable and loaded exactly once at startup; with no writer
//! after initialization, concurrent readers need no locking. The
//! distinguished `public` role means "no authentication required".

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub code: String,
    pub name: String,
    pub description: String,
}

impl Role {
    pub fn new(code: &str, name: &str, description: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// Built-in role codes.
pub mod codes {
    pub const PUBLIC: &str = "public";
    pub const ADMIN: &str = "admin";
    pub const BACKOFFICE: &str = "backoffice";
}

#[derive(Debug)]
pub struct RoleTable {
    roles: BTreeMap<String, Role>,
}

impl RoleTable {
    fn build(extra: Vec<Role>) -> Self {
        let mut roles = BTreeMap::new();
        for role in [
            Role::new(codes::PUBLIC, "Public", "Public role"),
            Role::new(codes::ADMIN, "Admin", "Admin role"),
            Role::new(codes::BACKOFFICE, "Backoffice", "Backoffice role"),
        ]
        .into_iter()
        .chain(extra)
        {
            roles.insert(role.code.clone(), role);
        }
        Self { roles }
    }

    pub fn get(&self, code: &str) -> Option<&Role> {
        self.roles.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.roles.contains_key(code)
    }

    pub fn all(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }
}

static ROLES: OnceLock<RoleTable> = OnceLock::new();

/// Installs the role table. Application-specific roles are appended to the
/// built-ins; the first call wins, later calls are no-ops.
pub fn install(extra: Vec<Role>) -> &'static RoleTable {
    ROLES.get_or_init(|| RoleTable::build(extra))
}

/// The installed role table (built-ins only if [`install`] was never called).
pub fn roles() -> &'static RoleTable {
    ROLES.get_or_init(|| RoleTable::build(Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_present() {
        let table = RoleTable::build(Vec::new());
        assert!(table.contains(codes::PUBLIC));
        assert!(table.contains(codes::ADMIN));
        assert!(table.contains(codes::BACKOFFICE));
        assert!(!table.contains("customer"));
    }

    #[test]
    fn extra_roles_are_appended() {
        let table = RoleTable::build(vec![Role::new("customer", "Customer", "Customer role")]);
        assert!(table.contains("customer"));
        assert_eq!(table.get("customer").unwrap().name, "Customer");
        assert_eq!(table.all().count(), 4);
    }
}
