//! Role table: built-in roles plus user customization.

use crate::config::RolesConfig;
use crate::types::Role;
use std::collections::HashSet;

/// Built-in roles, in their default serialization order.
pub fn builtin_roles() -> Vec<Role> {
    vec![
        Role::new("drivers", "Drivers", "🚗", 1)
            .with_shortcut('d')
            .built_in(),
        Role::new("approvers", "Approvers", "👍", 2)
            .with_shortcut('a')
            .built_in(),
        Role::new("contributors", "Contributors", "👥", 3)
            .with_shortcut('c')
            .built_in(),
        Role::new("informed", "Informed", "📢", 4)
            .with_shortcut('i')
            .built_in(),
    ]
}

/// The set of roles currently visible, sorted by `order` then id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTable {
    roles: Vec<Role>,
}

impl Default for RoleTable {
    fn default() -> Self {
        Self::new(builtin_roles())
    }
}

impl RoleTable {
    /// Build a table from roles. Later roles with an id already present are dropped.
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        let mut seen = HashSet::new();
        let mut roles: Vec<Role> = roles
            .into_iter()
            .filter(|r| !r.icon.is_empty() && seen.insert(r.id.clone()))
            .collect();
        roles.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Self { roles }
    }

    /// Built-ins, overridden or extended by custom roles, minus hidden ids.
    pub fn from_config(config: &RolesConfig) -> Self {
        let mut roles = builtin_roles();
        for def in &config.custom {
            let custom = Role {
                id: def.id.clone(),
                name: def.name.clone(),
                icon: def.icon.clone(),
                shortcut: def.shortcut,
                built_in: false,
                order: def.order,
            };
            match roles.iter_mut().find(|r| r.id == def.id) {
                Some(existing) => {
                    *existing = Role {
                        built_in: existing.built_in,
                        ..custom
                    }
                }
                None => roles.push(custom),
            }
        }
        let hidden: HashSet<&str> = config.hidden.iter().map(String::as_str).collect();
        Self::new(roles.into_iter().filter(|r| !hidden.contains(r.id.as_str())))
    }

    pub fn visible(&self) -> &[Role] {
        &self.roles
    }

    pub fn get(&self, id: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }

    pub fn by_icon(&self, icon: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.icon == icon)
    }

    pub fn by_shortcut(&self, shortcut: char) -> Option<&Role> {
        self.roles
            .iter()
            .find(|r| r.shortcut.is_some_and(|s| s.eq_ignore_ascii_case(&shortcut)))
    }

    /// Look a role up by id, display name or shortcut.
    pub fn resolve(&self, key: &str) -> Option<&Role> {
        if let Some(role) = self.get(key) {
            return Some(role);
        }
        if let Some(role) = self.roles.iter().find(|r| r.name.eq_ignore_ascii_case(key)) {
            return Some(role);
        }
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => self.by_shortcut(c),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoleDefinition;

    #[test]
    fn test_default_table_sorted_by_order() {
        let table = RoleTable::default();
        let ids: Vec<&str> = table.visible().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["drivers", "approvers", "contributors", "informed"]);
        assert!(table.visible().iter().all(|r| r.built_in));
    }

    #[test]
    fn test_lookup() {
        let table = RoleTable::default();
        assert_eq!(table.by_icon("👍").map(|r| r.id.as_str()), Some("approvers"));
        assert_eq!(table.by_shortcut('C').map(|r| r.id.as_str()), Some("contributors"));
        assert_eq!(table.resolve("Informed").map(|r| r.id.as_str()), Some("informed"));
        assert_eq!(table.resolve("d").map(|r| r.id.as_str()), Some("drivers"));
        assert!(table.resolve("nobody").is_none());
    }

    #[test]
    fn test_from_config_hides_and_adds() {
        let config = RolesConfig {
            hidden: vec!["informed".to_string()],
            custom: vec![
                RoleDefinition {
                    id: "reviewers".to_string(),
                    name: "Reviewers".to_string(),
                    icon: "🔍".to_string(),
                    shortcut: Some('r'),
                    order: 0,
                },
                RoleDefinition {
                    id: "drivers".to_string(),
                    name: "Owners".to_string(),
                    icon: "🏁".to_string(),
                    shortcut: None,
                    order: 10,
                },
            ],
        };
        let table = RoleTable::from_config(&config);
        let ids: Vec<&str> = table.visible().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["reviewers", "approvers", "contributors", "drivers"]);

        let drivers = table.get("drivers").unwrap();
        assert_eq!(drivers.icon, "🏁");
        assert!(drivers.built_in);
        assert!(!table.get("reviewers").unwrap().built_in);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let table = RoleTable::new(vec![
            Role::new("x", "First", "1️⃣", 2),
            Role::new("x", "Second", "2️⃣", 1),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("x").unwrap().name, "First");
    }
}
