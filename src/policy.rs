//! Capability table.
//!
//! Access is decided by an explicit `(role, resource, action)` lookup. A
//! capability that is not listed is denied; administrators hold all of them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Administrator,
    AdmissionsOfficer,
    Teacher,
    HrManager,
    FinanceManager,
    InventoryManager,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Resource {
    Students,
    Staff,
    Payroll,
    Finance,
    Inventory,
    Reports,
    Users,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Read,
    Write,
    Delete,
}

use Action::{Delete, Read, Write};
use Resource::*;

const ALL: &[Action] = &[Read, Write, Delete];
const READ_WRITE: &[Action] = &[Read, Write];
const READ_ONLY: &[Action] = &[Read];

/// Every granted capability for non-administrator roles.
const POLICY: &[(Role, Resource, &[Action])] = &[
    (Role::AdmissionsOfficer, Students, ALL),
    (Role::AdmissionsOfficer, Reports, READ_WRITE),
    (Role::AdmissionsOfficer, Dashboard, READ_ONLY),
    (Role::Teacher, Students, READ_WRITE),
    (Role::HrManager, Staff, ALL),
    (Role::HrManager, Payroll, ALL),
    (Role::HrManager, Reports, READ_WRITE),
    (Role::HrManager, Dashboard, READ_ONLY),
    (Role::FinanceManager, Finance, ALL),
    (Role::FinanceManager, Payroll, READ_ONLY),
    (Role::FinanceManager, Students, READ_ONLY),
    (Role::FinanceManager, Inventory, READ_ONLY),
    (Role::FinanceManager, Reports, READ_WRITE),
    (Role::FinanceManager, Dashboard, READ_ONLY),
    (Role::InventoryManager, Inventory, ALL),
    (Role::InventoryManager, Staff, READ_ONLY),
    (Role::InventoryManager, Reports, READ_WRITE),
    (Role::InventoryManager, Dashboard, READ_ONLY),
];

pub const RESOURCES: [Resource; 8] = [
    Students, Staff, Payroll, Finance, Inventory, Reports, Users, Dashboard,
];

pub fn is_allowed(role: Role, resource: Resource, action: Action) -> bool {
    if role == Role::Administrator {
        return true;
    }
    POLICY
        .iter()
        .any(|(r, res, actions)| *r == role && *res == resource && actions.contains(&action))
}

/// All `(resource, action)` pairs granted to `role`, in table order.
pub fn capabilities(role: Role) -> Vec<(Resource, Action)> {
    RESOURCES
        .iter()
        .flat_map(|res| ALL.iter().map(move |act| (*res, *act)))
        .filter(|(res, act)| is_allowed(role, *res, *act))
        .collect()
}

/// Roles that can read `resource`; used to pick alert recipients.
pub fn roles_with(resource: Resource, action: Action) -> Vec<Role> {
    [
        Role::Administrator,
        Role::AdmissionsOfficer,
        Role::Teacher,
        Role::HrManager,
        Role::FinanceManager,
        Role::InventoryManager,
    ]
    .into_iter()
    .filter(|role| is_allowed(*role, resource, action))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn administrator_holds_every_capability() {
        for res in RESOURCES {
            for act in [Read, Write, Delete] {
                assert!(is_allowed(Role::Administrator, res, act));
            }
        }
        assert_eq!(capabilities(Role::Administrator).len(), RESOURCES.len() * 3);
    }

    #[test]
    fn unlisted_capabilities_are_denied() {
        assert!(!is_allowed(Role::Teacher, Finance, Read));
        assert!(!is_allowed(Role::Teacher, Students, Delete));
        assert!(!is_allowed(Role::InventoryManager, Finance, Write));
        assert!(!is_allowed(Role::FinanceManager, Users, Read));
    }

    #[test]
    fn finance_manager_reads_payroll_but_cannot_edit_it() {
        assert!(is_allowed(Role::FinanceManager, Payroll, Read));
        assert!(!is_allowed(Role::FinanceManager, Payroll, Write));
        assert!(is_allowed(Role::FinanceManager, Finance, Delete));
    }

    #[test]
    fn only_administrators_manage_users() {
        assert_eq!(roles_with(Users, Write), vec![Role::Administrator]);
    }

    #[test]
    fn inventory_alert_roles() {
        assert_eq!(
            roles_with(Inventory, Read),
            vec![Role::Administrator, Role::FinanceManager, Role::InventoryManager]
        );
    }
}
