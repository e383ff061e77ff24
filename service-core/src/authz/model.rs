use crate::store::{FindManyQuery, RowStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Table holding per-role permission overrides (`role`, `permission`).
pub const ROLE_PERMISSIONS_TABLE: &str = "role_permissions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Role {
    Talent,
    Employer,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Talent, Role::Employer, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Talent => "talent",
            Role::Employer => "employer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage and display casing differ, so roles compare uppercased.
impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TALENT" => Ok(Role::Talent),
            "EMPLOYER" => Ok(Role::Employer),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Fine-grained capability, namespaced `resource:action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Permission {
    UserCreate,
    UserRead,
    UserUpdate,
    UserDelete,
    GigCreate,
    GigRead,
    GigUpdate,
    GigDelete,
    GigViewAll,
    PayoutRequest,
    PaymentProcess,
    ViewEarnings,
    ReviewCreate,
    ReviewRead,
    ReviewDelete,
    ReviewModerate,
    SuspendUser,
    ViewAuditLogs,
}

impl Permission {
    pub const ALL: [Permission; 18] = [
        Permission::UserCreate,
        Permission::UserRead,
        Permission::UserUpdate,
        Permission::UserDelete,
        Permission::GigCreate,
        Permission::GigRead,
        Permission::GigUpdate,
        Permission::GigDelete,
        Permission::GigViewAll,
        Permission::PayoutRequest,
        Permission::PaymentProcess,
        Permission::ViewEarnings,
        Permission::ReviewCreate,
        Permission::ReviewRead,
        Permission::ReviewDelete,
        Permission::ReviewModerate,
        Permission::SuspendUser,
        Permission::ViewAuditLogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::UserCreate => "user:create",
            Permission::UserRead => "user:read",
            Permission::UserUpdate => "user:update",
            Permission::UserDelete => "user:delete",
            Permission::GigCreate => "gig:create",
            Permission::GigRead => "gig:read",
            Permission::GigUpdate => "gig:update",
            Permission::GigDelete => "gig:delete",
            Permission::GigViewAll => "gig:view:all",
            Permission::PayoutRequest => "payout:request",
            Permission::PaymentProcess => "payment:process",
            Permission::ViewEarnings => "view:earnings",
            Permission::ReviewCreate => "review:create",
            Permission::ReviewRead => "review:read",
            Permission::ReviewDelete => "review:delete",
            Permission::ReviewModerate => "review:moderate",
            Permission::SuspendUser => "suspend:user",
            Permission::ViewAuditLogs => "view:audit:logs",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Unknown permission: {}", s))
    }
}

impl TryFrom<String> for Permission {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.as_str().to_string()
    }
}

/// Compiled-in permission set used when the store has no override rows for
/// a role.
pub fn default_permissions(role: Role) -> BTreeSet<Permission> {
    match role {
        Role::Talent => BTreeSet::from([
            Permission::UserRead,
            Permission::UserUpdate,
            Permission::GigCreate,
            Permission::GigRead,
            Permission::GigUpdate,
            Permission::PayoutRequest,
            Permission::ReviewCreate,
            Permission::ReviewRead,
            Permission::ViewEarnings,
        ]),
        Role::Employer => BTreeSet::from([
            Permission::UserRead,
            Permission::UserUpdate,
            Permission::GigCreate,
            Permission::GigRead,
            Permission::GigUpdate,
            Permission::PaymentProcess,
            Permission::ReviewCreate,
            Permission::ReviewRead,
        ]),
        Role::Admin => Permission::ALL.into_iter().collect(),
    }
}

/// Resource kinds whose instances can be ownership-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    User,
    Gig,
    Review,
    Payment,
    Talent,
    Portfolio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConfig {
    pub table: &'static str,
    pub owner_column: &'static str,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::User => "user",
            ResourceType::Gig => "gig",
            ResourceType::Review => "review",
            ResourceType::Payment => "payment",
            ResourceType::Talent => "talent",
            ResourceType::Portfolio => "portfolio",
        }
    }

    /// Where the owner of a resource instance is recorded.
    pub fn table_config(&self) -> TableConfig {
        let (table, owner_column) = match self {
            ResourceType::User => ("users", "id"),
            ResourceType::Gig => ("gigs", "employer_id"),
            ResourceType::Review => ("talent_reviews", "reviewer_id"),
            ResourceType::Payment => ("payments", "user_id"),
            ResourceType::Talent => ("talent_profiles", "user_id"),
            ResourceType::Portfolio => ("talent_portfolios", "user_id"),
        };
        TableConfig {
            table,
            owner_column,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of truth for role permissions and resource ownership, backed by
/// the row store.
#[derive(Clone)]
pub struct AuthorizationModel {
    store: Arc<dyn RowStore>,
}

impl AuthorizationModel {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    /// Override rows for the role win outright; no rows at all (or a failed
    /// lookup) falls back to [`default_permissions`]. The two sets are never
    /// merged.
    pub async fn permissions_for_role(&self, role: Role) -> BTreeSet<Permission> {
        let query = FindManyQuery::new().filter("role", role.as_str());

        match self.store.find_many(ROLE_PERMISSIONS_TABLE, &query).await {
            Ok(rows) if !rows.is_empty() => rows
                .iter()
                .filter_map(|row| row.get("permission").and_then(Value::as_str))
                .filter_map(|raw| match raw.parse::<Permission>() {
                    Ok(permission) => Some(permission),
                    Err(e) => {
                        tracing::warn!(role = %role, error = %e, "Ignoring unknown permission override");
                        None
                    }
                })
                .collect(),
            Ok(_) => default_permissions(role),
            Err(e) => {
                tracing::warn!(role = %role, error = %e, "Permission override lookup failed, using defaults");
                default_permissions(role)
            }
        }
    }

    /// Owner user id of a resource instance. A missing row and a failed
    /// lookup both come back as `None`; they are logged differently.
    pub async fn owner_of(&self, resource: ResourceType, resource_id: &str) -> Option<String> {
        let TableConfig {
            table,
            owner_column,
        } = resource.table_config();

        let columns = [owner_column];
        match self
            .store
            .find_by_id(table, resource_id, Some(&columns[..]))
            .await
        {
            Ok(Some(row)) => match row.get(owner_column) {
                Some(Value::String(owner)) => Some(owner.clone()),
                Some(Value::Number(owner)) => Some(owner.to_string()),
                _ => None,
            },
            Ok(None) => {
                tracing::debug!(resource = %resource, resource_id, "Resource not found for ownership lookup");
                None
            }
            Err(e) => {
                tracing::warn!(
                    resource = %resource,
                    resource_id,
                    error = %e,
                    ownership_lookup_failed = true,
                    "Ownership lookup failed"
                );
                None
            }
        }
    }
}
