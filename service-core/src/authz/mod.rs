//! Role, permission and resource-ownership authorization.

pub mod model;
pub mod ownership;
pub mod permissions;

pub use model::{
    AuthorizationModel, Permission, ROLE_PERMISSIONS_TABLE, ResourceType, Role, TableConfig,
    default_permissions,
};
pub use ownership::{OWNERSHIP_DENIED, OwnershipEvaluator};
pub use permissions::PermissionEvaluator;
