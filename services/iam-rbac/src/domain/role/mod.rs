//! 角色聚合

pub mod repository;
pub mod role;

pub use repository::{RoleFilter, RoleRepository};
pub use role::{Role, RoleId, RoleStatus};
