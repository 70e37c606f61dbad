//! 权限聚合

pub mod permission;
pub mod repository;

pub use permission::{Permission, PermissionId};
pub use repository::{PermissionFilter, PermissionRepository};
