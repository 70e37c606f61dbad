//! 权限应用服务

pub mod commands;
pub mod service;

pub use commands::{CreatePermissionCommand, UpdatePermissionCommand};
pub use service::PermissionService;
