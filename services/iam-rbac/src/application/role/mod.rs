//! 角色应用服务

pub mod commands;
pub mod service;

pub use commands::{CreateRoleCommand, RoleDetail, UpdateRoleCommand};
pub use service::RoleService;
