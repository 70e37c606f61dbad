//! 用户应用服务

pub mod commands;
pub mod service;

pub use commands::{CreateUserCommand, UpdateUserCommand, UserDetail};
pub use service::UserService;
