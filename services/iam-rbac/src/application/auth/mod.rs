//! 认证应用服务

pub mod service;

pub use service::{AuthService, CurrentUser};
