//! iam-rbac - 菜单、角色、权限与用户的 RBAC 核心
//!
//! 菜单树使用物化路径，子树的移动、级联禁用与删除都是单条前缀查询；
//! 写操作在 Unit of Work 内完成，提交后发出策略同步信号并失效会话缓存。

pub mod application;
pub mod context;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use context::RbacContext;
pub use error::RbacError;
