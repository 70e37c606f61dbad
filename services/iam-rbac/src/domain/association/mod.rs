//! 关联关系（角色-菜单、角色-权限、用户-角色）
//!
//! 三类关联结构一致，用同一个泛型实体与 Repository 表达。

pub mod binding;
pub mod repository;

pub use binding::{Binding, BindingId, RoleMenu, RolePermission, UserRole, plan_replacement};
pub use repository::AssociationRepository;
