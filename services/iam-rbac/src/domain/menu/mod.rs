//! 菜单聚合

pub mod forest;
pub mod menu;
pub mod repository;
pub mod tree;

pub use forest::{MenuNode, assemble_forest, retain_reachable, sort_menus};
pub use menu::{Menu, MenuId, MenuResource, MenuResourceId, MenuStatus, MenuType, ResourceSpec};
pub use repository::{MenuFilter, MenuRepository, MenuResourceRepository};
pub use tree::{MenuChanges, MenuScope, MenuTree, NewMenu};
