//! 菜单应用服务

pub mod commands;
pub mod import;
pub mod service;

pub use commands::{CreateMenuCommand, MenuListing, MenuQuery, UpdateMenuCommand};
pub use import::{ImportSummary, MenuSeed};
pub use service::MenuService;
