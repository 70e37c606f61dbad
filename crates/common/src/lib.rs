//! atrium-common - 通用类型和工具库

pub mod tree_path;
pub mod types;

pub use types::*;
