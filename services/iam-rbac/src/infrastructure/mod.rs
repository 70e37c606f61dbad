//! 基础设施层

pub mod cache;
pub mod persistence;
pub mod security;
