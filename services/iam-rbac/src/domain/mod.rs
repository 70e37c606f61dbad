//! 领域层

pub mod association;
pub mod menu;
pub mod permission;
pub mod role;
pub mod session;
pub mod unit_of_work;
pub mod user;
