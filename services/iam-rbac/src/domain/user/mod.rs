//! 用户聚合

pub mod password;
pub mod repository;
pub mod user;

pub use password::PasswordHasher;
pub use repository::{UserFilter, UserRepository};
pub use user::{User, UserStatus};

#[cfg(test)]
pub use password::MockPasswordHasher;
