//! 安全相关适配器

pub mod argon2_hasher;

pub use argon2_hasher::Argon2PasswordHasher;
