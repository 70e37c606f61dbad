//! 持久化实现
//!
//! - postgres: 生产环境，sqlx + 共享事务
//! - memory: 进程内实现，嵌入与测试使用

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
