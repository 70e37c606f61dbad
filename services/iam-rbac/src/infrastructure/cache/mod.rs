//! 缓存模块
//!
//! - MemoryCache: 进程内 CachePort 实现（moka），单实例部署与测试使用
//! - SessionCache: 用户 → 角色集合的会话缓存
//! - AuthorizationSync: 策略变更信号

pub mod authorization_sync;
pub mod memory_cache;
pub mod session_cache;

pub use authorization_sync::{AuthorizationSync, PolicyDomain, PolicySyncWatcher, SYNC_KEY};
pub use memory_cache::MemoryCache;
pub use session_cache::{SESSION_NAMESPACE, SessionCache};
