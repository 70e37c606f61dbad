//! 会话缓存
//!
//! 用户 → 角色 ID 集合。命中时不访问存储；未命中时先确认用户仍然存在且处于激活状态，
//! 再从关联表解析角色并回写缓存。缓存只是加速层，读写失败都降级到存储。

use std::sync::Arc;
use std::time::Duration;

use atrium_auth_core::Subject;
use atrium_common::UserId;
use atrium_errors::{AppError, AppResult};
use atrium_ports::{CachePort, namespaced_key};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::role::RoleId;
use crate::domain::session::AuthContext;
use crate::domain::unit_of_work::RbacStore;

/// 会话缓存命名空间
pub const SESSION_NAMESPACE: &str = "user";

#[derive(Debug, Serialize, Deserialize)]
struct SessionEntry {
    role_ids: Vec<RoleId>,
}

pub struct SessionCache {
    cache: Arc<dyn CachePort>,
    store: Arc<dyn RbacStore>,
    ttl: Duration,
}

impl SessionCache {
    pub fn new(cache: Arc<dyn CachePort>, store: Arc<dyn RbacStore>, ttl: Duration) -> Self {
        Self { cache, store, ttl }
    }

    fn key(user_id: &UserId) -> String {
        namespaced_key(SESSION_NAMESPACE, &user_id.to_string())
    }

    /// 解析主体的授权上下文
    ///
    /// 超级管理员不查缓存也不查存储。用户不存在或未激活时返回统一的 Unauthorized。
    pub async fn resolve(&self, subject: &Subject) -> AppResult<AuthContext> {
        let user_id = match subject {
            Subject::Root => return Ok(AuthContext::root()),
            Subject::User(id) => *id,
        };
        let key = Self::key(&user_id);

        if let Some(role_ids) = self.read(&key).await {
            metrics::counter!("rbac_session_cache_hits_total").increment(1);
            return Ok(AuthContext {
                subject: *subject,
                role_ids,
            });
        }
        metrics::counter!("rbac_session_cache_misses_total").increment(1);

        let role_ids = self.load(&user_id).await?;
        self.write(&key, &role_ids).await;

        Ok(AuthContext {
            subject: *subject,
            role_ids,
        })
    }

    /// 删除用户的会话缓存
    pub async fn invalidate(&self, user_id: &UserId) {
        if let Err(e) = self.cache.delete(&Self::key(user_id)).await {
            warn!(user_id = %user_id, error = %e, "Failed to invalidate session cache");
        } else {
            debug!(user_id = %user_id, "Session cache invalidated");
        }
    }

    pub async fn invalidate_many(&self, user_ids: &[UserId]) {
        for user_id in user_ids {
            self.invalidate(user_id).await;
        }
    }

    async fn read(&self, key: &str) -> Option<Vec<RoleId>> {
        match self.cache.get(key).await {
            Ok(Some(json)) => match serde_json::from_str::<SessionEntry>(&json) {
                Ok(entry) => Some(entry.role_ids),
                Err(e) => {
                    warn!(key = %key, error = %e, "Corrupted session cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Session cache read failed, falling back to storage");
                None
            }
        }
    }

    async fn write(&self, key: &str, role_ids: &[RoleId]) {
        let entry = SessionEntry {
            role_ids: role_ids.to_vec(),
        };
        let result = match serde_json::to_string(&entry) {
            Ok(json) => self.cache.set(key, &json, Some(self.ttl)).await,
            Err(e) => Err(AppError::internal(format!(
                "Failed to serialize session entry: {}",
                e
            ))),
        };

        if let Err(e) = result {
            metrics::counter!("rbac_session_cache_write_failures_total").increment(1);
            warn!(key = %key, transient = e.is_transient(), error = %e, "Failed to write session cache");
        }
    }

    async fn load(&self, user_id: &UserId) -> AppResult<Vec<RoleId>> {
        let active = self
            .store
            .users()
            .find_by_id(user_id)
            .await?
            .is_some_and(|user| user.is_active());
        if !active {
            debug!(user_id = %user_id, "Session rejected: user missing or inactive");
            return Err(AppError::unauthorized_uniform());
        }

        let mut role_ids = Vec::new();
        for binding in self.store.user_roles().list_by_owner(user_id).await? {
            if !role_ids.contains(&binding.target_id) {
                role_ids.push(binding.target_id);
            }
        }
        Ok(role_ids)
    }
}
