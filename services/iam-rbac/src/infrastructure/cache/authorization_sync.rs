//! 策略同步信号
//!
//! 每个策略域一个标记值（毫秒时间戳，单调不减）。写路径只负责覆盖标记，
//! 外部策略引擎轮询标记，发现变化后自行重新加载。写入失败只记录日志。

use std::collections::HashMap;
use std::sync::Arc;

use atrium_errors::{AppError, AppResult};
use atrium_ports::{CachePort, namespaced_key};
use chrono::Utc;
use tracing::{debug, warn};

/// 同步标记的键，位于各策略域的命名空间下
pub const SYNC_KEY: &str = "sync:policy";

/// 策略域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyDomain {
    Role,
    Permission,
}

impl PolicyDomain {
    pub const ALL: [PolicyDomain; 2] = [PolicyDomain::Role, PolicyDomain::Permission];

    pub fn namespace(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Permission => "permission",
        }
    }

    fn key(&self) -> String {
        namespaced_key(self.namespace(), SYNC_KEY)
    }
}

/// 策略同步信号
#[derive(Clone)]
pub struct AuthorizationSync {
    cache: Arc<dyn CachePort>,
}

impl AuthorizationSync {
    pub fn new(cache: Arc<dyn CachePort>) -> Self {
        Self { cache }
    }

    /// 更新策略域标记
    pub async fn touch(&self, domain: PolicyDomain) {
        match self.try_touch(domain).await {
            Ok(marker) => {
                metrics::counter!("rbac_authorization_sync_touch_total", "domain" => domain.namespace())
                    .increment(1);
                debug!(domain = domain.namespace(), marker, "Policy sync marker updated");
            }
            Err(e) => {
                metrics::counter!("rbac_authorization_sync_failures_total", "domain" => domain.namespace())
                    .increment(1);
                warn!(
                    domain = domain.namespace(),
                    transient = e.is_transient(),
                    error = %e,
                    "Failed to update policy sync marker"
                );
            }
        }
    }

    pub async fn touch_all(&self, domains: &[PolicyDomain]) {
        for domain in domains {
            self.touch(*domain).await;
        }
    }

    /// 当前标记，从未写入时为 None
    pub async fn marker(&self, domain: PolicyDomain) -> AppResult<Option<i64>> {
        match self.cache.get(&domain.key()).await? {
            Some(raw) => raw
                .parse::<i64>()
                .map(Some)
                .map_err(|e| AppError::internal(format!("Invalid policy sync marker: {}", e))),
            None => Ok(None),
        }
    }

    async fn try_touch(&self, domain: PolicyDomain) -> AppResult<i64> {
        // 损坏的旧值直接覆盖
        let previous = self.marker(domain).await.ok().flatten().unwrap_or(0);
        let marker = Utc::now().timestamp_millis().max(previous + 1);

        self.cache
            .set(&domain.key(), &marker.to_string(), None)
            .await?;
        Ok(marker)
    }
}

/// 策略引擎侧的轮询器
///
/// 记住上次看到的标记，`poll` 返回自上次以来发生变化的策略域。
pub struct PolicySyncWatcher {
    sync: AuthorizationSync,
    seen: HashMap<PolicyDomain, i64>,
}

impl PolicySyncWatcher {
    pub fn new(sync: AuthorizationSync) -> Self {
        Self {
            sync,
            seen: HashMap::new(),
        }
    }

    pub async fn poll(&mut self) -> AppResult<Vec<PolicyDomain>> {
        let mut changed = Vec::new();
        for domain in PolicyDomain::ALL {
            let Some(marker) = self.sync.marker(domain).await? else {
                continue;
            };
            if self.seen.insert(domain, marker) != Some(marker) {
                changed.push(domain);
            }
        }
        Ok(changed)
    }
}
