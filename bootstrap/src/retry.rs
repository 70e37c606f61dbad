//! 启动阶段的依赖连接重试

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

/// 指数退避计划
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    /// 总尝试次数（至少一次）
    pub attempts: u32,
    pub first_delay: Duration,
    pub max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 5,
            first_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    pub fn new(attempts: u32, first_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts,
            first_delay,
            max_delay,
        }
    }

    /// 各次失败后的等待时间，长度为 `attempts - 1`
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let total = self.attempts.max(1) - 1;
        (0..total).map(move |n| {
            self.first_delay
                .checked_mul(1u32 << n.min(16))
                .map_or(self.max_delay, |d| d.min(self.max_delay))
        })
    }
}

/// 按退避计划连接依赖，全部失败时返回最后一次的错误
pub async fn connect_with_backoff<F, Fut, T, E>(
    backoff: &Backoff,
    dependency: &str,
    mut connect: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delays = backoff.delays();
    let mut attempt = 1u32;

    loop {
        let error = match connect().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(dependency, attempt, "Dependency reachable after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        let Some(delay) = delays.next() else {
            warn!(dependency, attempt, error = %error, "Dependency unreachable, giving up");
            return Err(error);
        };

        warn!(
            dependency,
            attempt,
            error = %error,
            retry_in_ms = delay.as_millis() as u64,
            "Dependency unreachable, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
