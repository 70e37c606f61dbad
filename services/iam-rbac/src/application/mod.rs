//! 应用层
//!
//! 各服务在 Unit of Work 内完成持久化，提交成功后再发出策略同步信号、失效会话缓存。

pub mod auth;
pub mod menu;
pub mod permission;
pub mod role;
pub mod user;

use atrium_common::Identifier;
use atrium_errors::AppResult;
use tracing::warn;

use crate::domain::unit_of_work::UnitOfWork;

/// 根据执行结果提交或回滚
pub(crate) async fn finish<T>(uow: Box<dyn UnitOfWork>, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_error) = uow.rollback().await {
                warn!(error = %rollback_error, "Failed to rollback unit of work");
            }
            Err(e)
        }
    }
}

/// 校验必填且有长度上限的文本字段
pub(crate) fn check_text(field: &str, value: &str, max: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} cannot be empty", field));
    }
    if value.chars().count() > max {
        return Err(format!("{} cannot exceed {} characters", field, max));
    }
    Ok(())
}

/// 去重并保持原有顺序
pub(crate) fn distinct<I: Identifier>(ids: &[I]) -> Vec<I> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
