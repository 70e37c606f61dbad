//! 关联 Repository 接口

use async_trait::async_trait;
use atrium_common::Identifier;
use atrium_errors::AppResult;

use super::binding::Binding;

/// 关联 Repository
///
/// `replace_all` 在单个事务（或嵌套保存点）内完成删除与插入，
/// 重复调用相同参数时结果不变。
#[async_trait]
pub trait AssociationRepository<O: Identifier, T: Identifier>: Send + Sync {
    async fn list_by_owner(&self, owner_id: &O) -> AppResult<Vec<Binding<O, T>>>;

    async fn list_by_owners(&self, owner_ids: &[O]) -> AppResult<Vec<Binding<O, T>>>;

    async fn list_by_target(&self, target_id: &T) -> AppResult<Vec<Binding<O, T>>>;

    /// 用给定目标集合整体替换 owner 的关联，返回替换后的关联
    async fn replace_all(&self, owner_id: &O, target_ids: &[T]) -> AppResult<Vec<Binding<O, T>>>;

    async fn delete_by_owner(&self, owner_id: &O) -> AppResult<u64>;

    async fn delete_by_target(&self, target_id: &T) -> AppResult<u64>;

    async fn delete_by_targets(&self, target_ids: &[T]) -> AppResult<u64>;
}
