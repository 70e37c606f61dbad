//! 关联实体

use std::collections::{HashMap, HashSet};

use atrium_common::{Identifier, UserId, define_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::menu::MenuId;
use crate::domain::permission::PermissionId;
use crate::domain::role::RoleId;

define_id!(
    /// 关联记录 ID
    BindingId
);

/// 一条 owner → target 关联
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding<O, T> {
    pub id: BindingId,
    pub owner_id: O,
    pub target_id: T,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<O: Identifier, T: Identifier> Binding<O, T> {
    pub fn new(owner_id: O, target_id: T) -> Self {
        let now = Utc::now();
        Self {
            id: BindingId::new(),
            owner_id,
            target_id,
            created_at: now,
            updated_at: now,
        }
    }
}

pub type RoleMenu = Binding<RoleId, MenuId>;
pub type RolePermission = Binding<RoleId, PermissionId>;
pub type UserRole = Binding<UserId, RoleId>;

/// 计算全量替换后的关联集合
///
/// 目标去重并保持输入顺序；已存在的目标沿用原记录（ID 与时间戳不变），
/// 因此相同输入重复替换得到完全相同的结果。
pub fn plan_replacement<O: Identifier, T: Identifier>(
    existing: &[Binding<O, T>],
    owner_id: O,
    targets: &[T],
) -> Vec<Binding<O, T>> {
    let mut current: HashMap<T, &Binding<O, T>> =
        existing.iter().map(|b| (b.target_id, b)).collect();
    let mut seen = HashSet::with_capacity(targets.len());

    targets
        .iter()
        .filter(|target| seen.insert(**target))
        .map(|target| match current.remove(target) {
            Some(binding) => binding.clone(),
            None => Binding::new(owner_id, *target),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_dedupes_targets() {
        let role = RoleId::new();
        let menu = MenuId::new();

        let plan = plan_replacement::<RoleId, MenuId>(&[], role, &[menu, menu, menu]);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].owner_id, role);
        assert_eq!(plan[0].target_id, menu);
    }

    #[test]
    fn test_plan_reuses_existing_records() {
        let role = RoleId::new();
        let kept = MenuId::new();
        let dropped = MenuId::new();
        let added = MenuId::new();

        let existing = plan_replacement(&[], role, &[kept, dropped]);
        let plan = plan_replacement(&existing, role, &[kept, added]);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0], existing[0]);
        assert_eq!(plan[1].target_id, added);
        assert!(plan.iter().all(|b| b.target_id != dropped));

        let again = plan_replacement(&plan, role, &[kept, added]);
        assert_eq!(again, plan);
    }
}
