//! 菜单森林组装

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::menu::{Menu, MenuId};

/// 树节点
#[derive(Debug, Clone, Serialize)]
pub struct MenuNode {
    #[serde(flatten)]
    pub menu: Menu,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    /// 子树节点总数（含自身）
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(MenuNode::count).sum::<usize>()
    }

    /// 深度优先查找
    pub fn find(&self, id: &MenuId) -> Option<&MenuNode> {
        if &self.menu.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// 稳定排序：sequence 降序，其次按创建时间、ID 升序
pub fn sort_menus(menus: &mut [Menu]) {
    menus.sort_by(|a, b| {
        b.sequence
            .cmp(&a.sequence)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// 只保留祖先链完整的节点
///
/// 祖先缺失（未授权、已禁用或不存在）的节点无法挂到树上，直接丢弃。
pub fn retain_reachable(menus: Vec<Menu>) -> Vec<Menu> {
    let present: HashSet<MenuId> = menus.iter().map(|m| m.id).collect();
    menus
        .into_iter()
        .filter(|menu| menu.ancestor_ids().iter().all(|id| present.contains(id)))
        .collect()
}

/// 将扁平列表组装为森林
///
/// 父节点不在列表中的节点作为根。
pub fn assemble_forest(mut menus: Vec<Menu>) -> Vec<MenuNode> {
    sort_menus(&mut menus);

    let present: HashSet<MenuId> = menus.iter().map(|m| m.id).collect();
    let mut roots = Vec::new();
    let mut children: HashMap<MenuId, Vec<Menu>> = HashMap::new();

    for menu in menus {
        match menu.parent_id {
            Some(parent_id) if present.contains(&parent_id) => {
                children.entry(parent_id).or_default().push(menu);
            }
            _ => roots.push(menu),
        }
    }

    roots
        .into_iter()
        .map(|menu| build_node(menu, &mut children))
        .collect()
}

fn build_node(menu: Menu, children: &mut HashMap<MenuId, Vec<Menu>>) -> MenuNode {
    let kids = children.remove(&menu.id).unwrap_or_default();
    MenuNode {
        children: kids
            .into_iter()
            .map(|child| build_node(child, children))
            .collect(),
        menu,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::menu::{MenuStatus, MenuType};
    use chrono::{Duration, Utc};

    fn menu(parent: Option<&Menu>, sequence: i32, offset_secs: i64) -> Menu {
        let created = Utc::now() + Duration::seconds(offset_secs);
        Menu {
            id: MenuId::new(),
            parent_id: parent.map(|p| p.id),
            parent_path: parent.map(|p| p.subtree_prefix()).unwrap_or_default(),
            code: format!("m{}", sequence),
            name: format!("m{}", sequence),
            description: String::new(),
            sequence,
            menu_type: MenuType::Page,
            route: String::new(),
            properties: String::new(),
            status: MenuStatus::Enabled,
            resources: vec![],
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_assemble_orders_by_sequence_then_creation() {
        let root = menu(None, 0, 0);
        let low = menu(Some(&root), 1, 1);
        let high = menu(Some(&root), 5, 2);
        let tie_early = menu(Some(&root), 3, 3);
        let tie_late = menu(Some(&root), 3, 4);

        let forest = assemble_forest(vec![
            tie_late.clone(),
            low.clone(),
            root.clone(),
            high.clone(),
            tie_early.clone(),
        ]);

        assert_eq!(forest.len(), 1);
        let order: Vec<MenuId> = forest[0].children.iter().map(|n| n.menu.id).collect();
        assert_eq!(order, vec![high.id, tie_early.id, tie_late.id, low.id]);
        assert_eq!(forest[0].count(), 5);
    }

    #[test]
    fn test_orphan_becomes_root() {
        let root = menu(None, 0, 0);
        let child = menu(Some(&root), 0, 1);
        let grandchild = menu(Some(&child), 0, 2);

        let forest = assemble_forest(vec![child.clone(), grandchild.clone()]);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].menu.id, child.id);
        assert!(forest[0].find(&grandchild.id).is_some());
    }

    #[test]
    fn test_retain_reachable_drops_broken_chains() {
        let root = menu(None, 0, 0);
        let child = menu(Some(&root), 0, 1);
        let grandchild = menu(Some(&child), 0, 2);

        let kept = retain_reachable(vec![root.clone(), grandchild.clone()]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, root.id);
    }
}
