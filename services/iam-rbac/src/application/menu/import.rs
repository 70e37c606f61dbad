//! 菜单种子导入
//!
//! JSON 文件是一组嵌套的菜单节点。已存在的节点（按 ID，或同级下的编码、名称）跳过，
//! 只补齐缺少的资源，其子节点照常处理。未指定 sequence 时取 `同级总数 - 下标`，保持文件中的先后顺序。

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use atrium_errors::AppResult;

use crate::domain::menu::{MenuId, MenuResource, MenuStatus, MenuTree, MenuType, NewMenu, ResourceSpec};
use crate::domain::unit_of_work::Repositories;

/// 种子节点
#[derive(Debug, Clone, Deserialize)]
pub struct MenuSeed {
    pub id: Option<MenuId>,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub sequence: Option<i32>,
    #[serde(default, rename = "type")]
    pub menu_type: MenuType,
    #[serde(default)]
    pub route: String,
    /// 任意 JSON，入库时序列化为字符串
    #[serde(default)]
    pub properties: Value,
    pub status: Option<MenuStatus>,
    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
    #[serde(default)]
    pub children: Vec<MenuSeed>,
}

impl MenuSeed {
    fn properties_string(&self) -> String {
        match &self.properties {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// 导入统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub skipped: usize,
    pub resources_added: usize,
}

/// 导入种子，调用方负责事务
pub async fn import_menus<R: Repositories + ?Sized>(
    tree: &MenuTree,
    repos: &R,
    seeds: Vec<MenuSeed>,
) -> AppResult<ImportSummary> {
    let mut summary = ImportSummary::default();
    let mut pending: Vec<(Option<MenuId>, Vec<MenuSeed>)> = vec![(None, seeds)];

    while let Some((parent_id, siblings)) = pending.pop() {
        let total = siblings.len();

        for (index, mut seed) in siblings.into_iter().enumerate() {
            let children = std::mem::take(&mut seed.children);

            let id = match find_existing(repos, parent_id.as_ref(), &seed).await? {
                Some(existing) => {
                    let added = merge_resources(repos, &existing, &seed.resources).await?;
                    debug!(menu_id = %existing, code = %seed.code, added, "Seed menu exists, skipped");
                    summary.skipped += 1;
                    summary.resources_added += added;
                    existing
                }
                None => {
                    let properties = seed.properties_string();
                    let menu = tree
                        .create(
                            repos,
                            NewMenu {
                                id: seed.id,
                                parent_id,
                                code: seed.code,
                                name: seed.name,
                                description: seed.description,
                                sequence: Some(seed.sequence.unwrap_or((total - index) as i32)),
                                menu_type: seed.menu_type,
                                route: seed.route,
                                properties,
                                status: seed.status,
                                resources: seed.resources,
                            },
                        )
                        .await?;
                    summary.created += 1;
                    summary.resources_added += menu.resources.len();
                    menu.id
                }
            };

            if !children.is_empty() {
                pending.push((Some(id), children));
            }
        }
    }

    Ok(summary)
}

/// 为已存在的菜单补齐种子中缺少的资源（按方法 + 路径判断）
async fn merge_resources<R: Repositories + ?Sized>(
    repos: &R,
    menu_id: &MenuId,
    seeds: &[ResourceSpec],
) -> AppResult<usize> {
    if seeds.is_empty() {
        return Ok(0);
    }

    let resources = repos.menu_resources();
    let mut known: HashSet<(String, String)> = resources
        .list_by_menu(menu_id)
        .await?
        .iter()
        .map(MenuResource::key)
        .collect();

    let mut added = 0;
    for spec in seeds {
        if known.insert(spec.key()) {
            resources.insert(&MenuResource::new(*menu_id, spec)).await?;
            added += 1;
        }
    }
    Ok(added)
}

async fn find_existing<R: Repositories + ?Sized>(
    repos: &R,
    parent_id: Option<&MenuId>,
    seed: &MenuSeed,
) -> AppResult<Option<MenuId>> {
    let menus = repos.menus();

    if let Some(id) = &seed.id
        && let Some(menu) = menus.find_by_id(id).await?
    {
        return Ok(Some(menu.id));
    }
    if let Some(menu) = menus.find_by_code(parent_id, &seed.code).await? {
        return Ok(Some(menu.id));
    }
    Ok(menus
        .find_by_name(parent_id, &seed.name)
        .await?
        .map(|menu| menu.id))
}
