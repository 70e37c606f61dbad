//! PostgreSQL 菜单仓储实现
//!
//! 子树操作都是单条语句：`parent_path LIKE $prefix || '%'`，
//! 依赖 parent_path 上的 text_pattern_ops 索引。ID 中不含 LIKE 通配符。

use async_trait::async_trait;
use atrium_adapter_postgres::{PgSession, map_sqlx_error};
use atrium_errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::ids_to_uuids;
use crate::domain::menu::{
    Menu, MenuFilter, MenuId, MenuRepository, MenuResource, MenuResourceId,
    MenuResourceRepository, MenuStatus,
};

const MENU_COLUMNS: &str = "id, parent_id, parent_path, code, name, description, sequence, \
     menu_type, route, properties, status, created_at, updated_at";

const MENU_ORDER: &str = " ORDER BY sequence DESC, created_at ASC, id ASC";

pub struct PostgresMenuRepository {
    session: PgSession,
}

impl PostgresMenuRepository {
    pub fn new(session: PgSession) -> Self {
        Self { session }
    }

    async fn fetch_all(&self, sql: &str, bind: Option<&str>) -> AppResult<Vec<Menu>> {
        let mut conn = self.session.acquire().await?;
        let mut query = sqlx::query_as::<_, MenuRow>(sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(MenuRow::into_menu).collect()
    }
}

#[async_trait]
impl MenuRepository for PostgresMenuRepository {
    async fn find_by_id(&self, id: &MenuId) -> AppResult<Option<Menu>> {
        let mut conn = self.session.acquire().await?;
        let sql = format!("SELECT {} FROM menus WHERE id = $1", MENU_COLUMNS);
        let row = sqlx::query_as::<_, MenuRow>(&sql)
            .bind(id.0)
            .fetch_optional(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        row.map(MenuRow::into_menu).transpose()
    }

    async fn find_by_ids(&self, ids: &[MenuId]) -> AppResult<Vec<Menu>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.session.acquire().await?;
        let sql = format!(
            "SELECT {} FROM menus WHERE id = ANY($1){}",
            MENU_COLUMNS, MENU_ORDER
        );
        let rows = sqlx::query_as::<_, MenuRow>(&sql)
            .bind(ids_to_uuids(ids))
            .fetch_all(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(MenuRow::into_menu).collect()
    }

    async fn find_by_code(&self, parent_id: Option<&MenuId>, code: &str) -> AppResult<Option<Menu>> {
        let mut conn = self.session.acquire().await?;
        let sql = format!(
            "SELECT {} FROM menus WHERE parent_id IS NOT DISTINCT FROM $1 AND code = $2",
            MENU_COLUMNS
        );
        let row = sqlx::query_as::<_, MenuRow>(&sql)
            .bind(parent_id.map(|id| id.0))
            .bind(code)
            .fetch_optional(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        row.map(MenuRow::into_menu).transpose()
    }

    async fn find_by_name(&self, parent_id: Option<&MenuId>, name: &str) -> AppResult<Option<Menu>> {
        let mut conn = self.session.acquire().await?;
        let sql = format!(
            "SELECT {} FROM menus WHERE parent_id IS NOT DISTINCT FROM $1 AND name = $2 LIMIT 1",
            MENU_COLUMNS
        );
        let row = sqlx::query_as::<_, MenuRow>(&sql)
            .bind(parent_id.map(|id| id.0))
            .bind(name)
            .fetch_optional(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        row.map(MenuRow::into_menu).transpose()
    }

    async fn exists_code(
        &self,
        parent_id: Option<&MenuId>,
        code: &str,
        exclude: Option<&MenuId>,
    ) -> AppResult<bool> {
        let mut conn = self.session.acquire().await?;
        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM menus
                WHERE parent_id IS NOT DISTINCT FROM $1 AND code = $2
                  AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(parent_id.map(|id| id.0))
        .bind(code)
        .bind(exclude.map(|id| id.0))
        .fetch_one(conn.executor()?)
        .await
        .map_err(map_sqlx_error)?;
        Ok(exists.0)
    }

    async fn min_sibling_sequence(&self, parent_id: Option<&MenuId>) -> AppResult<Option<i32>> {
        let mut conn = self.session.acquire().await?;
        let min: (Option<i32>,) =
            sqlx::query_as("SELECT MIN(sequence) FROM menus WHERE parent_id IS NOT DISTINCT FROM $1")
                .bind(parent_id.map(|id| id.0))
                .fetch_one(conn.executor()?)
                .await
                .map_err(map_sqlx_error)?;
        Ok(min.0)
    }

    async fn find_by_path_prefix(&self, prefix: &str) -> AppResult<Vec<Menu>> {
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM menus WHERE parent_path LIKE $1 || '%'{}",
            MENU_COLUMNS, MENU_ORDER
        );
        self.fetch_all(&sql, Some(prefix)).await
    }

    async fn query(&self, filter: &MenuFilter) -> AppResult<Vec<Menu>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM menus WHERE 1 = 1", MENU_COLUMNS));

        if let Some(ids) = &filter.ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            builder.push(" AND id = ANY(");
            builder.push_bind(ids_to_uuids(ids));
            builder.push(")");
        }
        if let Some(name) = &filter.name_like {
            builder.push(" AND name LIKE ");
            builder.push_bind(format!("%{}%", name));
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(parent_id) = &filter.parent_id {
            builder.push(" AND parent_id = ");
            builder.push_bind(parent_id.0);
        }
        if let Some(prefix) = &filter.path_prefix {
            builder.push(" AND parent_path LIKE ");
            builder.push_bind(format!("{}%", prefix));
        }
        builder.push(MENU_ORDER);

        let mut conn = self.session.acquire().await?;
        let rows = builder
            .build_query_as::<MenuRow>()
            .fetch_all(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(MenuRow::into_menu).collect()
    }

    async fn insert(&self, menu: &Menu) -> AppResult<()> {
        let mut conn = self.session.acquire().await?;
        sqlx::query(
            r#"
            INSERT INTO menus (id, parent_id, parent_path, code, name, description, sequence,
                               menu_type, route, properties, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(menu.id.0)
        .bind(menu.parent_id.map(|id| id.0))
        .bind(&menu.parent_path)
        .bind(&menu.code)
        .bind(&menu.name)
        .bind(&menu.description)
        .bind(menu.sequence)
        .bind(menu.menu_type.as_str())
        .bind(&menu.route)
        .bind(&menu.properties)
        .bind(menu.status.as_str())
        .bind(menu.created_at)
        .bind(menu.updated_at)
        .execute(conn.executor()?)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update(&self, menu: &Menu) -> AppResult<()> {
        let mut conn = self.session.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE menus
            SET parent_id = $2, parent_path = $3, code = $4, name = $5, description = $6,
                sequence = $7, menu_type = $8, route = $9, properties = $10, status = $11,
                updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(menu.id.0)
        .bind(menu.parent_id.map(|id| id.0))
        .bind(&menu.parent_path)
        .bind(&menu.code)
        .bind(&menu.name)
        .bind(&menu.description)
        .bind(menu.sequence)
        .bind(menu.menu_type.as_str())
        .bind(&menu.route)
        .bind(&menu.properties)
        .bind(menu.status.as_str())
        .bind(menu.updated_at)
        .execute(conn.executor()?)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Menu not found"));
        }
        Ok(())
    }

    async fn update_status_by_path_prefix(&self, prefix: &str, status: MenuStatus) -> AppResult<u64> {
        if prefix.is_empty() {
            return Ok(0);
        }
        let mut conn = self.session.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE menus SET status = $2, updated_at = NOW()
            WHERE parent_path LIKE $1 || '%' AND status <> $2
            "#,
        )
        .bind(prefix)
        .bind(status.as_str())
        .execute(conn.executor()?)
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn rewrite_path_prefix(&self, old_prefix: &str, new_prefix: &str) -> AppResult<u64> {
        if old_prefix.is_empty() {
            return Ok(0);
        }
        let mut conn = self.session.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE menus SET parent_path = $2 || substr(parent_path, length($1) + 1)
            WHERE parent_path LIKE $1 || '%'
            "#,
        )
        .bind(old_prefix)
        .bind(new_prefix)
        .execute(conn.executor()?)
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_by_ids(&self, ids: &[MenuId]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.session.acquire().await?;
        let result = sqlx::query("DELETE FROM menus WHERE id = ANY($1)")
            .bind(ids_to_uuids(ids))
            .execute(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}

pub struct PostgresMenuResourceRepository {
    session: PgSession,
}

impl PostgresMenuResourceRepository {
    pub fn new(session: PgSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl MenuResourceRepository for PostgresMenuResourceRepository {
    async fn list_by_menu(&self, menu_id: &MenuId) -> AppResult<Vec<MenuResource>> {
        self.list_by_menus(std::slice::from_ref(menu_id)).await
    }

    async fn list_by_menus(&self, menu_ids: &[MenuId]) -> AppResult<Vec<MenuResource>> {
        if menu_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.session.acquire().await?;
        let rows = sqlx::query_as::<_, MenuResourceRow>(
            r#"
            SELECT id, menu_id, method, path, created_at, updated_at
            FROM menu_resources WHERE menu_id = ANY($1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(ids_to_uuids(menu_ids))
        .fetch_all(conn.executor()?)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert(&self, resource: &MenuResource) -> AppResult<()> {
        let mut conn = self.session.acquire().await?;
        sqlx::query(
            r#"
            INSERT INTO menu_resources (id, menu_id, method, path, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(resource.id.0)
        .bind(resource.menu_id.0)
        .bind(&resource.method)
        .bind(&resource.path)
        .bind(resource.created_at)
        .bind(resource.updated_at)
        .execute(conn.executor()?)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_by_menu(&self, menu_id: &MenuId) -> AppResult<u64> {
        self.delete_by_menus(std::slice::from_ref(menu_id)).await
    }

    async fn delete_by_menus(&self, menu_ids: &[MenuId]) -> AppResult<u64> {
        if menu_ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.session.acquire().await?;
        let result = sqlx::query("DELETE FROM menu_resources WHERE menu_id = ANY($1)")
            .bind(ids_to_uuids(menu_ids))
            .execute(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct MenuRow {
    id: Uuid,
    parent_id: Option<Uuid>,
    parent_path: String,
    code: String,
    name: String,
    description: String,
    sequence: i32,
    menu_type: String,
    route: String,
    properties: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MenuRow {
    fn into_menu(self) -> AppResult<Menu> {
        Ok(Menu {
            id: MenuId::from_uuid(self.id),
            parent_id: self.parent_id.map(MenuId::from_uuid),
            parent_path: self.parent_path,
            code: self.code,
            name: self.name,
            description: self.description,
            sequence: self.sequence,
            menu_type: self.menu_type.parse().map_err(AppError::internal)?,
            route: self.route,
            properties: self.properties,
            status: self.status.parse().map_err(AppError::internal)?,
            resources: Vec::new(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MenuResourceRow {
    id: Uuid,
    menu_id: Uuid,
    method: String,
    path: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MenuResourceRow> for MenuResource {
    fn from(row: MenuResourceRow) -> Self {
        Self {
            id: MenuResourceId::from_uuid(row.id),
            menu_id: MenuId::from_uuid(row.menu_id),
            method: row.method,
            path: row.path,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
