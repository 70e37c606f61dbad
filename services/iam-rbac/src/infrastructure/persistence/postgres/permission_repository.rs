//! PostgreSQL 权限仓储实现

use async_trait::async_trait;
use atrium_adapter_postgres::{PgSession, map_sqlx_error};
use atrium_common::{PagedResult, Pagination};
use atrium_errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::ids_to_uuids;
use crate::domain::permission::{Permission, PermissionFilter, PermissionId, PermissionRepository};

const PERMISSION_COLUMNS: &str =
    "id, name, slug, description, http_method, http_path, created_at, updated_at";

pub struct PostgresPermissionRepository {
    session: PgSession,
}

impl PostgresPermissionRepository {
    pub fn new(session: PgSession) -> Self {
        Self { session }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &PermissionFilter) {
    if let Some(ids) = &filter.ids {
        builder.push(" AND id = ANY(");
        builder.push_bind(ids_to_uuids(ids));
        builder.push(")");
    }
    if let Some(name) = &filter.name_like {
        builder.push(" AND name LIKE ");
        builder.push_bind(format!("%{}%", name));
    }
    if let Some(slug) = &filter.slug {
        builder.push(" AND slug = ");
        builder.push_bind(slug.clone());
    }
}

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    async fn find_by_id(&self, id: &PermissionId) -> AppResult<Option<Permission>> {
        let mut conn = self.session.acquire().await?;
        let sql = format!("SELECT {} FROM permissions WHERE id = $1", PERMISSION_COLUMNS);
        let row = sqlx::query_as::<_, PermissionRow>(&sql)
            .bind(id.0)
            .fetch_optional(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.session.acquire().await?;
        let sql = format!(
            "SELECT {} FROM permissions WHERE id = ANY($1) ORDER BY created_at ASC",
            PERMISSION_COLUMNS
        );
        let rows = sqlx::query_as::<_, PermissionRow>(&sql)
            .bind(ids_to_uuids(ids))
            .fetch_all(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn exists_by_slug(&self, slug: &str, exclude: Option<&PermissionId>) -> AppResult<bool> {
        let mut conn = self.session.acquire().await?;
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM permissions WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude.map(|id| id.0))
        .fetch_one(conn.executor()?)
        .await
        .map_err(map_sqlx_error)?;
        Ok(exists.0)
    }

    async fn query(
        &self,
        filter: &PermissionFilter,
        page: &Pagination,
    ) -> AppResult<PagedResult<Permission>> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM permissions WHERE 1 = 1");
        push_filter(&mut count_builder, filter);

        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM permissions WHERE 1 = 1",
            PERMISSION_COLUMNS
        ));
        push_filter(&mut query_builder, filter);
        query_builder.push(" ORDER BY created_at ASC, id ASC LIMIT ");
        query_builder.push_bind(page.limit() as i64);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(page.offset() as i64);

        let mut conn = self.session.acquire().await?;
        let total: (i64,) = count_builder
            .build_query_as()
            .fetch_one(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        let rows = query_builder
            .build_query_as::<PermissionRow>()
            .fetch_all(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;

        Ok(PagedResult::new(
            rows.into_iter().map(Into::into).collect(),
            total.0 as u64,
            page,
        ))
    }

    async fn insert(&self, permission: &Permission) -> AppResult<()> {
        let mut conn = self.session.acquire().await?;
        sqlx::query(
            r#"
            INSERT INTO permissions (id, name, slug, description, http_method, http_path, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(permission.id.0)
        .bind(&permission.name)
        .bind(&permission.slug)
        .bind(&permission.description)
        .bind(&permission.http_method)
        .bind(&permission.http_path)
        .bind(permission.created_at)
        .bind(permission.updated_at)
        .execute(conn.executor()?)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update(&self, permission: &Permission) -> AppResult<()> {
        let mut conn = self.session.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE permissions
            SET name = $2, slug = $3, description = $4, http_method = $5, http_path = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(permission.id.0)
        .bind(&permission.name)
        .bind(&permission.slug)
        .bind(&permission.description)
        .bind(&permission.http_method)
        .bind(&permission.http_path)
        .bind(permission.updated_at)
        .execute(conn.executor()?)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Permission not found"));
        }
        Ok(())
    }

    async fn delete(&self, id: &PermissionId) -> AppResult<()> {
        let mut conn = self.session.acquire().await?;
        sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id.0)
            .execute(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct PermissionRow {
    id: Uuid,
    name: String,
    slug: String,
    description: String,
    http_method: String,
    http_path: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Self {
            id: PermissionId::from_uuid(row.id),
            name: row.name,
            slug: row.slug,
            description: row.description,
            http_method: row.http_method,
            http_path: row.http_path,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
