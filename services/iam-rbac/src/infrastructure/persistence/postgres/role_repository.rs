//! PostgreSQL 角色仓储实现

use async_trait::async_trait;
use atrium_adapter_postgres::{PgSession, map_sqlx_error};
use atrium_common::{PagedResult, Pagination};
use atrium_errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::ids_to_uuids;
use crate::domain::role::{Role, RoleFilter, RoleId, RoleRepository};

const ROLE_COLUMNS: &str = "id, code, name, description, sequence, status, created_at, updated_at";

pub struct PostgresRoleRepository {
    session: PgSession,
}

impl PostgresRoleRepository {
    pub fn new(session: PgSession) -> Self {
        Self { session }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &RoleFilter) {
    if let Some(ids) = &filter.ids {
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
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn find_by_id(&self, id: &RoleId) -> AppResult<Option<Role>> {
        let mut conn = self.session.acquire().await?;
        let sql = format!("SELECT {} FROM roles WHERE id = $1", ROLE_COLUMNS);
        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(id.0)
            .fetch_optional(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        row.map(RoleRow::into_role).transpose()
    }

    async fn find_by_ids(&self, ids: &[RoleId]) -> AppResult<Vec<Role>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.session.acquire().await?;
        let sql = format!(
            "SELECT {} FROM roles WHERE id = ANY($1) ORDER BY sequence DESC, created_at ASC",
            ROLE_COLUMNS
        );
        let rows = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(ids_to_uuids(ids))
            .fetch_all(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(RoleRow::into_role).collect()
    }

    async fn exists_by_code(&self, code: &str, exclude: Option<&RoleId>) -> AppResult<bool> {
        let mut conn = self.session.acquire().await?;
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM roles WHERE code = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(code)
        .bind(exclude.map(|id| id.0))
        .fetch_one(conn.executor()?)
        .await
        .map_err(map_sqlx_error)?;
        Ok(exists.0)
    }

    async fn query(&self, filter: &RoleFilter, page: &Pagination) -> AppResult<PagedResult<Role>> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM roles WHERE 1 = 1");
        push_filter(&mut count_builder, filter);

        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM roles WHERE 1 = 1", ROLE_COLUMNS));
        push_filter(&mut query_builder, filter);
        query_builder.push(" ORDER BY sequence DESC, created_at ASC, id ASC LIMIT ");
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
            .build_query_as::<RoleRow>()
            .fetch_all(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;

        let roles = rows
            .into_iter()
            .map(RoleRow::into_role)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(PagedResult::new(roles, total.0 as u64, page))
    }

    async fn insert(&self, role: &Role) -> AppResult<()> {
        let mut conn = self.session.acquire().await?;
        sqlx::query(
            r#"
            INSERT INTO roles (id, code, name, description, sequence, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(role.id.0)
        .bind(&role.code)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.sequence)
        .bind(role.status.as_str())
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(conn.executor()?)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update(&self, role: &Role) -> AppResult<()> {
        let mut conn = self.session.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE roles
            SET code = $2, name = $3, description = $4, sequence = $5, status = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(role.id.0)
        .bind(&role.code)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.sequence)
        .bind(role.status.as_str())
        .bind(role.updated_at)
        .execute(conn.executor()?)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Role not found"));
        }
        Ok(())
    }

    async fn delete(&self, id: &RoleId) -> AppResult<()> {
        let mut conn = self.session.acquire().await?;
        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id.0)
            .execute(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct RoleRow {
    id: Uuid,
    code: String,
    name: String,
    description: String,
    sequence: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn into_role(self) -> AppResult<Role> {
        Ok(Role {
            id: RoleId::from_uuid(self.id),
            code: self.code,
            name: self.name,
            description: self.description,
            sequence: self.sequence,
            status: self.status.parse().map_err(AppError::internal)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
