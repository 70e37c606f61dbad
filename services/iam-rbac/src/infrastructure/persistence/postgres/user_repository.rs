//! PostgreSQL 用户仓储实现

use async_trait::async_trait;
use atrium_adapter_postgres::{PgSession, map_sqlx_error};
use atrium_common::{PagedResult, Pagination, UserId};
use atrium_errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::user::{User, UserFilter, UserRepository, UserStatus};

const USER_COLUMNS: &str =
    "id, username, email, full_name, phone, remark, password_hash, status, created_at, updated_at";

pub struct PostgresUserRepository {
    session: PgSession,
}

impl PostgresUserRepository {
    pub fn new(session: PgSession) -> Self {
        Self { session }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    if let Some(keyword) = &filter.keyword {
        let pattern = format!("%{}%", keyword);
        builder.push(" AND (username LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR full_name LIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status.as_str());
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>> {
        let mut conn = self.session.acquire().await?;
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.0)
            .fetch_optional(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let mut conn = self.session.acquire().await?;
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        row.map(UserRow::into_user).transpose()
    }

    async fn exists_by_username(&self, username: &str, exclude: Option<&UserId>) -> AppResult<bool> {
        let mut conn = self.session.acquire().await?;
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(username)
        .bind(exclude.map(|id| id.0))
        .fetch_one(conn.executor()?)
        .await
        .map_err(map_sqlx_error)?;
        Ok(exists.0)
    }

    async fn query(&self, filter: &UserFilter, page: &Pagination) -> AppResult<PagedResult<User>> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM users WHERE 1 = 1");
        push_filter(&mut count_builder, filter);

        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM users WHERE 1 = 1", USER_COLUMNS));
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
            .build_query_as::<UserRow>()
            .fetch_all(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;

        let users = rows
            .into_iter()
            .map(UserRow::into_user)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(PagedResult::new(users, total.0 as u64, page))
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        let mut conn = self.session.acquire().await?;
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, full_name, phone, remark, password_hash,
                               status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id.0)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.remark)
        .bind(&user.password_hash)
        .bind(user.status.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(conn.executor()?)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        let mut conn = self.session.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, full_name = $4, phone = $5, remark = $6,
                password_hash = $7, status = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(user.id.0)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.remark)
        .bind(&user.password_hash)
        .bind(user.status.as_str())
        .bind(user.updated_at)
        .execute(conn.executor()?)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User not found"));
        }
        Ok(())
    }

    async fn update_status(&self, id: &UserId, status: UserStatus) -> AppResult<()> {
        let mut conn = self.session.acquire().await?;
        let result = sqlx::query("UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.0)
            .bind(status.as_str())
            .execute(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User not found"));
        }
        Ok(())
    }

    async fn delete(&self, id: &UserId) -> AppResult<()> {
        let mut conn = self.session.acquire().await?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.0)
            .execute(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    full_name: String,
    phone: String,
    remark: String,
    password_hash: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AppResult<User> {
        Ok(User {
            id: UserId::from_uuid(self.id),
            username: self.username,
            email: self.email,
            full_name: self.full_name,
            phone: self.phone,
            remark: self.remark,
            password_hash: self.password_hash,
            status: self.status.parse().map_err(AppError::internal)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
