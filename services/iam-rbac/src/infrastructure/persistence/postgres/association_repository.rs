//! PostgreSQL 关联仓储实现
//!
//! 三张关联表结构相同，只有表名与外键列名不同。

use std::marker::PhantomData;

use async_trait::async_trait;
use atrium_adapter_postgres::{PgSession, map_sqlx_error};
use atrium_common::Identifier;
use atrium_errors::AppResult;
use chrono::{DateTime, Utc};
use sqlx::{Connection, PgConnection};
use uuid::Uuid;

use super::ids_to_uuids;
use crate::domain::association::{AssociationRepository, Binding, BindingId, plan_replacement};

/// 关联表元数据
#[derive(Debug)]
pub struct AssociationTable {
    pub table: &'static str,
    pub owner_column: &'static str,
    pub target_column: &'static str,
}

pub static ROLE_MENUS: AssociationTable = AssociationTable {
    table: "role_menus",
    owner_column: "role_id",
    target_column: "menu_id",
};

pub static ROLE_PERMISSIONS: AssociationTable = AssociationTable {
    table: "role_permissions",
    owner_column: "role_id",
    target_column: "permission_id",
};

pub static USER_ROLES: AssociationTable = AssociationTable {
    table: "user_roles",
    owner_column: "user_id",
    target_column: "role_id",
};

impl AssociationTable {
    fn select_where(&self, column: &str) -> String {
        format!(
            "SELECT id, {owner} AS owner_id, {target} AS target_id, created_at, updated_at \
             FROM {table} WHERE {column} = ANY($1) ORDER BY created_at ASC, id ASC",
            owner = self.owner_column,
            target = self.target_column,
            table = self.table,
            column = column,
        )
    }

    fn delete_where(&self, column: &str) -> String {
        format!("DELETE FROM {} WHERE {} = ANY($1)", self.table, column)
    }

    fn insert_unnest(&self) -> String {
        format!(
            "INSERT INTO {table} (id, {owner}, {target}, created_at, updated_at) \
             SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::uuid[], $4::timestamptz[], $5::timestamptz[])",
            table = self.table,
            owner = self.owner_column,
            target = self.target_column,
        )
    }
}

pub struct PostgresAssociationRepository<O, T> {
    session: PgSession,
    table: &'static AssociationTable,
    _marker: PhantomData<fn() -> (O, T)>,
}

impl<O: Identifier, T: Identifier> PostgresAssociationRepository<O, T> {
    pub fn new(session: PgSession, table: &'static AssociationTable) -> Self {
        Self {
            session,
            table,
            _marker: PhantomData,
        }
    }

    async fn select(
        &self,
        conn: &mut PgConnection,
        column: &str,
        ids: Vec<Uuid>,
    ) -> AppResult<Vec<Binding<O, T>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, BindingRow>(&self.table.select_where(column))
            .bind(ids)
            .fetch_all(conn)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(BindingRow::into_binding).collect())
    }

    async fn delete_where(&self, column: &str, ids: Vec<Uuid>) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.session.acquire().await?;
        let result = sqlx::query(&self.table.delete_where(column))
            .bind(ids)
            .execute(conn.executor()?)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl<O: Identifier, T: Identifier> AssociationRepository<O, T>
    for PostgresAssociationRepository<O, T>
{
    async fn list_by_owner(&self, owner_id: &O) -> AppResult<Vec<Binding<O, T>>> {
        self.list_by_owners(std::slice::from_ref(owner_id)).await
    }

    async fn list_by_owners(&self, owner_ids: &[O]) -> AppResult<Vec<Binding<O, T>>> {
        let mut conn = self.session.acquire().await?;
        self.select(conn.executor()?, self.table.owner_column, ids_to_uuids(owner_ids))
            .await
    }

    async fn list_by_target(&self, target_id: &T) -> AppResult<Vec<Binding<O, T>>> {
        let mut conn = self.session.acquire().await?;
        self.select(
            conn.executor()?,
            self.table.target_column,
            vec![target_id.as_uuid()],
        )
        .await
    }

    /// 在嵌套事务（已处于事务中时为保存点）内删除后重新插入
    async fn replace_all(&self, owner_id: &O, target_ids: &[T]) -> AppResult<Vec<Binding<O, T>>> {
        let mut conn = self.session.acquire().await?;
        let mut tx = conn.executor()?.begin().await.map_err(map_sqlx_error)?;

        let existing = self
            .select(&mut *tx, self.table.owner_column, vec![owner_id.as_uuid()])
            .await?;
        let plan = plan_replacement(&existing, *owner_id, target_ids);

        sqlx::query(&self.table.delete_where(self.table.owner_column))
            .bind(vec![owner_id.as_uuid()])
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if !plan.is_empty() {
            sqlx::query(&self.table.insert_unnest())
                .bind(plan.iter().map(|b| b.id.0).collect::<Vec<_>>())
                .bind(plan.iter().map(|b| b.owner_id.as_uuid()).collect::<Vec<_>>())
                .bind(plan.iter().map(|b| b.target_id.as_uuid()).collect::<Vec<_>>())
                .bind(plan.iter().map(|b| b.created_at).collect::<Vec<_>>())
                .bind(plan.iter().map(|b| b.updated_at).collect::<Vec<_>>())
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(plan)
    }

    async fn delete_by_owner(&self, owner_id: &O) -> AppResult<u64> {
        self.delete_where(self.table.owner_column, vec![owner_id.as_uuid()])
            .await
    }

    async fn delete_by_target(&self, target_id: &T) -> AppResult<u64> {
        self.delete_where(self.table.target_column, vec![target_id.as_uuid()])
            .await
    }

    async fn delete_by_targets(&self, target_ids: &[T]) -> AppResult<u64> {
        self.delete_where(self.table.target_column, ids_to_uuids(target_ids))
            .await
    }
}

#[derive(sqlx::FromRow)]
struct BindingRow {
    id: Uuid,
    owner_id: Uuid,
    target_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BindingRow {
    fn into_binding<O: Identifier, T: Identifier>(self) -> Binding<O, T> {
        Binding {
            id: BindingId::from_uuid(self.id),
            owner_id: O::from_uuid(self.owner_id),
            target_id: T::from_uuid(self.target_id),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_sql() {
        assert_eq!(
            ROLE_MENUS.delete_where(ROLE_MENUS.target_column),
            "DELETE FROM role_menus WHERE menu_id = ANY($1)"
        );
        let select = USER_ROLES.select_where(USER_ROLES.owner_column);
        assert!(select.contains("user_id AS owner_id, role_id AS target_id"));
        assert!(select.contains("FROM user_roles WHERE user_id = ANY($1)"));
        assert!(ROLE_PERMISSIONS.insert_unnest().starts_with(
            "INSERT INTO role_permissions (id, role_id, permission_id, created_at, updated_at)"
        ));
    }
}
