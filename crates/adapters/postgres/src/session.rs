//! 数据库会话
//!
//! 同一套仓储既可以直接使用连接池，也可以挂在 Unit of Work 的共享事务上。

use std::sync::Arc;

use atrium_errors::{AppError, AppResult};
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tokio::sync::{Mutex, MutexGuard};

use crate::map_sqlx_error;

/// 共享事务
pub type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// 仓储的执行上下文
#[derive(Clone)]
pub enum PgSession {
    Pool(PgPool),
    Tx(SharedTx),
}

impl PgSession {
    /// 获取连接：连接池模式下借出一个连接，事务模式下锁住共享事务
    pub async fn acquire(&self) -> AppResult<PgConn<'_>> {
        match self {
            Self::Pool(pool) => {
                let conn = pool.acquire().await.map_err(map_sqlx_error)?;
                Ok(PgConn::Pooled(conn))
            }
            Self::Tx(tx) => Ok(PgConn::Tx(tx.lock().await)),
        }
    }
}

/// 已获取的连接
pub enum PgConn<'a> {
    Pooled(PoolConnection<Postgres>),
    Tx(MutexGuard<'a, Option<Transaction<'static, Postgres>>>),
}

impl PgConn<'_> {
    /// 可直接传给 sqlx 查询的执行器
    pub fn executor(&mut self) -> AppResult<&mut PgConnection> {
        match self {
            Self::Pooled(conn) => Ok(&mut **conn),
            Self::Tx(guard) => guard
                .as_mut()
                .map(|tx| &mut **tx)
                .ok_or_else(|| AppError::internal("Transaction consumed")),
        }
    }
}

/// 开启事务并包装为共享事务
pub async fn begin_shared(pool: &PgPool) -> AppResult<SharedTx> {
    let tx = pool
        .begin()
        .await
        .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;
    Ok(Arc::new(Mutex::new(Some(tx))))
}

/// 提交共享事务
pub async fn commit_shared(tx: &SharedTx) -> AppResult<()> {
    let mut guard = tx.lock().await;
    let tx = guard
        .take()
        .ok_or_else(|| AppError::internal("Transaction already consumed"))?;

    tx.commit()
        .await
        .map_err(|e| AppError::database(format!("Failed to commit transaction: {}", e)))
}

/// 回滚共享事务
pub async fn rollback_shared(tx: &SharedTx) -> AppResult<()> {
    let mut guard = tx.lock().await;
    let tx = guard
        .take()
        .ok_or_else(|| AppError::internal("Transaction already consumed"))?;

    tx.rollback()
        .await
        .map_err(|e| AppError::database(format!("Failed to rollback transaction: {}", e)))
}
