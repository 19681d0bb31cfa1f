use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;

use crate::cache::RelationshipSource;

#[derive(Debug, Serialize)]
pub struct ConnectionChange {
    pub user_id: String,
    pub connection_id: String,
    pub connected: bool,
}

/// 从 connections 表读取好友关系
pub struct PgRelationshipSource {
    pool: PgPool,
}

impl PgRelationshipSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RelationshipSource for PgRelationshipSource {
    async fn holders_of(&self, owner: &str) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT user_id FROM connections WHERE connection_id = $1")
            .bind(owner)
            .fetch_all(&self.pool)
            .await
    }
}

pub async fn user_exists(pool: &PgPool, user_id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE user_id = $1)")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// 好友关系是双向的，两行在同一个事务里写入。返回是否新建了关系。
pub async fn connect(pool: &PgPool, a: &str, b: &str) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let inserted = sqlx::query(
        r#"
        INSERT INTO connections (user_id, connection_id)
        VALUES ($1, $2), ($2, $1)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(a)
    .bind(b)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    tx.commit().await?;
    Ok(inserted > 0)
}

pub async fn disconnect(pool: &PgPool, a: &str, b: &str) -> Result<bool, sqlx::Error> {
    let deleted = sqlx::query(
        r#"
        DELETE FROM connections
        WHERE (user_id = $1 AND connection_id = $2)
           OR (user_id = $2 AND connection_id = $1)
        "#,
    )
    .bind(a)
    .bind(b)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(deleted > 0)
}
