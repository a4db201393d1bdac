use crate::db::map_write_error;
use crate::error::AppResult;
use crate::models::{Entity, Record, UserProfile};
use crate::service::collections::CollectionStore;
use crate::service::StoreFactory;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::marker::PhantomData;
use std::sync::Arc;

/// JSONB 文档集合
pub struct PgCollectionStore<T> {
    pool: PgPool,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> PgCollectionStore<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }
}

fn record_from_row<T: Entity>(row: &PgRow) -> Result<Record<T>, sqlx::Error> {
    let Json(data): Json<T> = row.try_get("data")?;
    Ok(Record {
        id: row.try_get("id")?,
        data,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl<T: Entity> CollectionStore<T> for PgCollectionStore<T> {
    async fn list(&self) -> AppResult<Vec<Record<T>>> {
        let sql = format!(
            "SELECT id, data, created_at, updated_at FROM {} ORDER BY id",
            T::KIND.table()
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(record_from_row::<T>)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn get(&self, id: i64) -> AppResult<Option<Record<T>>> {
        let sql = format!(
            "SELECT id, data, created_at, updated_at FROM {} WHERE id = $1",
            T::KIND.table()
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(record_from_row::<T>).transpose()?)
    }

    async fn insert(&self, data: &T) -> AppResult<Record<T>> {
        let sql = format!(
            "INSERT INTO {} (data) VALUES ($1) RETURNING id, data, created_at, updated_at",
            T::KIND.table()
        );
        let row = sqlx::query(&sql)
            .bind(Json(data))
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error::<T>)?;
        Ok(record_from_row(&row)?)
    }

    async fn update(&self, id: i64, data: &T) -> AppResult<Option<Record<T>>> {
        let sql = format!(
            "UPDATE {} SET data = $2, updated_at = now() WHERE id = $1 \
             RETURNING id, data, created_at, updated_at",
            T::KIND.table()
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(Json(data))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error::<T>)?;
        Ok(row.as_ref().map(record_from_row::<T>).transpose()?)
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", T::KIND.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

/// 各集合的 Postgres 存储
pub struct PgStores {
    pool: PgPool,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl StoreFactory for PgStores {
    fn store<T: Entity>(&self) -> Arc<dyn CollectionStore<T>> {
        Arc::new(PgCollectionStore::<T>::new(self.pool.clone()))
    }

    fn users(&self) -> Arc<dyn CollectionStore<UserProfile>> {
        self.store::<UserProfile>()
    }
}
