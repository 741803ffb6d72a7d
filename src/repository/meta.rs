//! Key/value settings persisted beside the books.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::NewMeta;
use super::pool::{DbError, DbPool};
use crate::schema::meta;

/// Key holding the next Bot API update offset.
pub const UPDATE_OFFSET_KEY: &str = "tg_offset";

#[derive(Clone)]
pub struct DieselMetaRepository {
    pool: DbPool,
}

impl DieselMetaRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, DbError> {
        let mut conn = self.pool.get().await?;

        meta::table
            .find(key)
            .select(meta::value)
            .first::<String>(&mut conn)
            .await
            .optional()
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;

        diesel::replace_into(meta::table)
            .values(NewMeta { key, value })
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Stored update offset; an unreadable value counts as unset.
    pub async fn update_offset(&self) -> Result<Option<i64>, DbError> {
        Ok(self
            .get(UPDATE_OFFSET_KEY)
            .await?
            .and_then(|v| v.trim().parse().ok()))
    }

    pub async fn set_update_offset(&self, offset: i64) -> Result<(), DbError> {
        self.set(UPDATE_OFFSET_KEY, &offset.to_string()).await
    }
}
