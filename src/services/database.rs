use crate::error::{AppError, Result};
use crate::services::backend::{Backend, BackendError, Query};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

/// 数据库服务
///
/// 对 `Backend` 的类型化封装，行在这里和模型之间转换。
#[derive(Clone)]
pub struct Database {
    backend: Arc<dyn Backend>,
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(AppError::from))
        .collect()
}

impl Database {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// 验证后端连接
    pub async fn verify_connection(&self) -> Result<()> {
        match self.backend.rpc("get_schema_info", json!({})).await {
            Ok(_) => {
                info!("Backend '{}' connection verified successfully", self.backend.name());
                Ok(())
            }
            Err(e) => {
                error!("Failed to verify backend connection: {}", e);
                Err(e.into())
            }
        }
    }

    /// 选择记录
    pub async fn select<T>(&self, table: &str, query: &Query) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        debug!("Selecting from {}: {:?}", table, query);
        let rows = self.backend.select(table, query).await?;
        decode_rows(rows)
    }

    /// 原始行
    pub async fn select_raw(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        Ok(self.backend.select(table, query).await?)
    }

    /// 查找单个记录
    pub async fn find_one<T>(&self, table: &str, query: Query) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let rows = self.backend.select(table, &query.limit(1)).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    /// 通过ID获取单个记录
    pub async fn get_by_id<T>(&self, table: &str, id: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.find_one(table, Query::new().eq("id", id)).await {
            // 格式不合法的 id 不可能对应任何记录
            Err(AppError::Backend(BackendError::NotFound(_))) => Ok(None),
            other => other,
        }
    }

    pub async fn count(&self, table: &str, query: &Query) -> Result<usize> {
        Ok(self.backend.count(table, query).await?)
    }

    /// 创建记录
    pub async fn create<T, D>(&self, table: &str, data: &D) -> Result<T>
    where
        T: DeserializeOwned,
        D: Serialize,
    {
        let row = self.backend.insert(table, serde_json::to_value(data)?).await?;
        Ok(serde_json::from_value(row)?)
    }

    /// 通过ID使用JSON数据更新记录
    pub async fn update_by_id<T>(&self, table: &str, id: &str, updates: Value) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let rows = self.backend.update(table, &Query::new().eq("id", id), updates).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    /// 批量更新，返回更新后的行数
    pub async fn update_where(&self, table: &str, query: &Query, updates: Value) -> Result<usize> {
        Ok(self.backend.update(table, query, updates).await?.len())
    }

    pub async fn delete_where(&self, table: &str, query: &Query) -> Result<usize> {
        Ok(self.backend.delete(table, query).await?)
    }

    /// 服务端原子自增
    pub async fn increment(&self, table: &str, id: &str, column: &str, delta: i64) -> Result<i64> {
        Ok(self.backend.increment(table, id, column, delta).await?)
    }

    pub async fn rpc<T>(&self, function: &str, args: Value) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let value = self.backend.rpc(function, args).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// 分页查询，同时返回总数
    pub async fn paginate<T>(&self, table: &str, query: Query, page: usize, per_page: usize) -> Result<PaginatedResult<T>>
    where
        T: DeserializeOwned,
    {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let total = self.count(table, &query.filters_only()).await?;
        let data = self.select(table, &query.page(page, per_page)).await?;
        Ok(PaginatedResult::new(data, total, page, per_page))
    }
}

/// 分页结果结构
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

impl<T> PaginatedResult<T> {
    pub fn new(data: Vec<T>, total: usize, page: usize, per_page: usize) -> Self {
        let total_pages = if per_page == 0 { 0 } else { (total + per_page - 1) / per_page };
        Self { data, total, page, per_page, total_pages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::work::Work;
    use crate::services::backend::{schema::WORKS, MemoryBackend};

    fn db() -> Database {
        Database::new(Arc::new(MemoryBackend::new("secret", 3600, "http://localhost")))
    }

    #[tokio::test]
    async fn test_database_connection() {
        assert!(db().verify_connection().await.is_ok());
    }

    #[tokio::test]
    async fn test_typed_create_and_paginate() {
        let db = db();
        for i in 0..5 {
            let _: Work = db
                .create(WORKS, &json!({"title": format!("작품 {}", i), "genre": "시"}))
                .await
                .unwrap();
        }

        let page: PaginatedResult<Work> = db
            .paginate(WORKS, Query::new().order_asc("title"), 2, 2)
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].title, "작품 2");
    }

    #[tokio::test]
    async fn test_get_by_id_missing() {
        let found: Option<Work> = db().get_by_id(WORKS, "nope").await.unwrap();
        assert!(found.is_none());
    }
}
