//! BaaS 接入层
//!
//! 所有持久状态都在外部后端：表、认证、对象存储和 RPC。`RestBackend`
//! 对接托管服务，`MemoryBackend` 在进程内实现同样的语义，用于本地开发和测试。

pub mod memory;
pub mod query;
pub mod rest;
pub mod schema;

pub use memory::MemoryBackend;
pub use query::{Filter, Order, Query};
pub use rest::RestBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub type BackendResult<T> = std::result::Result<T, BackendError>;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// 违反唯一约束
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// 认证服务中的用户
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: AuthUser,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// 后端名称，用于日志
    fn name(&self) -> &'static str;

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser>;
    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<AuthSession>;
    async fn sign_out(&self, access_token: &str) -> BackendResult<()>;

    async fn select(&self, table: &str, query: &Query) -> BackendResult<Vec<Value>>;
    async fn count(&self, table: &str, query: &Query) -> BackendResult<usize>;
    /// 插入一行并返回后端补全默认值后的行
    async fn insert(&self, table: &str, row: Value) -> BackendResult<Value>;
    async fn update(&self, table: &str, query: &Query, patch: Value) -> BackendResult<Vec<Value>>;
    /// 返回删除的行数
    async fn delete(&self, table: &str, query: &Query) -> BackendResult<usize>;
    /// 服务端原子自增，返回新值
    async fn increment(&self, table: &str, id: &str, column: &str, delta: i64) -> BackendResult<i64>;
    async fn rpc(&self, function: &str, args: Value) -> BackendResult<Value>;

    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> BackendResult<()>;
    async fn download(&self, bucket: &str, key: &str) -> BackendResult<(Vec<u8>, String)>;
    fn public_url(&self, bucket: &str, key: &str) -> String;
}
