use super::{
    query::{Filter, Query},
    AuthSession, AuthUser, Backend, BackendError, BackendResult,
};
use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// PostgreSQL 的 invalid_text_representation 错误码
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

/// Supabase 风格 BaaS 的 HTTP 客户端
///
/// 表走 PostgREST (`/rest/v1`)，认证走 GoTrue (`/auth/v1`)，对象走 Storage (`/storage/v1`)。
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    anon_key: String,
    service_key: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: i64,
    user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// 把单个值渲染成 PostgREST 过滤器里的字面量
fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn quoted(value: &Value) -> String {
    format!("\"{}\"", literal(value).replace('"', "\\\""))
}

/// 把 `Query` 翻译成 PostgREST 查询参数
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = Vec::new();
    for filter in &query.filters {
        let rendered = match filter {
            Filter::Eq(_, v) => format!("eq.{}", literal(v)),
            Filter::Neq(_, v) => format!("neq.{}", literal(v)),
            Filter::In(_, vs) => format!("in.({})", vs.iter().map(quoted).collect::<Vec<_>>().join(",")),
            Filter::Contains(_, v) => {
                let items = match v {
                    Value::Array(items) => items.iter().map(quoted).collect::<Vec<_>>(),
                    single => vec![quoted(single)],
                };
                format!("cs.{{{}}}", items.join(","))
            }
            Filter::IsNull(_) => "is.null".to_string(),
        };
        params.push((filter.column().to_string(), rendered));
    }
    if !query.order.is_empty() {
        let order = query
            .order
            .iter()
            .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
            .collect::<Vec<_>>()
            .join(",");
        params.push(("order".to_string(), order));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(offset) = query.offset {
        params.push(("offset".to_string(), offset.to_string()));
    }
    params
}

/// 解析 `Content-Range: 0-9/42` 中的总数
fn parse_content_range(value: &str) -> Option<usize> {
    value.rsplit('/').next().and_then(|total| total.trim().parse().ok())
}

impl RestBackend {
    pub fn new(base_url: &str, anon_key: &str, service_key: &str, timeout_secs: u64) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            service_key: service_key.to_string(),
        })
    }

    /// 存储对象路径，键按路径段编码
    fn object_path(bucket: &str, key: &str) -> String {
        let key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", bucket, key)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// 以服务密钥发起请求
    fn service_request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn auth_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/auth/v1/{}", self.base_url, path))
            .header("apikey", &self.anon_key)
    }

    /// 非 2xx 响应统一转换成 BackendError
    async fn check(response: Response) -> BackendResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<Value>(&text).ok();
        let pg_code = body
            .as_ref()
            .and_then(|b| b.get("code"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let message = body
            .and_then(|body| {
                ["message", "msg", "error_description", "error"]
                    .iter()
                    .find_map(|k| body.get(*k).and_then(Value::as_str).map(str::to_string))
            })
            .unwrap_or(text);

        warn!("Backend request failed with {}: {}", status, message);
        Err(match status.as_u16() {
            409 => BackendError::Conflict(message),
            404 => BackendError::NotFound(message),
            401 | 403 => BackendError::Unauthorized(message),
            422 if message.contains("already registered") => BackendError::Conflict(message),
            // 非法 uuid 等文本无法转换成列类型：按记录不存在处理
            400 if pg_code.as_deref() == Some(INVALID_TEXT_REPRESENTATION) => {
                BackendError::NotFound(message)
            }
            code => BackendError::Status { status: code, message },
        })
    }

    async fn json_rows(response: Response) -> BackendResult<Vec<Value>> {
        let body = Self::check(response).await?.bytes().await?;
        if body.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl Backend for RestBackend {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser> {
        let response = self
            .auth_request(Method::POST, "signup")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: Value = Self::check(response).await?.json().await?;
        // 开启邮件确认时返回裸用户，否则用户嵌在 session 里
        let user = body.get("user").cloned().unwrap_or(body);
        Ok(serde_json::from_value(user)?)
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<AuthSession> {
        let response = self
            .auth_request(Method::POST, "token?grant_type=password")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let token: TokenResponse = Self::check(response).await?.json().await?;
        Ok(AuthSession {
            access_token: token.access_token,
            token_type: token.token_type,
            expires_in: token.expires_in,
            user: token.user,
        })
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        let response = self
            .auth_request(Method::POST, "logout")
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn select(&self, table: &str, query: &Query) -> BackendResult<Vec<Value>> {
        debug!("GET {} {:?}", table, query);
        let mut params = query_params(query);
        params.push(("select".to_string(), "*".to_string()));
        let response = self
            .service_request(Method::GET, &self.rest_url(table))
            .query(&params)
            .send()
            .await?;
        Self::json_rows(response).await
    }

    async fn count(&self, table: &str, query: &Query) -> BackendResult<usize> {
        let mut params = query_params(&query.filters_only());
        params.push(("select".to_string(), "id".to_string()));
        let response = self
            .service_request(Method::HEAD, &self.rest_url(table))
            .header("Prefer", "count=exact")
            .query(&params)
            .send()
            .await?;
        let response = Self::check(response).await?;
        response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| BackendError::Status {
                status: 500,
                message: "missing Content-Range in count response".to_string(),
            })
    }

    async fn insert(&self, table: &str, row: Value) -> BackendResult<Value> {
        let response = self
            .service_request(Method::POST, &self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        Self::json_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Status { status: 500, message: format!("insert into {} returned no row", table) })
    }

    async fn update(&self, table: &str, query: &Query, patch: Value) -> BackendResult<Vec<Value>> {
        let response = self
            .service_request(Method::PATCH, &self.rest_url(table))
            .header("Prefer", "return=representation")
            .query(&query_params(&query.filters_only()))
            .json(&patch)
            .send()
            .await?;
        Self::json_rows(response).await
    }

    async fn delete(&self, table: &str, query: &Query) -> BackendResult<usize> {
        let response = self
            .service_request(Method::DELETE, &self.rest_url(table))
            .header("Prefer", "return=representation")
            .query(&query_params(&query.filters_only()))
            .send()
            .await?;
        Ok(Self::json_rows(response).await?.len())
    }

    async fn increment(&self, table: &str, id: &str, column: &str, delta: i64) -> BackendResult<i64> {
        let value = self
            .rpc(
                "increment_counter",
                json!({ "p_table": table, "p_id": id, "p_column": column, "p_delta": delta }),
            )
            .await?;
        value.as_i64().ok_or_else(|| BackendError::Status {
            status: 500,
            message: format!("increment_counter returned {}", value),
        })
    }

    async fn rpc(&self, function: &str, args: Value) -> BackendResult<Value> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, function);
        let response = self.service_request(Method::POST, &url).json(&args).send().await?;
        let body = Self::check(response).await?.bytes().await?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> BackendResult<()> {
        let url = format!("{}/storage/v1/object/{}", self.base_url, Self::object_path(bucket, key));
        let response = self
            .service_request(Method::POST, &url)
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        Self::check(response)
            .await
            .map_err(|e| match e {
                BackendError::Status { status, message } => BackendError::Storage(format!("{}: {}", status, message)),
                other => other,
            })?;
        Ok(())
    }

    async fn download(&self, bucket: &str, key: &str) -> BackendResult<(Vec<u8>, String)> {
        let url = format!("{}/storage/v1/object/{}", self.base_url, Self::object_path(bucket, key));
        let response = Self::check(self.service_request(Method::GET, &url).send().await?).await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response.bytes().await?.to_vec();
        Ok((bytes, content_type))
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/storage/v1/object/public/{}", self.base_url, Self::object_path(bucket, key))
    }
}
