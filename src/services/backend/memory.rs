use super::{
    query::{Filter, Query},
    schema::{self, ColumnDef, TableDef},
    AuthSession, AuthUser, Backend, BackendError, BackendResult,
};
use crate::models::session::Claims;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::{cmp::Ordering, collections::HashMap};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredUser {
    id: String,
    email: String,
    password_hash: String,
}

/// 进程内后端
///
/// 表数据放在一把写锁下，插入时的唯一约束检查与写入是原子的。
pub struct MemoryBackend {
    tables: RwLock<HashMap<&'static str, Vec<Value>>>,
    users: DashMap<String, StoredUser>,
    objects: DashMap<(String, String), (Vec<u8>, String)>,
    jwt_secret: String,
    jwt_expiry_secs: i64,
    public_base_url: String,
}

impl MemoryBackend {
    pub fn new(jwt_secret: &str, jwt_expiry_secs: i64, public_base_url: &str) -> Self {
        let tables = schema::TABLES.iter().map(|t| (t.name, Vec::new())).collect();
        Self {
            tables: RwLock::new(tables),
            users: DashMap::new(),
            objects: DashMap::new(),
            jwt_secret: jwt_secret.to_string(),
            jwt_expiry_secs,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn table_def(name: &str) -> BackendResult<&'static TableDef> {
        schema::table(name).ok_or_else(|| BackendError::NotFound(format!("relation \"{}\" does not exist", name)))
    }

    fn issue_token(&self, user: &AuthUser) -> BackendResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            email: Some(user.email.clone()),
            aud: Some("authenticated".to_string()),
            role: Some("authenticated".to_string()),
            exp: now + self.jwt_expiry_secs,
            iat: now,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(self.jwt_secret.as_bytes()))
            .map_err(|e| BackendError::Status { status: 500, message: format!("token signing failed: {}", e) })
    }

    fn do_increment(&self, table: &str, id: &str, column: &str, delta: i64) -> BackendResult<i64> {
        if !schema::is_counter_column(table, column) {
            return Err(BackendError::Status {
                status: 400,
                message: format!("column \"{}\" of \"{}\" is not a counter", column, table),
            });
        }
        let def = Self::table_def(table)?;
        let mut tables = self.tables.write();
        let rows = tables.entry(def.name).or_default();
        let row = rows
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
            .ok_or_else(|| BackendError::NotFound(format!("{} {}", table, id)))?;

        let next = row.get(column).and_then(Value::as_i64).unwrap_or(0) + delta;
        if let Some(obj) = row.as_object_mut() {
            obj.insert(column.to_string(), json!(next));
        }
        Ok(next)
    }
}

static NULL: Value = Value::Null;

fn now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// 把列的 SQL 默认值表达式还原成 JSON 值
fn default_value(col: &ColumnDef) -> Option<Value> {
    let default = col.default?;
    let value = match default {
        "gen_random_uuid()" => json!(Uuid::new_v4().to_string()),
        "now()" => json!(now_string()),
        "true" => json!(true),
        "false" => json!(false),
        "'{}'::text[]" => json!([]),
        other => {
            if let Ok(n) = other.parse::<i64>() {
                json!(n)
            } else if let Some(text) = other.strip_prefix('\'').and_then(|s| s.strip_suffix("'::text")) {
                json!(text)
            } else {
                return None;
            }
        }
    };
    Some(value)
}

fn check_columns(def: &TableDef, obj: &Map<String, Value>) -> BackendResult<()> {
    for key in obj.keys() {
        if def.column(key).is_none() {
            return Err(BackendError::Status {
                status: 400,
                message: format!("Could not find the '{}' column of '{}'", key, def.name),
            });
        }
    }
    Ok(())
}

fn values_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(s), other) | (other, Value::String(s)) if !other.is_null() => match other {
            Value::Number(n) => s.parse::<f64>().ok() == n.as_f64(),
            Value::Bool(flag) => s.parse::<bool>().ok() == Some(*flag),
            _ => false,
        },
        _ => false,
    }
}

fn matches(row: &Value, filter: &Filter) -> bool {
    let cell = row.get(filter.column()).unwrap_or(&NULL);
    match filter {
        Filter::Eq(_, v) => !cell.is_null() && values_equal(cell, v),
        Filter::Neq(_, v) => !cell.is_null() && !values_equal(cell, v),
        Filter::In(_, vs) => !cell.is_null() && vs.iter().any(|v| values_equal(cell, v)),
        Filter::Contains(_, v) => match (cell, v) {
            (Value::Array(items), Value::Array(wanted)) => {
                wanted.iter().all(|w| items.iter().any(|i| values_equal(i, w)))
            }
            (Value::Array(items), single) => items.iter().any(|i| values_equal(i, single)),
            _ => false,
        },
        Filter::IsNull(_) => cell.is_null(),
    }
}

fn matches_all(row: &Value, query: &Query) -> bool {
    query.filters.iter().all(|f| matches(row, f))
}

/// 比较两个单元格，NULL 视为最大值
fn compare_cells(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(dx), Ok(dy)) => dx.cmp(&dy),
                _ => x.cmp(y),
            }
        }
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn apply_query(rows: &[Value], query: &Query) -> Vec<Value> {
    let mut selected: Vec<Value> = rows.iter().filter(|r| matches_all(r, query)).cloned().collect();

    if !query.order.is_empty() {
        selected.sort_by(|a, b| {
            for order in &query.order {
                let ca = a.get(&order.column).unwrap_or(&NULL);
                let cb = b.get(&order.column).unwrap_or(&NULL);
                let ord = compare_cells(ca, cb);
                let ord = if order.ascending { ord } else { ord.reverse() };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    let offset = query.offset.unwrap_or(0);
    let iter = selected.into_iter().skip(offset);
    match query.limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}

/// 检查 candidate 是否与 rows 中 skip 之外的某行冲突
fn find_conflict(def: &TableDef, rows: &[Value], candidate: &Value, skip: Option<usize>) -> Option<String> {
    for unique in def.unique {
        let clash = rows.iter().enumerate().any(|(i, existing)| {
            Some(i) != skip
                && unique.iter().all(|col| {
                    let a = existing.get(*col).unwrap_or(&NULL);
                    let b = candidate.get(*col).unwrap_or(&NULL);
                    !a.is_null() && values_equal(a, b)
                })
        });
        if clash {
            return Some(format!(
                "duplicate key value violates unique constraint \"{}_{}_key\"",
                def.name,
                unique.join("_")
            ));
        }
    }
    None
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser> {
        let key = email.trim().to_lowercase();
        if self.users.contains_key(&key) {
            return Err(BackendError::Conflict("User already registered".to_string()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| BackendError::Status { status: 500, message: format!("password hashing failed: {}", e) })?
            .to_string();

        let user = StoredUser { id: Uuid::new_v4().to_string(), email: key.clone(), password_hash };
        let auth_user = AuthUser { id: user.id.clone(), email: user.email.clone() };

        match self.users.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(BackendError::Conflict("User already registered".to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(user);
                debug!("Memory backend registered user {}", auth_user.id);
                Ok(auth_user)
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<AuthSession> {
        let key = email.trim().to_lowercase();
        let stored = self
            .users
            .get(&key)
            .map(|u| u.clone())
            .ok_or_else(|| BackendError::Unauthorized("Invalid login credentials".to_string()))?;

        let parsed = PasswordHash::new(&stored.password_hash)
            .map_err(|e| BackendError::Status { status: 500, message: format!("corrupt password hash: {}", e) })?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| BackendError::Unauthorized("Invalid login credentials".to_string()))?;

        let user = AuthUser { id: stored.id, email: stored.email };
        let access_token = self.issue_token(&user)?;
        Ok(AuthSession {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.jwt_expiry_secs,
            user,
        })
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["authenticated"]);
        decode::<Claims>(access_token, &DecodingKey::from_secret(self.jwt_secret.as_bytes()), &validation)
            .map_err(|e| BackendError::Unauthorized(e.to_string()))?;
        Ok(())
    }

    async fn select(&self, table: &str, query: &Query) -> BackendResult<Vec<Value>> {
        let def = Self::table_def(table)?;
        let tables = self.tables.read();
        let rows = tables.get(def.name).map(Vec::as_slice).unwrap_or(&[]);
        Ok(apply_query(rows, query))
    }

    async fn count(&self, table: &str, query: &Query) -> BackendResult<usize> {
        let def = Self::table_def(table)?;
        let tables = self.tables.read();
        let rows = tables.get(def.name).map(Vec::as_slice).unwrap_or(&[]);
        Ok(rows.iter().filter(|r| matches_all(r, query)).count())
    }

    async fn insert(&self, table: &str, row: Value) -> BackendResult<Value> {
        let def = Self::table_def(table)?;
        let mut obj = match row {
            Value::Object(obj) => obj,
            _ => return Err(BackendError::Status { status: 400, message: "row must be a JSON object".to_string() }),
        };
        check_columns(def, &obj)?;

        for col in def.columns {
            if obj.get(col.name).map_or(true, Value::is_null) {
                match default_value(col) {
                    Some(v) if !obj.contains_key(col.name) => {
                        obj.insert(col.name.to_string(), v);
                    }
                    _ if col.nullable => {
                        obj.entry(col.name.to_string()).or_insert(Value::Null);
                    }
                    _ => {
                        return Err(BackendError::Status {
                            status: 400,
                            message: format!("null value in column \"{}\" violates not-null constraint", col.name),
                        })
                    }
                }
            }
        }

        let candidate = Value::Object(obj);
        let mut tables = self.tables.write();
        let rows = tables.entry(def.name).or_default();
        if let Some(message) = find_conflict(def, rows, &candidate, None) {
            return Err(BackendError::Conflict(message));
        }
        rows.push(candidate.clone());
        Ok(candidate)
    }

    async fn update(&self, table: &str, query: &Query, patch: Value) -> BackendResult<Vec<Value>> {
        let def = Self::table_def(table)?;
        let patch = match patch {
            Value::Object(obj) => obj,
            _ => return Err(BackendError::Status { status: 400, message: "patch must be a JSON object".to_string() }),
        };
        check_columns(def, &patch)?;

        let mut tables = self.tables.write();
        let rows = tables.entry(def.name).or_default();
        let targets: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| matches_all(r, query))
            .map(|(i, _)| i)
            .collect();

        let mut updated = Vec::with_capacity(targets.len());
        for i in targets {
            let mut next = rows[i].clone();
            if let Some(obj) = next.as_object_mut() {
                for (k, v) in &patch {
                    obj.insert(k.clone(), v.clone());
                }
            }
            if let Some(message) = find_conflict(def, rows, &next, Some(i)) {
                return Err(BackendError::Conflict(message));
            }
            rows[i] = next.clone();
            updated.push(next);
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, query: &Query) -> BackendResult<usize> {
        let def = Self::table_def(table)?;
        let mut tables = self.tables.write();
        let rows = tables.entry(def.name).or_default();
        let before = rows.len();
        rows.retain(|r| !matches_all(r, query));
        Ok(before - rows.len())
    }

    async fn increment(&self, table: &str, id: &str, column: &str, delta: i64) -> BackendResult<i64> {
        self.do_increment(table, id, column, delta)
    }

    async fn rpc(&self, function: &str, args: Value) -> BackendResult<Value> {
        match function {
            "get_schema_info" => {
                let tables = self.tables.read();
                let mut info: Vec<Value> = schema::TABLES
                    .iter()
                    .map(|t| {
                        json!({
                            "table_name": t.name,
                            "row_count": tables.get(t.name).map_or(0, Vec::len),
                        })
                    })
                    .collect();
                info.sort_by(|a, b| compare_cells(&a["table_name"], &b["table_name"]));
                Ok(Value::Array(info))
            }
            "get_table_columns" => {
                let name = args.get("p_table_name").and_then(Value::as_str).unwrap_or_default();
                let columns = schema::table(name)
                    .map(|t| {
                        t.columns
                            .iter()
                            .map(|c| {
                                json!({
                                    "column_name": c.name,
                                    "data_type": c.data_type,
                                    "is_nullable": if c.nullable { "YES" } else { "NO" },
                                    "column_default": c.default,
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(Value::Array(columns))
            }
            "increment_counter" => {
                let field = |k: &str| args.get(k).and_then(Value::as_str).unwrap_or_default().to_string();
                let delta = args.get("p_delta").and_then(Value::as_i64).unwrap_or(1);
                let next = self.do_increment(&field("p_table"), &field("p_id"), &field("p_column"), delta)?;
                Ok(json!(next))
            }
            other => Err(BackendError::NotFound(format!("function {} does not exist", other))),
        }
    }

    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> BackendResult<()> {
        let slot = (bucket.to_string(), key.to_string());
        if self.objects.contains_key(&slot) {
            return Err(BackendError::Conflict(format!("object {}/{} already exists", bucket, key)));
        }
        self.objects.insert(slot, (bytes, content_type.to_string()));
        Ok(())
    }

    async fn download(&self, bucket: &str, key: &str) -> BackendResult<(Vec<u8>, String)> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BackendError::NotFound(format!("object {}/{}", bucket, key)))
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/objects/{}/{}", self.public_base_url, bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::backend::schema::{INTERACTIONS, LIBRARY_FOLLOWERS, NOTIFICATIONS, WORKS};

    fn backend() -> MemoryBackend {
        MemoryBackend::new("test-secret", 3600, "http://localhost/api/hall/media")
    }

    #[tokio::test]
    async fn test_insert_fills_defaults() {
        let b = backend();
        let row = b.insert(WORKS, json!({"title": "t", "genre": "SF"})).await.unwrap();
        assert!(row["id"].as_str().is_some());
        assert_eq!(row["like_count"], json!(0));
        assert_eq!(row["is_public"], json!(true));
        assert_eq!(row["themes"], json!([]));
        assert!(row["user_id"].is_null());
    }

    #[tokio::test]
    async fn test_insert_rejects_missing_required_and_unknown_columns() {
        let b = backend();
        let err = b.insert(WORKS, json!({"genre": "SF"})).await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 400, .. }));

        let err = b.insert(WORKS, json!({"title": "t", "genre": "SF", "bogus": 1})).await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_unique_like_per_pair() {
        let b = backend();
        let like = json!({"work_id": "w1", "user_id": "u1", "interaction_type": "like"});
        b.insert(INTERACTIONS, like.clone()).await.unwrap();
        let err = b.insert(INTERACTIONS, like).await.unwrap_err();
        assert!(matches!(err, BackendError::Conflict(_)));

        b.insert(INTERACTIONS, json!({"work_id": "w1", "user_id": "u2", "interaction_type": "like"}))
            .await
            .unwrap();
        assert_eq!(b.count(INTERACTIONS, &Query::new().eq("work_id", "w1")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unique_follow_per_pair() {
        let b = backend();
        let edge = json!({"library_id": "l1", "follower_id": "u1"});
        b.insert(LIBRARY_FOLLOWERS, edge.clone()).await.unwrap();
        assert!(matches!(b.insert(LIBRARY_FOLLOWERS, edge).await, Err(BackendError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_filters_and_ordering() {
        let b = backend();
        for (title, likes, themes) in [("a", 3, json!(["미래"])), ("b", 7, json!(["자연"])), ("c", 5, json!(["미래", "자연"]))] {
            let row = b.insert(WORKS, json!({"title": title, "genre": "SF", "themes": themes})).await.unwrap();
            let id = row["id"].as_str().unwrap().to_string();
            b.update(WORKS, &Query::new().eq("id", id), json!({"like_count": likes})).await.unwrap();
        }

        let popular = b.select(WORKS, &Query::new().order_desc("like_count").limit(2)).await.unwrap();
        let titles: Vec<_> = popular.iter().map(|r| r["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["b", "c"]);

        let future = b.select(WORKS, &Query::new().contains("themes", "미래").order_asc("title")).await.unwrap();
        assert_eq!(future.len(), 2);
        assert_eq!(future[1]["title"], json!("c"));

        let not_a = b.count(WORKS, &Query::new().neq("title", "a")).await.unwrap();
        assert_eq!(not_a, 2);

        let picked = b.select(WORKS, &Query::new().is_in("title", vec!["a", "c"])).await.unwrap();
        assert_eq!(picked.len(), 2);

        let orphans = b.count(WORKS, &Query::new().is_null("library_id")).await.unwrap();
        assert_eq!(orphans, 3);
    }

    #[tokio::test]
    async fn test_timestamps_order_as_datetimes() {
        let b = backend();
        b.insert(NOTIFICATIONS, json!({"user_id": "u", "type": "like", "actor_id": "a", "content": "old",
            "created_at": "2024-01-01T09:00:00+09:00"})).await.unwrap();
        b.insert(NOTIFICATIONS, json!({"user_id": "u", "type": "like", "actor_id": "a", "content": "new",
            "created_at": "2024-01-01T01:00:00Z"})).await.unwrap();

        let rows = b.select(NOTIFICATIONS, &Query::new().order_desc("created_at")).await.unwrap();
        assert_eq!(rows[0]["content"], json!("new"));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let b = backend();
        let row = b.insert(WORKS, json!({"title": "t", "genre": "SF"})).await.unwrap();
        let id = row["id"].as_str().unwrap().to_string();

        let updated = b.update(WORKS, &Query::new().eq("id", id.clone()), json!({"title": "u"})).await.unwrap();
        assert_eq!(updated[0]["title"], json!("u"));

        assert_eq!(b.delete(WORKS, &Query::new().eq("id", id.clone())).await.unwrap(), 1);
        assert!(b.select(WORKS, &Query::new().eq("id", id)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_increment_counter() {
        let b = backend();
        let row = b.insert(WORKS, json!({"title": "t", "genre": "SF"})).await.unwrap();
        let id = row["id"].as_str().unwrap();
        assert_eq!(b.increment(WORKS, id, "view_count", 1).await.unwrap(), 1);
        let via_rpc = b
            .rpc("increment_counter", json!({"p_table": WORKS, "p_id": id, "p_column": "view_count", "p_delta": 2}))
            .await
            .unwrap();
        assert_eq!(via_rpc, json!(3));
        assert!(b.increment(WORKS, id, "title", 1).await.is_err());
        assert!(matches!(b.increment(WORKS, "missing", "view_count", 1).await, Err(BackendError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_table_is_not_found() {
        let b = backend();
        assert!(matches!(b.select("nope", &Query::new()).await, Err(BackendError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_introspection_rpcs() {
        let b = backend();
        b.insert(WORKS, json!({"title": "t", "genre": "SF"})).await.unwrap();

        let info = b.rpc("get_schema_info", json!({})).await.unwrap();
        let works = info.as_array().unwrap().iter().find(|t| t["table_name"] == json!(WORKS)).unwrap();
        assert_eq!(works["row_count"], json!(1));

        let cols = b.rpc("get_table_columns", json!({"p_table_name": "comments"})).await.unwrap();
        let content = cols.as_array().unwrap().iter().find(|c| c["column_name"] == json!("content")).unwrap();
        assert_eq!(content["is_nullable"], json!("NO"));

        assert!(b.rpc("drop_everything", json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_auth_round_trip() {
        let b = backend();
        let user = b.sign_up("Reader@Example.com", "secret1").await.unwrap();
        assert_eq!(user.email, "reader@example.com");
        assert!(matches!(b.sign_up("reader@example.com", "other12").await, Err(BackendError::Conflict(_))));

        let session = b.sign_in("reader@example.com", "secret1").await.unwrap();
        assert_eq!(session.user.id, user.id);
        b.sign_out(&session.access_token).await.unwrap();

        assert!(matches!(
            b.sign_in("reader@example.com", "wrong-password").await,
            Err(BackendError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_object_storage() {
        let b = backend();
        b.upload("covers", "1_a.png", vec![1, 2, 3], "image/png").await.unwrap();
        let (bytes, content_type) = b.download("covers", "1_a.png").await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(content_type, "image/png");
        assert!(b.public_url("covers", "1_a.png").ends_with("/objects/covers/1_a.png"));
        assert!(b.download("covers", "missing").await.is_err());
    }
}
