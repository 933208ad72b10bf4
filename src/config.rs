use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// 托管 BaaS
    Rest,
    /// 进程内存储
    Memory,
}

impl std::str::FromStr for BackendMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rest" | "supabase" => Ok(BackendMode::Rest),
            "memory" => Ok(BackendMode::Memory),
            other => anyhow::bail!("unknown BACKEND_MODE '{}', expected 'rest' or 'memory'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub public_base_url: String,

    // Backend configuration
    pub backend_mode: BackendMode,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: String,

    // Authentication configuration
    pub jwt_secret: String,
    pub jwt_expiry_secs: i64,
    pub admin_user_ids: Vec<String>,

    // Storage configuration
    pub storage_bucket: String,
    pub max_upload_size: u64,
    pub allowed_image_types: String,

    // Content settings
    pub max_comment_length: usize,
    pub default_works_per_page: usize,
    pub default_comments_per_page: usize,

    // Feature flags
    pub enable_registrations: bool,
    pub enable_comments: bool,
    pub seed_sample_data: bool,

    // Rate limiting
    pub rate_limit_requests: u32,

    // CORS configuration
    pub cors_allowed_origins: String,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var_or(key, default)
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {}", key))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Config {
            server_host: var_or("SERVER_HOST", "0.0.0.0"),
            server_port: parse_var("SERVER_PORT", "3000")?,
            environment: var_or("ENVIRONMENT", "development"),
            log_level: var_or("LOG_LEVEL", "literary_hall=debug,tower_http=debug"),
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", "30")?,
            public_base_url: var_or("PUBLIC_BASE_URL", "http://localhost:3000"),

            backend_mode: var_or("BACKEND_MODE", "rest").parse()?,
            supabase_url: var_or("SUPABASE_URL", "http://localhost:54321"),
            supabase_anon_key: var_or("SUPABASE_ANON_KEY", ""),
            supabase_service_key: var_or("SUPABASE_SERVICE_KEY", ""),

            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_expiry_secs: parse_var("JWT_EXPIRY_SECS", "3600")?,
            admin_user_ids: parse_list(&var_or("ADMIN_USER_IDS", "")),

            storage_bucket: var_or("STORAGE_BUCKET", "covers"),
            max_upload_size: parse_var("MAX_UPLOAD_SIZE", "5242880")?,
            allowed_image_types: var_or("ALLOWED_IMAGE_TYPES", "jpeg,jpg,png,gif,webp"),

            max_comment_length: parse_var("MAX_COMMENT_LENGTH", "2000")?,
            default_works_per_page: parse_var("DEFAULT_WORKS_PER_PAGE", "12")?,
            default_comments_per_page: parse_var("DEFAULT_COMMENTS_PER_PAGE", "50")?,

            enable_registrations: parse_var("ENABLE_REGISTRATIONS", "true")?,
            enable_comments: parse_var("ENABLE_COMMENTS", "true")?,
            seed_sample_data: parse_var("SEED_SAMPLE_DATA", "false")?,

            rate_limit_requests: parse_var("RATE_LIMIT_REQUESTS", "100")?,

            cors_allowed_origins: var_or("CORS_ALLOWED_ORIGINS", "http://localhost:3001"),
        };
        config.validate()?;
        Ok(config)
    }

    /// 启动前检查地址和密钥
    pub fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.public_base_url)
            .with_context(|| format!("PUBLIC_BASE_URL is not a valid URL: {}", self.public_base_url))?;

        if self.backend_mode == BackendMode::Rest {
            let base = url::Url::parse(&self.supabase_url)
                .with_context(|| format!("SUPABASE_URL is not a valid URL: {}", self.supabase_url))?;
            if !matches!(base.scheme(), "http" | "https") {
                anyhow::bail!("SUPABASE_URL must use http or https");
            }
            if self.supabase_anon_key.is_empty() || self.supabase_service_key.is_empty() {
                anyhow::bail!("SUPABASE_ANON_KEY and SUPABASE_SERVICE_KEY are required in rest mode");
            }
        }

        if self.jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        Ok(())
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_user_ids.iter().any(|id| id == user_id)
    }

    /// 内存模式下对象的公开地址前缀
    pub fn media_base_url(&self) -> String {
        format!("{}/api/hall/media", self.public_base_url.trim_end_matches('/'))
    }

    /// 允许上传的扩展名列表（小写）
    pub fn allowed_image_extensions(&self) -> Vec<String> {
        parse_list(&self.allowed_image_types)
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect()
    }
}

/// 逗号分隔列表，忽略空项
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            environment: "development".to_string(),
            log_level: "literary_hall=debug,tower_http=debug".to_string(),
            request_timeout_secs: 30,
            public_base_url: "http://localhost:3000".to_string(),
            backend_mode: BackendMode::Memory,
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: String::new(),
            supabase_service_key: String::new(),
            jwt_secret: "development-secret-change-me".to_string(),
            jwt_expiry_secs: 3600,
            admin_user_ids: Vec::new(),
            storage_bucket: "covers".to_string(),
            max_upload_size: 5 * 1024 * 1024,
            allowed_image_types: "jpeg,jpg,png,gif,webp".to_string(),
            max_comment_length: 2000,
            default_works_per_page: 12,
            default_comments_per_page: 50,
            enable_registrations: true,
            enable_comments: true,
            seed_sample_data: false,
            rate_limit_requests: 100,
            cors_allowed_origins: "http://localhost:3001".to_string(),
        }
    }
}
