use crate::{
    config::{BackendMode, Config},
    error::Result,
    services::{
        backend::{Backend, MemoryBackend, RestBackend},
        AuthService, Database, InspectorService, InteractionService, LibraryService, MediaService,
        NotificationService, UserService, WorkService,
    },
};
use governor::{clock::DefaultClock, state::keyed::DashMapStateStore, Quota, RateLimiter};
use std::{num::NonZeroU32, sync::Arc};
use tracing::info;

pub type KeyedRateLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;

/// 应用程序的共享状态
/// 包含所有服务和配置的引用
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 后端网关
    pub db: Arc<Database>,

    /// 认证服务
    pub auth_service: AuthService,

    /// 用户服务
    pub user_service: UserService,

    /// 通知服务
    pub notification_service: NotificationService,

    /// 点赞、评论、关注
    pub interaction_service: InteractionService,

    /// 作品服务
    pub work_service: WorkService,

    /// 书房服务
    pub library_service: LibraryService,

    /// 媒体服务
    pub media_service: MediaService,

    /// 管理诊断
    pub inspector_service: InspectorService,

    /// 按客户端 IP 的限流器
    pub rate_limiter: Arc<KeyedRateLimiter>,
}

/// 按配置选择后端实现
pub fn backend_from_config(config: &Config) -> Result<Arc<dyn Backend>> {
    let backend: Arc<dyn Backend> = match config.backend_mode {
        BackendMode::Rest => Arc::new(RestBackend::new(
            &config.supabase_url,
            &config.supabase_anon_key,
            &config.supabase_service_key,
            config.request_timeout_secs,
        )?),
        BackendMode::Memory => Arc::new(MemoryBackend::new(
            &config.jwt_secret,
            config.jwt_expiry_secs,
            &config.media_base_url(),
        )),
    };
    info!("Using '{}' backend", backend.name());
    Ok(backend)
}

impl AppState {
    pub async fn new(config: Config, backend: Arc<dyn Backend>) -> Result<Self> {
        let db = Arc::new(Database::new(backend));

        let user_service = UserService::new(db.clone()).await?;
        let auth_service = AuthService::new(&config, db.clone(), user_service.clone()).await?;
        let notification_service = NotificationService::new(db.clone(), user_service.clone()).await?;
        let interaction_service = InteractionService::new(
            db.clone(),
            notification_service.clone(),
            user_service.clone(),
            &config,
        )
        .await?;
        let work_service = WorkService::new(db.clone(), user_service.clone(), &config).await?;
        let library_service = LibraryService::new(db.clone(), user_service.clone()).await?;
        let media_service = MediaService::new(db.clone(), &config).await?;
        let inspector_service = InspectorService::new(db.clone()).await?;

        let per_minute = NonZeroU32::new(config.rate_limit_requests).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::dashmap(Quota::per_minute(per_minute)));

        Ok(Self {
            config,
            db,
            auth_service,
            user_service,
            notification_service,
            interaction_service,
            work_service,
            library_service,
            media_service,
            inspector_service,
            rate_limiter,
        })
    }

    /// 获取分页配置
    pub fn get_page_size(&self, resource_type: &str) -> usize {
        match resource_type {
            "works" => self.config.default_works_per_page,
            "comments" => self.config.default_comments_per_page,
            _ => 20,
        }
    }
}
