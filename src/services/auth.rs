use crate::{
    config::Config,
    error::{AppError, Result},
    models::session::{Claims, SessionContext},
    services::{backend::AuthSession, Database, UserService},
    utils::validation::{validate_email_format, validate_password},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::{debug, info, warn};

/// 会话变化事件
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn { user_id: String },
    SignedOut { user_id: String },
}

pub type SubscriptionId = u64;

type AuthCallback = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct AuthService {
    config: Config,
    db: Arc<Database>,
    user_service: UserService,
    subscribers: Arc<RwLock<Vec<(SubscriptionId, AuthCallback)>>>,
    next_subscription: Arc<AtomicU64>,
}

impl AuthService {
    pub async fn new(config: &Config, db: Arc<Database>, user_service: UserService) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            db,
            user_service,
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_subscription: Arc::new(AtomicU64::new(1)),
        })
    }

    /// 注册会话变化回调
    pub fn on_auth_state_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().push((id, Arc::new(callback)));
        debug!("Registered auth subscriber {}", id);
        id
    }

    /// 取消订阅，返回是否存在该订阅
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        let removed = subscribers.len() != before;
        if removed {
            debug!("Removed auth subscriber {}", id);
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    fn emit(&self, event: AuthEvent) {
        // 回调在锁外执行，允许回调内部再订阅或退订
        let callbacks: Vec<AuthCallback> = self.subscribers.read().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in callbacks {
            callback(&event);
        }
    }

    /// 注册并创建空资料
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<crate::services::backend::AuthUser> {
        if !self.config.enable_registrations {
            return Err(AppError::forbidden("Registrations are disabled"));
        }
        let email = request.email.trim();
        validate_email_format(email)?;
        validate_password(&request.password)?;

        let user = self.db.backend().sign_up(email, &request.password).await?;
        self.user_service.create_profile(&user.id).await?;

        info!("User registered: {}", user.id);
        Ok(user)
    }

    pub async fn sign_in(&self, request: SignInRequest) -> Result<AuthSession> {
        let email = request.email.trim();
        validate_email_format(email)?;
        if request.password.is_empty() {
            return Err(AppError::validation("Password is required"));
        }

        let session = self.db.backend().sign_in(email, &request.password).await.map_err(|e| {
            warn!("Sign in failed for {}: {}", email, e);
            AppError::from(e)
        })?;

        info!("User signed in: {}", session.user.id);
        self.emit(AuthEvent::SignedIn { user_id: session.user.id.clone() });
        Ok(session)
    }

    pub async fn sign_out(&self, session: &SessionContext) -> Result<()> {
        self.db.backend().sign_out(&session.access_token).await?;
        info!("User signed out: {}", session.user_id);
        self.emit(AuthEvent::SignedOut { user_id: session.user_id.clone() });
        Ok(())
    }

    pub fn verify_jwt(&self, token: &str) -> Result<Claims> {
        let decoding_key = DecodingKey::from_secret(self.config.jwt_secret.as_ref());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["authenticated"]);

        match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(token_data) => {
                debug!("JWT token verified for user: {}", token_data.claims.sub);
                Ok(token_data.claims)
            }
            Err(e) => {
                warn!("JWT verification failed: {}", e);
                Err(AppError::Authentication("Invalid token".to_string()))
            }
        }
    }

    /// 由令牌构造会话
    pub fn session_from_token(&self, token: &str) -> Result<SessionContext> {
        let claims = self.verify_jwt(token)?;
        let mut session = SessionContext::new(claims.sub.clone(), token).with_admin(self.config.is_admin(&claims.sub));
        if let Some(email) = claims.email {
            session = session.with_email(email);
        }
        Ok(session)
    }
}
