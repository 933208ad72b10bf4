use serde::{Deserialize, Serialize};

/// BaaS 签发的访问令牌载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 用户ID
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

/// 当前请求的会话
///
/// 由认证中间件从 Bearer 令牌构造，显式传给每个服务调用。
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: String,
    pub is_admin: bool,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            access_token: access_token.into(),
            is_admin: false,
        }
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// 本人或管理员
    pub fn can_manage(&self, owner_id: Option<&str>) -> bool {
        self.is_admin || owner_id == Some(self.user_id.as_str())
    }
}
