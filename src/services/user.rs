use crate::{
    error::{AppError, Result},
    models::{
        library::Library,
        profile::*,
        session::SessionContext,
        work::Work,
    },
    services::{
        backend::{schema::{INTERACTIONS, PROFILES, USER_LIBRARIES, WORKS}, Query},
        Database,
    },
};
use crate::utils::validation::validate_display_name;
use chrono::Utc;
use serde_json::json;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info};
use validator::Validate;

/// 用户服务，处理个人资料相关的业务逻辑
#[derive(Clone)]
pub struct UserService {
    db: Arc<Database>,
}

impl UserService {
    /// 创建新的用户服务实例
    pub async fn new(db: Arc<Database>) -> Result<Self> {
        Ok(Self { db })
    }

    /// 注册时创建空资料，已存在则直接返回
    pub async fn create_profile(&self, user_id: &str) -> Result<Profile> {
        debug!("Creating profile for user: {}", user_id);

        if let Some(existing) = self.find_profile(user_id).await? {
            return Ok(existing);
        }

        let created = self
            .db
            .create::<Profile, _>(PROFILES, &json!({ "id": user_id, "full_name": "", "bio": "" }))
            .await;

        match created {
            Ok(profile) => Ok(profile),
            // 并发注册时另一请求已写入
            Err(e) if e.is_unique_violation() => self.get_profile(user_id).await,
            Err(e) => Err(e),
        }
    }

    pub async fn find_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        self.db.get_by_id(PROFILES, user_id).await
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Profile> {
        self.find_profile(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile"))
    }

    /// 显示名，资料缺失或名字为空时为 `Someone`
    pub async fn display_name(&self, user_id: &str) -> Result<String> {
        Ok(self
            .find_profile(user_id)
            .await?
            .map(|p| p.display_name())
            .unwrap_or_else(|| ANONYMOUS_NAME.to_string()))
    }

    /// 批量解析显示名
    pub async fn display_names(&self, user_ids: &[String]) -> Result<HashMap<String, String>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut ids = user_ids.to_vec();
        ids.sort();
        ids.dedup();

        let profiles: Vec<Profile> = self.db.select(PROFILES, &Query::new().is_in("id", ids)).await?;
        Ok(profiles
            .into_iter()
            .map(|p| {
                let name = p.display_name();
                (p.id, name)
            })
            .collect())
    }

    pub async fn update_profile(&self, session: &SessionContext, request: UpdateProfileRequest) -> Result<Profile> {
        debug!("Updating profile for user: {}", session.user_id);
        request.validate()?;

        let full_name = request.full_name.trim();
        validate_display_name(full_name)?;
        let bio = request.bio.as_deref().map(str::trim).unwrap_or_default();

        // 旧账户可能没有资料行
        self.create_profile(&session.user_id).await?;

        let profile = self
            .db
            .update_by_id::<Profile>(
                PROFILES,
                &session.user_id,
                json!({
                    "full_name": full_name,
                    "bio": bio,
                    "updated_at": Utc::now().to_rfc3339(),
                }),
            )
            .await?
            .ok_or_else(|| AppError::not_found("Profile"))?;

        info!("Profile updated for user: {}", session.user_id);
        Ok(profile)
    }

    /// 当前用户点赞过的作品，最近点赞在前
    pub async fn liked_works(&self, session: &SessionContext) -> Result<Vec<Work>> {
        let likes = self
            .db
            .select_raw(
                INTERACTIONS,
                &Query::new()
                    .eq("user_id", session.user_id.as_str())
                    .eq("interaction_type", "like")
                    .order_desc("created_at"),
            )
            .await?;

        let work_ids: Vec<String> = likes
            .iter()
            .filter_map(|row| row.get("work_id").and_then(|v| v.as_str()).map(str::to_string))
            .collect();
        if work_ids.is_empty() {
            return Ok(Vec::new());
        }

        let works: Vec<Work> = self.db.select(WORKS, &Query::new().is_in("id", work_ids.clone())).await?;
        let mut by_id: HashMap<String, Work> = works.into_iter().map(|w| (w.id.clone(), w)).collect();

        Ok(work_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .filter(|w| w.is_public || w.is_owned_by(&session.user_id))
            .collect())
    }

    /// 某用户的作品，非本人只能看到公开作品
    pub async fn user_works(&self, user_id: &str, viewer: Option<&SessionContext>) -> Result<Vec<Work>> {
        let mut query = Query::new().eq("user_id", user_id);
        if !viewer.map_or(false, |v| v.can_manage(Some(user_id))) {
            query = query.eq("is_public", true);
        }
        self.db.select(WORKS, &query.order_desc("created_at")).await
    }

    pub async fn user_libraries(&self, user_id: &str, viewer: Option<&SessionContext>) -> Result<Vec<Library>> {
        let mut query = Query::new().eq("user_id", user_id);
        if !viewer.map_or(false, |v| v.can_manage(Some(user_id))) {
            query = query.eq("is_public", true);
        }
        self.db.select(USER_LIBRARIES, &query.order_desc("created_at")).await
    }
}
