use crate::{
    error::{AppError, Result},
    models::{
        follow::{FollowerView, LibraryFollower},
        library::*,
        profile::{display_name_of, Profile},
        session::SessionContext,
        work::Work,
    },
    services::{
        backend::{
            schema::{LIBRARY_FOLLOWERS, PROFILES, USER_LIBRARIES, WORKS},
            Query,
        },
        Database, UserService,
    },
};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info};
use validator::Validate;

/// 书房服务
#[derive(Clone)]
pub struct LibraryService {
    db: Arc<Database>,
    user_service: UserService,
}

/// 空字符串存为 NULL
fn blank_to_null(value: Option<&str>) -> Value {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => json!(text),
        _ => Value::Null,
    }
}

fn visible_to(library: &Library, viewer: Option<&SessionContext>) -> bool {
    library.is_public || viewer.map_or(false, |v| v.can_manage(Some(&library.user_id)))
}

impl LibraryService {
    pub async fn new(db: Arc<Database>, user_service: UserService) -> Result<Self> {
        Ok(Self { db, user_service })
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Option<Library>> {
        self.db
            .find_one(USER_LIBRARIES, Query::new().eq("user_id", user_id))
            .await
    }

    /// 每个用户只能有一个书房
    pub async fn create_library(&self, session: &SessionContext, request: CreateLibraryRequest) -> Result<Library> {
        debug!("Creating library for user: {}", session.user_id);
        request.validate()?;

        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Library name is required"));
        }
        if self.find_by_user(&session.user_id).await?.is_some() {
            return Err(AppError::conflict("You already have a library"));
        }

        let created = self
            .db
            .create::<Library, _>(
                USER_LIBRARIES,
                &json!({
                    "user_id": session.user_id,
                    "name": name,
                    "description": blank_to_null(request.description.as_deref()),
                    "banner_url": blank_to_null(request.banner_url.as_deref()),
                    "is_public": request.is_public.unwrap_or(true),
                    "theme": request.theme.unwrap_or_default().as_str(),
                }),
            )
            .await;

        let library = match created {
            Ok(library) => library,
            Err(e) if e.is_unique_violation() => return Err(AppError::conflict("You already have a library")),
            Err(e) => return Err(e),
        };

        info!("Library {} created for user {}", library.id, session.user_id);
        Ok(library)
    }

    pub async fn get_library(&self, library_id: &str, viewer: Option<&SessionContext>) -> Result<Library> {
        let library: Library = self
            .db
            .get_by_id(USER_LIBRARIES, library_id)
            .await?
            .ok_or_else(|| AppError::not_found("Library"))?;
        if !visible_to(&library, viewer) {
            return Err(AppError::not_found("Library"));
        }
        Ok(library)
    }

    /// 按用户查书房；私有书房只对本人可见
    pub async fn get_library_by_user(&self, user_id: &str, viewer: Option<&SessionContext>) -> Result<LibraryView> {
        let library = self
            .find_by_user(user_id)
            .await?
            .filter(|l| visible_to(l, viewer))
            .ok_or_else(|| AppError::not_found("Library"))?;

        let is_owner = viewer.map_or(false, |v| v.user_id == library.user_id);
        let owner_name = self.user_service.display_name(&library.user_id).await?;
        Ok(LibraryView { library, is_owner, owner_name })
    }

    pub async fn update_settings(&self, session: &SessionContext, request: UpdateLibraryRequest) -> Result<Library> {
        request.validate()?;
        let library = self
            .find_by_user(&session.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Library"))?;

        let mut patch = Map::new();
        if let Some(name) = request.name.as_deref().map(str::trim) {
            if name.is_empty() {
                return Err(AppError::validation("Library name is required"));
            }
            patch.insert("name".into(), json!(name));
        }
        if request.description.is_some() {
            patch.insert("description".into(), blank_to_null(request.description.as_deref()));
        }
        if request.banner_url.is_some() {
            patch.insert("banner_url".into(), blank_to_null(request.banner_url.as_deref()));
        }
        if let Some(is_public) = request.is_public {
            patch.insert("is_public".into(), json!(is_public));
        }
        if let Some(theme) = request.theme {
            patch.insert("theme".into(), json!(theme.as_str()));
        }
        patch.insert("updated_at".into(), json!(Utc::now().to_rfc3339()));

        let updated = self
            .db
            .update_by_id::<Library>(USER_LIBRARIES, &library.id, Value::Object(patch))
            .await?
            .ok_or_else(|| AppError::not_found("Library"))?;

        info!("Library {} settings updated", updated.id);
        Ok(updated)
    }

    pub async fn list_library_works(&self, library_id: &str, viewer: Option<&SessionContext>) -> Result<Vec<Work>> {
        let library = self.get_library(library_id, viewer).await?;

        let mut query = Query::new().eq("library_id", library_id);
        if !viewer.map_or(false, |v| v.can_manage(Some(&library.user_id))) {
            query = query.eq("is_public", true);
        }
        self.db.select(WORKS, &query.order_desc("created_at")).await
    }

    /// 关注者，最近关注的在前
    pub async fn list_followers(
        &self,
        library_id: &str,
        viewer: Option<&SessionContext>,
        page: usize,
        limit: usize,
    ) -> Result<Vec<FollowerView>> {
        self.get_library(library_id, viewer).await?;

        let edges: Vec<LibraryFollower> = self
            .db
            .select(
                LIBRARY_FOLLOWERS,
                &Query::new()
                    .eq("library_id", library_id)
                    .order_desc("created_at")
                    .page(page, limit),
            )
            .await?;
        if edges.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = edges.iter().map(|e| e.follower_id.clone()).collect();
        let profiles: HashMap<String, Profile> = self
            .db
            .select::<Profile>(PROFILES, &Query::new().is_in("id", ids))
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        Ok(edges
            .into_iter()
            .map(|edge| {
                let profile = profiles.get(&edge.follower_id);
                FollowerView {
                    full_name: display_name_of(profile.and_then(|p| p.full_name.as_deref())),
                    bio: profile.and_then(|p| p.bio.clone()).filter(|b| !b.is_empty()),
                    follower_id: edge.follower_id,
                    followed_at: edge.created_at,
                }
            })
            .collect())
    }

    /// 推荐书房：关注数、点赞数靠前的公开书房
    pub async fn recommended(&self, limit: usize) -> Result<Vec<Library>> {
        self.db
            .select(
                USER_LIBRARIES,
                &Query::new()
                    .eq("is_public", true)
                    .order_desc("followers_count")
                    .order_desc("total_likes")
                    .limit(limit.clamp(1, 50)),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_to_null() {
        assert_eq!(blank_to_null(Some("")), Value::Null);
        assert_eq!(blank_to_null(Some("  ")), Value::Null);
        assert_eq!(blank_to_null(None), Value::Null);
        assert_eq!(blank_to_null(Some(" 배너 ")), json!("배너"));
    }
}
