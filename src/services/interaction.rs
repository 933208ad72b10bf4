//! 互动与通知一致性层
//!
//! 点赞、评论、关注三种用户动作，连同它们的派生效果：计数回写和给内容所有者的通知。
//! 所有操作都显式接收 `SessionContext`。后端失败原样向上传播，不重试也不回滚。

use crate::{
    config::Config,
    error::{AppError, Result},
    models::{
        comment::*,
        follow::FollowToggle,
        interaction::{Interaction, InteractionType},
        library::Library,
        notification::{NewNotification, Notification, NotificationType, NotificationView},
        session::SessionContext,
        work::{LikeState, LikeToggle, Work},
    },
    services::{
        backend::{
            schema::{COMMENTS, INTERACTIONS, LIBRARY_FOLLOWERS, USER_LIBRARIES, WORKS},
            Query,
        },
        counters::Counters,
        Database, NotificationService, UserService,
    },
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct InteractionService {
    db: Arc<Database>,
    counters: Counters,
    notification_service: NotificationService,
    user_service: UserService,
    config: Config,
}

fn like_pair(work_id: &str, user_id: &str) -> Query {
    Query::new()
        .eq("work_id", work_id)
        .eq("user_id", user_id)
        .eq("interaction_type", InteractionType::Like.as_str())
}

fn follow_pair(library_id: &str, follower_id: &str) -> Query {
    Query::new().eq("library_id", library_id).eq("follower_id", follower_id)
}

impl InteractionService {
    pub async fn new(
        db: Arc<Database>,
        notification_service: NotificationService,
        user_service: UserService,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            counters: Counters::new(db.clone()),
            db,
            notification_service,
            user_service,
            config: config.clone(),
        })
    }

    /// 读取作品；私有作品对非所有者表现为不存在
    async fn visible_work(&self, work_id: &str, viewer: Option<&SessionContext>) -> Result<Work> {
        let work: Work = self
            .db
            .get_by_id(WORKS, work_id)
            .await?
            .ok_or_else(|| AppError::not_found("Work"))?;

        if !work.is_public && !viewer.map_or(false, |v| v.can_manage(work.user_id.as_deref())) {
            return Err(AppError::not_found("Work"));
        }
        Ok(work)
    }

    /// 切换点赞
    ///
    /// 按当前状态决定插入或删除，重复快速点击不会产生两条点赞。
    pub async fn toggle_like(&self, session: &SessionContext, work_id: &str) -> Result<LikeToggle> {
        debug!("User {} toggling like on work {}", session.user_id, work_id);

        let work = self.visible_work(work_id, Some(session)).await?;
        let pair = like_pair(work_id, &session.user_id);

        let existing = self.db.count(INTERACTIONS, &pair).await?;
        let (liked, fresh) = if existing > 0 {
            self.db.delete_where(INTERACTIONS, &pair).await?;
            (false, false)
        } else {
            let created = self
                .db
                .create::<Interaction, _>(
                    INTERACTIONS,
                    &json!({
                        "work_id": work_id,
                        "user_id": session.user_id,
                        "interaction_type": InteractionType::Like.as_str(),
                    }),
                )
                .await;
            match created {
                Ok(_) => (true, true),
                Err(e) if e.is_unique_violation() => {
                    debug!("Work {} already liked by {}", work_id, session.user_id);
                    (true, false)
                }
                Err(e) => return Err(e),
            }
        };

        let like_count = self.counters.refresh_work_likes(work_id).await?;
        if let Some(library_id) = work.library_id.as_deref() {
            self.counters.refresh_library_totals(library_id).await?;
        }

        if fresh {
            if let Some(owner_id) = work.user_id.as_deref() {
                if owner_id != session.user_id {
                    let actor_name = self.user_service.display_name(&session.user_id).await?;
                    self.notification_service
                        .create_notification(NewNotification {
                            recipient_id: owner_id.to_string(),
                            notification_type: NotificationType::Like,
                            actor_id: session.user_id.clone(),
                            actor_name,
                            work_id: Some(work.id.clone()),
                            work_title: Some(work.title.clone()),
                            library_id: None,
                        })
                        .await?;
                }
            }
        }

        info!("User {} {} work {}", session.user_id, if liked { "liked" } else { "unliked" }, work_id);
        Ok(LikeToggle { work_id: work_id.to_string(), liked, like_count })
    }

    /// 当前用户是否点赞以及点赞数
    pub async fn like_state(&self, viewer: Option<&SessionContext>, work_id: &str) -> Result<LikeState> {
        let work = self.visible_work(work_id, viewer).await?;
        let liked = match viewer {
            Some(session) => self.db.count(INTERACTIONS, &like_pair(work_id, &session.user_id)).await? > 0,
            None => false,
        };
        Ok(LikeState { work_id: work.id, liked, like_count: work.like_count })
    }

    /// 发表评论
    pub async fn post_comment(&self, session: &SessionContext, work_id: &str, text: &str) -> Result<CommentWithAuthor> {
        debug!("User {} commenting on work {}", session.user_id, work_id);

        if !self.config.enable_comments {
            return Err(AppError::forbidden("Comments are disabled"));
        }
        let content = text.trim();
        if content.is_empty() {
            return Err(AppError::validation("Comment cannot be empty"));
        }
        if content.chars().count() > self.config.max_comment_length {
            return Err(AppError::Validation(format!(
                "Comment cannot exceed {} characters",
                self.config.max_comment_length
            )));
        }

        let work = self.visible_work(work_id, Some(session)).await?;

        let comment: Comment = self
            .db
            .create(
                COMMENTS,
                &json!({
                    "work_id": work_id,
                    "user_id": session.user_id,
                    "content": content,
                }),
            )
            .await?;

        self.counters.refresh_work_comments(work_id).await?;

        let author_name = self.user_service.display_name(&session.user_id).await?;
        if let Some(owner_id) = work.user_id.as_deref() {
            if owner_id != session.user_id {
                self.notification_service
                    .create_notification(NewNotification {
                        recipient_id: owner_id.to_string(),
                        notification_type: NotificationType::Comment,
                        actor_id: session.user_id.clone(),
                        actor_name: author_name.clone(),
                        work_id: Some(work.id.clone()),
                        work_title: Some(work.title.clone()),
                        library_id: None,
                    })
                    .await?;
            }
        }

        info!("Comment {} created on work {}", comment.id, work_id);
        Ok(CommentWithAuthor { comment, author_name })
    }

    /// 作品评论，按时间正序
    pub async fn list_comments(
        &self,
        viewer: Option<&SessionContext>,
        work_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<Vec<CommentWithAuthor>> {
        self.visible_work(work_id, viewer).await?;

        let comments: Vec<Comment> = self
            .db
            .select(
                COMMENTS,
                &Query::new()
                    .eq("work_id", work_id)
                    .order_asc("created_at")
                    .page(page, limit),
            )
            .await?;

        let author_ids: Vec<String> = comments.iter().map(|c| c.user_id.clone()).collect();
        let names = self.user_service.display_names(&author_ids).await?;

        Ok(comments
            .into_iter()
            .map(|comment| {
                let author_name = names
                    .get(&comment.user_id)
                    .cloned()
                    .unwrap_or_else(|| crate::models::profile::ANONYMOUS_NAME.to_string());
                CommentWithAuthor { comment, author_name }
            })
            .collect())
    }

    async fn followable_library(&self, session: &SessionContext, library_id: &str) -> Result<Library> {
        let library: Library = self
            .db
            .get_by_id(USER_LIBRARIES, library_id)
            .await?
            .ok_or_else(|| AppError::not_found("Library"))?;

        if !library.is_public && !session.can_manage(Some(&library.user_id)) {
            return Err(AppError::forbidden("This library is private"));
        }
        Ok(library)
    }

    /// 切换关注，与点赞对称
    pub async fn toggle_follow(&self, session: &SessionContext, library_id: &str) -> Result<FollowToggle> {
        debug!("User {} toggling follow on library {}", session.user_id, library_id);

        let library = self.followable_library(session, library_id).await?;
        let pair = follow_pair(library_id, &session.user_id);

        let existing = self.db.count(LIBRARY_FOLLOWERS, &pair).await?;
        let (following, fresh) = if existing > 0 {
            self.db.delete_where(LIBRARY_FOLLOWERS, &pair).await?;
            (false, false)
        } else {
            let created = self
                .db
                .create::<serde_json::Value, _>(
                    LIBRARY_FOLLOWERS,
                    &json!({ "library_id": library_id, "follower_id": session.user_id }),
                )
                .await;
            match created {
                Ok(_) => (true, true),
                Err(e) if e.is_unique_violation() => {
                    debug!("Library {} already followed by {}", library_id, session.user_id);
                    (true, false)
                }
                Err(e) => return Err(e),
            }
        };

        let followers_count = self.counters.refresh_library_followers(library_id).await?;

        if fresh && library.user_id != session.user_id {
            let actor_name = self.user_service.display_name(&session.user_id).await?;
            self.notification_service
                .create_notification(NewNotification {
                    recipient_id: library.user_id.clone(),
                    notification_type: NotificationType::Follow,
                    actor_id: session.user_id.clone(),
                    actor_name,
                    work_id: None,
                    work_title: None,
                    library_id: Some(library.id.clone()),
                })
                .await?;
        }

        info!(
            "User {} {} library {}",
            session.user_id,
            if following { "followed" } else { "unfollowed" },
            library_id
        );
        Ok(FollowToggle { library_id: library_id.to_string(), following, followers_count })
    }

    pub async fn is_following(&self, session: &SessionContext, library_id: &str) -> Result<bool> {
        Ok(self
            .db
            .count(LIBRARY_FOLLOWERS, &follow_pair(library_id, &session.user_id))
            .await?
            > 0)
    }

    pub async fn mark_notification_read(&self, session: &SessionContext, notification_id: &str) -> Result<Notification> {
        self.notification_service.mark_read(session, notification_id).await
    }

    pub async fn list_notifications(
        &self,
        session: &SessionContext,
        page: usize,
        limit: usize,
    ) -> Result<Vec<NotificationView>> {
        self.notification_service.list_notifications(session, page, limit).await
    }
}
