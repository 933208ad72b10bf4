use crate::{
    error::{AppError, Result},
    models::{
        notification::*,
        profile::ANONYMOUS_NAME,
        session::SessionContext,
        work::Work,
    },
    services::{
        backend::{schema::{NOTIFICATIONS, WORKS}, Query},
        Database, UserService,
    },
};
use serde_json::json;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info};

#[derive(Clone)]
pub struct NotificationService {
    db: Arc<Database>,
    user_service: UserService,
}

impl NotificationService {
    pub async fn new(db: Arc<Database>, user_service: UserService) -> Result<Self> {
        Ok(Self { db, user_service })
    }

    /// 写入通知；行为者就是接收者时不产生通知
    pub async fn create_notification(&self, request: NewNotification) -> Result<Option<Notification>> {
        if request.actor_id == request.recipient_id {
            debug!("Skipping self notification for user {}", request.actor_id);
            return Ok(None);
        }

        let content = request
            .notification_type
            .render(&request.actor_name, request.work_title.as_deref());

        let notification: Notification = self
            .db
            .create(
                NOTIFICATIONS,
                &json!({
                    "user_id": request.recipient_id,
                    "type": request.notification_type.as_str(),
                    "actor_id": request.actor_id,
                    "work_id": request.work_id,
                    "library_id": request.library_id,
                    "content": content,
                    "is_read": false,
                }),
            )
            .await?;

        info!(
            "Created {} notification {} for user {}",
            notification.notification_type.as_str(),
            notification.id,
            notification.user_id
        );
        Ok(Some(notification))
    }

    /// 最新的在前，附带行为者名字和作品标题
    pub async fn list_notifications(
        &self,
        session: &SessionContext,
        page: usize,
        limit: usize,
    ) -> Result<Vec<NotificationView>> {
        debug!("Listing notifications for user: {}", session.user_id);

        let notifications: Vec<Notification> = self
            .db
            .select(
                NOTIFICATIONS,
                &Query::new()
                    .eq("user_id", session.user_id.as_str())
                    .order_desc("created_at")
                    .page(page, limit),
            )
            .await?;

        let actor_ids: Vec<String> = notifications.iter().map(|n| n.actor_id.clone()).collect();
        let names = self.user_service.display_names(&actor_ids).await?;

        let mut work_ids: Vec<String> = notifications.iter().filter_map(|n| n.work_id.clone()).collect();
        work_ids.sort();
        work_ids.dedup();
        let titles: HashMap<String, String> = if work_ids.is_empty() {
            HashMap::new()
        } else {
            self.db
                .select::<Work>(WORKS, &Query::new().is_in("id", work_ids))
                .await?
                .into_iter()
                .map(|w| (w.id, w.title))
                .collect()
        };

        Ok(notifications
            .into_iter()
            .map(|notification| {
                let actor_name = names
                    .get(&notification.actor_id)
                    .cloned()
                    .unwrap_or_else(|| ANONYMOUS_NAME.to_string());
                let work_title = notification.work_id.as_ref().and_then(|id| titles.get(id).cloned());
                let message = notification
                    .notification_type
                    .render(&actor_name, work_title.as_deref());
                NotificationView { notification, actor_name, work_title, message }
            })
            .collect())
    }

    /// 标记已读；已读时不写后端
    pub async fn mark_read(&self, session: &SessionContext, notification_id: &str) -> Result<Notification> {
        let notification: Notification = self
            .db
            .get_by_id(NOTIFICATIONS, notification_id)
            .await?
            .ok_or_else(|| AppError::not_found("Notification"))?;

        if notification.user_id != session.user_id {
            return Err(AppError::forbidden("Cannot modify another user's notification"));
        }
        if notification.is_read {
            return Ok(notification);
        }

        let updated = self
            .db
            .update_by_id::<Notification>(NOTIFICATIONS, notification_id, json!({ "is_read": true }))
            .await?
            .ok_or_else(|| AppError::not_found("Notification"))?;
        debug!("Notification {} marked as read", notification_id);
        Ok(updated)
    }

    pub async fn mark_all_read(&self, session: &SessionContext) -> Result<usize> {
        let updated = self
            .db
            .update_where(
                NOTIFICATIONS,
                &Query::new()
                    .eq("user_id", session.user_id.as_str())
                    .eq("is_read", false),
                json!({ "is_read": true }),
            )
            .await?;
        info!("Marked {} notifications read for user {}", updated, session.user_id);
        Ok(updated)
    }

    pub async fn unread_count(&self, session: &SessionContext) -> Result<usize> {
        self.db
            .count(
                NOTIFICATIONS,
                &Query::new()
                    .eq("user_id", session.user_id.as_str())
                    .eq("is_read", false),
            )
            .await
    }
}
